//! NewsAPI-compatible keyword search.

use async_trait::async_trait;
use serde::Deserialize;

use super::{ApiError, ApiResult, error_from_response};

/// Default search endpoint.
pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2/everything";

/// A search hit that carried a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsArticle {
    pub title: String,
    pub description: String,
    pub url: String,
}

impl NewsArticle {
    /// `"{title}. {description}"`, the unit of news text fed to the model.
    pub fn summary(&self) -> String {
        format!("{}. {}", self.title, self.description)
    }
}

#[async_trait]
pub trait NewsSearch: Send + Sync {
    async fn search(&self, query: &str) -> ApiResult<Vec<NewsArticle>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

pub struct NewsApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    language: String,
    sort_by: String,
    page_size: u32,
}

impl NewsApiClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            language: "en".to_string(),
            sort_by: "relevancy".to_string(),
            page_size: 5,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = sort_by.into();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

#[async_trait]
impl NewsSearch for NewsApiClient {
    async fn search(&self, query: &str) -> ApiResult<Vec<NewsArticle>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ApiError::NotConfigured("NEWS_API_KEY"))?;

        let page_size = self.page_size.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("language", self.language.as_str()),
                ("sortBy", self.sort_by.as_str()),
                ("apiKey", api_key),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        Ok(body
            .articles
            .into_iter()
            .filter_map(|raw| {
                let description = raw.description.filter(|d| !d.trim().is_empty())?;
                Some(NewsArticle {
                    title: raw.title.unwrap_or_default(),
                    description,
                    url: raw.url.unwrap_or_default(),
                })
            })
            .collect())
    }
}
