//! The tracker: owns both stores and runs the scoring and analysis passes.
//!
//! Passes are sequential, one search and one model call per item, in list
//! order. Store locks are only taken for the final write of each item, never
//! across an external call, so concurrent passes interleave and the last
//! write wins.

use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::alert::{AlertRule, AlertStatus, evaluate};
use crate::api_clients::{
    FeedSource, HttpFeedSource, LlmClient, NewsApiClient, NewsArticle, NewsSearch, OpenAiClient,
    http_client,
};
use crate::category::{Category, prefixed_query};
use crate::config::{ApiKeys, TrackerConfig};
use crate::error::Result;
use crate::geopolitical::{GeopoliticalArticle, collect_articles};
use crate::prediction::{Prediction, PredictionStore, Scorecard};
use crate::progress::{ArticleLink, ProgressEntry, ProgressFallback, ProgressStore};
use crate::report::{ReportError, render_report, write_report_file};
use crate::scoring::{ProgressAnalyzer, StatusScorer, Tagger};

/// The three external services the tracker talks to.
#[derive(Clone)]
pub struct Services {
    pub llm: Arc<dyn LlmClient>,
    pub news: Arc<dyn NewsSearch>,
    pub feeds: Arc<dyn FeedSource>,
}

impl Services {
    /// Real HTTP clients, one `reqwest::Client` per service so each carries
    /// its own timeout.
    pub fn from_config(config: &TrackerConfig, keys: &ApiKeys) -> Result<Self> {
        let llm = OpenAiClient::new(
            http_client(config.llm.timeout())?,
            config.llm.base_url.clone(),
            keys.openai.clone(),
            config.llm.model.clone(),
        );
        let news = NewsApiClient::new(
            http_client(config.news.timeout())?,
            config.news.base_url.clone(),
            keys.news.clone(),
        )
        .with_language(config.news.language.clone())
        .with_sort_by(config.news.sort_by.clone())
        .with_page_size(config.news.page_size);
        let feeds = HttpFeedSource::new(http_client(config.rss.timeout())?);

        Ok(Self {
            llm: Arc::new(llm),
            news: Arc::new(news),
            feeds: Arc::new(feeds),
        })
    }
}

/// One `"{title}. {description}"` per line.
fn joined_summaries(articles: &[NewsArticle]) -> String {
    articles
        .iter()
        .map(NewsArticle::summary)
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct Tracker {
    predictions: PredictionStore,
    progress: ProgressStore,
    news: Arc<dyn NewsSearch>,
    feeds: Arc<dyn FeedSource>,
    scorer: StatusScorer,
    analyzer: ProgressAnalyzer,
    tagger: Tagger,
    query_prefix: String,
    feed_urls: Vec<String>,
    entries_per_feed: usize,
    alert_rules: Vec<AlertRule>,
    fallback: ProgressFallback,
}

impl Tracker {
    /// Build a tracker whose progress entries are stamped with today's date.
    pub fn new(config: &TrackerConfig, services: Services) -> Self {
        Self::new_on(config, services, Local::now().date_naive())
    }

    pub fn new_on(config: &TrackerConfig, services: Services, today: NaiveDate) -> Self {
        Self {
            predictions: PredictionStore::new(&config.predictions),
            progress: ProgressStore::new(config.progress.initial, today),
            news: services.news,
            feeds: services.feeds,
            scorer: StatusScorer::new(services.llm.clone(), config.llm.score_cache_ttl()),
            analyzer: ProgressAnalyzer::new(services.llm.clone()),
            tagger: Tagger::new(services.llm),
            query_prefix: config.news.query_prefix.clone(),
            feed_urls: config.rss.feeds.clone(),
            entries_per_feed: config.rss.entries_per_feed,
            alert_rules: config.alerts.clone(),
            fallback: config.progress.fallback,
        }
    }

    /// Convenience for binaries: real clients from config plus env keys.
    pub fn from_config(config: &TrackerConfig, keys: &ApiKeys) -> Result<Self> {
        Ok(Self::new(config, Services::from_config(config, keys)?))
    }

    pub async fn predictions(&self) -> Vec<Prediction> {
        self.predictions.snapshot().await
    }

    pub async fn scorecard(&self) -> Scorecard {
        Scorecard::from_predictions(&self.predictions.snapshot().await)
    }

    pub async fn progress(&self) -> Vec<ProgressEntry> {
        self.progress.snapshot().await
    }

    pub async fn alerts(&self) -> AlertStatus {
        evaluate(&self.alert_rules, &self.progress.snapshot().await)
    }

    /// Search failures degrade to "no news".
    async fn search(&self, query: &str) -> Vec<NewsArticle> {
        match self.news.search(query).await {
            Ok(articles) => {
                tracing::debug!(query, count = articles.len(), "news search");
                articles
            }
            Err(e) => {
                tracing::warn!(query, "news search failed: {e}");
                Vec::new()
            }
        }
    }

    /// Score every prediction against fresh news and store the outcome.
    pub async fn score_predictions(&self) -> Vec<Prediction> {
        let predictions = self.predictions.snapshot().await;
        tracing::info!(count = predictions.len(), "scoring predictions");

        for prediction in &predictions {
            let query = prefixed_query(&self.query_prefix, &prediction.prediction);
            let news = joined_summaries(&self.search(&query).await);
            let status = self.scorer.score(&prediction.prediction, &news).await;
            tracing::info!(id = prediction.id, %status, "prediction scored");
            self.predictions.update(prediction.id, status, news).await;
        }

        self.predictions.snapshot().await
    }

    pub async fn analyze_progress(&self) -> Vec<ProgressEntry> {
        self.analyze_progress_on(Local::now().date_naive()).await
    }

    /// Re-estimate every category. Each entry is replaced wholesale with the
    /// new value, `today`, and the articles that informed it.
    pub async fn analyze_progress_on(&self, today: NaiveDate) -> Vec<ProgressEntry> {
        for category in Category::ALL {
            let articles = self
                .search(&category.search_query(&self.query_prefix))
                .await;
            let news = joined_summaries(&articles);

            let value = match self.analyzer.analyze(category, &news).await {
                Ok(value) => value,
                Err(reason) => {
                    let previous = self.progress.progress_of(category).await.unwrap_or(0);
                    let value = self.fallback.resolve(previous);
                    tracing::info!(%category, ?reason, value, "no progress judgment; using fallback");
                    value
                }
            };

            let links = articles
                .into_iter()
                .map(|a| ArticleLink {
                    title: a.title,
                    url: a.url,
                })
                .collect();
            self.progress
                .replace(ProgressEntry::new(category, value, today).with_articles(links))
                .await;
        }

        self.progress.snapshot().await
    }

    pub async fn geopolitical_feed(&self) -> Vec<GeopoliticalArticle> {
        collect_articles(
            self.feeds.as_ref(),
            &self.tagger,
            &self.feed_urls,
            self.entries_per_feed,
        )
        .await
    }

    /// Current progress plus a fresh feed, rendered to PDF bytes.
    pub async fn report_pdf(&self) -> Vec<u8> {
        let events = self.geopolitical_feed().await;
        render_report(&self.progress.snapshot().await, &events)
    }

    /// Same as [`Tracker::report_pdf`] but written to a temp file that is
    /// deleted when the returned handle drops.
    pub async fn report_file(&self) -> std::result::Result<tempfile::NamedTempFile, ReportError> {
        let events = self.geopolitical_feed().await;
        let progress = self.progress.snapshot().await;
        write_report_file(&progress, &events, None)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::api_clients::{ApiError, ApiResult, NewsArticle, NewsSearch};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned search results keyed by exact query. Unknown queries return
    /// nothing; queries listed in `failing` return an error.
    #[derive(Default)]
    pub struct StaticNews {
        pub results: HashMap<String, Vec<NewsArticle>>,
        pub failing: Vec<String>,
        pub queries: Mutex<Vec<String>>,
    }

    impl StaticNews {
        pub fn with(mut self, query: &str, articles: Vec<NewsArticle>) -> Self {
            self.results.insert(query.to_string(), articles);
            self
        }

        pub fn failing(mut self, query: &str) -> Self {
            self.failing.push(query.to_string());
            self
        }
    }

    pub fn article(title: &str, description: &str) -> NewsArticle {
        NewsArticle {
            title: title.to_string(),
            description: description.to_string(),
            url: format!("https://news.example/{}", title.replace(' ', "-")),
        }
    }

    #[async_trait]
    impl NewsSearch for StaticNews {
        async fn search(&self, query: &str) -> ApiResult<Vec<NewsArticle>> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.failing.iter().any(|q| q == query) {
                return Err(ApiError::Parse("search unavailable".to_string()));
            }
            Ok(self.results.get(query).cloned().unwrap_or_default())
        }
    }
}
