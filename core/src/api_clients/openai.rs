//! OpenAI-compatible chat-completions client.
//!
//! Non-streaming: the scorers ask for a handful of tokens, so the whole reply
//! is read in one response.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ApiError, ApiResult, ChatRequest, LlmClient, error_from_response};

/// Default API root; `/chat/completions` is appended.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    /// Create a client. `api_key = None` yields a client whose every call
    /// fails with `ApiError::NotConfigured`.
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_request_body(&self, request: &ChatRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> ApiResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ApiError::NotConfigured("OPENAI_API_KEY"))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|_| ApiError::Parse("API key is not a valid header value".to_string()))?,
        );

        let response = self
            .client
            .post(self.endpoint())
            .headers(headers)
            .json(&self.build_request_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Parse("response has no choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        tracing::debug!(model = %self.model, reply = %content, "chat completion");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatRequest {
        ChatRequest {
            system: "You are a political analyst.".to_string(),
            user: "Status?".to_string(),
            temperature: 0.0,
            max_tokens: 10,
        }
    }

    fn client(server: &MockServer, key: Option<&str>) -> OpenAiClient {
        OpenAiClient::new(
            crate::api_clients::http_client(Duration::from_secs(5)).unwrap(),
            server.uri(),
            key.map(str::to_string),
            DEFAULT_MODEL,
        )
    }

    #[test]
    fn request_body_carries_sampling_parameters() {
        let client = OpenAiClient::new(reqwest::Client::new(), DEFAULT_BASE_URL, None, "gpt-4o");
        let body = client.build_request_body(&request());
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 10);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Status?");
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Achieved" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server, Some("sk-test"))
            .complete(&request())
            .await
            .unwrap();
        assert_eq!(reply, "Achieved");
    }

    #[tokio::test]
    async fn missing_key_never_hits_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server, None).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ApiError::NotConfigured("OPENAI_API_KEY")));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
            })))
            .mount(&server)
            .await;

        let err = client(&server, Some("sk-bad"))
            .complete(&request())
            .await
            .unwrap_err();
        match err {
            ApiError::ApiResponse {
                status,
                message,
                error_type,
            } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
                assert_eq!(error_type.as_deref(), Some("invalid_request_error"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = client(&server, Some("sk-test"))
            .complete(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }
}
