//! LLM-backed judgments: prediction status, category progress, article tags.
//!
//! Every judgment is validated against a closed set before it is returned.
//! Anything the model says outside that set, and any client failure, turns
//! into the conservative answer for that judgment.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::api_clients::{ChatRequest, LlmClient};
use crate::category::Category;
use crate::prediction::PredictionStatus;
use crate::progress::MAX_PROGRESS;
use tracker_utils_string::take_bytes_at_char_boundary;

/// System message shared by the status and progress prompts.
pub const ANALYST_SYSTEM_PROMPT: &str = "You are a political analyst.";

/// Largest slice of news text placed into a single prompt.
pub const MAX_NEWS_BYTES: usize = 12_000;

/// Tag value meaning "no category applies".
pub const NO_TAG: &str = "None";

fn bounded_news(news: &str) -> &str {
    take_bytes_at_char_boundary(news, MAX_NEWS_BYTES)
}

fn status_prompt(prediction: &str, news: &str) -> String {
    format!(
        "You are an expert political analyst. Your task is to evaluate the status of a specific prediction based on recent news.\n\
         The status can be one of the following: \"Achieved\", \"InProgress\", \"Obstructed\", \"Not Started\".\n\n\
         Prediction: \"{prediction}\"\n\n\
         Recent News Summary: \"{news}\"\n\n\
         Based on the news, what is the most appropriate status for the prediction?\n\
         Return only one of the following words: Achieved, InProgress, Obstructed, Not Started.",
        news = bounded_news(news),
    )
}

fn progress_prompt(category: Category, news: &str) -> String {
    format!(
        "You are an expert political analyst tracking authoritarian indicators.\n\
         Indicator: \"{category}\"\n\n\
         Recent News Summary: \"{news}\"\n\n\
         On a scale from 0 to 100, how far has this indicator advanced, where 0 means no movement \
         and 100 means fully realized?\n\
         Return only the integer.",
        news = bounded_news(news),
    )
}

fn tag_system_prompt() -> String {
    format!(
        "You're a political analyst classifying news. \
         Choose the ONE most relevant category from this list: {}. \
         If none apply, return '{NO_TAG}'. Only return the category name.",
        Category::prompt_list()
    )
}

/// Accept a status reply only if, trimmed, it is exactly one of the labels.
pub fn parse_status_reply(reply: &str) -> Option<PredictionStatus> {
    reply.trim().parse().ok()
}

/// First run of ASCII digits in `reply`, clamped to `[0, 100]`.
///
/// Overlong digit runs saturate rather than fail, so `"999999999999"` is 100.
pub fn parse_progress_reply(reply: &str) -> Option<u8> {
    let start = reply.find(|c: char| c.is_ascii_digit())?;
    let digits: &str = reply[start..]
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .unwrap_or_default();
    let value = digits
        .bytes()
        .fold(0u32, |acc, b| {
            acc.saturating_mul(10).saturating_add(u32::from(b - b'0'))
        })
        .min(u32::from(MAX_PROGRESS));
    u8::try_from(value).ok()
}

/// Accept a tag reply only if, trimmed, it names a category.
pub fn parse_tag_reply(reply: &str) -> Option<Category> {
    reply.trim().parse().ok()
}

/// Most status judgments kept in memory at once.
pub const STATUS_CACHE_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(999);

type StatusCacheKey = (String, String);

/// Scores a prediction against news text.
pub struct StatusScorer {
    llm: Arc<dyn LlmClient>,
    cache_ttl: Duration,
    cache: Mutex<LruCache<StatusCacheKey, (Instant, PredictionStatus)>>,
}

impl StatusScorer {
    /// `cache_ttl` of zero disables memoization.
    pub fn new(llm: Arc<dyn LlmClient>, cache_ttl: Duration) -> Self {
        Self::with_capacity(llm, cache_ttl, STATUS_CACHE_CAPACITY)
    }

    pub fn with_capacity(
        llm: Arc<dyn LlmClient>,
        cache_ttl: Duration,
        capacity: NonZeroUsize,
    ) -> Self {
        Self {
            llm,
            cache_ttl,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn cached(&self, key: &StatusCacheKey) -> Option<PredictionStatus> {
        if self.cache_ttl.is_zero() {
            return None;
        }
        let mut cache = self.cache.lock().ok()?;
        let (at, status) = *cache.get(key)?;
        if at.elapsed() < self.cache_ttl {
            Some(status)
        } else {
            cache.pop(key);
            None
        }
    }

    fn remember(&self, key: StatusCacheKey, status: PredictionStatus) {
        if self.cache_ttl.is_zero() {
            return;
        }
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, (Instant::now(), status));
        }
    }

    /// Judge `prediction` against `news`. Empty news is `Not Started`
    /// without a model call.
    pub async fn score(&self, prediction: &str, news: &str) -> PredictionStatus {
        if news.trim().is_empty() {
            return PredictionStatus::NotStarted;
        }

        let key = (prediction.to_string(), news.to_string());
        if let Some(status) = self.cached(&key) {
            tracing::debug!(prediction, %status, "status cache hit");
            return status;
        }

        let request = ChatRequest {
            system: ANALYST_SYSTEM_PROMPT.to_string(),
            user: status_prompt(prediction, news),
            temperature: 0.0,
            max_tokens: 10,
        };

        match self.llm.complete(&request).await {
            Ok(reply) => match parse_status_reply(&reply) {
                Some(status) => {
                    self.remember(key, status);
                    status
                }
                None => {
                    tracing::warn!(
                        prediction,
                        reply = %reply.trim(),
                        "model returned an invalid status; defaulting to Not Started"
                    );
                    PredictionStatus::NotStarted
                }
            },
            Err(e) => {
                tracing::error!(prediction, "status scoring failed: {e}");
                PredictionStatus::NotStarted
            }
        }
    }
}

/// Why the analyzer produced no number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoJudgment {
    /// No news text to judge.
    NoEvidence,
    /// Reply contained no digits.
    Unparseable(String),
    /// The model call failed.
    Failed(String),
}

/// Estimates how far a category has advanced.
pub struct ProgressAnalyzer {
    llm: Arc<dyn LlmClient>,
}

impl ProgressAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Returns a clamped percentage, or why there is none. The caller
    /// decides what a non-judgment means for the stored value.
    pub async fn analyze(&self, category: Category, news: &str) -> Result<u8, NoJudgment> {
        if news.trim().is_empty() {
            return Err(NoJudgment::NoEvidence);
        }

        let request = ChatRequest {
            system: ANALYST_SYSTEM_PROMPT.to_string(),
            user: progress_prompt(category, news),
            temperature: 0.0,
            max_tokens: 5,
        };

        match self.llm.complete(&request).await {
            Ok(reply) => parse_progress_reply(&reply).ok_or_else(|| {
                tracing::warn!(%category, reply = %reply.trim(), "model returned no progress number");
                NoJudgment::Unparseable(reply)
            }),
            Err(e) => {
                tracing::error!(%category, "progress analysis failed: {e}");
                Err(NoJudgment::Failed(e.to_string()))
            }
        }
    }
}

/// Assigns at most one category to a news snippet.
pub struct Tagger {
    llm: Arc<dyn LlmClient>,
}

impl Tagger {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// `None` covers both "no category applies" and any failure.
    pub async fn tag(&self, text: &str) -> Option<Category> {
        let request = ChatRequest {
            system: tag_system_prompt(),
            user: format!("Classify this article:\n{}", bounded_news(text)),
            temperature: 0.2,
            max_tokens: 20,
        };

        match self.llm.complete(&request).await {
            Ok(reply) => {
                let tag = parse_tag_reply(&reply);
                if tag.is_none() && reply.trim() != NO_TAG {
                    tracing::debug!(reply = %reply.trim(), "tagger reply outside category set");
                }
                tag
            }
            Err(e) => {
                tracing::error!("tagging failed: {e}");
                None
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::ScriptedLlm;
    use super::*;
    use crate::api_clients::ApiError;
    use pretty_assertions::assert_eq;

    #[test]
    fn status_reply_must_match_exactly() {
        assert_eq!(parse_status_reply(" Achieved\n"), Some(PredictionStatus::Achieved));
        assert_eq!(parse_status_reply("Not Started"), Some(PredictionStatus::NotStarted));
        assert_eq!(parse_status_reply("Achieved."), None);
        assert_eq!(parse_status_reply("In Progress"), None);
        assert_eq!(parse_status_reply("Status: Obstructed"), None);
        assert_eq!(parse_status_reply(""), None);
    }

    #[test]
    fn progress_reply_takes_first_number_and_clamps() {
        assert_eq!(parse_progress_reply("72"), Some(72));
        assert_eq!(parse_progress_reply("About 65%, maybe 70"), Some(65));
        assert_eq!(parse_progress_reply("150"), Some(100));
        assert_eq!(parse_progress_reply("99999999999999999999"), Some(100));
        assert_eq!(parse_progress_reply("-5"), Some(5));
        assert_eq!(parse_progress_reply("0"), Some(0));
        assert_eq!(parse_progress_reply("none"), None);
        assert_eq!(parse_progress_reply(""), None);
    }

    #[test]
    fn tag_reply_is_category_or_nothing() {
        assert_eq!(parse_tag_reply("Media Subversion"), Some(Category::MediaSubversion));
        assert_eq!(parse_tag_reply("None"), None);
        assert_eq!(parse_tag_reply("Media Subversion."), None);
        assert_eq!(parse_tag_reply("Elections"), None);
    }

    #[tokio::test]
    async fn empty_news_is_not_started_without_a_call() {
        let llm = ScriptedLlm::replying(&["Achieved"]);
        let scorer = StatusScorer::new(llm.clone(), Duration::ZERO);
        assert_eq!(scorer.score("Anything", "").await, PredictionStatus::NotStarted);
        assert_eq!(scorer.score("Anything", " \n ").await, PredictionStatus::NotStarted);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn valid_reply_is_stored_and_prompt_is_deterministic() {
        let llm = ScriptedLlm::replying(&["InProgress"]);
        let scorer = StatusScorer::new(llm.clone(), Duration::ZERO);
        let status = scorer
            .score("Policy Change 1: Energy Deregulation", "Drilling permits expanded.")
            .await;
        assert_eq!(status, PredictionStatus::InProgress);

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].max_tokens, 10);
        assert_eq!(requests[0].system, ANALYST_SYSTEM_PROMPT);
        assert!(requests[0].user.contains("Drilling permits expanded."));
    }

    #[tokio::test]
    async fn invalid_reply_and_failure_fall_back() {
        let llm = ScriptedLlm::new(vec![
            Ok("Probably achieved".to_string()),
            Ok(String::new()),
            Err(ApiError::NotConfigured("OPENAI_API_KEY")),
        ]);
        let scorer = StatusScorer::new(llm, Duration::ZERO);
        for _ in 0..3 {
            assert_eq!(scorer.score("p", "news").await, PredictionStatus::NotStarted);
        }
    }

    #[tokio::test]
    async fn cache_reuses_successful_judgments_only() {
        let llm = ScriptedLlm::replying(&["garbage", "Obstructed", "Achieved"]);
        let scorer = StatusScorer::new(llm.clone(), Duration::from_secs(600));

        assert_eq!(scorer.score("p", "n").await, PredictionStatus::NotStarted);
        assert_eq!(scorer.score("p", "n").await, PredictionStatus::Obstructed);
        assert_eq!(scorer.score("p", "n").await, PredictionStatus::Obstructed);
        assert_eq!(llm.call_count(), 2);

        assert_eq!(scorer.score("p", "other news").await, PredictionStatus::Achieved);
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn cache_is_bounded_and_keeps_recent_judgments() {
        let replies = vec!["Achieved"; 50];
        let llm = ScriptedLlm::replying(&replies);
        let capacity = NonZeroUsize::new(8).unwrap();
        let scorer = StatusScorer::with_capacity(llm.clone(), Duration::from_secs(600), capacity);

        for pass in 0..50 {
            scorer.score("p", &format!("news batch {pass}")).await;
            assert!(scorer.cache.lock().unwrap().len() <= capacity.get());
        }
        assert_eq!(llm.call_count(), 50);

        assert_eq!(scorer.score("p", "news batch 49").await, PredictionStatus::Achieved);
        assert_eq!(llm.call_count(), 50);
        assert_eq!(scorer.score("p", "news batch 0").await, PredictionStatus::NotStarted);
        assert_eq!(llm.call_count(), 51);
    }

    #[test]
    fn default_capacity_is_one_thousand() {
        assert_eq!(STATUS_CACHE_CAPACITY.get(), 1000);
    }

    #[tokio::test]
    async fn analyzer_clamps_and_reports_non_judgments() {
        let llm = ScriptedLlm::new(vec![
            Ok("120".to_string()),
            Ok("unclear".to_string()),
            Err(ApiError::Parse("boom".to_string())),
        ]);
        let analyzer = ProgressAnalyzer::new(llm.clone());
        let c = Category::FederalAgencyCapture;

        assert_eq!(analyzer.analyze(c, "news").await, Ok(100));
        assert_eq!(
            analyzer.analyze(c, "news").await,
            Err(NoJudgment::Unparseable("unclear".to_string()))
        );
        assert!(matches!(analyzer.analyze(c, "news").await, Err(NoJudgment::Failed(_))));
        assert_eq!(analyzer.analyze(c, "").await, Err(NoJudgment::NoEvidence));
        assert_eq!(llm.call_count(), 3);
        assert!(llm.requests.lock().unwrap()[0].user.contains("Federal Agency Capture"));
    }

    #[tokio::test]
    async fn tagger_only_returns_known_categories() {
        let llm = ScriptedLlm::new(vec![
            Ok("NATO Disengagement".to_string()),
            Ok("None".to_string()),
            Ok("Foreign Policy".to_string()),
            Err(ApiError::Parse("boom".to_string())),
        ]);
        let tagger = Tagger::new(llm.clone());
        assert_eq!(tagger.tag("a").await, Some(Category::NatoDisengagement));
        assert_eq!(tagger.tag("b").await, None);
        assert_eq!(tagger.tag("c").await, None);
        assert_eq!(tagger.tag("d").await, None);

        let requests = llm.requests.lock().unwrap();
        assert!(requests[0].system.contains("Judicial Defiance"));
        assert_eq!(requests[0].max_tokens, 20);
        assert!(requests[0].user.starts_with("Classify this article:\n"));
    }

    #[test]
    fn long_news_is_bounded_in_prompt() {
        let news = "é".repeat(MAX_NEWS_BYTES);
        let prompt = status_prompt("p", &news);
        assert!(prompt.len() < MAX_NEWS_BYTES + 1_000);
    }
}
