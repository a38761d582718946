//! Top-level error for tracker operations that can fail outright.
//!
//! Most external failures never reach this type: the pipeline degrades them
//! to safe defaults. What remains is setup (config, HTTP client builder) and
//! local report I/O.

use crate::api_clients::ApiError;
use crate::config::ConfigError;
use crate::report::ReportError;

/// Tracker result type alias
pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_sources_transparently() {
        let err: TrackerError = ConfigError::Invalid("rss.feeds is empty".to_string()).into();
        assert_eq!(err.to_string(), "invalid config: rss.feeds is empty");

        let err: TrackerError = ApiError::NotConfigured("OPENAI_API_KEY").into();
        assert!(matches!(err, TrackerError::Api(_)));
    }
}
