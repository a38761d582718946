//! Root of the `tracker-core` library.
//!
//! Tracks a fixed list of political predictions and five authoritarian
//! indicator categories against live news, using an LLM as the judge.

// Library code reports through `tracing`; only the binaries print.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod alert;
pub mod api_clients;
pub mod category;
pub mod config;
pub mod error;
pub mod geopolitical;
pub mod pipeline;
pub mod prediction;
pub mod progress;
pub mod report;
pub mod scoring;

pub use alert::{AlertRule, AlertStatus};
pub use category::Category;
pub use config::{ApiKeys, ConfigSource, TrackerConfig};
pub use error::{Result, TrackerError};
pub use geopolitical::GeopoliticalArticle;
pub use pipeline::{Services, Tracker};
pub use prediction::{Prediction, PredictionStatus, Scorecard};
pub use progress::{ProgressEntry, ProgressFallback};
