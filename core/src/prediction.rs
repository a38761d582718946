//! Predictions and their achievement status.
//!
//! The prediction list is seeded once at startup (built-in list or the
//! `[[predictions]]` table of the config file) and then only its `result`
//! and `news_match` fields change.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::RwLock;

/// Achievement status of a prediction.
///
/// Serialized with the exact labels the model is asked to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PredictionStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "InProgress")]
    InProgress,
    #[serde(rename = "Obstructed")]
    Obstructed,
    #[serde(rename = "Achieved")]
    Achieved,
}

impl PredictionStatus {
    pub const ALL: [PredictionStatus; 4] = [
        PredictionStatus::Achieved,
        PredictionStatus::InProgress,
        PredictionStatus::Obstructed,
        PredictionStatus::NotStarted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "InProgress",
            Self::Obstructed => "Obstructed",
            Self::Achieved => "Achieved",
        }
    }
}

impl fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a prediction status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for PredictionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Seed entry: what a prediction looks like before any scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionSeed {
    pub timeframe: String,
    pub prediction: String,
}

impl PredictionSeed {
    fn new(timeframe: &str, prediction: &str) -> Self {
        Self {
            timeframe: timeframe.to_string(),
            prediction: prediction.to_string(),
        }
    }
}

/// Built-in prediction list.
pub fn default_seeds() -> Vec<PredictionSeed> {
    vec![
        PredictionSeed::new(
            "Jan-Mar 2025",
            "Executive Order 1: Streamline Federal Bureaucracy",
        ),
        PredictionSeed::new("Jan-Mar 2025", "Policy Change 1: Energy Deregulation"),
        PredictionSeed::new("Apr-Jun 2025", "Judicial Appointment 1: Conservative Judge"),
        PredictionSeed::new(
            "Apr-Jun 2025",
            "Agency Restructuring 1: Department of Education changes",
        ),
        PredictionSeed::new("Jul-Sep 2025", "Legislative Push 1: Immigration Reform"),
        PredictionSeed::new("Jul-Sep 2025", "Withdrawal from International Treaty"),
        PredictionSeed::new(
            "Oct-Dec 2025",
            "Executive Order 2: Re-evaluating Environmental Regulations",
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: usize,
    pub timeframe: String,
    pub prediction: String,
    pub result: PredictionStatus,
    pub news_match: String,
}

/// Per-status counts, in `PredictionStatus::ALL` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scorecard {
    pub counts: Vec<StatusCount>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: PredictionStatus,
    pub count: usize,
}

impl Scorecard {
    pub fn from_predictions(predictions: &[Prediction]) -> Self {
        let counts = PredictionStatus::ALL
            .into_iter()
            .map(|status| StatusCount {
                status,
                count: predictions.iter().filter(|p| p.result == status).count(),
            })
            .collect();
        Self {
            counts,
            total: predictions.len(),
        }
    }

    pub fn count(&self, status: PredictionStatus) -> usize {
        self.counts
            .iter()
            .find(|c| c.status == status)
            .map_or(0, |c| c.count)
    }
}

/// Group predictions by timeframe, keeping first-seen timeframe order.
pub fn group_by_timeframe(predictions: &[Prediction]) -> Vec<(String, Vec<Prediction>)> {
    let mut groups: Vec<(String, Vec<Prediction>)> = Vec::new();
    for prediction in predictions {
        match groups
            .iter_mut()
            .find(|(timeframe, _)| *timeframe == prediction.timeframe)
        {
            Some((_, members)) => members.push(prediction.clone()),
            None => groups.push((prediction.timeframe.clone(), vec![prediction.clone()])),
        }
    }
    groups
}

/// In-memory prediction store.
pub struct PredictionStore {
    predictions: RwLock<Vec<Prediction>>,
}

impl PredictionStore {
    pub fn new(seeds: &[PredictionSeed]) -> Self {
        let predictions = seeds
            .iter()
            .enumerate()
            .map(|(id, seed)| Prediction {
                id,
                timeframe: seed.timeframe.clone(),
                prediction: seed.prediction.clone(),
                result: PredictionStatus::NotStarted,
                news_match: String::new(),
            })
            .collect();
        Self {
            predictions: RwLock::new(predictions),
        }
    }

    pub async fn snapshot(&self) -> Vec<Prediction> {
        self.predictions.read().await.clone()
    }

    /// Record a scoring outcome. Unknown ids are ignored.
    pub async fn update(&self, id: usize, result: PredictionStatus, news_match: String) {
        let mut predictions = self.predictions.write().await;
        if let Some(prediction) = predictions.iter_mut().find(|p| p.id == id) {
            prediction.result = result;
            prediction.news_match = news_match;
        }
    }
}
