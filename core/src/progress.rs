//! Per-category progress store.

use crate::category::Category;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Starting value for every category before the first analysis pass.
pub const DEFAULT_INITIAL_PROGRESS: u8 = 50;

/// Upper bound for a progress value.
pub const MAX_PROGRESS: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleLink {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub title: Category,
    pub progress: u8,
    /// ISO date (`YYYY-MM-DD`).
    pub last_updated: String,
    #[serde(default)]
    pub articles: Vec<ArticleLink>,
}

impl ProgressEntry {
    pub fn new(title: Category, progress: u8, last_updated: NaiveDate) -> Self {
        Self {
            title,
            progress: progress.min(MAX_PROGRESS),
            last_updated: last_updated.format("%Y-%m-%d").to_string(),
            articles: Vec::new(),
        }
    }

    pub fn with_articles(mut self, articles: Vec<ArticleLink>) -> Self {
        self.articles = articles;
        self
    }
}

/// What to store when the analyzer produced no judgment for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressFallback {
    /// Keep whatever value the category already had.
    #[default]
    KeepPrevious,
    /// Reset the category to 0.
    Zero,
}

impl ProgressFallback {
    pub fn resolve(self, previous: u8) -> u8 {
        match self {
            Self::KeepPrevious => previous,
            Self::Zero => 0,
        }
    }
}

/// In-memory progress store: exactly one entry per category, in
/// `Category::ALL` order.
pub struct ProgressStore {
    entries: RwLock<Vec<ProgressEntry>>,
}

impl ProgressStore {
    pub fn new(initial: u8, today: NaiveDate) -> Self {
        let entries = Category::ALL
            .into_iter()
            .map(|category| ProgressEntry::new(category, initial, today))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub async fn snapshot(&self) -> Vec<ProgressEntry> {
        self.entries.read().await.clone()
    }

    pub async fn progress_of(&self, category: Category) -> Option<u8> {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| e.title == category)
            .map(|e| e.progress)
    }

    /// Replace a category's entry wholesale. The progress value is clamped.
    pub async fn replace(&self, mut entry: ProgressEntry) {
        entry.progress = entry.progress.min(MAX_PROGRESS);
        let mut entries = self.entries.write().await;
        if let Some(slot) = entries.iter_mut().find(|e| e.title == entry.title) {
            *slot = entry;
        }
    }
}
