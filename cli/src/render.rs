//! Plain-text dashboard rendering.

use std::fmt::Write as _;

use tracker_core::prediction::group_by_timeframe;
use tracker_core::progress::MAX_PROGRESS;
use tracker_core::{
    AlertStatus, GeopoliticalArticle, Prediction, PredictionStatus, ProgressEntry, Scorecard,
};

const BAR_WIDTH: usize = 20;

/// Widest status label, for column alignment.
fn status_width() -> usize {
    PredictionStatus::ALL
        .iter()
        .map(|s| s.as_str().len())
        .max()
        .unwrap_or(0)
}

pub fn predictions(predictions: &[Prediction]) -> String {
    let width = status_width();
    let mut out = String::new();
    for (timeframe, members) in group_by_timeframe(predictions) {
        let _ = writeln!(out, "{timeframe}");
        for p in members {
            let _ = writeln!(out, "  {:<width$}  {}", p.result.as_str(), p.prediction);
        }
    }
    out
}

pub fn scorecard(scorecard: &Scorecard) -> String {
    let counts = scorecard
        .counts
        .iter()
        .map(|c| format!("{}: {}", c.status, c.count))
        .collect::<Vec<_>>()
        .join("  ");
    format!("Scorecard ({} predictions)  {counts}\n", scorecard.total)
}

fn bar(progress: u8) -> String {
    let filled = usize::from(progress.min(MAX_PROGRESS)) * BAR_WIDTH / usize::from(MAX_PROGRESS);
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

pub fn progress(items: &[ProgressEntry]) -> String {
    let width = items
        .iter()
        .map(|i| i.title.as_str().len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for item in items {
        let _ = writeln!(
            out,
            "{:<width$}  {} {:>3}%  (updated {})",
            item.title.as_str(),
            bar(item.progress),
            item.progress,
            item.last_updated
        );
        for article in &item.articles {
            let _ = writeln!(out, "{:width$}    - {} <{}>", "", article.title, article.url);
        }
    }
    out
}

pub fn alerts(status: &AlertStatus) -> String {
    if status.triggered {
        format!("ALERT: {}\n", status.reason)
    } else {
        "No alerts.\n".to_string()
    }
}

pub fn feed(articles: &[GeopoliticalArticle]) -> String {
    if articles.is_empty() {
        return "No articles.\n".to_string();
    }
    let mut out = String::new();
    for article in articles {
        let tags = article
            .tags
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(out, "{}  {}", article.date, article.title);
        if !tags.is_empty() {
            let _ = write!(out, "  [{tags}]");
        }
        let _ = writeln!(out);
        if !article.summary.is_empty() {
            let _ = writeln!(out, "    {}", article.summary);
        }
        if !article.link.is_empty() {
            let _ = writeln!(out, "    {}", article.link);
        }
    }
    out
}
