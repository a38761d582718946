//! Tagged world-news feed.

use serde::{Deserialize, Serialize};

use crate::api_clients::{FeedEntry, FeedSource};
use crate::category::Category;
use crate::scoring::Tagger;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeopoliticalArticle {
    pub title: String,
    /// `YYYY-MM-DD` or `N/A`.
    pub date: String,
    pub summary: String,
    pub link: String,
    /// Zero or one category.
    pub tags: Vec<Category>,
}

impl GeopoliticalArticle {
    fn from_entry(entry: FeedEntry, tag: Option<Category>) -> Self {
        Self {
            date: entry.date_label(),
            title: entry.title,
            summary: entry.summary,
            link: entry.link,
            tags: tag.into_iter().collect(),
        }
    }
}

/// Text handed to the tagger for one entry.
fn tagger_input(entry: &FeedEntry) -> String {
    format!("Title: {}\nSummary: {}", entry.title, entry.summary)
}

/// Read the first `per_feed` entries of each feed in order and tag each.
/// A feed that cannot be fetched or parsed is skipped.
pub async fn collect_articles(
    source: &dyn FeedSource,
    tagger: &Tagger,
    feeds: &[String],
    per_feed: usize,
) -> Vec<GeopoliticalArticle> {
    let mut articles = Vec::new();
    for url in feeds {
        let entries = match source.fetch(url, per_feed).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(feed = %url, "skipping feed: {e}");
                continue;
            }
        };
        for entry in entries.into_iter().take(per_feed) {
            let tag = tagger.tag(&tagger_input(&entry)).await;
            articles.push(GeopoliticalArticle::from_entry(entry, tag));
        }
    }
    tracing::info!(count = articles.len(), "geopolitical feed collected");
    articles
}


#[cfg(test)]
mod tests {
    use super::test_support::{StaticFeeds, entry};
    use super::*;
    use crate::scoring::test_support::ScriptedLlm;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn takes_first_entries_per_feed_and_skips_broken_feeds() {
        let source = StaticFeeds::default()
            .with("a", vec![entry("A1", "first"), entry("A2", "second")])
            .with("c", vec![entry("C1", "third")]);
        let llm = ScriptedLlm::replying(&["Media Subversion", "None"]);
        let tagger = Tagger::new(llm.clone());
        let feeds = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let articles = collect_articles(&source, &tagger, &feeds, 1).await;

        assert_eq!(
            articles.iter().map(|a| a.title.as_str()).collect::<Vec<_>>(),
            vec!["A1", "C1"]
        );
        assert_eq!(articles[0].tags, vec![Category::MediaSubversion]);
        assert!(articles[1].tags.is_empty());
        assert_eq!(articles[0].date, "N/A");

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests[0].user, "Classify this article:\nTitle: A1\nSummary: first");
    }

    #[tokio::test]
    async fn no_feeds_means_no_articles() {
        let llm = ScriptedLlm::replying(&[]);
        let tagger = Tagger::new(llm.clone());
        let articles = collect_articles(&StaticFeeds::default(), &tagger, &[], 3).await;
        assert!(articles.is_empty());
        assert_eq!(llm.call_count(), 0);
    }
}
