//! The five tracked agenda categories.
//!
//! This enum is the only place the category list is spelled out. Progress
//! entries, alert rules, tagger prompts, and configuration all go through it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    FederalAgencyCapture,
    JudicialDefiance,
    SuppressionOfDissent,
    NatoDisengagement,
    MediaSubversion,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 5] = [
        Category::FederalAgencyCapture,
        Category::JudicialDefiance,
        Category::SuppressionOfDissent,
        Category::NatoDisengagement,
        Category::MediaSubversion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FederalAgencyCapture => "Federal Agency Capture",
            Self::JudicialDefiance => "Judicial Defiance",
            Self::SuppressionOfDissent => "Suppression of Dissent",
            Self::NatoDisengagement => "NATO Disengagement",
            Self::MediaSubversion => "Media Subversion",
        }
    }

    /// News search query for this category, e.g. `"Project 2025 Judicial Defiance"`.
    pub fn search_query(self, prefix: &str) -> String {
        prefixed_query(prefix, self.as_str())
    }

    /// Comma-separated list used inside classifier prompts.
    pub fn prompt_list() -> String {
        Self::ALL
            .into_iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `"{prefix} {text}"`, or just `text` when the prefix is blank.
pub fn prefixed_query(prefix: &str, text: &str) -> String {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        text.to_string()
    } else {
        format!("{prefix} {text}")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Exact match on the display name. Model output is held to the same
    /// rule, so no case folding or trimming happens here.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn from_str_is_exact() {
        assert!("federal agency capture".parse::<Category>().is_err());
        assert!(" Media Subversion".parse::<Category>().is_err());
        assert!("None".parse::<Category>().is_err());
    }

    #[test]
    fn search_query_uses_prefix() {
        assert_eq!(
            Category::NatoDisengagement.search_query("Project 2025"),
            "Project 2025 NATO Disengagement"
        );
        assert_eq!(
            Category::MediaSubversion.search_query("  "),
            "Media Subversion"
        );
    }

    #[test]
    fn serializes_as_display_name() {
        let json = serde_json::to_string(&Category::SuppressionOfDissent).unwrap();
        assert_eq!(json, "\"Suppression of Dissent\"");
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Category::SuppressionOfDissent);
        assert!(serde_json::from_str::<Category>("\"Elections\"").is_err());
    }
}
