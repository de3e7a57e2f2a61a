use serde::{Deserialize, Serialize};

use super::candidate::{Candidate, CatalogEntry};

/// The entity being searched for in a foreign catalog.
///
/// `titles` holds the primary title variants followed by synonyms. Blank
/// titles, a zero year and a zero episode count count as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetDescription {
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default, rename = "type", alias = "format")]
    pub media_type: Option<String>,
}

impl TargetDescription {
    pub fn new<S: Into<String>>(titles: impl IntoIterator<Item = S>) -> Self {
        Self {
            titles: titles
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.trim().is_empty())
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_year(mut self, year: u32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_episodes(mut self, episodes: u32) -> Self {
        self.episodes = Some(episodes);
        self
    }

    pub fn with_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Non-blank titles, order preserved, duplicates kept.
    pub fn titles(&self) -> Vec<&str> {
        self.titles
            .iter()
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty())
            .collect()
    }

    pub fn year(&self) -> Option<u32> {
        self.year.filter(|&y| y > 0)
    }

    pub fn episodes(&self) -> Option<u32> {
        self.episodes.filter(|&e| e > 0)
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Describe a primary-catalog record as a search target.
impl<I: PartialEq> From<&CatalogEntry<I>> for TargetDescription {
    fn from(entry: &CatalogEntry<I>) -> Self {
        Self {
            titles: entry.titles().into_iter().map(str::to_string).collect(),
            year: entry.year(),
            episodes: entry.episodes(),
            media_type: entry.media_type().map(str::to_string),
        }
    }
}
