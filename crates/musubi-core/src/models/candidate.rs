use serde::{Deserialize, Serialize};

/// What the match cascade needs to know about a foreign catalog record.
///
/// Implement this for a catalog's own record type to resolve against it
/// directly, or convert records into [`CatalogEntry`].
pub trait Candidate {
    /// Catalog-specific identifier, carried through to the result untouched.
    type Id: PartialEq;

    fn id(&self) -> &Self::Id;

    /// Every title variant and synonym, in preference order.
    fn titles(&self) -> Vec<&str>;

    fn year(&self) -> Option<u32> {
        None
    }

    fn episodes(&self) -> Option<u32> {
        None
    }

    /// Free-form format label ("TV", "Movie", "OVA", ...).
    fn media_type(&self) -> Option<&str> {
        None
    }
}

/// A title with language variants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleVariants {
    #[serde(default, alias = "userPreferred", skip_serializing_if = "Option::is_none")]
    pub user_preferred: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub romaji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native: Option<String>,
}

impl TitleVariants {
    /// Non-blank variants: user-preferred, English, romaji, native.
    pub fn all(&self) -> Vec<&str> {
        [
            &self.user_preferred,
            &self.english,
            &self.romaji,
            &self.native,
        ]
        .into_iter()
        .filter_map(|t| t.as_deref())
        .filter(|t| !t.trim().is_empty())
        .collect()
    }

    /// Returns the best available display title.
    pub fn preferred(&self) -> &str {
        self.all().first().copied().unwrap_or("Unknown")
    }
}

/// A record's title as catalogs deliver it: one string or a set of variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Title {
    Single(String),
    Variants(TitleVariants),
}

impl Title {
    pub fn all(&self) -> Vec<&str> {
        match self {
            Title::Single(s) if s.trim().is_empty() => Vec::new(),
            Title::Single(s) => vec![s.as_str()],
            Title::Variants(v) => v.all(),
        }
    }

    pub fn preferred(&self) -> &str {
        match self {
            Title::Single(s) if !s.trim().is_empty() => s,
            Title::Single(_) => "Unknown",
            Title::Variants(v) => v.preferred(),
        }
    }
}

impl Default for Title {
    fn default() -> Self {
        Title::Variants(TitleVariants::default())
    }
}

impl From<&str> for Title {
    fn from(s: &str) -> Self {
        Title::Single(s.to_string())
    }
}

impl From<String> for Title {
    fn from(s: String) -> Self {
        Title::Single(s)
    }
}

impl From<TitleVariants> for Title {
    fn from(v: TitleVariants) -> Self {
        Title::Variants(v)
    }
}

/// Generic catalog record usable as a [`Candidate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry<I> {
    pub id: I,
    #[serde(default)]
    pub title: Title,
    /// Native-script title some catalogs carry next to a single-string title.
    #[serde(default, alias = "japaneseTitle", skip_serializing_if = "Option::is_none")]
    pub japanese_title: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default, rename = "type", alias = "format")]
    pub media_type: Option<String>,
}

impl<I> CatalogEntry<I> {
    pub fn new(id: I, title: impl Into<Title>) -> Self {
        Self {
            id,
            title: title.into(),
            japanese_title: None,
            synonyms: Vec::new(),
            year: None,
            episodes: None,
            media_type: None,
        }
    }

    pub fn with_japanese_title(mut self, title: impl Into<String>) -> Self {
        self.japanese_title = Some(title.into());
        self
    }

    pub fn with_synonyms<S: Into<String>>(mut self, synonyms: impl IntoIterator<Item = S>) -> Self {
        self.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
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
}

impl<I: PartialEq> Candidate for CatalogEntry<I> {
    type Id = I;

    fn id(&self) -> &I {
        &self.id
    }

    fn titles(&self) -> Vec<&str> {
        let mut titles = self.title.all();
        titles.extend(
            self.japanese_title
                .as_deref()
                .filter(|t| !t.trim().is_empty()),
        );
        titles.extend(
            self.synonyms
                .iter()
                .map(String::as_str)
                .filter(|s| !s.trim().is_empty()),
        );
        titles
    }

    fn year(&self) -> Option<u32> {
        self.year.filter(|&y| y > 0)
    }

    fn episodes(&self) -> Option<u32> {
        self.episodes.filter(|&e| e > 0)
    }

    fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref().filter(|t| !t.trim().is_empty())
    }
}
