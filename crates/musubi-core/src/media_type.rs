//! Format labels and their compatibility table.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use phf::phf_map;
use serde::Serialize;

/// Canonical media format bucket.
///
/// Catalogs spell formats differently ("TV", "tv series", "Television");
/// labels are folded into one bucket before comparison. Labels outside the
/// table are kept verbatim (uppercased) and only equal themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum MediaType {
    Tv,
    Movie,
    /// OVA and OAD share a bucket.
    Ova,
    /// ONA is its own bucket.
    Ona,
    Special,
    Music,
    Other(String),
}

/// Compile-time synonym table. All keys are lowercase.
static SYNONYMS: phf::Map<&'static str, MediaType> = phf_map! {
    "tv" => MediaType::Tv,
    "television" => MediaType::Tv,
    "tv series" => MediaType::Tv,

    "movie" => MediaType::Movie,
    "film" => MediaType::Movie,
    "theatrical" => MediaType::Movie,

    "ova" => MediaType::Ova,
    "oad" => MediaType::Ova,

    "ona" => MediaType::Ona,

    "special" => MediaType::Special,
    "specials" => MediaType::Special,
    "sp" => MediaType::Special,

    "music" => MediaType::Music,
    "music video" => MediaType::Music,
    "pv" => MediaType::Music,
    "promotional video" => MediaType::Music,
};

impl MediaType {
    /// Fold a free-form label into its bucket. Returns `None` for blank labels.
    pub fn parse(label: &str) -> Option<Self> {
        let key = label.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        Some(
            SYNONYMS
                .get(key.as_str())
                .cloned()
                .unwrap_or_else(|| MediaType::Other(key.to_uppercase())),
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Tv => "TV",
            MediaType::Movie => "MOVIE",
            MediaType::Ova => "OVA",
            MediaType::Ona => "ONA",
            MediaType::Special => "SPECIAL",
            MediaType::Music => "MUSIC",
            MediaType::Other(label) => label,
        }
    }
}

impl FromStr for MediaType {
    type Err = Infallible;

    /// Blank labels parse as `Other("")`; use [`MediaType::parse`] to tell them apart.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s).unwrap_or_else(|| MediaType::Other(String::new())))
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether two format labels may describe the same entity.
///
/// A missing or blank label on either side is compatible with anything.
pub fn compatible(a: Option<&str>, b: Option<&str>) -> bool {
    match (a.and_then(MediaType::parse), b.and_then(MediaType::parse)) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonyms_fold_into_buckets() {
        assert_eq!(MediaType::parse("TV"), Some(MediaType::Tv));
        assert_eq!(MediaType::parse(" Television "), Some(MediaType::Tv));
        assert_eq!(MediaType::parse("TV Series"), Some(MediaType::Tv));
        assert_eq!(MediaType::parse("Film"), Some(MediaType::Movie));
        assert_eq!(MediaType::parse("OAD"), Some(MediaType::Ova));
        assert_eq!(MediaType::parse("PV"), Some(MediaType::Music));
        assert_eq!(MediaType::parse("SP"), Some(MediaType::Special));
    }

    #[test]
    fn unknown_label_uppercased() {
        assert_eq!(
            MediaType::parse("tv_short"),
            Some(MediaType::Other("TV_SHORT".into()))
        );
        assert_eq!(MediaType::parse("tv_short").unwrap().to_string(), "TV_SHORT");
    }

    #[test]
    fn blank_label_is_absent() {
        assert_eq!(MediaType::parse(""), None);
        assert_eq!(MediaType::parse("   "), None);
    }

    #[test]
    fn from_str_never_fails() {
        assert_eq!("movie".parse::<MediaType>(), Ok(MediaType::Movie));
        assert_eq!("".parse::<MediaType>(), Ok(MediaType::Other(String::new())));
    }

    #[test]
    fn compatible_same_bucket() {
        assert!(compatible(Some("TV"), Some("television")));
        assert!(compatible(Some("movie"), Some("Theatrical")));
        assert!(compatible(Some("OVA"), Some("oad")));
    }

    #[test]
    fn incompatible_buckets() {
        assert!(!compatible(Some("TV"), Some("Movie")));
        assert!(!compatible(Some("OVA"), Some("ONA")));
        assert!(!compatible(Some("Special"), Some("Music")));
    }

    #[test]
    fn missing_labels_are_compatible() {
        assert!(compatible(None, Some("TV")));
        assert!(compatible(Some("Movie"), None));
        assert!(compatible(None, None));
        assert!(compatible(Some(""), Some("TV")));
    }

    #[test]
    fn unknown_labels_compare_textually() {
        assert!(compatible(Some("tv_short"), Some("TV_SHORT")));
        assert!(!compatible(Some("tv_short"), Some("TV")));
    }
}
