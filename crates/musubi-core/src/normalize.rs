//! Title normalization for cross-catalog comparison.
//!
//! [`normalize`] is the full pipeline used by the match cascade. It folds
//! case and diacritics, drops bracketed annotations, rewrites season/part
//! references into canonical tokens and then strips the tokens and format
//! words that differ between catalogs for the same show.
//!
//! [`clean`] is the cheap variant (case, accents, punctuation only) and
//! [`search_query`] the aggressive one meant for catalog search endpoints.
//!
//! `normalize` is idempotent: feeding its output back in returns it unchanged.

use std::sync::LazyLock;

use regex::{Captures, Regex, RegexSet};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalized and cleaned titles are cut to this many characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// Apply the full normalization pipeline.
///
/// Levels applied in order:
/// 1. Lowercase + compatibility decomposition, combining marks dropped
/// 2. Bracketed content removal
/// 3. Punctuation erasure, whitespace collapse, length cap
/// 4. Season/part rewriting into `season N` / `part N` / `final season`
/// 5. Season, part, format, trailing-year and lone-digit stripping
/// 6. Leading article removal
///
/// Levels 4–6 repeat until the string stops changing.
///
/// The result may be empty; callers treat an empty title as unmatchable.
pub fn normalize(raw: &str) -> String {
    let s = fold(raw);
    let s = strip_brackets(&s);
    let s = erase_punctuation(&s);
    let mut s = truncate(&collapse_whitespace(&s));

    // Each round only rewrites markers into strippable tokens or removes
    // text, so the loop reaches a fixed point.
    loop {
        let next = strip_leading_article(&collapse_whitespace(&strip_markers(
            &canonicalize_markers(&s),
        )));
        if next == s {
            return s;
        }
        s = next;
    }
}

/// Cheap cleanup: lowercase, drop accents and punctuation, collapse spaces.
///
/// Season/part/format words are kept, so `clean("Re:Zero 2nd Season")` is
/// `"re zero 2nd season"`.
pub fn clean(raw: &str) -> String {
    let s = fold(raw);
    let s = erase_punctuation(&s);
    truncate(&collapse_whitespace(&s))
}

// ── Level 1: case and diacritic folding ───────────────────────────────

/// Lowercase, apply NFKD (fullwidth → ASCII, split diacritics), drop the
/// combining marks and lowercase again.
///
/// The second lowercase catches letters that only become ASCII capitals
/// under NFKD, such as mathematical alphanumerics (`𝐇`) and letterlike
/// symbols (`ℌ`).
fn fold(s: &str) -> String {
    s.to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

// ── Level 2: bracketed annotations ────────────────────────────────────

static BRACKETS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\([^)]*\)|\[[^\]]*\]|\{[^}]*\}|【[^】]*】").unwrap()
});

/// Remove `(...)`, `[...]`, `{...}` and `【...】` including their content.
fn strip_brackets(s: &str) -> String {
    BRACKETS.replace_all(s, " ").into_owned()
}

// ── Level 3: punctuation, whitespace, length ──────────────────────────

/// Replace every character that is neither alphanumeric nor whitespace with a space.
fn erase_punctuation(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect()
}

/// Trim and collapse multiple whitespace runs to a single space.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_TITLE_CHARS {
        return s.to_string();
    }
    s.chars()
        .take(MAX_TITLE_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

// ── Level 4: season / part rewriting ──────────────────────────────────

static WORD_ORDINAL_SEASON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth)\s*season\b")
        .unwrap()
});

static DIGIT_ORDINAL_SEASON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+)(?:st|nd|rd|th)(?:\s*season)?\b").unwrap());

static SEASON_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bseason\s*(\d+)\b").unwrap());

static S_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bs\s*(\d+)\b").unwrap());

/// "第2期", "2期", "2クール".
static JAPANESE_SEASON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:第\s*)?(\d+)\s*(?:期|クール)").unwrap());

static FINAL_SEASON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:final|last)\s*season\b").unwrap());

static PART_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bpart\s*(\d+)\b").unwrap());

static P_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bp(\d+)\b").unwrap());

/// "第2部", "2部".
static JAPANESE_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:第\s*)?(\d+)\s*部").unwrap());

fn ordinal_value(word: &str) -> u32 {
    match word {
        "first" => 1,
        "second" => 2,
        "third" => 3,
        "fourth" => 4,
        "fifth" => 5,
        "sixth" => 6,
        "seventh" => 7,
        "eighth" => 8,
        "ninth" => 9,
        _ => 10,
    }
}

/// Rewrite the many ways catalogs spell a season or part into
/// `season N`, `part N` and `final season`.
fn canonicalize_markers(s: &str) -> String {
    let s = WORD_ORDINAL_SEASON.replace_all(s, |caps: &Captures| {
        format!("season {}", ordinal_value(&caps[1]))
    });
    let s = DIGIT_ORDINAL_SEASON.replace_all(&s, "season ${1}");
    let s = SEASON_NUMBER.replace_all(&s, "season ${1}");
    let s = S_NUMBER.replace_all(&s, "season ${1}");
    let s = JAPANESE_SEASON.replace_all(&s, " season ${1} ");
    let s = FINAL_SEASON.replace_all(&s, "final season");
    let s = PART_NUMBER.replace_all(&s, "part ${1}");
    let s = P_NUMBER.replace_all(&s, "part ${1}");
    JAPANESE_PART.replace_all(&s, " part ${1} ").into_owned()
}

// ── Level 5: marker stripping ─────────────────────────────────────────

/// Numbered season/part tokens, format vocabulary, a trailing release year
/// and lone digits. `final season` carries no number and survives.
static MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bseason \d+\b",
        r"\bpart \d+\b",
        r"\b(?:ova|oad|ona)\b",
        r"\b(?:movie|film|theatrical)\b",
        r"\b(?:specials?|sp)\b",
        r"\b(?:tv|television)(?:\s*series)?\b",
        r"\b(?:web|net)\s*series\b",
        r"\b(?:19|20)\d{2}$",
        r"\b\d\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

fn strip_markers(s: &str) -> String {
    MARKERS
        .iter()
        .fold(s.to_string(), |acc, re| re.replace_all(&acc, " ").into_owned())
}

// ── Level 6: leading article ──────────────────────────────────────────

static LEADING_ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(?:the|a|an)\s+)+").unwrap());

fn strip_leading_article(s: &str) -> String {
    LEADING_ARTICLE.replace(s, "").into_owned()
}

// ── Search queries ────────────────────────────────────────────────────

/// Everything [`normalize`] strips plus collection, release and media words.
/// Applied once, to raw (not canonicalized) text.
static QUERY_NOISE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b\d+(?:st|nd|rd|th)?\s*season\b",
        r"\bseason\s*\d+\b",
        r"\bs\d+\b",
        r"(?:第\s*)?\d+\s*(?:期|クール)",
        r"\bpart\s*\d+\b",
        r"\bp\d+\b",
        r"(?:第\s*)?\d+\s*部",
        r"\b(?:ova|oad|ona)\b",
        r"\b(?:movie|film|theatrical)\b",
        r"\b(?:specials?|sp)\b",
        r"\b(?:tv|television)\s*series\b",
        r"\b(?:web|net)\s*series\b",
        r"\b(?:complete|collection|series)\b",
        r"\b(?:dubbed|subbed|uncensored|uncut)\b",
        r"\b(?:hd|bd|dvd|blu ray)\b",
        r"\b(?:remaster(?:ed)?|remake)\b",
        r"\b(?:final|chapter|episode|vol)\b",
        r"\b\d{4}\b",
        r"\b\d\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Build a catalog search query from a display title.
///
/// More aggressive than [`normalize`]: it also drops words such as
/// "complete", "dubbed", "bd" or "episode" and every four-digit number,
/// trading precision for recall on remote search endpoints.
pub fn search_query(raw: &str) -> String {
    let s = fold(raw);
    let s = strip_brackets(&s);
    let s = collapse_whitespace(&erase_punctuation(&s));
    let s = QUERY_NOISE
        .iter()
        .fold(s, |acc, re| re.replace_all(&acc, " ").into_owned());
    strip_leading_article(&collapse_whitespace(&s))
}

// ── Derivative versions ───────────────────────────────────────────────

static DERIVATIVE: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"\b(?:re-?edit|redit|re-?cut)\b",
        r"\b(?:director['’]?s?\s*cut|extended\s*cut|final\s*cut)\b",
        r"\bnew\s*edit\b|新編集版|\bcompilation\b",
        r"\b(?:recaps?|summary)\b",
        r"\b(?:condensed|abridged|shortened)\b",
        r"\b(?:theatrical|cinema)\s*version\b",
        r"\b(?:alternate|alternative)\s*version\b",
        r"\b(?:extended|long)\s*version\b",
        r"\b(?:remaster(?:ed)?|remake)\b",
        r"\([^)]*(?:re-?edit|director|cut|recap|compilation|remaster)[^)]*\)",
    ])
    .unwrap()
});

/// Whether a raw title marks a re-edit, recap, director's cut or similar
/// derivative of another entry.
pub fn is_derivative(raw: &str) -> bool {
    DERIVATIVE.is_match(&raw.to_lowercase())
}
