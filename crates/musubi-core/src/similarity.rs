//! Composite title similarity.
//!
//! Blends a Jaro-Winkler score with a normalized Levenshtein score, then
//! adjusts for word containment: a title whose words are all present in the
//! other title is boosted (one catalog often omits a subtitle), titles that
//! share only a small part of their words are penalised.
//!
//! Inputs are expected to be normalized already (see [`crate::normalize`]).

use std::collections::HashSet;

use serde::Serialize;

const JARO_WEIGHT: f64 = 0.4;
const EDIT_WEIGHT: f64 = 0.6;

const PREFIX_SCALE: f64 = 0.1;
const MAX_PREFIX_SCALE: f64 = 0.25;
const MAX_PREFIX_LEN: usize = 4;

/// Candidate words ⊆ target words.
const CANDIDATE_CONTAINED_BOOST: f64 = 1.1;
/// Target words ⊆ candidate words.
const TARGET_CONTAINED_BOOST: f64 = 1.05;

/// Overlap ratios below this are penalised.
const MIN_OVERLAP_RATIO: f64 = 0.5;
/// Per-word decay for words that appear on one side only.
const EXTRA_WORD_DECAY: f64 = 0.9;

/// Which containment rule shaped the final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Containment {
    /// Both strings are equal.
    Identical,
    /// One side had no words.
    Empty,
    /// Every candidate word appears in the target.
    CandidateInTarget,
    /// Every target word appears in the candidate.
    TargetInCandidate,
    /// Partial overlap. `penalty` is 1.0 when the ratio was high enough.
    Overlap { ratio: f64, penalty: f64 },
}

/// Every intermediate value of one [`similarity`] computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Breakdown {
    pub jaro_winkler: f64,
    pub levenshtein: f64,
    /// `0.4 * jaro_winkler + 0.6 * levenshtein`.
    pub base: f64,
    pub containment: Containment,
    /// Final score in [0, 1].
    pub score: f64,
}

impl Breakdown {
    fn fixed(value: f64, containment: Containment) -> Self {
        Self {
            jaro_winkler: value,
            levenshtein: value,
            base: value,
            containment,
            score: value,
        }
    }
}

/// Composite similarity of two normalized titles, in [0, 1].
///
/// Equal non-empty strings score exactly 1.0; an empty side scores 0.0.
/// The score is symmetric except where one word set contains the other,
/// because the two containment boosts differ.
pub fn similarity(target: &str, candidate: &str) -> f64 {
    breakdown(target, candidate).score
}

/// Same as [`similarity`], keeping the intermediate scores for diagnostics.
pub fn breakdown(target: &str, candidate: &str) -> Breakdown {
    if target.is_empty() || candidate.is_empty() {
        return Breakdown::fixed(0.0, Containment::Empty);
    }
    if target == candidate {
        return Breakdown::fixed(1.0, Containment::Identical);
    }

    let target_words: Vec<&str> = target.split_whitespace().collect();
    let candidate_words: Vec<&str> = candidate.split_whitespace().collect();
    if target_words.is_empty() || candidate_words.is_empty() {
        return Breakdown::fixed(0.0, Containment::Empty);
    }

    let target_set: HashSet<&str> = target_words.iter().copied().collect();
    let candidate_set: HashSet<&str> = candidate_words.iter().copied().collect();

    let target_matches = target_words
        .iter()
        .filter(|w| candidate_set.contains(*w))
        .count();
    let candidate_matches = candidate_words
        .iter()
        .filter(|w| target_set.contains(*w))
        .count();

    let jaro_winkler = jaro_winkler(target, candidate);
    let levenshtein = levenshtein_similarity(target, candidate);
    let base = JARO_WEIGHT * jaro_winkler + EDIT_WEIGHT * levenshtein;

    let (containment, adjusted) = if candidate_matches == candidate_words.len() {
        (Containment::CandidateInTarget, base * CANDIDATE_CONTAINED_BOOST)
    } else if target_matches == target_words.len() {
        (Containment::TargetInCandidate, base * TARGET_CONTAINED_BOOST)
    } else {
        let matching = target_matches.min(candidate_matches) as f64;
        let union = target_set.union(&candidate_set).count() as f64;
        let ratio = matching / union;

        let penalty = if ratio < MIN_OVERLAP_RATIO {
            let extra = (target_words.len() - target_matches)
                + (candidate_words.len() - candidate_matches);
            EXTRA_WORD_DECAY.powi(extra as i32) * ratio
        } else {
            1.0
        };

        (Containment::Overlap { ratio, penalty }, base * penalty)
    };

    Breakdown {
        jaro_winkler,
        levenshtein,
        base,
        containment,
        score: adjusted.clamp(0.0, 1.0),
    }
}

/// Jaro-Winkler similarity over chars, in [0, 1].
///
/// Matching window is `floor(max_len / 2) - 1`; half-transpositions are
/// counted; up to four common leading chars add a prefix bonus scaled by 0.1.
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, &ca) in a.iter().enumerate() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(b.len());
        for j in start..end {
            if !b_matched[j] && b[j] == ca {
                a_matched[i] = true;
                b_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }

    if matches == 0 {
        return 0.0;
    }

    let b_in_order = b
        .iter()
        .zip(&b_matched)
        .filter_map(|(c, &m)| m.then_some(c));
    let transpositions = a
        .iter()
        .zip(&a_matched)
        .filter_map(|(c, &m)| m.then_some(c))
        .zip(b_in_order)
        .filter(|(x, y)| x != y)
        .count()
        / 2;

    let m = matches as f64;
    let jaro = (m / a.len() as f64 + m / b.len() as f64 + (m - transpositions as f64) / m) / 3.0;

    let prefix = a
        .iter()
        .zip(&b)
        .take(MAX_PREFIX_LEN)
        .take_while(|(x, y)| x == y)
        .count();

    jaro + prefix as f64 * PREFIX_SCALE.min(MAX_PREFIX_SCALE) * (1.0 - jaro)
}

/// `1 - levenshtein(a, b) / max(len(a), len(b))`, lengths in chars.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    1.0 - strsim::levenshtein(a, b) as f64 / max_len as f64
}
