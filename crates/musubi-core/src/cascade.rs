//! Tiered match cascade.
//!
//! A [`Resolver`] holds an ordered list of [`Tier`]s, strictest first. Each
//! tier scans the whole candidate pool; the first tier that produces a result
//! ends the search. Six exact tiers (raw or normalized title equality plus
//! year/episode/type agreement) come before three fuzzy tiers that keep the
//! best-scoring title pair above a threshold.

use std::fmt;
use std::sync::LazyLock;

use bitflags::bitflags;
use serde::Serialize;

use crate::config::{FuzzyTierConfig, MatchConfig};
use crate::media_type::compatible;
use crate::models::{Candidate, TargetDescription};
use crate::normalize::normalize;
use crate::similarity::similarity;

static DEFAULT_RESOLVER: LazyLock<Resolver> = LazyLock::new(Resolver::default);

/// Resolve `target` against `candidates` with the default tiers.
///
/// See [`Resolver::resolve`].
pub fn resolve<'c, C: Candidate>(
    target: &TargetDescription,
    candidates: &'c [C],
    exclude: &[C::Id],
) -> Option<MatchResult<'c, C>> {
    DEFAULT_RESOLVER.resolve(target, candidates, exclude)
}

/// The tier that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMethod {
    ExactYearEpisodeTypeRaw,
    ExactYearEpisodeTypeNormalized,
    ExactYearTypeRaw,
    ExactYearTypeNormalized,
    ExactTypeRaw,
    ExactTypeNormalized,
    Loose,
    LastResort,
    BestPossible,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::ExactYearEpisodeTypeRaw => "exact-year-episode-type-raw",
            MatchMethod::ExactYearEpisodeTypeNormalized => "exact-year-episode-type-normalized",
            MatchMethod::ExactYearTypeRaw => "exact-year-type-raw",
            MatchMethod::ExactYearTypeNormalized => "exact-year-type-normalized",
            MatchMethod::ExactTypeRaw => "exact-type-raw",
            MatchMethod::ExactTypeNormalized => "exact-type-normalized",
            MatchMethod::Loose => "loose",
            MatchMethod::LastResort => "last-resort",
            MatchMethod::BestPossible => "best-possible",
        }
    }

    pub fn is_exact(&self) -> bool {
        !matches!(
            self,
            MatchMethod::Loose | MatchMethod::LastResort | MatchMethod::BestPossible
        )
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single best match of one resolution call.
#[derive(Debug, Serialize)]
pub struct MatchResult<'c, C> {
    /// In [0, 1]; exactly 1.0 for exact tiers.
    pub similarity: f64,
    pub method: MatchMethod,
    pub candidate: &'c C,
    /// The literal target title that matched (raw exact tiers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The normalized target title that matched (normalized and fuzzy tiers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<String>,
    /// Echo of the target's hints, for audit logs.
    pub year: Option<u32>,
    pub episodes: Option<u32>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

bitflags! {
    /// Target fields an exact tier compares. A tier whose fields the target
    /// lacks is skipped.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Requires: u8 {
        const YEAR = 0b0000_0001;
        const EPISODES = 0b0000_0010;
        const TYPE = 0b0000_0100;
    }
}

/// Which form of the titles an exact tier compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleForm {
    Raw,
    Normalized,
}

/// The matchable view of a target or candidate: titles in both forms plus hints.
///
/// Normalized titles that came out empty are dropped.
#[derive(Debug, Clone)]
pub struct Profile<'a> {
    pub raw: Vec<&'a str>,
    pub normalized: Vec<String>,
    pub year: Option<u32>,
    pub episodes: Option<u32>,
    pub media_type: Option<&'a str>,
}

impl<'a> Profile<'a> {
    pub fn of_target(target: &'a TargetDescription) -> Self {
        Self::build(
            target.titles(),
            target.year(),
            target.episodes(),
            target.media_type(),
        )
    }

    pub fn of_candidate<C: Candidate>(candidate: &'a C) -> Self {
        Self::build(
            candidate.titles(),
            candidate.year(),
            candidate.episodes(),
            candidate.media_type(),
        )
    }

    fn build(
        raw: Vec<&'a str>,
        year: Option<u32>,
        episodes: Option<u32>,
        media_type: Option<&'a str>,
    ) -> Self {
        let normalized = raw
            .iter()
            .map(|t| normalize(t))
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            raw,
            normalized,
            year,
            episodes,
            media_type,
        }
    }

    fn has(&self, requires: Requires) -> bool {
        (!requires.contains(Requires::YEAR) || self.year.is_some())
            && (!requires.contains(Requires::EPISODES) || self.episodes.is_some())
            && (!requires.contains(Requires::TYPE) || self.media_type.is_some())
    }
}

/// A candidate paired with its profile.
pub type PoolEntry<'c, C> = (&'c C, Profile<'c>);

/// Exact title equality plus agreement on the required fields. Scores 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExactTier {
    pub method: MatchMethod,
    pub requires: Requires,
    pub form: TitleForm,
}

impl ExactTier {
    pub fn evaluate<'c, C>(
        &self,
        target: &Profile<'_>,
        pool: &[PoolEntry<'c, C>],
    ) -> Option<MatchResult<'c, C>> {
        if !target.has(self.requires) {
            tracing::debug!(method = %self.method, "Tier skipped, target lacks required fields");
            return None;
        }

        for (candidate, profile) in pool {
            if !self.fields_agree(target, profile) {
                continue;
            }
            match self.form {
                TitleForm::Raw => {
                    if let Some(title) = target.raw.iter().find(|t| profile.raw.contains(*t)) {
                        return Some(result(self.method, 1.0, *candidate, target, Some(*title), None));
                    }
                }
                TitleForm::Normalized => {
                    if let Some(title) = target
                        .normalized
                        .iter()
                        .find(|t| profile.normalized.contains(*t))
                    {
                        return Some(result(
                            self.method,
                            1.0,
                            *candidate,
                            target,
                            None,
                            Some(title.as_str()),
                        ));
                    }
                }
            }
        }
        None
    }

    fn fields_agree(&self, target: &Profile<'_>, candidate: &Profile<'_>) -> bool {
        (!self.requires.contains(Requires::YEAR) || candidate.year == target.year)
            && (!self.requires.contains(Requires::EPISODES) || candidate.episodes == target.episodes)
            && (!self.requires.contains(Requires::TYPE)
                || compatible(target.media_type, candidate.media_type))
    }
}

/// Best composite similarity over every normalized title pair.
///
/// Pairs below `min_similarity` are ignored. When the target has a format
/// and the candidate's is compatible, `type_bonus` is added (capped at 1.0)
/// and the candidate wins ties. Otherwise the earliest candidate wins ties.
/// The winner is returned only if its score reaches `accept_at`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyTier {
    pub method: MatchMethod,
    pub min_similarity: f64,
    pub type_bonus: f64,
    pub accept_at: f64,
}

struct Best<'c, 't, C> {
    score: f64,
    type_match: bool,
    candidate: &'c C,
    normalized: &'t str,
}

impl FuzzyTier {
    pub fn new(method: MatchMethod, config: &FuzzyTierConfig) -> Self {
        Self {
            method,
            min_similarity: config.min_similarity,
            type_bonus: config.type_bonus,
            accept_at: config.accept_at,
        }
    }

    pub fn evaluate<'c, C>(
        &self,
        target: &Profile<'_>,
        pool: &[PoolEntry<'c, C>],
    ) -> Option<MatchResult<'c, C>> {
        let mut best: Option<Best<'c, '_, C>> = None;

        for (candidate, profile) in pool {
            let type_match =
                target.media_type.is_some() && compatible(target.media_type, profile.media_type);

            for t in &target.normalized {
                for c in &profile.normalized {
                    let score = similarity(t, c);
                    tracing::trace!(method = %self.method, left = %t, right = %c, score, "Scored pair");
                    if score < self.min_similarity {
                        continue;
                    }

                    let adjusted = if type_match {
                        (score + self.type_bonus).min(1.0)
                    } else {
                        score
                    };

                    let better = match &best {
                        None => true,
                        Some(b) => {
                            adjusted > b.score
                                || (adjusted == b.score && type_match && !b.type_match)
                        }
                    };
                    if better {
                        best = Some(Best {
                            score: adjusted,
                            type_match,
                            candidate: *candidate,
                            normalized: t,
                        });
                    }
                }
            }
        }

        let best = best?;
        if best.score < self.accept_at {
            tracing::debug!(method = %self.method, score = best.score, accept_at = self.accept_at, "Best pair below acceptance");
            return None;
        }
        Some(result(
            self.method,
            best.score,
            best.candidate,
            target,
            None,
            Some(best.normalized),
        ))
    }
}

/// One step of the cascade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tier {
    Exact(ExactTier),
    Fuzzy(FuzzyTier),
}

impl Tier {
    pub fn method(&self) -> MatchMethod {
        match self {
            Tier::Exact(t) => t.method,
            Tier::Fuzzy(t) => t.method,
        }
    }

    pub fn evaluate<'c, C>(
        &self,
        target: &Profile<'_>,
        pool: &[PoolEntry<'c, C>],
    ) -> Option<MatchResult<'c, C>> {
        match self {
            Tier::Exact(t) => t.evaluate(target, pool),
            Tier::Fuzzy(t) => t.evaluate(target, pool),
        }
    }

    fn exact(method: MatchMethod, requires: Requires, form: TitleForm) -> Self {
        Tier::Exact(ExactTier {
            method,
            requires,
            form,
        })
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Exact(t) => write!(f, "{} (requires {:?})", t.method, t.requires),
            Tier::Fuzzy(t) => write!(
                f,
                "{} (min {:.2}, type bonus +{:.2}, accept at {:.2})",
                t.method, t.min_similarity, t.type_bonus, t.accept_at
            ),
        }
    }
}

fn result<'c, C>(
    method: MatchMethod,
    similarity: f64,
    candidate: &'c C,
    target: &Profile<'_>,
    title: Option<&str>,
    normalized: Option<&str>,
) -> MatchResult<'c, C> {
    MatchResult {
        similarity,
        method,
        candidate,
        title: title.map(str::to_string),
        normalized: normalized.map(str::to_string),
        year: target.year,
        episodes: target.episodes,
        media_type: target.media_type.map(str::to_string),
    }
}

/// Runs the tiers in order. Stateless; share freely across threads.
#[derive(Debug, Clone)]
pub struct Resolver {
    tiers: Vec<Tier>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(&MatchConfig::default())
    }
}

impl Resolver {
    /// The standard nine tiers with fuzzy thresholds from `config`.
    pub fn new(config: &MatchConfig) -> Self {
        let all = Requires::YEAR | Requires::EPISODES | Requires::TYPE;
        let year_type = Requires::YEAR | Requires::TYPE;
        Self {
            tiers: vec![
                Tier::exact(MatchMethod::ExactYearEpisodeTypeRaw, all, TitleForm::Raw),
                Tier::exact(MatchMethod::ExactYearEpisodeTypeNormalized, all, TitleForm::Normalized),
                Tier::exact(MatchMethod::ExactYearTypeRaw, year_type, TitleForm::Raw),
                Tier::exact(MatchMethod::ExactYearTypeNormalized, year_type, TitleForm::Normalized),
                Tier::exact(MatchMethod::ExactTypeRaw, Requires::TYPE, TitleForm::Raw),
                Tier::exact(MatchMethod::ExactTypeNormalized, Requires::TYPE, TitleForm::Normalized),
                Tier::Fuzzy(FuzzyTier::new(MatchMethod::Loose, &config.loose)),
                Tier::Fuzzy(FuzzyTier::new(MatchMethod::LastResort, &config.last_resort)),
                Tier::Fuzzy(FuzzyTier::new(MatchMethod::BestPossible, &config.fallback)),
            ],
        }
    }

    /// A resolver running exactly `tiers`, in the given order.
    pub fn with_tiers(tiers: Vec<Tier>) -> Self {
        Self { tiers }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Find the candidate that denotes the same entity as `target`.
    ///
    /// Candidates whose id is in `exclude` are dropped before any comparison.
    /// Returns `None` when nothing qualifies, including when the target has
    /// no usable titles or the pool is empty.
    #[tracing::instrument(
        name = "resolve",
        skip_all,
        fields(titles = target.titles.len(), candidates = candidates.len())
    )]
    pub fn resolve<'c, C: Candidate>(
        &self,
        target: &TargetDescription,
        candidates: &'c [C],
        exclude: &[C::Id],
    ) -> Option<MatchResult<'c, C>> {
        let target = Profile::of_target(target);
        if target.normalized.is_empty() {
            tracing::debug!("Target has no usable titles");
            return None;
        }

        let pool: Vec<PoolEntry<'c, C>> = candidates
            .iter()
            .filter(|c| !exclude.contains(c.id()))
            .map(|c| (c, Profile::of_candidate(c)))
            .collect();
        if pool.is_empty() {
            tracing::debug!("No candidates left after exclusion");
            return None;
        }

        for tier in &self.tiers {
            if let Some(found) = tier.evaluate(&target, &pool) {
                tracing::debug!(
                    method = %found.method,
                    similarity = found.similarity,
                    "Match found"
                );
                return Some(found);
            }
        }

        tracing::debug!("No match");
        None
    }

    /// Resolve several targets against one pool, in order. A candidate
    /// matched by an earlier target is excluded for the later ones.
    pub fn resolve_many<'c, C>(
        &self,
        targets: &[TargetDescription],
        candidates: &'c [C],
    ) -> Vec<Option<MatchResult<'c, C>>>
    where
        C: Candidate,
        C::Id: Clone,
    {
        let mut claimed: Vec<C::Id> = Vec::new();
        targets
            .iter()
            .map(|target| {
                let found = self.resolve(target, candidates, &claimed);
                if let Some(m) = &found {
                    claimed.push(m.candidate.id().clone());
                }
                found
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CatalogEntry;

    type Entry = CatalogEntry<u32>;

    fn pool(entries: &[Entry]) -> Vec<PoolEntry<'_, Entry>> {
        entries.iter().map(|e| (e, Profile::of_candidate(e))).collect()
    }

    fn tier(method: MatchMethod) -> Tier {
        *Resolver::default()
            .tiers()
            .iter()
            .find(|t| t.method() == method)
            .unwrap()
    }

    fn aot_target() -> TargetDescription {
        TargetDescription::new(["Attack on Titan Season 2", "Shingeki no Kyojin"])
            .with_year(2017)
            .with_episodes(12)
            .with_type("TV")
    }

    // ── Tier list ─────────────────────────────────────────────────────

    #[test]
    fn default_tier_order() {
        let methods: Vec<_> = Resolver::default().tiers().iter().map(Tier::method).collect();
        assert_eq!(
            methods,
            vec![
                MatchMethod::ExactYearEpisodeTypeRaw,
                MatchMethod::ExactYearEpisodeTypeNormalized,
                MatchMethod::ExactYearTypeRaw,
                MatchMethod::ExactYearTypeNormalized,
                MatchMethod::ExactTypeRaw,
                MatchMethod::ExactTypeNormalized,
                MatchMethod::Loose,
                MatchMethod::LastResort,
                MatchMethod::BestPossible,
            ]
        );
    }

    #[test]
    fn method_names() {
        assert_eq!(MatchMethod::ExactYearEpisodeTypeRaw.to_string(), "exact-year-episode-type-raw");
        assert_eq!(MatchMethod::LastResort.to_string(), "last-resort");
        assert!(MatchMethod::ExactTypeNormalized.is_exact());
        assert!(!MatchMethod::BestPossible.is_exact());
    }

    // ── Exact tiers in isolation ──────────────────────────────────────

    #[test]
    fn raw_tier_needs_literal_title() {
        let target = aot_target();
        let entries = [Entry::new(1, "Shingeki no Kyojin Season 2")
            .with_year(2017)
            .with_episodes(12)
            .with_type("TV")];
        let profile = Profile::of_target(&target);

        assert!(tier(MatchMethod::ExactYearEpisodeTypeRaw)
            .evaluate(&profile, &pool(&entries))
            .is_none());

        let found = tier(MatchMethod::ExactYearEpisodeTypeNormalized)
            .evaluate(&profile, &pool(&entries))
            .unwrap();
        assert_eq!(found.similarity, 1.0);
        assert_eq!(found.normalized.as_deref(), Some("shingeki no kyojin"));
        assert_eq!(found.title, None);
    }

    #[test]
    fn raw_tier_reports_title() {
        let target = aot_target();
        let entries = [Entry::new(1, "Shingeki no Kyojin")
            .with_year(2017)
            .with_episodes(12)
            .with_type("Television")];
        let found = tier(MatchMethod::ExactYearEpisodeTypeRaw)
            .evaluate(&Profile::of_target(&target), &pool(&entries))
            .unwrap();
        assert_eq!(found.title.as_deref(), Some("Shingeki no Kyojin"));
        assert_eq!(found.year, Some(2017));
        assert_eq!(found.episodes, Some(12));
        assert_eq!(found.media_type.as_deref(), Some("TV"));
    }

    #[test]
    fn exact_tier_skipped_without_fields() {
        let target = TargetDescription::new(["Shingeki no Kyojin"]).with_type("TV");
        let entries = [Entry::new(1, "Shingeki no Kyojin").with_type("TV")];
        let profile = Profile::of_target(&target);

        assert!(tier(MatchMethod::ExactYearTypeRaw)
            .evaluate(&profile, &pool(&entries))
            .is_none());
        assert!(tier(MatchMethod::ExactTypeRaw)
            .evaluate(&profile, &pool(&entries))
            .is_some());
    }

    #[test]
    fn exact_tier_rejects_field_mismatch() {
        let target = TargetDescription::new(["Kimi no Na wa."])
            .with_year(2016)
            .with_type("Movie");
        let entries = [
            Entry::new(1, "Kimi no Na wa.").with_year(2017).with_type("Movie"),
            Entry::new(2, "Kimi no Na wa.").with_year(2016).with_type("TV"),
        ];
        assert!(tier(MatchMethod::ExactYearTypeRaw)
            .evaluate(&Profile::of_target(&target), &pool(&entries))
            .is_none());
    }

    #[test]
    fn missing_candidate_type_is_compatible() {
        let target = TargetDescription::new(["Kimi no Na wa."]).with_type("Movie");
        let entries = [Entry::new(7, "Kimi no Na wa.")];
        let found = tier(MatchMethod::ExactTypeRaw)
            .evaluate(&Profile::of_target(&target), &pool(&entries))
            .unwrap();
        assert_eq!(found.candidate.id, 7);
    }

    // ── Fuzzy tiers in isolation ──────────────────────────────────────

    #[test]
    fn fuzzy_threshold_applies_before_bonus() {
        // 0.68218 raw: below loose (0.70) even though +0.05 would clear it.
        let target = TargetDescription::new(["Kimetsu no Yaiba"]).with_type("TV");
        let entries = [Entry::new(1, "Kimetsu no Yaiba: Mugen Ressha-hen").with_type("TV")];
        let profile = Profile::of_target(&target);

        assert!(tier(MatchMethod::Loose)
            .evaluate(&profile, &pool(&entries))
            .is_none());

        let found = tier(MatchMethod::LastResort)
            .evaluate(&profile, &pool(&entries))
            .unwrap();
        assert!((found.similarity - (0.682_18 + 0.03)).abs() < 1e-4);
    }

    #[test]
    fn type_bonus_can_flip_order() {
        let target = TargetDescription::new(["Spy x Family"]).with_type("TV");
        let entries = [
            Entry::new(1, "Spy x Family: Ending").with_type("Movie"),
            Entry::new(2, "Spy x Family Mission").with_type("TV"),
        ];
        let found = tier(MatchMethod::Loose)
            .evaluate(&Profile::of_target(&target), &pool(&entries))
            .unwrap();
        assert_eq!(found.candidate.id, 2);
        assert!((found.similarity - 0.8144).abs() < 1e-4);
        assert_eq!(found.normalized.as_deref(), Some("spy x family"));
    }

    #[test]
    fn fuzzy_ties_keep_first_candidate() {
        let target = TargetDescription::new(["Spy x Family"]);
        let entries = [
            Entry::new(1, "Spy x Family Code: White"),
            Entry::new(2, "Spy x Family Code: White"),
        ];
        let found = tier(MatchMethod::Loose)
            .evaluate(&Profile::of_target(&target), &pool(&entries))
            .unwrap();
        assert_eq!(found.candidate.id, 1);
    }

    #[test]
    fn fallback_respects_acceptance() {
        let target = TargetDescription::new(["Bleach"]);
        let entries = [Entry::new(1, "Bleach: Sennen Kessen-hen")];
        assert!(tier(MatchMethod::BestPossible)
            .evaluate(&Profile::of_target(&target), &pool(&entries))
            .is_none());
    }

    // ── Resolver ──────────────────────────────────────────────────────

    #[test]
    fn custom_tier_order() {
        let loose = tier(MatchMethod::Loose);
        let resolver = Resolver::with_tiers(vec![loose]);
        let target = aot_target();
        let entries = [Entry::new(1, "Shingeki no Kyojin")
            .with_year(2017)
            .with_episodes(12)
            .with_type("TV")];
        let found = resolver.resolve(&target, &entries, &[]).unwrap();
        assert_eq!(found.method, MatchMethod::Loose);
        assert_eq!(found.similarity, 1.0);
    }

    #[test]
    fn config_changes_thresholds() {
        let mut config = MatchConfig::default();
        config.fallback.accept_at = 0.5;
        let resolver = Resolver::new(&config);

        let target = TargetDescription::new(["Bleach"]);
        let entries = [Entry::new(1, "Bleach: Sennen Kessen-hen")];
        let found = resolver.resolve(&target, &entries, &[]).unwrap();
        assert_eq!(found.method, MatchMethod::BestPossible);
        assert!(resolve(&target, &entries, &[]).is_none());
    }

    #[test]
    fn unusable_target_titles() {
        let target = TargetDescription::new(["Season 2", "---"]);
        let entries = [Entry::new(1, "Season 2")];
        assert!(resolve(&target, &entries, &[]).is_none());
    }

    #[test]
    fn resolve_many_never_reuses_candidate() {
        let entries = [
            Entry::new(1, "Spy x Family"),
            Entry::new(2, "Spy x Family Code: White"),
        ];
        let targets = [
            TargetDescription::new(["Spy x Family"]),
            TargetDescription::new(["Spy x Family"]),
        ];
        let found = Resolver::default().resolve_many(&targets, &entries);
        assert_eq!(found[0].as_ref().unwrap().candidate.id, 1);
        assert_eq!(found[1].as_ref().unwrap().candidate.id, 2);
        assert_eq!(found[1].as_ref().unwrap().method, MatchMethod::Loose);
    }

    #[test]
    fn result_serializes_method_tag() {
        let target = TargetDescription::new(["Bleach"]).with_type("TV");
        let entries = [Entry::new(5, "Bleach").with_type("TV")];
        let found = resolve(&target, &entries, &[]).unwrap();
        let json = serde_json::to_value(&found).unwrap();
        assert_eq!(json["method"], "exact-type-raw");
        assert_eq!(json["similarity"], 1.0);
        assert_eq!(json["candidate"]["id"], 5);
        assert_eq!(json["title"], "Bleach");
        assert_eq!(json["type"], "TV");
        assert!(json.get("normalized").is_none());
    }
}
