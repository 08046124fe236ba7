//! Per-entity relevance scoring.
//!
//! Each searchable field is normalized once and scored in four passes:
//! exact (plural-tolerant) matches, partial (substring / edit-distance)
//! matches for exact terms with no exact hit, related-term frequency, and a
//! proximity bonus. The raw total is divided by the best score the term set
//! could reach and capped at 1.
use crate::entity::{Entity, SearchableFieldSet};
use crate::expansion::ExpandedTerms;
use crate::matching::{edit_similarity, is_exact_match, proximity_score, substring_overlap};
use crate::normalize::{normalize_value, tokenize};
use serde::Serialize;
use serde_json::Value;
use std::ops::Add;

pub const EXACT_WEIGHT: f64 = 5.0;
pub const PARTIAL_WEIGHT: f64 = 0.7;
pub const RELATED_WEIGHT: f64 = 0.5;
pub const PROXIMITY_WEIGHT: f64 = 5.0;

pub const SUBSTRING_THRESHOLD: f64 = 0.5;
pub const EDIT_SIMILARITY_THRESHOLD: f64 = 0.7;

const DEFAULT_FIELD_WEIGHT: f64 = 1.0;
const FIELD_WEIGHTS: &[(&str, f64)] = &[
    ("name", 3.0),
    ("title", 2.5),
    ("tags", 2.0),
    ("description", 1.5),
    ("content", 1.0),
];

pub fn field_weight(field: &str) -> f64 {
    FIELD_WEIGHTS
        .iter()
        .find(|(name, _)| *name == field)
        .map_or(DEFAULT_FIELD_WEIGHT, |(_, weight)| *weight)
}

pub fn max_field_weight() -> f64 {
    FIELD_WEIGHTS
        .iter()
        .map(|(_, weight)| *weight)
        .fold(DEFAULT_FIELD_WEIGHT, f64::max)
}

/// Match counters for one entity. `concept` and `root` are reserved and stay 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchTally {
    pub exact: u32,
    pub partial: u32,
    pub related: u32,
    pub concept: u32,
    pub root: u32,
}

impl Add for MatchTally {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            exact: self.exact + rhs.exact,
            partial: self.partial + rhs.partial,
            related: self.related + rhs.related,
            concept: self.concept + rhs.concept,
            root: self.root + rhs.root,
        }
    }
}

/// Raw score and tallies produced by one scoring step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Contribution {
    score: f64,
    matches: MatchTally,
}

impl Contribution {
    fn bonus(score: f64) -> Self {
        Self {
            score,
            ..Self::default()
        }
    }

    fn with(score: f64, matches: MatchTally) -> Self {
        Self { score, matches }
    }
}

impl Add for Contribution {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            score: self.score + rhs.score,
            matches: self.matches + rhs.matches,
        }
    }
}

impl std::iter::Sum for Contribution {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EntityScore {
    pub score: f64,
    pub matches: MatchTally,
}

struct NormalizedField {
    text: String,
    weight: f64,
}

impl NormalizedField {
    fn tokens(&self) -> Vec<&str> {
        tokenize(&self.text)
    }
}

/// Scores entities against one expanded term set.
///
/// Built once per ranking call and shared across candidates; holds no
/// mutable state, so `score` can run from many threads at once.
pub struct EntityScorer<'a> {
    fields: &'a SearchableFieldSet,
    terms: &'a ExpandedTerms,
    proximity_terms: Vec<String>,
    max_possible: f64,
}

impl<'a> EntityScorer<'a> {
    pub fn new(fields: &'a SearchableFieldSet, terms: &'a ExpandedTerms) -> Self {
        let term_count = terms.exact_terms.len() + terms.related_terms.len();
        Self {
            fields,
            terms,
            proximity_terms: terms.all_terms_distinct(),
            max_possible: term_count as f64 * max_field_weight() * EXACT_WEIGHT,
        }
    }

    pub fn score(&self, entity: &Entity) -> EntityScore {
        if self.max_possible <= 0.0 {
            return EntityScore::default();
        }

        let total: Contribution = self
            .fields
            .iter()
            .map(|name| NormalizedField {
                text: normalize_value(entity.get(name).unwrap_or(&Value::Null)),
                weight: field_weight(name),
            })
            .map(|field| self.score_field(&field))
            .sum();

        EntityScore {
            score: (total.score / self.max_possible).clamp(0.0, 1.0),
            matches: total.matches,
        }
    }

    fn score_field(&self, field: &NormalizedField) -> Contribution {
        let tokens = field.tokens();
        if tokens.is_empty() {
            return Contribution::default();
        }

        let exact: Contribution = self
            .terms
            .exact_terms
            .iter()
            .map(|term| self.score_exact_term(term, &tokens, field.weight))
            .sum();

        let related: Contribution = self
            .terms
            .distinct_related()
            .map(|term| self.score_related_term(term, &tokens, field.weight))
            .sum();

        let proximity = proximity_score(&field.text, &self.proximity_terms)
            * field.weight
            * PROXIMITY_WEIGHT;

        exact + related + Contribution::bonus(proximity)
    }

    /// Exact hits pre-empt partial scoring for the same (term, field) pair.
    fn score_exact_term(&self, term: &str, tokens: &[&str], weight: f64) -> Contribution {
        let needle = term.to_lowercase();
        let importance = self.terms.exact_importance(term);
        let hits = count_matches(&needle, tokens);

        if hits > 0 {
            let frequency = hits as f64 / tokens.len() as f64;
            let matches = MatchTally {
                exact: hits as u32,
                ..MatchTally::default()
            };
            return Contribution::with(frequency * importance * weight * EXACT_WEIGHT, matches);
        }

        tokens
            .iter()
            .map(|token| partial_match(&needle, token, importance * weight))
            .sum()
    }

    fn score_related_term(&self, term: &str, tokens: &[&str], weight: f64) -> Contribution {
        let hits = count_matches(&term.to_lowercase(), tokens);
        if hits == 0 {
            return Contribution::default();
        }
        let frequency = hits as f64 / tokens.len() as f64;
        let importance = self.terms.related_importance(term);
        let matches = MatchTally {
            related: 1,
            ..MatchTally::default()
        };
        Contribution::with(frequency * importance * weight * RELATED_WEIGHT, matches)
    }
}

fn count_matches(term: &str, tokens: &[&str]) -> usize {
    tokens
        .iter()
        .filter(|token| is_exact_match(term, token))
        .count()
}

/// Substring overlap and edit similarity fire independently.
fn partial_match(term: &str, token: &str, scale: f64) -> Contribution {
    let mut contribution = Contribution::default();

    let overlap = substring_overlap(term, token);
    if overlap > SUBSTRING_THRESHOLD {
        contribution = contribution + partial_hit(overlap * scale * PARTIAL_WEIGHT);
    }

    let similarity = edit_similarity(term, token);
    if similarity > EDIT_SIMILARITY_THRESHOLD {
        contribution = contribution + partial_hit(similarity * scale * PARTIAL_WEIGHT);
    }

    contribution
}

fn partial_hit(score: f64) -> Contribution {
    Contribution::with(
        score,
        MatchTally {
            partial: 1,
            ..MatchTally::default()
        },
    )
}
