//! Query term expansion.
//!
//! A raw query becomes an [`ExpandedTerms`] set: exact terms, related terms and
//! per-term importance. The remote expander asks a language model; the
//! fallback expander is local and deterministic. The ranker always has the
//! fallback to hand, so an expander error is never fatal.
pub mod gemini;

use crate::normalize::normalize_text;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_EXACT_IMPORTANCE: f64 = 1.0;
pub const DEFAULT_RELATED_IMPORTANCE: f64 = 0.7;
const MIN_FALLBACK_TOKEN_LEN: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedTerms {
    pub exact_terms: Vec<String>,
    pub related_terms: Vec<String>,
    pub importance: BTreeMap<String, f64>,
}

impl ExpandedTerms {
    /// Strictly parses a collaborator response.
    ///
    /// Markdown code fences are tolerated. Missing keys, wrong types, importance
    /// outside `(0, 1]` and an empty term set are all rejected.
    pub fn parse(body: &str) -> Result<Self> {
        let terms: Self = serde_json::from_str(strip_code_fence(body))
            .context("expansion response is not an ExpandedTerms document")?;

        if terms.is_empty() {
            bail!("expansion response contains no terms");
        }
        if let Some((term, weight)) = terms
            .importance
            .iter()
            .find(|(_, w)| !(**w > 0.0 && **w <= 1.0))
        {
            bail!("importance for {term:?} out of range: {weight}");
        }
        Ok(terms)
    }

    pub fn is_empty(&self) -> bool {
        self.exact_terms.is_empty() && self.related_terms.is_empty()
    }

    pub fn exact_importance(&self, term: &str) -> f64 {
        self.importance
            .get(term)
            .copied()
            .unwrap_or(DEFAULT_EXACT_IMPORTANCE)
    }

    pub fn related_importance(&self, term: &str) -> f64 {
        self.importance
            .get(term)
            .copied()
            .unwrap_or(DEFAULT_RELATED_IMPORTANCE)
    }

    /// Related terms that are not also exact terms.
    pub fn distinct_related(&self) -> impl Iterator<Item = &String> {
        self.related_terms
            .iter()
            .filter(|term| !self.exact_terms.contains(term))
    }

    /// Exact then related terms, lowercased, first occurrence kept.
    pub fn all_terms_distinct(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for term in self.exact_terms.iter().chain(&self.related_terms) {
            let lower = term.to_lowercase();
            if !seen.contains(&lower) {
                seen.push(lower);
            }
        }
        seen
    }
}

/// Deterministic local expansion: normalized query tokens longer than two
/// characters, each with importance 1.0.
pub fn fallback_terms(query: &str) -> ExpandedTerms {
    let normalized = normalize_text(query);
    let exact_terms: Vec<String> = normalized
        .split_whitespace()
        .filter(|token| token.chars().count() >= MIN_FALLBACK_TOKEN_LEN)
        .map(str::to_string)
        .collect();
    let importance = exact_terms
        .iter()
        .map(|term| (term.clone(), DEFAULT_EXACT_IMPORTANCE))
        .collect();

    ExpandedTerms {
        exact_terms,
        related_terms: Vec::new(),
        importance,
    }
}

fn strip_code_fence(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[async_trait]
pub trait TermExpander: Send + Sync {
    fn name(&self) -> &str;

    async fn expand(&self, query: &str, entity_name: &str) -> Result<ExpandedTerms>;
}

/// Expander that never leaves the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackExpander;

#[async_trait]
impl TermExpander for FallbackExpander {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn expand(&self, query: &str, _entity_name: &str) -> Result<ExpandedTerms> {
        Ok(fallback_terms(query))
    }
}
