use crate::config::RankerConfig;
use crate::entity::{Entity, SearchableFieldSet};
use crate::error::RankError;
use crate::expansion::gemini::GeminiExpander;
use crate::expansion::{fallback_terms, ExpandedTerms, FallbackExpander, TermExpander};
use crate::scoring::{EntityScore, EntityScorer, MatchTally};
use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

pub const MAX_RESULTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMatch {
    pub id: Value,
    pub model: String,
    pub confidence: f64,
    pub matches: MatchTally,
}

pub struct Ranker {
    expander: Box<dyn TermExpander>,
    config: RankerConfig,
}

impl Ranker {
    pub fn new(expander: impl TermExpander + 'static, config: RankerConfig) -> Self {
        Self {
            expander: Box::new(expander),
            config,
        }
    }

    /// Ranker that expands terms locally only.
    pub fn offline() -> Self {
        Self::new(FallbackExpander, RankerConfig::from_env())
    }

    /// Gemini-backed ranker configured from the environment.
    ///
    /// Fails when the API key is missing or the HTTP client cannot be built;
    /// treat that as fatal configuration, not something to retry.
    pub fn from_env() -> Result<Self> {
        let expander = GeminiExpander::from_env()?;
        Ok(Self::new(expander, RankerConfig::from_env()))
    }

    /// Expands `query`, falling back to local tokens on error, timeout or
    /// malformed output. Never fails.
    pub async fn expand(&self, query: &str, entity_name: &str) -> ExpandedTerms {
        let pending = self.expander.expand(query, entity_name);
        match tokio::time::timeout(self.config.expansion_timeout, pending).await {
            Ok(Ok(terms)) => {
                debug!(
                    expander = self.expander.name(),
                    exact = terms.exact_terms.len(),
                    related = terms.related_terms.len(),
                    "Expanded query"
                );
                terms
            }
            Ok(Err(e)) => {
                warn!(
                    expander = self.expander.name(),
                    error = %e,
                    "Term expansion failed; using local fallback"
                );
                fallback_terms(query)
            }
            Err(_) => {
                warn!(
                    expander = self.expander.name(),
                    timeout_ms = self.config.expansion_timeout.as_millis() as u64,
                    "Term expansion timed out; using local fallback"
                );
                fallback_terms(query)
            }
        }
    }

    /// Ranks `entities` against `query` and returns at most three matches.
    ///
    /// `Ok(None)` means there was nothing to search; `Ok(Some(vec![]))` means
    /// nothing matched.
    pub async fn rank(
        &self,
        query: &str,
        entity_name: &str,
        entities: &[Entity],
    ) -> std::result::Result<Option<Vec<RankedMatch>>, RankError> {
        if entities.is_empty() {
            return Ok(None);
        }
        ensure_ids(entities)?;

        let terms = self.expand(query, entity_name).await;
        self.rank_with_terms(entity_name, entities, &terms)
    }

    /// Scoring half of [`Ranker::rank`], for callers holding expanded terms.
    pub fn rank_with_terms(
        &self,
        entity_name: &str,
        entities: &[Entity],
        terms: &ExpandedTerms,
    ) -> std::result::Result<Option<Vec<RankedMatch>>, RankError> {
        if entities.is_empty() {
            return Ok(None);
        }
        ensure_ids(entities)?;

        let fields = SearchableFieldSet::from_first(entities);
        let scorer = EntityScorer::new(&fields, terms);
        debug!(
            candidates = entities.len(),
            fields = fields.len(),
            "Scoring candidates"
        );

        let scores: Vec<EntityScore> = if entities.len() >= self.config.parallel_threshold {
            entities.par_iter().map(|e| scorer.score(e)).collect()
        } else {
            entities.iter().map(|e| scorer.score(e)).collect()
        };

        let mut ranked: Vec<(&Entity, EntityScore)> = entities
            .iter()
            .zip(scores)
            .filter(|(_, scored)| scored.score > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));
        ranked.truncate(MAX_RESULTS);

        let matches: Vec<RankedMatch> = ranked
            .into_iter()
            .map(|(entity, scored)| RankedMatch {
                id: entity.id().cloned().unwrap_or(Value::Null),
                model: entity_name.to_string(),
                confidence: scored.score,
                matches: scored.matches,
            })
            .collect();

        info!(model = entity_name, results = matches.len(), "Ranked candidates");
        Ok(Some(matches))
    }
}

fn ensure_ids(entities: &[Entity]) -> std::result::Result<(), RankError> {
    match entities.iter().position(|e| e.id().is_none()) {
        Some(index) => Err(RankError::MissingId { index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct FailingExpander;

    #[async_trait]
    impl TermExpander for FailingExpander {
        fn name(&self) -> &str {
            "failing"
        }

        async fn expand(&self, _query: &str, _entity_name: &str) -> Result<ExpandedTerms> {
            anyhow::bail!("connection refused")
        }
    }

    struct SlowExpander;

    #[async_trait]
    impl TermExpander for SlowExpander {
        fn name(&self) -> &str {
            "slow"
        }

        async fn expand(&self, _query: &str, _entity_name: &str) -> Result<ExpandedTerms> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(ExpandedTerms {
                exact_terms: vec!["never".into()],
                ..ExpandedTerms::default()
            })
        }
    }

    struct FixedExpander(ExpandedTerms);

    #[async_trait]
    impl TermExpander for FixedExpander {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn expand(&self, _query: &str, _entity_name: &str) -> Result<ExpandedTerms> {
            Ok(self.0.clone())
        }
    }

    fn config() -> RankerConfig {
        RankerConfig {
            expansion_timeout: Duration::from_millis(50),
            parallel_threshold: 64,
        }
    }

    fn entities(values: Vec<Value>) -> Vec<Entity> {
        values
            .into_iter()
            .map(|v| Entity::try_from(v).unwrap())
            .collect()
    }

    fn catalog() -> Vec<Entity> {
        entities(vec![
            json!({"id": 1, "name": "Blue Running Shoes"}),
            json!({"id": 2, "name": "Red Hat"}),
        ])
    }

    #[test]
    fn empty_candidates_return_none() {
        let ranker = Ranker::new(FallbackExpander, config());
        let result = tokio_test::block_on(ranker.rank("shoes", "products", &[])).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn running_shoes_ranks_first_and_hat_is_dropped() {
        let ranker = Ranker::new(FailingExpander, config());
        let result = tokio_test::block_on(ranker.rank("running shoe", "products", &catalog()))
            .unwrap()
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, json!(1));
        assert_eq!(result[0].model, "products");
        assert!(result[0].confidence > 0.0);
        assert_eq!(result[0].matches.exact, 2);
    }

    #[test]
    fn blank_query_matches_nothing() {
        let ranker = Ranker::new(FailingExpander, config());
        let result = tokio_test::block_on(ranker.rank("", "products", &catalog())).unwrap();
        assert_eq!(result, Some(Vec::new()));
    }

    #[test]
    fn timeout_falls_back_and_still_ranks() {
        let ranker = Ranker::new(SlowExpander, config());
        let result = tokio_test::block_on(ranker.rank("red hat", "products", &catalog()))
            .unwrap()
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, json!(2));
    }

    #[test]
    fn expansion_failure_yields_fallback_terms() {
        let ranker = Ranker::new(FailingExpander, config());
        let terms = tokio_test::block_on(ranker.expand("Fresh Sourdough Bread", "listings"));
        assert_eq!(terms, fallback_terms("Fresh Sourdough Bread"));
        assert_eq!(terms.exact_terms, vec!["fresh", "sourdough", "bread"]);
    }

    #[test]
    fn successful_expansion_is_used_verbatim() {
        let expanded = ExpandedTerms {
            exact_terms: vec!["cap".into()],
            related_terms: vec!["hat".into()],
            importance: [("cap".to_string(), 1.0), ("hat".to_string(), 0.9)]
                .into_iter()
                .collect(),
        };
        let ranker = Ranker::new(FixedExpander(expanded.clone()), config());
        assert_eq!(
            tokio_test::block_on(ranker.expand("cap", "products")),
            expanded
        );

        let result = tokio_test::block_on(ranker.rank("cap", "products", &catalog()))
            .unwrap()
            .unwrap();
        assert_eq!(result[0].id, json!(2));
        assert_eq!(result[0].matches.related, 1);
    }

    #[test]
    fn at_most_three_results() {
        let many = entities(
            (1..=10)
                .map(|id| json!({"id": id, "name": "Red Hat"}))
                .collect(),
        );
        let ranker = Ranker::new(FallbackExpander, config());
        let result = tokio_test::block_on(ranker.rank("red hat", "products", &many))
            .unwrap()
            .unwrap();
        assert_eq!(result.len(), 3);
        // Equal scores keep input order.
        let ids: Vec<Value> = result.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn results_are_sorted_by_confidence() {
        let items = entities(vec![
            json!({"id": "a", "name": "Wool socks", "description": "warm wool"}),
            json!({"id": "b", "name": "Wool hat", "description": "winter hat, wool blend"}),
            json!({"id": "c", "name": "Cotton hat", "description": "summer"}),
        ]);
        let ranker = Ranker::new(FallbackExpander, config());
        let result = tokio_test::block_on(ranker.rank("wool hat", "products", &items))
            .unwrap()
            .unwrap();
        assert_eq!(result[0].id, json!("b"));
        assert!(result
            .windows(2)
            .all(|pair| pair[0].confidence >= pair[1].confidence));
    }

    #[test]
    fn parallel_and_sequential_scoring_agree() {
        let items = entities(
            (0..200)
                .map(|id| {
                    json!({"id": id, "name": format!("item {id} blue shoe"), "tags": ["shoes"]})
                })
                .collect(),
        );
        let terms = fallback_terms("blue shoes 7");
        let parallel = Ranker::new(
            FallbackExpander,
            RankerConfig {
                parallel_threshold: 1,
                ..config()
            },
        );
        let sequential = Ranker::new(
            FallbackExpander,
            RankerConfig {
                parallel_threshold: usize::MAX,
                ..config()
            },
        );
        assert_eq!(
            parallel.rank_with_terms("products", &items, &terms).unwrap(),
            sequential.rank_with_terms("products", &items, &terms).unwrap()
        );
    }

    #[test]
    fn string_id_tokens_are_matched() {
        let items = entities(vec![json!({"id": "shoe-123", "name": "Red Hat"})]);
        let ranker = Ranker::new(FallbackExpander, config());
        let result = tokio_test::block_on(ranker.rank("shoe", "products", &items))
            .unwrap()
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, json!("shoe-123"));
        assert_eq!(result[0].matches.exact, 1);
    }

    #[test]
    fn missing_id_is_reported() {
        let items = entities(vec![json!({"id": 1, "name": "a"}), json!({"name": "b"})]);
        let ranker = Ranker::new(FallbackExpander, config());
        let err = tokio_test::block_on(ranker.rank("anything", "products", &items)).unwrap_err();
        assert_eq!(err, RankError::MissingId { index: 1 });
    }

    #[test]
    fn input_entities_are_untouched() {
        let items = catalog();
        let before = items.clone();
        let ranker = Ranker::new(FallbackExpander, config());
        tokio_test::block_on(ranker.rank("running shoes", "products", &items)).unwrap();
        assert_eq!(items, before);
    }
}
