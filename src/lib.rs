pub mod config;
pub mod entity;
pub mod error;
/// Query term expansion: Gemini-backed remote expander plus the local fallback.
pub mod expansion;
pub mod matching;
pub mod normalize;
pub mod ranker;
pub mod scoring;

pub use config::{GeminiConfig, RankerConfig};
pub use entity::{load_entities, parse_entities, Entity, SearchableFieldSet};
pub use error::RankError;
pub use expansion::{fallback_terms, ExpandedTerms, FallbackExpander, TermExpander};
pub use ranker::{RankedMatch, Ranker, MAX_RESULTS};
pub use scoring::{EntityScore, EntityScorer, MatchTally};
