//! Token-level matchers used by the entity scorer.
//!
//! - `morphology`: plural-tolerant exact matching
//! - `fuzzy`: edit-distance and substring-overlap similarity
//! - `proximity`: co-occurrence bonus for distinct terms in one field
pub mod fuzzy;
pub mod morphology;
pub mod proximity;

pub use fuzzy::{edit_similarity, levenshtein, substring_overlap};
pub use morphology::{is_exact_match, variants};
pub use proximity::proximity_score;
