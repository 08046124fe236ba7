//! Error types for ranking.

use thiserror::Error;

/// The single failure `Ranker::rank` may surface.
///
/// Term-expansion problems never appear here; they degrade to the local
/// fallback instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RankError {
    /// A candidate has no usable `id` field.
    #[error("entity at index {index} has no `id` field")]
    MissingId { index: usize },

    /// A record in the input was not a JSON object.
    #[error("entity at index {index} is not a JSON object")]
    NotAnObject { index: usize },
}
