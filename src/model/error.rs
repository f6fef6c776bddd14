//! Error types for model construction, validation, and serialization.

use thiserror::Error;

/// Errors raised while building, validating, or serializing a network.
///
/// Every variant is raised synchronously at the point of detection and
/// carries a message naming the offending variable, state, or shape.
/// Nothing is silently corrected except under an explicit force flag.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BnError {
    /// Malformed identifier, empty state list, or otherwise invalid input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Tensor shape disagrees with the declared state/parent cardinalities.
    #[error("shape error: {0}")]
    Shape(String),

    /// A CPT column does not sum to 1 within tolerance and forcing was not requested.
    #[error("normalization error: {0}")]
    Normalization(String),

    /// Duplicate id, dependency cycle, or reference to an undefined parent.
    #[error("structural error: {0}")]
    Structural(String),

    /// Unknown variable id or state in a query or fit input.
    #[error("lookup error: {0}")]
    Lookup(String),

    /// Unrecognized file extension or malformed document.
    #[error("format error: {0}")]
    Format(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BnError>;
