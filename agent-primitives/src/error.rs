//! Shared error definitions for agent primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the primitives crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided trace identifier could not be parsed.
    #[error("invalid trace id: {source}")]
    InvalidTraceId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Contract identifier failed validation.
    #[error("invalid contract id `{id}`: {reason}")]
    InvalidContractId {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A contract could not be assembled from the supplied parts.
    #[error("invalid contract: {reason}")]
    InvalidContract {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// An enumerated value did not match any known variant.
    #[error("unknown {field} value `{value}`")]
    UnknownVariant {
        /// Name of the enumerated field.
        field: &'static str,
        /// The value that failed to parse.
        value: String,
    },
}
