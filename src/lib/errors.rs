//! Custom error types for svasm operations.

use thiserror::Error;

/// Result type alias for svasm operations
pub type Result<T> = std::result::Result<T, SvasmError>;

/// Error type for svasm operations
#[derive(Error, Debug)]
pub enum SvasmError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// Configuration problem detected before any pipeline stage runs
    #[error("Configuration error: {reason}")]
    Configuration {
        /// Explanation of the problem
        reason: String,
    },

    /// A record arrived outside the assumed reordering window
    #[error(
        "Ordering violation: record at tid {tid}:{position} arrived after \
         tid {released_tid}:{released_position} was already released (window {window})"
    )]
    OrderingViolation {
        /// Contig index of the offending record
        tid: u32,
        /// Position of the offending record
        position: i64,
        /// Contig index of the already-released record
        released_tid: u32,
        /// Position of the already-released record
        released_position: i64,
        /// The window size that was assumed
        window: i64,
    },

    /// A record could not be decoded or violates a structural invariant
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord {
        /// 1-based line number in the source file
        line: u64,
        /// Explanation of the problem
        reason: String,
    },

    /// Required contig not present in the dictionary
    #[error("Contig '{name}' not found in dictionary")]
    ContigNotFound {
        /// The contig name
        name: String,
    },
}
