//! Error type for route-spatial-index construction failures.
//!
//! Query operations are total (see `query.rs`) and never return this type;
//! only [`crate::builder::build_index`] can fail.

use std::fmt;

/// Construction-time failure for a malformed route.
#[derive(Debug, Clone)]
pub enum RouteIndexError {
    /// The route contained no segments, or every segment was empty.
    EmptyRoute { reason: String },
}

impl fmt::Display for RouteIndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteIndexError::EmptyRoute { reason } => {
                write!(f, "route has no indexable points: {}", reason)
            }
        }
    }
}

impl std::error::Error for RouteIndexError {}

/// Result type alias for route-spatial-index construction.
pub type Result<T> = std::result::Result<T, RouteIndexError>;
