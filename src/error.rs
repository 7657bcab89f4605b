//! Unified error type for the planner.
//!
//! Geometry and simplification never fail; errors only come from waypoint
//! indexing, durable state, GPX parsing/writing and the routing service.

use thiserror::Error;

/// Errors produced by waypoint editing, persistence, GPX and routing.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("index out of bounds: {index} (waypoint count {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("GPX parsing error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("GPX writing error: {0}")]
    GpxWrite(String),

    #[error("routing error: {0}")]
    Routing(String),

    #[error("malformed route response: {0}")]
    MalformedRoute(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PlannerError>;

/// Check `index < len`, as required by every positional waypoint operation.
pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(PlannerError::IndexOutOfBounds { index, len })
    }
}
