//! Error types for round processing.
//!
//! Every variant is fatal for the current build step. Host and CLI code
//! wrap these in `anyhow` and can downcast to inspect them.

use crate::models::MARKER_ATTRIBUTE;
use std::path::PathBuf;

/// Errors raised while processing a round.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// A marked unit matches neither recognized shape.
    #[error(
        "#[{marker}] can only be applied to {shapes} implementations, not: {unit} ({path:?})",
        marker = MARKER_ATTRIBUTE
    )]
    ClassificationConflict {
        unit: String,
        path: PathBuf,
        shapes: String,
    },

    /// The artifact writer failed.
    #[error("failed to write artifact {path:?}: {source}")]
    WriteFailure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// More than one application-style module was declared.
    #[error("only one root module may be declared per build, found: {}", .units.join(", "))]
    MultipleRoots { units: Vec<String> },

    /// Generation never reached a fixed point.
    #[error("rounds did not settle after {0} rounds")]
    RoundLimitExceeded(u32),
}

impl ProcessorError {
    /// Create a write failure for the given path.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailure {
            path: path.into(),
            source,
        }
    }
}
