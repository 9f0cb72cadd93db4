//! Error types for the snapping engine.

use thiserror::Error;

/// Errors raised while configuring snapping.
#[derive(Debug, Error)]
pub enum SnapError {
    /// Settings could not be parsed.
    #[error("failed to parse snap settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting holds an unusable value.
    #[error("invalid snap setting `{name}`: {reason}")]
    InvalidSetting {
        /// Setting name.
        name: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Result type for snapping configuration.
pub type Result<T> = std::result::Result<T, SnapError>;
