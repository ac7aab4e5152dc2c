//! Animator error types

use thiserror::Error;

/// Errors raised by the animator's ambient surfaces
///
/// Scheduling itself never fails; these cover the process-wide instance slot,
/// configuration loading and frame clocks that cannot start.
#[derive(Error, Debug)]
pub enum AnimatorError {
    /// The process-wide animator was installed twice
    #[error("Global animator already initialized")]
    AlreadyInitialized,

    /// The process-wide animator was requested before being installed
    #[error("Global animator not initialized. Call set_global_animator() at app startup.")]
    NotInitialized,

    /// Configuration values are out of range
    #[error("Invalid animator config: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("Failed to parse animator config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("Failed to read animator config: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// The frame clock could not be attached
    #[error("Failed to start frame clock: {0}")]
    ClockStart(#[source] std::io::Error),
}

/// Result type for animator operations
pub type Result<T> = std::result::Result<T, AnimatorError>;
