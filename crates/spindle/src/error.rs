//! Top-level error type.

use spindle_config::ConfigError;
use spindle_core::PipelineError;
use spindle_telemetry::TelemetryError;
use thiserror::Error;

/// Result type for application-level Spindle operations.
pub type SpindleResult<T> = Result<T, SpindleError>;

/// Errors surfaced while bootstrapping or running Spindle.
#[derive(Debug, Error)]
pub enum SpindleError {
    /// Configuration failed to load or validate.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logging or metrics failed to initialize.
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// A pipeline run or mutation failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
