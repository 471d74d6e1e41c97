//! Logging and metrics for Spindle.
//!
//! This crate wires the engine's `tracing` events and `metrics` recordings to
//! concrete backends:
//!
//! - **Logging**: `tracing-subscriber` with JSON or pretty output
//! - **Metrics**: a Prometheus recorder rendered on demand
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `spindle_pipeline_runs_total` | Counter | `pipeline`, `outcome` | Completed runs |
//! | `spindle_pipeline_run_duration_seconds` | Histogram | `pipeline` | Run latency |
//! | `spindle_middleware_dispatch_total` | Counter | `pipeline` | Middleware invocations |
//!
//! # Example
//!
//! ```rust,ignore
//! use spindle_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let telemetry = init_telemetry(&TelemetryConfig::builder().service_name("orders").build())?;
//!
//! // ... run pipelines ...
//!
//! if let Some(text) = telemetry.render_metrics() {
//!     println!("{text}");
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/spindle-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, MetricsConfig, MetricsRegistry};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Service name used when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "spindle";

/// Handles to the installed telemetry backends.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    metrics: Option<MetricsRegistry>,
}

impl Telemetry {
    /// Returns the metrics registry, if metrics are enabled.
    #[must_use]
    pub fn metrics(&self) -> Option<&MetricsRegistry> {
        self.metrics.as_ref()
    }

    /// Renders metrics in Prometheus text format, if metrics are enabled.
    #[must_use]
    pub fn render_metrics(&self) -> Option<String> {
        self.metrics.as_ref().map(MetricsRegistry::render)
    }
}

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<Telemetry> {
    init_logging(&config.logging)?;
    let metrics = init_metrics(&config.metrics)?;

    tracing::info!(
        service = %config.service_name,
        logging = config.logging.enabled,
        metrics = metrics.is_some(),
        "telemetry initialized"
    );

    Ok(Telemetry { metrics })
}
