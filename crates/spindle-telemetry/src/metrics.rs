//! Prometheus metrics for Spindle.
//!
//! The pipeline records its metrics through the `metrics` facade. This module
//! installs a Prometheus recorder so those metrics can be rendered in text
//! exposition format. No HTTP listener is started; collaborators that serve
//! `/metrics` call [`MetricsRegistry::render`] themselves.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `spindle_pipeline_runs_total` | Counter | `pipeline`, `outcome` | Completed runs |
//! | `spindle_pipeline_run_duration_seconds` | Histogram | `pipeline` | Run latency |
//! | `spindle_middleware_dispatch_total` | Counter | `pipeline` | Middleware invocations |
//!
//! `outcome` is `ok` or the error kind (`incomplete_chain`,
//! `next_called_multiple_times`, `middleware`, ...).

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use spindle_core::names;
use std::sync::OnceLock;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Service name, attached to every metric as the `service` label.
    pub service_name: String,

    /// Histogram buckets for run duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: crate::DEFAULT_SERVICE_NAME.to_string(),
            // 100us up to 10s
            duration_buckets: vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Metrics registry for Spindle.
///
/// Wraps the Prometheus handle and renders the current snapshot.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    handle: PrometheusHandle,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with the given handle.
    #[must_use]
    pub fn new(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Renders all metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initializes the metrics subsystem.
///
/// Returns `Ok(None)` when metrics are disabled. Installing twice returns the
/// handle from the first installation.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidConfig` for an empty bucket list and
/// `TelemetryError::MetricsInit` if another recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<Option<MetricsRegistry>> {
    if !config.enabled {
        return Ok(None);
    }

    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(Some(MetricsRegistry::new(handle.clone())));
    }

    if config.duration_buckets.is_empty() {
        return Err(TelemetryError::InvalidConfig(
            "duration_buckets must not be empty".to_string(),
        ));
    }

    let handle = PrometheusBuilder::new()
        .add_global_label("service", config.service_name.clone())
        .set_buckets_for_metric(
            Matcher::Full(names::PIPELINE_RUN_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let handle = METRICS_HANDLE.get_or_init(|| handle).clone();

    register_metric_descriptions();
    tracing::debug!(service = %config.service_name, "metrics recorder installed");

    Ok(Some(MetricsRegistry::new(handle)))
}

/// Returns the global metrics handle if initialized.
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Registers descriptions for all standard metrics.
fn register_metric_descriptions() {
    describe_counter!(
        names::PIPELINE_RUNS_TOTAL,
        Unit::Count,
        "Total number of completed pipeline runs by outcome"
    );

    describe_histogram!(
        names::PIPELINE_RUN_DURATION_SECONDS,
        Unit::Seconds,
        "Pipeline run duration in seconds"
    );

    describe_counter!(
        names::MIDDLEWARE_DISPATCH_TOTAL,
        Unit::Count,
        "Total number of middleware invocations"
    );
}
