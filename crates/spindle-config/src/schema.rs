//! Configuration schema types.
//!
//! This module defines the telemetry sections of the configuration file and
//! their conversion into the runtime types of `spindle-telemetry`. The
//! `[pipeline]` section deserializes directly into
//! [`PipelineOptions`](spindle_middleware::PipelineOptions).

use serde::{Deserialize, Serialize};
use spindle_telemetry::{LogConfig, MetricsConfig, TelemetryConfig, DEFAULT_SERVICE_NAME};

fn default_true() -> bool {
    true
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g. "info" or "spindle_middleware=trace,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,

    /// Emit span open/close events.
    #[serde(default)]
    pub span_events: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
            span_events: false,
        }
    }
}

impl LoggingSection {
    /// Converts this section into a [`LogConfig`].
    #[must_use]
    pub fn to_log_config(&self, service_name: &str) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            span_events: self.span_events,
            file_line_info: self.include_location,
            service_name: service_name.to_string(),
            ..LogConfig::production()
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Install the Prometheus recorder.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Buckets for the run duration histogram, in seconds.
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: Vec<f64>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            histogram_buckets: default_histogram_buckets(),
        }
    }
}

impl MetricsSection {
    /// Converts this section into a [`MetricsConfig`].
    #[must_use]
    pub fn to_metrics_config(&self, service_name: &str) -> MetricsConfig {
        MetricsConfig {
            enabled: self.enabled,
            service_name: service_name.to_string(),
            duration_buckets: self.histogram_buckets.clone(),
        }
    }
}

fn default_histogram_buckets() -> Vec<f64> {
    MetricsConfig::default().duration_buckets
}

/// Telemetry configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Service name attached to logs and metrics.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsSection,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            logging: LoggingSection::default(),
            metrics: MetricsSection::default(),
        }
    }
}

impl TelemetrySection {
    /// Converts this section into a [`TelemetryConfig`].
    #[must_use]
    pub fn to_telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig::builder()
            .service_name(&self.service_name)
            .logging(self.logging.to_log_config(&self.service_name))
            .metrics(self.metrics.to_metrics_config(&self.service_name))
            .build()
    }
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}
