//! Main configuration types.
//!
//! This module provides the top-level [`SpindleConfig`] struct and its builder.

use serde::{Deserialize, Serialize};
use spindle_middleware::PipelineOptions;
use spindle_telemetry::logging::create_env_filter;

use crate::{ConfigError, LogFormat, TelemetrySection};

/// Complete Spindle configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use spindle_config::SpindleConfig;
///
/// let config = SpindleConfig::default();
/// assert!(!config.pipeline.seal_after_run);
/// assert_eq!(config.telemetry.service_name, "spindle");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SpindleConfig {
    /// Options applied to pipelines built from this configuration.
    #[serde(default)]
    pub pipeline: PipelineOptions,

    /// Telemetry configuration (logging, metrics).
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

impl SpindleConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> SpindleConfigBuilder {
        SpindleConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The service name is empty
    /// - The log level is not a valid filter directive
    /// - The histogram buckets are empty, non-positive or not increasing
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telemetry.service_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.service_name",
                "must not be empty",
            ));
        }

        if self.telemetry.logging.enabled {
            create_env_filter(&self.telemetry.logging.level).map_err(|e| {
                ConfigError::invalid_value("telemetry.logging.level", e.to_string())
            })?;
        }

        let buckets = &self.telemetry.metrics.histogram_buckets;
        if self.telemetry.metrics.enabled {
            if buckets.is_empty() {
                return Err(ConfigError::invalid_value(
                    "telemetry.metrics.histogram_buckets",
                    "must not be empty",
                ));
            }
            if buckets.iter().any(|b| !b.is_finite() || *b <= 0.0) {
                return Err(ConfigError::invalid_value(
                    "telemetry.metrics.histogram_buckets",
                    "must be positive, finite values",
                ));
            }
            if buckets.windows(2).any(|w| w[0] >= w[1]) {
                return Err(ConfigError::invalid_value(
                    "telemetry.metrics.histogram_buckets",
                    "must be strictly increasing",
                ));
            }
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// - Pretty log formatting with source locations and span events
    /// - Debug log level
    /// - Pipelines accept middleware at any time
    ///
    /// # Example
    ///
    /// ```
    /// use spindle_config::SpindleConfig;
    ///
    /// let config = SpindleConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.include_location = true;
        config.telemetry.logging.span_events = true;

        config.pipeline.seal_after_run = false;

        config
    }

    /// Create a production configuration preset.
    ///
    /// - JSON log formatting
    /// - Info log level
    /// - Pipelines are sealed once they have run
    ///
    /// # Example
    ///
    /// ```
    /// use spindle_config::SpindleConfig;
    ///
    /// let config = SpindleConfig::production();
    /// assert_eq!(config.telemetry.logging.format, spindle_config::LogFormat::Json);
    /// assert!(config.pipeline.seal_after_run);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.logging.include_location = false;

        config.pipeline.seal_after_run = true;

        config
    }
}

/// Builder for [`SpindleConfig`].
#[derive(Debug, Default)]
pub struct SpindleConfigBuilder {
    pipeline: Option<PipelineOptions>,
    telemetry: Option<TelemetrySection>,
}

impl SpindleConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pipeline options.
    #[must_use]
    pub fn pipeline(mut self, pipeline: PipelineOptions) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Set the telemetry configuration.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetrySection) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> SpindleConfig {
        SpindleConfig {
            pipeline: self.pipeline.unwrap_or_default(),
            telemetry: self.telemetry.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<SpindleConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
