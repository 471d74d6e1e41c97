//! Telemetry configuration.

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;

/// Configuration for all telemetry subsystems.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// Service name (used in metrics and logs).
    pub service_name: String,

    /// Metrics configuration.
    pub metrics: MetricsConfig,

    /// Logging configuration.
    pub logging: LogConfig,
}

impl TelemetryConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::new()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: crate::DEFAULT_SERVICE_NAME.to_string(),
            metrics: MetricsConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Builder for [`TelemetryConfig`].
#[derive(Debug, Default)]
pub struct TelemetryConfigBuilder {
    service_name: Option<String>,
    metrics: Option<MetricsConfig>,
    logging: Option<LogConfig>,
}

impl TelemetryConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service name.
    #[must_use]
    pub fn service_name(mut self, name: &str) -> Self {
        self.service_name = Some(name.to_string());
        self
    }

    /// Sets the metrics configuration.
    #[must_use]
    pub fn metrics(mut self, config: MetricsConfig) -> Self {
        self.metrics = Some(config);
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn logging(mut self, config: LogConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// Sets the log filter directive.
    #[must_use]
    pub fn log_level(mut self, level: &str) -> Self {
        let config = self.logging.take().unwrap_or_default();
        self.logging = Some(LogConfig {
            level: level.to_string(),
            ..config
        });
        self
    }

    /// Builds the configuration.
    ///
    /// The service name is copied into the logging and metrics sections.
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        let defaults = TelemetryConfig::default();

        let service_name = self.service_name.unwrap_or(defaults.service_name);

        let mut metrics = self.metrics.unwrap_or(defaults.metrics);
        metrics.service_name.clone_from(&service_name);

        let mut logging = self.logging.unwrap_or(defaults.logging);
        logging.service_name.clone_from(&service_name);

        TelemetryConfig {
            service_name,
            metrics,
            logging,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "spindle");
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_builder_propagates_service_name() {
        let config = TelemetryConfig::builder()
            .service_name("checkout")
            .build();

        assert_eq!(config.service_name, "checkout");
        assert_eq!(config.metrics.service_name, "checkout");
        assert_eq!(config.logging.service_name, "checkout");
    }

    #[test]
    fn test_builder_log_level_keeps_other_settings() {
        let config = TelemetryConfig::builder()
            .logging(LogConfig::development())
            .log_level("spindle_middleware=trace")
            .build();

        assert_eq!(config.logging.level, "spindle_middleware=trace");
        assert!(!config.logging.json_format);
    }
}
