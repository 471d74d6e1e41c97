//! Application bootstrap.
//!
//! [`Spindle`] ties configuration and telemetry together: it validates a
//! [`SpindleConfig`], installs logging and metrics, and hands out pipeline
//! builders preconfigured with the `[pipeline]` section.

use crate::error::SpindleResult;
use spindle_config::{ConfigLoader, SpindleConfig};
use spindle_middleware::{PipelineBuilder, PipelineOptions};
use spindle_telemetry::{init_telemetry, Telemetry};

/// An initialized Spindle runtime.
#[derive(Debug, Clone)]
pub struct Spindle {
    config: SpindleConfig,
    telemetry: Telemetry,
}

impl Spindle {
    /// Validates `config` and initializes telemetry.
    ///
    /// # Errors
    ///
    /// Returns `SpindleError::Config` if validation fails and
    /// `SpindleError::Telemetry` if logging or metrics cannot be installed.
    pub fn init(config: SpindleConfig) -> SpindleResult<Self> {
        config.validate()?;
        let telemetry = init_telemetry(&config.telemetry.to_telemetry_config())?;

        tracing::info!(
            service = %config.telemetry.service_name,
            seal_after_run = config.pipeline.seal_after_run,
            fresh_context_per_run = config.pipeline.fresh_context_per_run,
            "spindle initialized"
        );

        Ok(Self { config, telemetry })
    }

    /// Loads configuration from `loader`, then calls [`Spindle::init`].
    pub fn from_loader(loader: ConfigLoader) -> SpindleResult<Self> {
        Self::init(loader.load()?)
    }

    /// Returns a pipeline builder named `name` using the configured options.
    pub fn pipeline<I, O>(&self, name: impl Into<String>) -> PipelineBuilder<I, O>
    where
        I: Send + 'static,
        O: Send + 'static,
    {
        PipelineBuilder::new()
            .name(name)
            .options(self.config.pipeline)
    }

    /// Returns the configured pipeline options.
    pub fn pipeline_options(&self) -> PipelineOptions {
        self.config.pipeline
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &SpindleConfig {
        &self.config
    }

    /// Returns the telemetry handles.
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SpindleError;
    use spindle_config::{LoggingSection, MetricsSection, TelemetrySection};

    fn quiet() -> SpindleConfig {
        SpindleConfig::builder()
            .telemetry(TelemetrySection {
                logging: LoggingSection {
                    enabled: false,
                    ..Default::default()
                },
                metrics: MetricsSection {
                    enabled: false,
                    ..Default::default()
                },
                ..Default::default()
            })
            .build()
    }

    #[test]
    fn test_init_quiet() {
        let spindle = Spindle::init(quiet()).unwrap();
        assert!(spindle.telemetry().metrics().is_none());
        assert_eq!(spindle.pipeline_options(), PipelineOptions::default());
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let mut config = quiet();
        config.telemetry.service_name = String::new();

        let err = Spindle::init(config).unwrap_err();
        assert!(matches!(err, SpindleError::Config(_)));
    }

    #[test]
    fn test_pipeline_builder_uses_config_options() {
        let mut config = quiet();
        config.pipeline = PipelineOptions::default().sealed(true);
        let spindle = Spindle::init(config).unwrap();

        let pipeline = spindle.pipeline::<u8, u8>("orders").build();
        assert_eq!(pipeline.name(), "orders");
        assert!(pipeline.options().seal_after_run);
    }
}
