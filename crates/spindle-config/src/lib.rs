//! Typed configuration for Spindle.
//!
//! This crate provides a strongly-typed configuration system with support for:
//! - TOML and JSON configuration files
//! - `.env` files and environment variable overrides
//! - Strict parsing (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! [`SpindleConfig`] has two sections:
//!
//! - `pipeline` - [`PipelineOptions`](spindle_middleware::PipelineOptions)
//!   applied to pipelines built by the application
//! - `telemetry` - [`TelemetrySection`] with logging and metrics settings
//!
//! # Example
//!
//! ```no_run
//! use spindle_config::ConfigLoader;
//!
//! # fn main() -> Result<(), spindle_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("spindle.toml")?
//!     .with_env_prefix("SPINDLE")
//!     .load()?;
//!
//! println!("sealed pipelines: {}", config.pipeline.seal_after_run);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [pipeline]
//! seal_after_run = true
//! fresh_context_per_run = false
//!
//! [telemetry]
//! service_name = "orders"
//!
//! [telemetry.logging]
//! enabled = true
//! level = "info,spindle_middleware=debug"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! histogram_buckets = [0.001, 0.01, 0.1, 1.0]
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with variables named `PREFIX__SECTION__KEY`:
//!
//! - `SPINDLE__PIPELINE__FRESH_CONTEXT_PER_RUN=true`
//! - `SPINDLE__TELEMETRY__SERVICE_NAME=orders`
//! - `SPINDLE__TELEMETRY__METRICS__HISTOGRAM_BUCKETS=0.01,0.1,1`

#![doc(html_root_url = "https://docs.rs/spindle-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_toml_document() {
        let toml = r#"
            [pipeline]
            seal_after_run = true
            fresh_context_per_run = true

            [telemetry]
            service_name = "orders"

            [telemetry.logging]
            enabled = false
            level = "trace"
            format = "pretty"
            include_location = true
            span_events = true

            [telemetry.metrics]
            enabled = true
            histogram_buckets = [0.001, 0.01]
        "#;

        let config = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load()
            .unwrap();

        assert!(config.pipeline.seal_after_run);
        assert!(config.pipeline.fresh_context_per_run);
        assert_eq!(config.telemetry.service_name, "orders");
        assert!(!config.telemetry.logging.enabled);
        assert!(config.telemetry.logging.span_events);
        assert_eq!(config.telemetry.metrics.histogram_buckets, vec![0.001, 0.01]);

        let telemetry = config.telemetry.to_telemetry_config();
        assert!(!telemetry.logging.enabled);
        assert_eq!(telemetry.metrics.service_name, "orders");
    }
}
