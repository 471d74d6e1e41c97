//! Metric and log field names shared by the engine and the telemetry layer.

/// Total pipeline runs, labelled by `pipeline` and `outcome`.
pub const PIPELINE_RUNS_TOTAL: &str = "spindle_pipeline_runs_total";

/// Pipeline run duration in seconds, labelled by `pipeline`.
pub const PIPELINE_RUN_DURATION_SECONDS: &str = "spindle_pipeline_run_duration_seconds";

/// Middleware invocations, labelled by `pipeline`.
pub const MIDDLEWARE_DISPATCH_TOTAL: &str = "spindle_middleware_dispatch_total";

/// Standard structured log field names.
pub mod fields {
    /// Pipeline name.
    pub const PIPELINE: &str = "pipeline";

    /// Middleware name.
    pub const MIDDLEWARE: &str = "middleware";

    /// Dispatch index.
    pub const INDEX: &str = "index";

    /// Run outcome (`ok` or an error kind).
    pub const OUTCOME: &str = "outcome";
}
