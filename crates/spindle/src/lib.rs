//! # Spindle
//!
//! **Onion-style async middleware pipelines with typed context cells**
//!
//! Spindle runs an ordered list of middleware around a terminal handler. Each
//! middleware receives the input and a `next` continuation, and may act before
//! and after the rest of the chain runs, replace the input, or short-circuit.
//! A run carries a [`Context`](core::Context): a map of typed
//! [`Cell`](core::Cell)s that middleware reach either explicitly through
//! `Next::context` or ambiently through hooks such as
//! [`use_cell`](middleware::use_cell).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spindle::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SpindleError> {
//!     let spindle = Spindle::init(SpindleConfig::development())?;
//!     let user = Cell::named("user", None::<String>);
//!
//!     let auth_user = user.clone();
//!     let pipeline = spindle
//!         .pipeline::<Request, Response>("http")
//!         .add(from_fn("auth", move |req: Request, next: Next<Request, Response>| {
//!             let user = auth_user.clone();
//!             async move {
//!                 use_cell(&user)?.set(req.user());
//!                 next.run(req).await
//!             }
//!         }))
//!         .on_last(|req| async move { Ok(Response::ok(req)) })
//!         .build();
//!
//!     let response = pipeline.run(Request::get("/")).await?;
//!     println!("{:?} as {:?}", response, pipeline.context().read(&user));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! run(input) → A → B → C → on_last
//!                              ↓
//!   output  ← A ← B ← C ←──────┘
//! ```
//!
//! - [`core`]: cells, contexts, errors, and the hook registry
//! - [`middleware`]: the `Middleware` trait, `Pipeline`, and context hooks
//! - [`telemetry`]: structured logging and Prometheus metrics
//! - [`config`]: layered TOML/JSON/env configuration

#![doc(html_root_url = "https://docs.rs/spindle/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bootstrap;
mod error;

pub use bootstrap::Spindle;
pub use error::{SpindleError, SpindleResult};

// Re-export core types
pub use spindle_core as core;

// Re-export middleware and pipeline types
pub use spindle_middleware as middleware;

// Re-export telemetry
pub use spindle_telemetry as telemetry;

// Re-export configuration
pub use spindle_config as config;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use spindle::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Spindle, SpindleError, SpindleResult};

    pub use spindle_core::{Cell, Context, HookError, PipelineError, PipelineResult};

    // Middleware and pipeline
    pub use spindle_middleware::{
        from_fn, handler, BoxFuture, Middleware, Next, Pipeline, PipelineBuilder,
        PipelineOptions, RunOptions, Runner,
    };

    // Hooks
    pub use spindle_middleware::{
        scope_context, use_cell, use_cell_value, use_context, use_pipeline, with_context,
        CellRef,
    };

    // Configuration
    pub use spindle_config::{ConfigLoader, SpindleConfig};
}
