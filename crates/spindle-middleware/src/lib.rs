//! # Spindle Middleware
//!
//! Onion-style middleware pipeline for the Spindle engine.
//!
//! A [`Pipeline`] runs its middleware in insertion order. Each middleware
//! receives the input and a [`Next`] continuation; code before `next.run(..)`
//! runs on the way in, code after it runs on the way out:
//!
//! ```text
//! run(input) → A → B → C → on_last
//!                              ↓
//! output     ← A ← B ← C ←─────┘
//! ```
//!
//! ## Key Features
//!
//! - **Ordered**: middleware runs in the order it was added
//! - **Short-circuit**: returning without calling `next` skips the rest
//! - **Single continuation**: calling `next` twice is an error
//! - **Ambient context**: [`use_context`], [`use_cell`], [`use_cell_value`]
//!   and [`use_pipeline`] resolve the running pipeline's [`Context`] from
//!   anywhere inside a middleware
//! - **Async**: every stage is a `Send` future, safe to run on a
//!   multi-threaded Tokio runtime
//!
//! ## Example
//!
//! ```
//! use spindle_core::{Cell, PipelineError};
//! use spindle_middleware::{from_fn, use_cell, Next, Pipeline};
//!
//! # tokio_test::block_on(async {
//! let hits = Cell::named("hits", 0_u32);
//! let counted = hits.clone();
//!
//! let mut pipeline = Pipeline::builder().default_output(0_u32).build();
//! pipeline.add(from_fn("count", move |input: u32, next: Next<u32, u32>| {
//!     let hits = counted.clone();
//!     async move {
//!         use_cell(&hits)?.update(|n| n + 1);
//!         next.run(input).await
//!     }
//! }))?;
//!
//! pipeline.run(1).await?;
//! assert_eq!(pipeline.context().read(&hits), 1);
//! # Ok::<(), PipelineError>(())
//! # }).unwrap();
//! ```
//!
//! [`Context`]: spindle_core::Context

#![doc(html_root_url = "https://docs.rs/spindle-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod counter;
pub mod hooks;
pub mod middleware;
pub mod pipeline;

// Re-export main types at crate root
pub use counter::Counter;
pub use hooks::{
    context_hooks, scope_context, use_cell, use_cell_value, use_context, use_pipeline,
    with_context, CellRef, ContextHooks,
};
pub use middleware::{from_fn, handler, BoxFuture, FnMiddleware, Handler, Middleware, Next};
pub use pipeline::{
    BoxedMiddleware, OnLast, Pipeline, PipelineBuilder, PipelineOptions, RunOptions, Runner,
};
