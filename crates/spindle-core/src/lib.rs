//! # Spindle Core
//!
//! Core types for the Spindle pipeline engine.
//!
//! This crate provides the building blocks every pipeline run is made of:
//!
//! - [`Cell`] - A typed storage slot identified by an opaque [`CellId`]
//! - [`Context`] - The per-run store mapping cell identities to values
//! - [`hook::HookRegistry`] - Scoped, ambient hook tables
//! - [`PipelineError`] - Standard error type for pipeline runs

#![doc(html_root_url = "https://docs.rs/spindle-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cell;
mod context;
mod error;
pub mod hook;
pub mod names;

pub use cell::{BoundCell, Cell, CellId};
pub use context::{Context, ContextBuilder};
pub use error::{HookError, PipelineError, PipelineResult};
pub use hook::{HookRegistry, Scoped};
