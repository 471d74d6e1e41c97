//! # Spindle Test
//!
//! Test utilities for Spindle pipelines.
//!
//! ## Key Features
//!
//! - **Event Log**: a shared, cloneable [`EventLog`] for asserting dispatch order
//! - **Canned Middleware**: [`recording`], [`terminal`], [`failing`] and
//!   [`CallsNextTwice`], generic over any pipeline input/output
//! - **Onion Traces**: [`onion`] builds the expected enter/exit sequence
//!
//! ## Example
//!
//! ```ignore
//! use spindle_middleware::Pipeline;
//! use spindle_test::{recording, EventLog};
//!
//! #[tokio::test]
//! async fn test_order() {
//!     let log = EventLog::new();
//!     let pipeline: Pipeline<(), ()> = Pipeline::builder()
//!         .add(recording("A", &log))
//!         .add(recording("B", &log))
//!         .default_output(())
//!         .build();
//!
//!     pipeline.run(()).await.unwrap();
//!     log.assert_onion(&["A", "B"]);
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/spindle-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod events;
mod middleware;

pub use error::TestError;
pub use events::{onion, EventLog};
pub use middleware::{failing, recording, terminal, CallsNextTwice, Failing, Recording, Terminal};
