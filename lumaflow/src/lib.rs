//! # Lumaflow runtime
//!
//! The runtime substrate behind the lumaflow image-processing boundary.
//! Decoders, encoders, and the operation graph are external collaborators;
//! this crate provides the safety-critical plumbing between them and
//! foreign callers:
//!
//! - **Context ownership**: one root object owns all error state, tracked
//!   memory, IO streams, jobs, and responses, with deterministic teardown
//!   ordering
//! - **Exactly-once error reporting**: a single-slot error record with a
//!   bounded diagnostic call stack; a second raise is refused until the
//!   first error is explicitly cleared
//! - **IO abstraction**: files, copied caller buffers, and growable output
//!   sinks behind one `Read`/`Write`/`Seek` surface
//! - **JSON command dispatch**: engine operations invoked by method name
//!   instead of a widening binary ABI
//!
//! ## Quick Start
//!
//! ```rust
//! use lumaflow::prelude::*;
//!
//! let mut ctx = Context::new();
//! let output = ctx.create_io_for_output_buffer();
//! let job = ctx.create_job();
//! ctx.job_add_io(job, output, 0, Direction::Out)?;
//!
//! let response = ctx.send_json(Target::Job(job), "v1/execute", b"{}")?;
//! let status = ctx.response(response).map(JsonResponse::status);
//! assert_eq!(status, Some(200));
//!
//! ctx.destroy_job(job)?;
//! assert!(ctx.begin_terminate());
//! # Ok::<(), lumaflow::errors::FlowError>(())
//! ```
//!
//! A context is **not** thread-safe: the caller serializes all operations
//! against it, including across the jobs and streams it owns.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod context;
#[cfg(test)]
mod context_tests;
pub mod engine;
pub mod errors;
pub mod io;
pub mod job;
pub mod json;
pub mod memory;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::{Context, IoId, JobId, ResponseId, Target};
    pub use crate::engine::{EngineBackend, ExecutionScope, NullEngine};
    pub use crate::errors::{
        CallFrame, ErrorCode, ErrorState, FlowError, MAX_CALLSTACK_FRAMES,
    };
    pub use crate::io::{CleanupWith, Direction, IoMode, IoObject, Lifetime};
    pub use crate::job::{IoBinding, Job};
    pub use crate::json::JsonResponse;
    pub use crate::memory::{AllocationSite, MemoryLedger};
}
