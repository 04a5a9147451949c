//! stagecraft-lib: Core types and logic for stagecraft
//!
//! A build-and-package orchestrator: derives canonical output directories,
//! stages them to a known-clean state, delegates compilation to an opaque
//! external backend, and packages the results into timestamped zip archives.
//!
//! - [`resolve`]: output directory and archive naming
//! - [`staging`]: clean-state preparation of output directories
//! - [`backend`]: the opaque build contract and a process-spawning adapter
//! - [`invoke`]: settings profiles and backend invocation
//! - [`archive`]: zip packaging with per-unit or combined modes
//! - [`pipeline`]: the orchestrator tying the phases together

pub mod archive;
pub mod backend;
pub mod invoke;
pub mod pipeline;
pub mod resolve;
pub mod staging;
mod types;

pub use types::*;
