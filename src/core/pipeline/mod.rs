//! # Pipeline Module
//!
//! Wires stages into a chain of bounded queues and drives a run.
//!
//! ## Queue lifecycle
//! - The caller (or the [`Pipeline`]'s input feeder) owns and closes the
//!   first queue
//! - Every stage owns, and is the only one to close, its output queue
//! - The last queue is drained by a sink (the aggregator) on the caller's
//!   thread
//!
//! ## Threads
//! One named thread per stage, one scoped thread per in-flight item, plus
//! the per-item sub-tasks each stage spawns.

mod cancel;
mod chain;
mod executor;

pub use cancel::CancellationToken;
pub use chain::{run_chain, Chain, ChainRun};
pub use executor::{Pipeline, PipelineBuilder, PipelineConfig, PipelineResult};
