//! # Core Module
//!
//! The signing engine, independent of any front end.
//!
//! ## Modules
//! - `hasher` - Hash primitives and the exclusive slow-hash token
//! - `queue` - Bounded queues and the in-flight limiter
//! - `stage` - The `Stage` trait and the generic stage runner
//! - `signer` - Dual-hash, fan-out, and aggregation
//! - `pipeline` - Chains stages together and drives a run
//! - `source` - Input items from lists, ranges, or files

pub mod hasher;
pub mod pipeline;
pub mod queue;
pub mod signer;
pub mod source;
pub mod stage;

// Re-export commonly used types
pub use hasher::{HashPrimitive, HashPrimitiveKind, HasherConfig, Hashers};
pub use pipeline::{CancellationToken, Chain, Pipeline, PipelineBuilder, PipelineResult};
pub use signer::{DualHashResult, FanOutResult, FinalDigest, Item};
pub use source::ItemSource;
pub use stage::{FnStage, Stage, StageReport};
