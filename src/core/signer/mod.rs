//! # Signer Module
//!
//! The concrete stages that turn a batch of items into one digest.
//!
//! ## Flow
//! 1. **Dual hash** - `fast(x) + "~" + fast(slow(x))`, slow calls serialized
//! 2. **Fan-out** - six indexed fast hashes, concatenated by index
//! 3. **Aggregate** - sort every result and join with `_`
//!
//! The digest depends only on the item multiset, never on scheduling.

mod aggregator;
mod dual_hash;
mod fan_out;
mod types;

pub use aggregator::Aggregator;
pub use dual_hash::DualHashStage;
pub use fan_out::{FanOutStage, FAN_OUT_WIDTH};
pub use types::{DualHashResult, FanOutResult, FinalDigest, Item};

use crate::core::hasher::Hashers;
use crate::core::pipeline::Chain;
use std::sync::Arc;

/// The dual-hash then fan-out chain, signing with `hashers`
pub fn signer_chain(hashers: &Hashers) -> Chain<Item, FanOutResult> {
    Chain::new()
        .then(DualHashStage::new(hashers.clone()))
        .then(FanOutStage::new(Arc::clone(&hashers.fast)))
}
