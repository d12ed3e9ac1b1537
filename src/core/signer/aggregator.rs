//! The aggregator: collects every per-item signature into one digest.

use super::types::{FanOutResult, FinalDigest};
use crate::core::queue::{Packet, QueueReceiver};
use crate::error::{ItemFailure, PipelineError};
use crate::events::{Event, EventSender, ItemEvent};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Sorts and joins every [`FanOutResult`] of a run.
pub struct Aggregator {
    max_items: Option<usize>,
    events: EventSender,
}

impl Aggregator {
    /// `max_items` bounds how many results are held in memory
    pub fn new(max_items: Option<usize>, events: EventSender) -> Self {
        Self { max_items, events }
    }

    /// Drain `input` until it is closed, then emit the digest.
    ///
    /// The queue is always drained to the end, even after an overflow or a
    /// failure, so upstream stages can finish. Any failed item fails the
    /// whole digest, and item failures are reported ahead of an overflow.
    pub fn collect(
        &self,
        input: QueueReceiver<Packet<FanOutResult>>,
    ) -> Result<FinalDigest, PipelineError> {
        let mut results: Vec<String> = Vec::new();
        let mut failures: Vec<ItemFailure> = Vec::new();
        let mut overflow = None;

        for packet in input.iter() {
            match packet {
                Ok(result) => {
                    if let Some(limit) = self.max_items.filter(|&limit| results.len() >= limit) {
                        overflow = Some(limit);
                        continue;
                    }
                    results.push(result.into_inner());
                    self.events.send(Event::Item(ItemEvent::Collected {
                        collected: results.len(),
                    }));
                }
                Err(failure) => failures.push(failure),
            }
        }

        if let Some(limit) = overflow {
            warn!(limit, failed = failures.len(), "aggregator overflowed");
        }
        if !failures.is_empty() {
            return Err(PipelineError::ItemsFailed { failures });
        }
        if let Some(limit) = overflow {
            return Err(PipelineError::TooManyItems { limit });
        }

        results.par_sort_unstable();
        debug!(results = results.len(), "aggregated");
        Ok(FinalDigest::new(results.join("_")))
    }
}
