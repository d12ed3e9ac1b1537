//! Pipeline execution implementation.

use super::cancel::CancellationToken;
use super::chain::{run_chain, Chain};
use crate::core::hasher::{ExclusiveStats, HasherConfig, Hashers};
use crate::core::queue;
use crate::core::signer::{signer_chain, Aggregator, FanOutResult, FinalDigest, Item};
use crate::core::source::{self, ItemSource};
use crate::core::stage::{StageContext, StageReport};
use crate::error::{PipelineError, SignerError};
use crate::events::{null_sender, Event, EventSender, PipelineEvent, PipelineSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of pipeline execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Unique id of this run
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// The final digest
    pub digest: FinalDigest,
    /// Items fed into the pipeline
    pub total_items: usize,
    /// One report per stage, in chain order
    pub stages: Vec<StageReport>,
    /// Slow-hash call statistics, cumulative for this pipeline instance
    pub slow_hash: ExclusiveStats,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Configuration for the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Capacity of every queue in the chain
    pub capacity: usize,
    /// Items a single stage works on at once
    pub max_in_flight: usize,
    /// Upper bound on results the aggregator will hold
    pub max_items: Option<usize>,
    /// Hash primitives
    pub hasher: HasherConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            max_in_flight: 64,
            max_items: None,
            hasher: HasherConfig::default(),
        }
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    hashers: Option<Hashers>,
    token: Option<CancellationToken>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            hashers: None,
            token: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the capacity of every queue
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Set how many items each stage may work on at once
    pub fn max_in_flight(mut self, limit: usize) -> Self {
        self.config.max_in_flight = limit;
        self
    }

    /// Bound the number of results held by the aggregator
    pub fn max_items(mut self, limit: usize) -> Self {
        self.config.max_items = Some(limit);
        self
    }

    /// Set the hash primitive configuration
    pub fn hasher(mut self, config: HasherConfig) -> Self {
        self.config.hasher = config;
        self
    }

    /// Use already constructed primitives instead of `hasher`
    pub fn hashers(mut self, hashers: Hashers) -> Self {
        self.hashers = Some(hashers);
        self
    }

    /// Share a cancellation token with the caller
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        if self.config.capacity == 0 {
            return Err(PipelineError::InvalidCapacity {
                capacity: self.config.capacity,
            });
        }
        if self.config.max_in_flight == 0 {
            return Err(PipelineError::InvalidInFlightLimit {
                limit: self.config.max_in_flight,
            });
        }

        let hashers = self
            .hashers
            .unwrap_or_else(|| self.config.hasher.build());

        Ok(Pipeline {
            chain: signer_chain(&hashers),
            hashers,
            config: self.config,
            token: self.token.unwrap_or_default(),
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The signing pipeline.
///
/// Owns its primitives, including the exclusive slow-hash token, so
/// separate instances never contend with each other.
pub struct Pipeline {
    config: PipelineConfig,
    hashers: Hashers,
    chain: Chain<Item, FanOutResult>,
    token: CancellationToken,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The configuration this pipeline was built with
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The primitives this pipeline signs with
    pub fn hashers(&self) -> &Hashers {
        &self.hashers
    }

    /// A handle that cancels runs of this pipeline
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run the pipeline without events
    pub fn run<I>(&self, items: I) -> Result<PipelineResult, SignerError>
    where
        I: IntoIterator<Item = Item>,
    {
        self.run_with_events(items, &null_sender())
    }

    /// Read items from `source`, then run
    pub fn run_source(
        &self,
        source: &ItemSource,
        events: &EventSender,
    ) -> Result<PipelineResult, SignerError> {
        let items = source.items()?;
        self.run_with_events(items, events)
    }

    /// Run the pipeline with event reporting
    pub fn run_with_events<I>(
        &self,
        items: I,
        events: &EventSender,
    ) -> Result<PipelineResult, SignerError>
    where
        I: IntoIterator<Item = Item>,
    {
        let start_time = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let items: Vec<Item> = items.into_iter().collect();
        let total_items = items.len();

        info!(
            %run_id,
            items = total_items,
            capacity = self.config.capacity,
            max_in_flight = self.config.max_in_flight,
            "pipeline started"
        );
        events.send(Event::Pipeline(PipelineEvent::Started {
            total_items: Some(total_items),
        }));

        let (input, first) = queue::bounded(self.config.capacity)?;
        let ctx = StageContext {
            token: self.token.clone(),
            events: events.clone(),
            max_in_flight: self.config.max_in_flight,
        };
        let aggregator = Aggregator::new(self.config.max_items, events.clone());

        let outcome = thread::scope(|scope| {
            scope.spawn(|| source::feed(items, input, &self.token));
            run_chain(&self.chain, first, self.config.capacity, &ctx, |last| {
                aggregator.collect(last)
            })
        });

        let run = match outcome {
            Ok(run) => run,
            Err(PipelineError::Cancelled) => {
                warn!(%run_id, "pipeline cancelled");
                events.send(Event::Pipeline(PipelineEvent::Cancelled));
                return Err(PipelineError::Cancelled.into());
            }
            Err(e) => {
                warn!(%run_id, error = %e, "pipeline failed");
                events.send(Event::Pipeline(PipelineEvent::Error {
                    message: e.to_string(),
                }));
                return Err(e.into());
            }
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let digest = run.output;

        info!(%run_id, items = total_items, duration_ms, "pipeline completed");
        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: PipelineSummary {
                total_items,
                digest_len: digest.as_str().len(),
                duration_ms,
            },
        }));

        Ok(PipelineResult {
            run_id,
            started_at,
            digest,
            total_items,
            stages: run.stages,
            slow_hash: self.hashers.slow.stats(),
            duration_ms,
        })
    }
}
