//! # Stage Module
//!
//! A stage turns every value from its input queue into one value on its
//! output queue. Per-item work runs concurrently; the runner only closes the
//! output once all of it has finished.
//!
//! ## Typed boundaries
//! Each stage declares its `Input` and `Output` types, so wiring a stage
//! after one that produces something else fails to compile instead of
//! failing at run time.

mod runner;

pub use runner::{run_stage, StageContext};

use crate::core::pipeline::CancellationToken;
use crate::error::HashError;
use crate::events::StageState;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::marker::PhantomData;

/// Per-item work of one pipeline phase
pub trait Stage: Send + Sync + 'static {
    /// Value consumed from the input queue
    type Input: Display + Send + 'static;
    /// Value produced on the output queue
    type Output: Send + 'static;

    /// Name used for the stage thread, logs, and failures
    fn name(&self) -> &'static str;

    /// Compute the output for one input.
    ///
    /// Sub-tasks should check `cancel` before each primitive call and give
    /// up with [`HashError::Cancelled`] once it fires.
    fn process(
        &self,
        input: &Self::Input,
        cancel: &CancellationToken,
    ) -> Result<Self::Output, HashError>;
}

/// A stage built from a closure. The closure never sees the token.
///
/// ```rust,ignore
/// let upper = FnStage::new("upper", |s: &String| Ok(s.to_uppercase()));
/// ```
pub struct FnStage<I, O, F> {
    name: &'static str,
    work: F,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O, F> FnStage<I, O, F>
where
    F: Fn(&I) -> Result<O, HashError>,
{
    /// Wrap `work` as a stage called `name`
    pub fn new(name: &'static str, work: F) -> Self {
        Self {
            name,
            work,
            _types: PhantomData,
        }
    }
}

impl<I, O, F> Stage for FnStage<I, O, F>
where
    I: Display + Send + 'static,
    O: Send + 'static,
    F: Fn(&I) -> Result<O, HashError> + Send + Sync + 'static,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> &'static str {
        self.name
    }

    fn process(&self, input: &I, _cancel: &CancellationToken) -> Result<O, HashError> {
        (self.work)(input)
    }
}

/// What a stage did during one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    /// Stage name
    pub stage: String,
    /// Items that produced an output
    pub processed: usize,
    /// Items that failed here, plus failures forwarded from upstream
    pub failed: usize,
    /// Items discarded after cancellation
    pub skipped: usize,
    /// Final lifecycle state
    pub state: StageState,
}
