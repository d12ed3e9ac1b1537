//! Typed stage chains and the generic run loop.

use crate::core::queue::{self, Packet, QueueReceiver};
use crate::core::stage::{run_stage, Stage, StageContext, StageReport};
use crate::error::PipelineError;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

type Connect<In, Out> = dyn Fn(QueueReceiver<Packet<In>>, &mut Launcher) -> Result<QueueReceiver<Packet<Out>>, PipelineError>
    + Send
    + Sync;

/// An ordered list of stages taking `In` values to `Out` values.
///
/// Each [`Chain::then`] checks at compile time that the new stage consumes
/// what the previous one produces. A chain is a description only; nothing
/// runs until [`run_chain`], and it can be run any number of times.
pub struct Chain<In, Out> {
    connect: Box<Connect<In, Out>>,
    stages: Vec<&'static str>,
}

impl<T: Send + 'static> Chain<T, T> {
    /// The empty chain: output is the input queue itself
    pub fn new() -> Self {
        Self {
            connect: Box::new(|input, _| Ok(input)),
            stages: Vec::new(),
        }
    }
}

impl<T: Send + 'static> Default for Chain<T, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In: Send + 'static, Out: Send + 'static> Chain<In, Out> {
    /// Append `stage`, fed by this chain's output
    pub fn then<S>(self, stage: S) -> Chain<In, S::Output>
    where
        S: Stage<Input = Out>,
    {
        let stage = Arc::new(stage);
        let mut stages = self.stages;
        stages.push(stage.name());
        let upstream = self.connect;

        Chain {
            connect: Box::new(move |input, launcher| {
                let fed = upstream(input, launcher)?;
                launcher.launch(Arc::clone(&stage), fed)
            }),
            stages,
        }
    }

    /// Stage names in order
    pub fn stage_names(&self) -> &[&'static str] {
        &self.stages
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Starts stage threads and remembers them for joining.
struct Launcher {
    capacity: usize,
    ctx: StageContext,
    running: Vec<(&'static str, JoinHandle<Result<StageReport, PipelineError>>)>,
}

impl Launcher {
    fn new(capacity: usize, ctx: StageContext) -> Self {
        Self {
            capacity,
            ctx,
            running: Vec::new(),
        }
    }

    fn launch<S: Stage>(
        &mut self,
        stage: Arc<S>,
        input: QueueReceiver<Packet<S::Input>>,
    ) -> Result<QueueReceiver<Packet<S::Output>>, PipelineError> {
        let name = stage.name();
        let (output, next) = queue::bounded(self.capacity)?;
        let ctx = self.ctx.clone();

        let handle = thread::Builder::new()
            .name(format!("stage-{name}"))
            .spawn(move || run_stage(stage.as_ref(), input, output, &ctx))
            .map_err(|source| PipelineError::SpawnFailed {
                stage: name.to_string(),
                source,
            })?;

        debug!(stage = name, capacity = self.capacity, "stage started");
        self.running.push((name, handle));
        Ok(next)
    }

    /// Wait for every stage; the first failure wins.
    fn join(self) -> Result<Vec<StageReport>, PipelineError> {
        let mut reports = Vec::with_capacity(self.running.len());
        let mut first_error = None;

        for (name, handle) in self.running {
            let outcome = handle.join().unwrap_or_else(|_| {
                error!(stage = name, "stage thread panicked");
                Err(PipelineError::StagePanicked {
                    stage: name.to_string(),
                })
            });
            match outcome {
                Ok(report) => reports.push(report),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }
}

/// Output of [`run_chain`]
#[derive(Debug)]
pub struct ChainRun<R> {
    /// What the sink produced
    pub output: R,
    /// One report per stage, in chain order
    pub stages: Vec<StageReport>,
}

/// Run `chain` over `input` and hand its last queue to `sink`.
///
/// Each stage gets a fresh output queue of `capacity` and its own thread.
/// `input` is consumed but never closed here; whoever holds its sender
/// closes it. Returns once the sink is done and every stage has closed.
pub fn run_chain<In, Out, R, F>(
    chain: &Chain<In, Out>,
    input: QueueReceiver<Packet<In>>,
    capacity: usize,
    ctx: &StageContext,
    sink: F,
) -> Result<ChainRun<R>, PipelineError>
where
    In: Send + 'static,
    Out: Send + 'static,
    F: FnOnce(QueueReceiver<Packet<Out>>) -> Result<R, PipelineError>,
{
    if capacity == 0 {
        return Err(PipelineError::InvalidCapacity { capacity });
    }

    let mut launcher = Launcher::new(capacity, ctx.clone());
    let sunk = (chain.connect)(input, &mut launcher).and_then(sink);
    let stages = launcher.join()?;

    if ctx.token.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    Ok(ChainRun {
        output: sunk?,
        stages,
    })
}
