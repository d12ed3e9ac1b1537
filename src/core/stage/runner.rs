//! The generic stage runner.

use super::{Stage, StageReport};
use crate::core::pipeline::CancellationToken;
use crate::core::queue::{Packet, QueueReceiver, QueueSender, WorkLimiter};
use crate::error::{HashError, ItemFailure, PipelineError};
use crate::events::{Event, EventSender, ItemEvent, StageEvent, StageProgress, StageState};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tracing::{debug, warn};

/// Shared knobs every stage of a run receives
#[derive(Clone)]
pub struct StageContext {
    /// Cancels the whole run
    pub token: CancellationToken,
    /// Progress events
    pub events: EventSender,
    /// Maximum items a stage works on at once
    pub max_in_flight: usize,
}

#[derive(Default)]
struct Counters {
    processed: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

/// Drive `stage` from `input` to `output`.
///
/// Every input value gets its own worker thread (bounded by
/// `max_in_flight`). The output queue is dropped, and so closed, only after
/// the input is exhausted and every worker has returned. The input queue
/// is never closed here; that belongs to the upstream producer.
pub fn run_stage<S: Stage>(
    stage: &S,
    input: QueueReceiver<Packet<S::Input>>,
    output: QueueSender<Packet<S::Output>>,
    ctx: &StageContext,
) -> Result<StageReport, PipelineError> {
    let name = stage.name();
    let limiter = WorkLimiter::new(ctx.max_in_flight)?;
    let counters = Counters::default();

    announce(ctx, name, StageState::Running);

    let launched = thread::scope(|scope| -> Result<(), PipelineError> {
        for packet in input.iter() {
            if ctx.token.is_cancelled() {
                counters.skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            let value = match packet {
                Ok(value) => value,
                Err(failure) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    forward(&output, Err(failure), name);
                    continue;
                }
            };

            let permit = limiter.acquire();
            let output = output.clone();
            let counters = &counters;
            thread::Builder::new()
                .name(format!("{name}-item"))
                .spawn_scoped(scope, move || {
                    let _permit = permit;
                    if ctx.token.is_cancelled() {
                        counters.skipped.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                    if let Some(packet) = work_item(stage, &value, counters, ctx) {
                        forward(&output, packet, name);
                    }
                })
                .map_err(|source| PipelineError::SpawnFailed {
                    stage: name.to_string(),
                    source,
                })?;
        }

        debug!(stage = name, in_flight = limiter.in_flight(), "input drained");
        announce(ctx, name, StageState::Draining);
        Ok(())
    });

    drop(output);
    announce(ctx, name, StageState::Closed);
    launched?;

    let report = StageReport {
        stage: name.to_string(),
        processed: counters.processed.load(Ordering::Relaxed),
        failed: counters.failed.load(Ordering::Relaxed),
        skipped: counters.skipped.load(Ordering::Relaxed),
        state: StageState::Closed,
    };

    debug!(
        stage = name,
        processed = report.processed,
        failed = report.failed,
        skipped = report.skipped,
        "stage closed"
    );
    ctx.events.send(Event::Stage(StageEvent::Completed(StageProgress {
        stage: report.stage.clone(),
        processed: report.processed,
        failed: report.failed,
        skipped: report.skipped,
    })));

    Ok(report)
}

/// Process one value. `None` means the work was abandoned on cancellation.
fn work_item<S: Stage>(
    stage: &S,
    value: &S::Input,
    counters: &Counters,
    ctx: &StageContext,
) -> Option<Packet<S::Output>> {
    let name = stage.name();
    let result = panic::catch_unwind(AssertUnwindSafe(|| stage.process(value, &ctx.token)))
        .unwrap_or_else(|_| {
            Err(HashError::Panicked {
                primitive: name,
                input: value.to_string(),
            })
        });

    match result {
        Ok(out) => {
            let completed = counters.processed.fetch_add(1, Ordering::Relaxed) + 1;
            ctx.events.send(Event::Item(ItemEvent::Processed {
                stage: name.to_string(),
                completed,
            }));
            Some(Ok(out))
        }
        Err(HashError::Cancelled { .. }) => {
            counters.skipped.fetch_add(1, Ordering::Relaxed);
            debug!(stage = name, input = %value, "item abandoned on cancellation");
            None
        }
        Err(error) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            let failure = ItemFailure {
                stage: name,
                input: value.to_string(),
                error,
            };
            warn!(stage = name, input = %failure.input, error = %failure.error, "item failed");
            ctx.events.send(Event::Item(ItemEvent::Failed {
                stage: name.to_string(),
                input: failure.input.clone(),
                message: failure.error.to_string(),
            }));
            Some(Err(failure))
        }
    }
}

fn forward<T>(output: &QueueSender<Packet<T>>, packet: Packet<T>, stage: &'static str) {
    if !output.send(packet) {
        warn!(stage, "downstream queue is gone; result dropped");
    }
}

fn announce(ctx: &StageContext, stage: &'static str, state: StageState) {
    debug!(stage, %state, "stage state");
    ctx.events.send(Event::Stage(StageEvent::StateChanged {
        stage: stage.to_string(),
        state,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::queue;
    use crate::core::stage::FnStage;
    use crate::events::{null_sender, EventChannel};
    use std::time::Duration;

    fn context(max_in_flight: usize) -> StageContext {
        StageContext {
            token: CancellationToken::new(),
            events: null_sender(),
            max_in_flight,
        }
    }

    fn feed<T: Send + 'static>(values: Vec<Packet<T>>, capacity: usize) -> QueueReceiver<Packet<T>> {
        let (sender, receiver) = queue::bounded(capacity).unwrap();
        thread::spawn(move || {
            for value in values {
                sender.send(value);
            }
        });
        receiver
    }

    #[test]
    fn every_input_produces_one_output() {
        let stage = FnStage::new("square", |n: &i64| Ok(n * n));
        let input = feed((1..=20).map(Ok).collect(), 4);
        let (output, results) = queue::bounded(4).unwrap();

        let collector = thread::spawn(move || {
            let mut values: Vec<i64> = results.iter().map(|p: Packet<i64>| p.unwrap()).collect();
            values.sort();
            values
        });

        let report = run_stage(&stage, input, output, &context(8)).unwrap();
        let values = collector.join().unwrap();

        assert_eq!(values, (1..=20).map(|n| n * n).collect::<Vec<_>>());
        assert_eq!(report.processed, 20);
        assert_eq!(report.failed, 0);
        assert_eq!(report.state, StageState::Closed);
    }

    #[test]
    fn output_closes_only_after_slow_items_finish() {
        let stage = FnStage::new("slow", |n: &i64| {
            thread::sleep(Duration::from_millis(20 * (*n as u64)));
            Ok(*n)
        });
        let input = feed(vec![Ok(3), Ok(1), Ok(2)], 3);
        let (output, results) = queue::bounded(1).unwrap();

        let collector = thread::spawn(move || results.iter().count());
        run_stage(&stage, input, output, &context(8)).unwrap();

        assert_eq!(collector.join().unwrap(), 3);
    }

    #[test]
    fn failures_are_reported_and_forwarded() {
        let stage = FnStage::new("picky", |n: &i64| {
            if *n < 0 {
                Err(HashError::Failed {
                    primitive: "picky",
                    input: n.to_string(),
                    reason: "negative".to_string(),
                })
            } else {
                Ok(*n)
            }
        });
        let upstream = ItemFailure {
            stage: "earlier",
            input: "x".to_string(),
            error: HashError::Panicked {
                primitive: "earlier",
                input: "x".to_string(),
            },
        };
        let input = feed(vec![Ok(1), Ok(-1), Err(upstream.clone())], 4);
        let (output, results) = queue::bounded(4).unwrap();

        let report = run_stage(&stage, input, output, &context(4)).unwrap();
        let failures: Vec<ItemFailure> = results.iter().filter_map(Result::err).collect();

        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(failures.len(), 2);
        assert!(failures.contains(&upstream));
        assert!(failures.iter().any(|f| f.stage == "picky" && f.input == "-1"));
    }

    #[test]
    fn panicking_item_becomes_a_failure() {
        let stage = FnStage::new("fragile", |n: &i64| {
            if *n == 2 {
                panic!("item two is cursed");
            }
            Ok(*n)
        });
        let input = feed(vec![Ok(1), Ok(2)], 2);
        let (output, results) = queue::bounded(2).unwrap();

        let report = run_stage(&stage, input, output, &context(2)).unwrap();
        let failures: Vec<ItemFailure> = results.iter().filter_map(Result::err).collect();

        assert_eq!(report.processed, 1);
        assert!(matches!(failures[0].error, HashError::Panicked { .. }));
    }

    #[test]
    fn cancelled_stage_skips_and_still_closes() {
        let stage = FnStage::new("never", |n: &i64| Ok(*n));
        let ctx = context(2);
        ctx.token.cancel();
        let input = feed((0..10).map(Ok).collect(), 2);
        let (output, results) = queue::bounded(2).unwrap();

        let report = run_stage(&stage, input, output, &ctx).unwrap();

        assert_eq!(report.skipped, 10);
        assert_eq!(results.iter().count(), 0);
    }

    #[test]
    fn abandoned_items_are_skipped_not_failed() {
        let stage = FnStage::new("abandon", |n: &i64| {
            if *n % 2 == 0 {
                Err(HashError::Cancelled {
                    primitive: "abandon",
                    input: n.to_string(),
                })
            } else {
                Ok(*n)
            }
        });
        let input = feed((0..6).map(Ok).collect(), 2);
        let (output, results) = queue::bounded(6).unwrap();

        let report = run_stage(&stage, input, output, &context(3)).unwrap();
        let mut values: Vec<i64> = results.iter().map(|p: Packet<i64>| p.unwrap()).collect();
        values.sort();

        assert_eq!(values, vec![1, 3, 5]);
        assert_eq!(report.processed, 3);
        assert_eq!(report.skipped, 3);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn lifecycle_events_are_ordered() {
        let (events, receiver) = EventChannel::new();
        let ctx = StageContext {
            events,
            ..context(2)
        };
        let stage = FnStage::new("id", |n: &i64| Ok(*n));
        let input = feed(vec![Ok(1)], 1);
        let (output, results) = queue::bounded(1).unwrap();

        let collector = thread::spawn(move || results.iter().count());
        run_stage(&stage, input, output, &ctx).unwrap();
        collector.join().unwrap();
        drop(ctx);

        let states: Vec<StageState> = receiver
            .iter()
            .filter_map(|event| match event {
                Event::Stage(StageEvent::StateChanged { state, .. }) => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![StageState::Running, StageState::Draining, StageState::Closed]
        );
    }
}
