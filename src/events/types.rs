//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};

/// All events emitted by the signing pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Stage lifecycle events
    Stage(StageEvent),
    /// Per-item events
    Item(ItemEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Lifecycle of a single stage.
///
/// A stage always moves `Running -> Draining -> Closed`; it never reaches
/// `Closed` while item work is still outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageState {
    /// Consuming input and launching item work
    Running,
    /// Input closed, waiting for in-flight item work
    Draining,
    /// Output queue closed, stage finished
    Closed,
}

impl std::fmt::Display for StageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageState::Running => write!(f, "Running"),
            StageState::Draining => write!(f, "Draining"),
            StageState::Closed => write!(f, "Closed"),
        }
    }
}

/// Events emitted by the stage runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageEvent {
    /// Stage moved to a new lifecycle state
    StateChanged { stage: String, state: StageState },
    /// Stage closed its output
    Completed(StageProgress),
}

/// Counters reported by a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageProgress {
    /// Stage name
    pub stage: String,
    /// Items that produced an output
    pub processed: usize,
    /// Items that failed in this or an earlier stage
    pub failed: usize,
    /// Items discarded after cancellation
    pub skipped: usize,
}

/// Events for individual items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ItemEvent {
    /// An item finished a stage
    Processed { stage: String, completed: usize },
    /// An item failed in a stage; the failure is forwarded downstream
    Failed {
        stage: String,
        input: String,
        message: String,
    },
    /// The aggregator received a per-item result
    Collected { collected: usize },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started { total_items: Option<usize> },
    /// Pipeline completed successfully
    Completed { summary: PipelineSummary },
    /// Pipeline was cancelled
    Cancelled,
    /// Pipeline encountered a fatal error
    Error { message: String },
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Items signed
    pub total_items: usize,
    /// Length of the final digest in bytes
    pub digest_len: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Stage(StageEvent::Completed(StageProgress {
            stage: "fan-out".to_string(),
            processed: 7,
            failed: 1,
            skipped: 0,
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Stage(StageEvent::Completed(p)) => {
                assert_eq!(p.processed, 7);
                assert_eq!(p.failed, 1);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn stage_state_display() {
        assert_eq!(StageState::Draining.to_string(), "Draining");
    }
}
