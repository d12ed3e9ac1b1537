//! # Queue Module
//!
//! Bounded queues between stages, and the in-flight limiter stages use to
//! cap their own fan-out.
//!
//! ## Lifecycle
//! A queue closes when its last [`QueueSender`] is dropped. A stage keeps
//! its sender until every item worker (each holding a clone) has returned,
//! so a queue cannot be closed while its producer still has work pending.

use crate::error::{ItemFailure, PipelineError};
use crossbeam_channel::{Receiver, Sender};

/// What travels between stages: a value, or the failure that replaced it
pub type Packet<T> = Result<T, ItemFailure>;

/// Create a bounded queue. Producers block while it is full.
pub fn bounded<T>(capacity: usize) -> Result<(QueueSender<T>, QueueReceiver<T>), PipelineError> {
    if capacity == 0 {
        return Err(PipelineError::InvalidCapacity { capacity });
    }
    let (sender, receiver) = crossbeam_channel::bounded(capacity);
    Ok((QueueSender { inner: sender }, QueueReceiver { inner: receiver }))
}

/// Producing end of a bounded queue
pub struct QueueSender<T> {
    inner: Sender<T>,
}

impl<T> QueueSender<T> {
    /// Push a value, blocking while the queue is full.
    ///
    /// Returns `false` if the consumer is gone and the value was dropped.
    pub fn send(&self, value: T) -> bool {
        self.inner.send(value).is_ok()
    }
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Consuming end of a bounded queue
pub struct QueueReceiver<T> {
    inner: Receiver<T>,
}

impl<T> QueueReceiver<T> {
    /// Block until a value arrives, or `None` once the queue is closed and drained
    pub fn recv(&self) -> Option<T> {
        self.inner.recv().ok()
    }

    /// Iterate until the queue is closed and drained
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.inner.iter()
    }
}

/// Counting semaphore over a bounded permit channel.
///
/// A stage acquires a permit before launching item work and the worker
/// releases it on return, so at most `limit` items run at once.
pub struct WorkLimiter {
    acquire: Sender<()>,
    release: Receiver<()>,
}

impl WorkLimiter {
    /// Allow up to `limit` concurrent permits
    pub fn new(limit: usize) -> Result<Self, PipelineError> {
        if limit == 0 {
            return Err(PipelineError::InvalidInFlightLimit { limit });
        }
        let (acquire, release) = crossbeam_channel::bounded(limit);
        Ok(Self { acquire, release })
    }

    /// Block until a permit is free
    pub fn acquire(&self) -> Permit<'_> {
        // Both ends live in `self`, so the channel cannot disconnect here.
        let _ = self.acquire.send(());
        Permit {
            release: &self.release,
        }
    }

    /// Permits currently held
    pub fn in_flight(&self) -> usize {
        self.acquire.len()
    }
}

/// A held permit; released on drop
pub struct Permit<'a> {
    release: &'a Receiver<()>,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let _ = self.release.try_recv();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn zero_capacity_is_rejected() {
        let result = bounded::<u8>(0);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidCapacity { capacity: 0 })
        ));
    }

    #[test]
    fn queue_closes_when_last_sender_drops() {
        let (sender, receiver) = bounded(4).unwrap();
        let clone = sender.clone();

        assert!(sender.send(1));
        drop(sender);
        assert!(clone.send(2));
        drop(clone);

        let values: Vec<i32> = receiver.iter().collect();
        assert_eq!(values, vec![1, 2]);
        assert!(receiver.recv().is_none());
    }

    #[test]
    fn full_queue_blocks_the_producer() {
        let (sender, receiver) = bounded(1).unwrap();
        assert!(sender.send(0));

        let producer = thread::spawn(move || sender.send(1));

        thread::sleep(Duration::from_millis(30));
        assert!(!producer.is_finished());

        assert_eq!(receiver.recv(), Some(0));
        assert!(producer.join().unwrap());
        assert_eq!(receiver.recv(), Some(1));
    }

    #[test]
    fn send_after_consumer_drops_reports_loss() {
        let (sender, receiver) = bounded(1).unwrap();
        drop(receiver);
        assert!(!sender.send(5));
    }

    #[test]
    fn limiter_caps_concurrency() {
        let limiter = WorkLimiter::new(2).unwrap();
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..8 {
                let permit = limiter.acquire();
                let active = &active;
                let peak = &peak;
                scope.spawn(move || {
                    let _permit = permit;
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    active.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(WorkLimiter::new(0).is_err());
    }
}
