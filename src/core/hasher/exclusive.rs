//! Exclusive-access token for a primitive that tolerates one caller at a time.
//!
//! The token is owned by a pipeline instance and handed to whichever stage
//! needs the scarce primitive, so two pipelines in one process never share
//! (or contend on) the same lock.

use super::traits::{call_guarded, HashPrimitive};
use crate::core::pipeline::CancellationToken;
use crate::error::HashError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Call statistics for an [`ExclusiveHasher`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusiveStats {
    /// Total calls made through the token
    pub calls: u64,
    /// Highest number of callers observed inside the primitive at once
    pub peak_concurrency: usize,
}

/// Serializes every call to the wrapped primitive.
pub struct ExclusiveHasher {
    inner: Arc<dyn HashPrimitive>,
    lock: Mutex<()>,
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicU64,
}

impl ExclusiveHasher {
    /// Take ownership of a primitive that must never run concurrently
    pub fn new(inner: Arc<dyn HashPrimitive>) -> Self {
        Self {
            inner,
            lock: Mutex::new(()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicU64::new(0),
        }
    }

    /// Name of the wrapped primitive
    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    /// Hash `data` while holding the token.
    ///
    /// The lock covers the primitive call and nothing else. Callers still
    /// waiting for the lock when `cancel` fires get [`HashError::Cancelled`]
    /// and never reach the primitive.
    pub fn hash(&self, data: &str, cancel: &CancellationToken) -> Result<String, HashError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if cancel.is_cancelled() {
            return Err(HashError::Cancelled {
                primitive: self.inner.name(),
                input: data.to_string(),
            });
        }
        self.enter(data)
    }

    fn enter(&self, data: &str) -> Result<String, HashError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::Relaxed);

        let result = if active > 1 {
            Err(HashError::Overheated {
                primitive: self.inner.name(),
                active,
            })
        } else {
            call_guarded(self.inner.as_ref(), data)
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    /// Snapshot of call statistics
    pub fn stats(&self) -> ExclusiveStats {
        ExclusiveStats {
            calls: self.calls.load(Ordering::Relaxed),
            peak_concurrency: self.peak.load(Ordering::SeqCst),
        }
    }
}

impl std::fmt::Debug for ExclusiveHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExclusiveHasher")
            .field("primitive", &self.inner.name())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::Md5Hasher;
    use crossbeam_channel::{Receiver, Sender};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn calls_never_overlap() {
        let hasher = ExclusiveHasher::new(Arc::new(Md5Hasher::with_latency(
            Duration::from_millis(2),
        )));

        thread::scope(|scope| {
            for i in 0..16 {
                let hasher = &hasher;
                scope.spawn(move || {
                    hasher
                        .hash(&i.to_string(), &CancellationToken::new())
                        .unwrap()
                });
            }
        });

        let stats = hasher.stats();
        assert_eq!(stats.calls, 16);
        assert_eq!(stats.peak_concurrency, 1);
    }

    #[test]
    fn bypassing_the_lock_overheats() {
        let hasher = ExclusiveHasher::new(Arc::new(Md5Hasher::new()));
        hasher.active.store(1, Ordering::SeqCst);

        let result = hasher.enter("0");

        assert_eq!(
            result,
            Err(HashError::Overheated {
                primitive: "md5",
                active: 2,
            })
        );
        assert_eq!(hasher.active.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn independent_tokens_do_not_share_state() {
        let a = ExclusiveHasher::new(Arc::new(Md5Hasher::new()));
        let b = ExclusiveHasher::new(Arc::new(Md5Hasher::new()));

        a.hash("1", &CancellationToken::new()).unwrap();

        assert_eq!(a.stats().calls, 1);
        assert_eq!(b.stats().calls, 0);
    }

    /// Signals when a call starts, then holds it until released.
    struct Gate {
        entered: Sender<()>,
        release: Receiver<()>,
    }

    impl HashPrimitive for Gate {
        fn name(&self) -> &'static str {
            "gate"
        }

        fn hash(&self, data: &str) -> Result<String, HashError> {
            let _ = self.entered.send(());
            let _ = self.release.recv();
            Ok(data.to_string())
        }
    }

    #[test]
    fn waiters_are_turned_away_after_cancel() {
        let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        let hasher = ExclusiveHasher::new(Arc::new(Gate {
            entered: entered_tx,
            release: release_rx,
        }));
        let token = CancellationToken::new();

        let (holder, waiter) = thread::scope(|scope| {
            let holder = scope.spawn(|| hasher.hash("first", &token));
            entered_rx.recv().unwrap();
            let waiter = scope.spawn(|| hasher.hash("second", &token));
            token.cancel();
            release_tx.send(()).unwrap();
            (holder.join().unwrap(), waiter.join().unwrap())
        });

        assert_eq!(holder, Ok("first".to_string()));
        assert_eq!(
            waiter,
            Err(HashError::Cancelled {
                primitive: "gate",
                input: "second".to_string(),
            })
        );
        assert_eq!(hasher.stats().calls, 1);
    }
}
