//! Admission control for concurrent capability invocations.
//!
//! Every `tools/call` must take an admission slot before it is spawned. At most
//! `max_concurrency` admitted calls run at once while up to `max_queued` more
//! wait for a running slot. A call that finds every slot taken is refused
//! immediately, so the protocol reader never blocks and the waiting set stays
//! bounded.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Semaphore, TryAcquireError};
use tokio::task::JoinHandle;

/// Default number of admitted calls allowed to wait for a running slot.
pub const DEFAULT_MAX_QUEUED: usize = 256;

const DEFAULT_CONCURRENCY: NonZeroUsize = match NonZeroUsize::new(32) {
    Some(limit) => limit,
    None => NonZeroUsize::MIN,
};

/// Running and waiting limits for invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    max_concurrency: NonZeroUsize,
    max_queued: usize,
}

impl SchedulerConfig {
    /// Limits running invocations to `max_concurrency`, with the default
    /// waiting bound.
    #[must_use]
    pub const fn new(max_concurrency: NonZeroUsize) -> Self {
        Self {
            max_concurrency,
            max_queued: DEFAULT_MAX_QUEUED,
        }
    }

    /// Sets how many admitted calls may wait for a running slot.
    #[must_use]
    pub const fn with_max_queued(mut self, max_queued: usize) -> Self {
        self.max_queued = max_queued;
        self
    }

    /// Returns the running limit.
    #[must_use]
    pub const fn max_concurrency(self) -> NonZeroUsize {
        self.max_concurrency
    }

    /// Returns the waiting limit.
    #[must_use]
    pub const fn max_queued(self) -> usize {
        self.max_queued
    }

    /// Total calls admitted at once, running or waiting.
    #[must_use]
    pub fn admission_limit(self) -> usize {
        self.max_concurrency
            .get()
            .saturating_add(self.max_queued)
            .min(Semaphore::MAX_PERMITS)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

/// Refusal reasons of [`InvocationScheduler::try_spawn`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// The scheduler was closed and admits nothing new.
    #[error("invocation scheduler closed")]
    Closed,
    /// Every admission slot is taken.
    #[error("too many invocations in flight (limit {limit})")]
    Busy {
        /// Admission limit that was reached.
        limit: usize,
    },
}

/// Result alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Bounds how many invocations run and wait at once.
///
/// Clones share their slots. Calls admitted before [`close`](Self::close)
/// still run to completion.
#[derive(Debug, Clone)]
pub struct InvocationScheduler {
    admission: Arc<Semaphore>,
    running: Arc<Semaphore>,
    config: SchedulerConfig,
}

impl InvocationScheduler {
    /// Creates a scheduler with the given limits.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            admission: Arc::new(Semaphore::new(config.admission_limit())),
            running: Arc::new(Semaphore::new(config.max_concurrency().get())),
            config,
        }
    }

    /// Returns the configured limits.
    #[must_use]
    pub const fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Returns the number of admitted calls that have not finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.config
            .admission_limit()
            .saturating_sub(self.admission.available_permits())
    }

    /// Returns `true` once [`close`](Self::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.admission.is_closed()
    }

    /// Stops admitting new calls.
    pub fn close(&self) {
        self.admission.close();
    }

    /// Admits and spawns `future` without waiting for a slot.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Busy`] when every admission slot is taken and
    /// [`SchedulerError::Closed`] after [`close`](Self::close).
    pub fn try_spawn<F, T>(&self, future: F) -> SchedulerResult<JoinHandle<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let admitted = Arc::clone(&self.admission)
            .try_acquire_owned()
            .map_err(|err| match err {
                TryAcquireError::Closed => SchedulerError::Closed,
                TryAcquireError::NoPermits => SchedulerError::Busy {
                    limit: self.config.admission_limit(),
                },
            })?;
        let running = Arc::clone(&self.running);

        Ok(tokio::spawn(async move {
            let _admitted = admitted;
            // `running` is never closed.
            let _slot = running.acquire_owned().await.ok();
            future.await
        }))
    }
}

impl Default for InvocationScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn limits(running: usize, queued: usize) -> SchedulerConfig {
        SchedulerConfig::new(NonZeroUsize::new(running).unwrap()).with_max_queued(queued)
    }

    #[tokio::test]
    async fn admitted_calls_run_within_the_concurrency_limit() {
        let scheduler = InvocationScheduler::new(limits(2, 4));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                scheduler
                    .try_spawn(async move {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .unwrap()
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.in_flight(), 0);
    }

    #[tokio::test]
    async fn full_scheduler_refuses_until_a_slot_frees() {
        let scheduler = InvocationScheduler::new(limits(1, 1));
        let gate = Arc::new(Notify::new());

        let blocker = {
            let gate = Arc::clone(&gate);
            scheduler.try_spawn(async move { gate.notified().await }).unwrap()
        };
        let waiting = scheduler.try_spawn(async { "waited" }).unwrap();
        assert_eq!(scheduler.in_flight(), 2);

        let refused = scheduler.try_spawn(async {}).unwrap_err();
        assert_eq!(refused, SchedulerError::Busy { limit: 2 });

        gate.notify_one();
        blocker.await.unwrap();
        assert_eq!(waiting.await.unwrap(), "waited");
        assert_eq!(scheduler.in_flight(), 0);
        assert!(scheduler.try_spawn(async {}).is_ok());
    }

    #[tokio::test]
    async fn close_refuses_new_calls_but_finishes_admitted_ones() {
        let scheduler = InvocationScheduler::new(limits(1, 1));
        let gate = Arc::new(Notify::new());

        let blocker = {
            let gate = Arc::clone(&gate);
            scheduler.try_spawn(async move { gate.notified().await }).unwrap()
        };
        let waiting = scheduler.try_spawn(async { 7 }).unwrap();

        scheduler.close();
        assert!(scheduler.is_closed());
        assert_eq!(scheduler.try_spawn(async {}).unwrap_err(), SchedulerError::Closed);

        gate.notify_one();
        blocker.await.unwrap();
        assert_eq!(waiting.await.unwrap(), 7);
    }

    #[test]
    fn admission_limit_counts_running_and_waiting() {
        assert_eq!(limits(4, 0).admission_limit(), 4);
        assert_eq!(SchedulerConfig::default().admission_limit(), 32 + DEFAULT_MAX_QUEUED);
    }
}
