//! Debounced commit scheduler
//!
//! One timer per list view. Every `schedule` call restarts the timer from
//! now, so a commit only fires once the user has been quiet for the whole
//! delay. A job that has already fired runs to completion; later calls
//! schedule a fresh one.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

type CommitJob = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Observable scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    PendingCommit { deadline: Instant },
}

struct Pending {
    deadline: Instant,
    handle: JoinHandle<()>,
    job: CommitJob,
}

#[derive(Default)]
struct SchedulerState {
    generation: u64,
    pending: Option<Pending>,
}

impl SchedulerState {
    /// Invalidate and take whatever is pending
    fn take_pending(&mut self) -> Option<Pending> {
        self.generation += 1;
        let pending = self.pending.take();
        if let Some(pending) = &pending {
            pending.handle.abort();
        }
        pending
    }
}

/// Restart-on-activity commit timer
#[derive(Clone)]
pub struct CommitScheduler {
    delay: Duration,
    state: Arc<Mutex<SchedulerState>>,
}

impl CommitScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Arc::new(Mutex::new(SchedulerState::default())),
        }
    }

    /// (Re)start the timer; `job` runs once it expires undisturbed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&self, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let job: CommitJob = Box::new(move || Box::pin(job()));

        let mut state = self.state.lock();
        if state.take_pending().is_some() {
            tracing::debug!("Commit timer restarted");
        }

        let generation = state.generation;
        let deadline = Instant::now() + self.delay;
        let shared = Arc::clone(&self.state);

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;

            let job = {
                let mut state = shared.lock();
                if state.generation != generation {
                    return;
                }
                match state.pending.take() {
                    Some(pending) => pending.job,
                    None => return,
                }
            };

            tracing::debug!("Commit timer expired");
            job().await;
        });

        state.pending = Some(Pending {
            deadline,
            handle,
            job,
        });
    }

    /// Drop the pending job without running it
    pub fn cancel(&self) -> bool {
        self.state.lock().take_pending().is_some()
    }

    pub fn phase(&self) -> SchedulerPhase {
        match &self.state.lock().pending {
            Some(pending) => SchedulerPhase::PendingCommit {
                deadline: pending.deadline,
            },
            None => SchedulerPhase::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DELAY: Duration = Duration::from_millis(2_500);

    fn counting_job(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> BoxFuture<'static, ()> {
        let counter = Arc::clone(counter);
        move || {
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let scheduler = CommitScheduler::new(DELAY);
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(counting_job(&fired));
        assert!(matches!(scheduler.phase(), SchedulerPhase::PendingCommit { .. }));

        tokio::time::sleep(DELAY - Duration::from_millis(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_debounces() {
        let scheduler = CommitScheduler::new(DELAY);
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(counting_job(&fired));
        tokio::time::sleep(DELAY - Duration::from_millis(1)).await;
        scheduler.schedule(counting_job(&fired));

        // Just short of the second window
        tokio::time::sleep(DELAY - Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_job() {
        let scheduler = CommitScheduler::new(DELAY);
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(counting_job(&fired));
        assert!(scheduler.cancel());

        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
    }
}
