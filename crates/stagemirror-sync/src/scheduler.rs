//! Refresh scheduling.
//!
//! At most one pass runs at a time. Requests arriving while a pass runs are
//! folded into a single pending rerun by a channel of capacity one; direct
//! triggers during a pass are dropped.

use crate::pass::SyncSession;
use crate::summary::RefreshSummary;
use crate::SyncError;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

/// What asked for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Explicit user request
    Manual,
    /// Debounced file system change
    Change,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Result of one trigger.
#[derive(Debug)]
pub enum TriggerOutcome {
    Completed(RefreshSummary),
    Failed(SyncError),
    /// A pass was already running
    Skipped,
}

/// Serializes refresh passes for one session.
pub struct RefreshScheduler {
    session: Mutex<SyncSession>,
    state: Mutex<SchedulerState>,
    last_summary: Mutex<Option<RefreshSummary>>,
    passes: AtomicUsize,
}

impl RefreshScheduler {
    pub fn new(session: SyncSession) -> Self {
        Self {
            session: Mutex::new(session),
            state: Mutex::new(SchedulerState::Idle),
            last_summary: Mutex::new(None),
            passes: AtomicUsize::new(0),
        }
    }

    /// Bounded request queue: one pending rerun at most.
    pub fn channel() -> (SchedulerHandle, mpsc::Receiver<Trigger>) {
        let (tx, rx) = mpsc::channel(1);
        (SchedulerHandle { tx }, rx)
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Number of passes that ran to completion or failure.
    pub fn passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }

    pub fn last_summary(&self) -> Option<RefreshSummary> {
        self.last_summary.lock().clone()
    }

    /// Staging directory of the current session.
    ///
    /// Blocks while a pass is running.
    pub fn staging_dir(&self) -> PathBuf {
        self.session.lock().staging_dir().to_path_buf()
    }

    /// Run one pass now, unless one is already running.
    pub fn trigger(&self, trigger: Trigger) -> TriggerOutcome {
        let Some(_guard) = self.begin() else {
            debug!(?trigger, "Refresh already running, trigger dropped");
            return TriggerOutcome::Skipped;
        };

        info!(?trigger, "Refresh triggered");

        let mut session = self.session.lock();
        let result = panic::catch_unwind(AssertUnwindSafe(|| session.run()));
        drop(session);

        self.passes.fetch_add(1, Ordering::SeqCst);

        match result {
            Ok(Ok(summary)) => {
                *self.last_summary.lock() = Some(summary.clone());
                TriggerOutcome::Completed(summary)
            }
            Ok(Err(e)) => {
                error!(error = %e, "Refresh failed");
                TriggerOutcome::Failed(e)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(panic = %message, "Refresh aborted, staging output may be incomplete");
                TriggerOutcome::Failed(SyncError::Aborted(message))
            }
        }
    }

    /// Consume requests until shutdown or until every handle is dropped.
    pub async fn run(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<Trigger>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        loop {
            let trigger = tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Scheduler stopping");
                    break;
                }
                trigger = rx.recv() => match trigger {
                    Some(trigger) => trigger,
                    None => {
                        debug!("All refresh handles dropped");
                        break;
                    }
                },
            };

            let scheduler = Arc::clone(&self);
            match tokio::task::spawn_blocking(move || scheduler.trigger(trigger)).await {
                Ok(TriggerOutcome::Completed(summary)) => {
                    debug!(accepted = summary.accepted, "Scheduled refresh complete");
                }
                Ok(TriggerOutcome::Failed(_)) | Ok(TriggerOutcome::Skipped) => {}
                Err(e) => error!(error = %e, "Refresh task failed"),
            }
        }
    }

    fn begin(&self) -> Option<RunningGuard<'_>> {
        let mut state = self.state.lock();
        if *state == SchedulerState::Running {
            return None;
        }
        *state = SchedulerState::Running;
        Some(RunningGuard { state: &self.state })
    }
}

/// Restores `Idle` however the pass ends.
struct RunningGuard<'a> {
    state: &'a Mutex<SchedulerState>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock() = SchedulerState::Idle;
    }
}

/// Cloneable sender of refresh requests.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<Trigger>,
}

impl SchedulerHandle {
    /// Queue a refresh. Returns false if one is already pending or the
    /// scheduler is gone.
    pub fn request(&self, trigger: Trigger) -> bool {
        match self.tx.try_send(trigger) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(?trigger, "Refresh already pending");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(?trigger, "Scheduler is not running");
                false
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
