//! The orchestrating poll loop.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::manifest::ManifestCache;
use crate::presence::PresenceProvider;
use crate::resolver::{self, ResolveError, ResolvedStatus};
use crate::snapshot::SnapshotProvider;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(15_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleOutcome {
    /// A new status was broadcast.
    Published,
    /// The status did not change; nothing was broadcast.
    Unchanged,
    /// This cycle failed and was skipped; the poller stays running.
    Skipped,
    /// No character is in an activity; the poller stops.
    Idle,
}

/// Polls the profile on a fixed interval and republishes the resolved
/// status whenever it changes.
///
/// Cycles never overlap: one spawned task runs a full cycle, then sleeps,
/// so a slow network call simply delays the next tick instead of racing a
/// second cycle against it.
pub struct PresencePoller {
    snapshots: SnapshotProvider,
    cache: Arc<ManifestCache>,
    providers: Vec<Box<dyn PresenceProvider>>,
    interval: Duration,
    last_published: Mutex<Option<ResolvedStatus>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PresencePoller {
    pub fn new(
        snapshots: SnapshotProvider,
        cache: Arc<ManifestCache>,
        providers: Vec<Box<dyn PresenceProvider>>,
        interval: Duration,
    ) -> Self {
        Self {
            snapshots,
            cache,
            providers,
            interval,
            last_published: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Transition Stopped -> Running. No-op if already running.
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock();
        if task.is_some() {
            tracing::debug!("presence poller already running");
            return;
        }

        tracing::info!("starting presence poller");
        let poller = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            loop {
                if poller.run_cycle().await == CycleOutcome::Idle {
                    poller.enter_stopped().await;
                    return;
                }
                tokio::time::sleep(poller.interval).await;
            }
        }));
    }

    /// Transition Running -> Stopped. Idempotent, and safe to call from
    /// outside the cycle task.
    pub fn stop(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            self.last_published.lock().take();
            tracing::info!("presence poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// The self-initiated stop: no character is in an activity, so the
    /// presence is cleared and the poller winds itself down. The published
    /// state is dropped so a later restart always republishes.
    async fn enter_stopped(&self) {
        for provider in &self.providers {
            provider.clear().await;
        }
        self.last_published.lock().take();
        self.task.lock().take();
        tracing::info!("presence poller stopped");
    }

    async fn run_cycle(&self) -> CycleOutcome {
        let snapshot = match self.snapshots.get_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("snapshot fetch failed, skipping this cycle: {}", e);
                return CycleOutcome::Skipped;
            }
        };

        let status = match resolver::resolve(&self.cache, &snapshot) {
            Ok(status) => status,
            Err(ResolveError::NoActiveCharacter) => {
                tracing::info!("no character is in an activity, clearing presence");
                return CycleOutcome::Idle;
            }
            Err(e) => {
                tracing::warn!("resolution failed, skipping this cycle: {}", e);
                return CycleOutcome::Skipped;
            }
        };

        {
            // Field-wise equality over the whole status: re-entering the
            // same activity with a new start time counts as a change and
            // restarts the elapsed timer.
            let last = self.last_published.lock();
            if last.as_ref() == Some(&status) {
                return CycleOutcome::Unchanged;
            }
        }

        tracing::info!(
            "new activity: {} ({})",
            status.state,
            status.details.as_deref().unwrap_or("no details")
        );
        for provider in &self.providers {
            tracing::debug!("publishing to {}", provider.name());
            provider.update(&status).await;
        }
        *self.last_published.lock() = Some(status);
        CycleOutcome::Published
    }
}
