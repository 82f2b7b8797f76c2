//! Legacy per-connection sync observer.
//!
//! Starts a connection sync once, then polls its status on a fixed interval
//! until the watch is destroyed. Onboarding itself never waits on this; it is
//! for views that want to show sync progress of an existing connection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{ConnectionId, DataPulseApi, SyncStatusReport};
use crate::error::ApiError;

/// Last observed result; `None` until the start call returns.
pub type SyncObservation = Option<Result<SyncStatusReport, ApiError>>;

/// Handle to a running status poller. Dropping it stops polling.
pub struct StatusWatch {
    connection_id: ConnectionId,
    rx: watch::Receiver<SyncObservation>,
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl StatusWatch {
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn latest(&self) -> SyncObservation {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncObservation> {
        self.rx.clone()
    }

    /// Stop polling and wait for the task to exit.
    pub async fn destroy(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(connection_id = self.connection_id, "Status watch task failed: {e}");
                }
            }
        }
    }
}

impl Drop for StatusWatch {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Start a sync for `connection_id` and keep polling its status every `interval`.
///
/// Errors are published like any other observation and polling continues.
pub fn spawn_status_watch(
    api: Arc<dyn DataPulseApi>,
    connection_id: ConnectionId,
    interval: Duration,
) -> StatusWatch {
    let (tx, rx) = watch::channel::<SyncObservation>(None);
    let (shutdown, mut stop) = watch::channel(false);

    let handle = tokio::spawn(async move {
        info!(connection_id, interval_ms = interval.as_millis() as u64, "Sync status watch started");

        let started = api.start_connection_sync(connection_id).await;
        if let Err(ref e) = started {
            warn!(connection_id, "Failed to start connection sync: {e}");
        }
        tx.send_replace(Some(started));

        let mut tick = tokio::time::interval_at(Instant::now() + interval, interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = stop.changed() => {
                    info!(connection_id, "Sync status watch stopped");
                    return;
                }
            }

            let observed = api.connection_sync_status(connection_id).await;
            match observed {
                Ok(ref report) => debug!(connection_id, status = ?report.status, "Sync status polled"),
                Err(ref e) => warn!(connection_id, "Sync status poll failed: {e}"),
            }
            tx.send_replace(Some(observed));
        }
    });

    StatusWatch {
        connection_id,
        rx,
        shutdown,
        handle: Some(handle),
    }
}

/// One status watch per connection, started on first request.
///
/// Backs the progress endpoint of the onboarding routes; all watches share the
/// configured poll interval.
pub struct SyncWatches {
    api: Arc<dyn DataPulseApi>,
    interval: Duration,
    watches: Mutex<HashMap<ConnectionId, StatusWatch>>,
}

impl SyncWatches {
    pub fn new(api: Arc<dyn DataPulseApi>, interval: Duration) -> Self {
        Self {
            api,
            interval,
            watches: Mutex::new(HashMap::new()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Latest observation for `connection_id`, starting its watch if none runs yet.
    pub async fn observe(&self, connection_id: ConnectionId) -> SyncObservation {
        let mut watches = self.watches.lock().await;
        watches
            .entry(connection_id)
            .or_insert_with(|| {
                spawn_status_watch(Arc::clone(&self.api), connection_id, self.interval)
            })
            .latest()
    }

    /// Subscribe to the watch of `connection_id`, starting it if needed.
    pub async fn subscribe(&self, connection_id: ConnectionId) -> watch::Receiver<SyncObservation> {
        let mut watches = self.watches.lock().await;
        watches
            .entry(connection_id)
            .or_insert_with(|| {
                spawn_status_watch(Arc::clone(&self.api), connection_id, self.interval)
            })
            .subscribe()
    }

    pub async fn is_watching(&self, connection_id: ConnectionId) -> bool {
        self.watches.lock().await.contains_key(&connection_id)
    }

    /// Stop the watch of `connection_id`. Returns whether one was running.
    pub async fn stop(&self, connection_id: ConnectionId) -> bool {
        let removed = self.watches.lock().await.remove(&connection_id);
        match removed {
            Some(watch) => {
                watch.destroy().await;
                true
            }
            None => false,
        }
    }

    pub async fn stop_all(&self) {
        let drained: Vec<StatusWatch> = self.watches.lock().await.drain().map(|(_, w)| w).collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "Stopping sync status watches");
        }
        for watch in drained {
            watch.destroy().await;
        }
    }
}
