//! Periodic active-layer monitor
//!
//! Layer selectors downstream of the aggregate need to know when encodings
//! start, stop or swap rank. The monitor samples
//! [`SimulcastTrack::active_layers`] on an interval and publishes a new view on
//! a `watch` channel whenever the ranking changes. Bitrate-only changes are
//! not published.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::stats::ActiveLayers;
use crate::track::SimulcastTrack;

/// Background task publishing ranking changes of a simulcast track
///
/// The task ends on its own when the track is stopped or dropped. Dropping
/// the monitor aborts it.
#[derive(Debug)]
pub struct LayerMonitor {
    rx: watch::Receiver<ActiveLayers>,
    handle: JoinHandle<()>,
}

impl LayerMonitor {
    /// Spawn a monitor polling at the track's configured interval
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(track: &Arc<SimulcastTrack>) -> Self {
        let interval = track.config().monitor_interval;
        Self::spawn_with_interval(track, interval)
    }

    /// Spawn a monitor polling at `interval`
    pub fn spawn_with_interval(track: &Arc<SimulcastTrack>, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(track.active_layers());
        let weak = Arc::downgrade(track);
        let track_id = track.id().to_string();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately; the initial view is already published
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let layers = match weak.upgrade() {
                    Some(track) if !track.is_stopped() => track.active_layers(),
                    _ => break,
                };

                tx.send_if_modified(|current| {
                    if current.same_ranking(&layers) {
                        return false;
                    }
                    tracing::debug!(
                        track = %track_id,
                        active = ?layers.active_ids(),
                        inactive = ?layers.inactive,
                        "Active layers changed"
                    );
                    *current = layers;
                    true
                });
            }

            tracing::debug!(track = %track_id, "Layer monitor finished");
        });

        Self { rx, handle }
    }

    /// Get a receiver for ranking changes
    pub fn subscribe(&self) -> watch::Receiver<ActiveLayers> {
        self.rx.clone()
    }

    /// Latest published view
    pub fn current(&self) -> ActiveLayers {
        self.rx.borrow().clone()
    }

    /// Check whether the monitor task has ended
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the monitor task
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for LayerMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
