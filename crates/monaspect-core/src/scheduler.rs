//! Background market refresh on a fixed period.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::failover::{FailoverCoordinator, Refreshed};
use crate::fetch_error::FetchError;
use crate::{NormalizedAsset, UtcDateTime};

/// Result of one scheduled refresh.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub tick: u64,
    pub completed_at: UtcDateTime,
    pub outcome: Result<Refreshed<NormalizedAsset>, FetchError>,
}

/// Owner of a running refresh loop. Dropping it stops the loop at the next
/// await point.
pub struct RefreshHandle {
    reports: watch::Receiver<Option<RefreshReport>>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Receiver that observes the most recent report.
    pub fn subscribe(&self) -> watch::Receiver<Option<RefreshReport>> {
        self.reports.clone()
    }

    pub fn latest(&self) -> Option<RefreshReport> {
        self.reports.borrow().clone()
    }

    /// Stops the loop and waits for the in-progress tick, if any, to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(error) = self.task.await {
            warn!(error = %error, "refresh loop ended abnormally");
        }
    }
}

/// Refreshes the configured market list immediately and then every
/// `settings().refresh_interval`. Ticks that would overlap a slow refresh
/// are skipped rather than queued.
pub fn spawn_market_refresh(coordinator: Arc<FailoverCoordinator>) -> RefreshHandle {
    let (report_tx, reports) = watch::channel(None);
    let (stop, mut stop_rx) = watch::channel(false);
    let period = coordinator.settings().refresh_interval;

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick = 0_u64;

        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        debug!("refresh loop stopping");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    tick += 1;
                    let outcome = coordinator.fetch_market().await;
                    match &outcome {
                        Ok(refreshed) => info!(
                            tick,
                            source = %refreshed.source,
                            freshness = refreshed.freshness.as_str(),
                            "scheduled market refresh"
                        ),
                        Err(error) => warn!(tick, error = %error, "scheduled market refresh failed"),
                    }
                    report_tx.send_replace(Some(RefreshReport {
                        tick,
                        completed_at: UtcDateTime::now(),
                        outcome,
                    }));
                }
            }
        }
    });

    RefreshHandle {
        reports,
        stop,
        task,
    }
}
