//! Health Check Task
//!
//! Background loop that probes the store handle and triggers a reconnection
//! after enough consecutive failures.

use std::sync::atomic::Ordering;
use std::sync::Weak;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{ConnectionState, Inner};
use crate::store::probe;

/// Runs until the shutdown channel fires or the manager is dropped.
///
/// Each wake: no handle means nothing to do; a successful probe clears the
/// failure counter; reaching the threshold reconnects and clears the counter
/// whatever the outcome. Only a weak reference is held between wakes, so
/// dropping every manager handle also drops the shutdown sender.
pub(super) async fn run(manager: Weak<Inner>, mut shutdown: watch::Receiver<bool>) {
    let Some((interval, threshold)) = manager.upgrade().map(|inner| {
        (
            inner.settings.health_check_interval,
            inner.settings.failure_threshold.max(1),
        )
    }) else {
        return;
    };
    let mut failures: u32 = 0;

    info!(
        interval_secs = interval.as_secs(),
        threshold, "Starting cache health check task"
    );

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let Some(inner) = manager.upgrade() else {
            break;
        };

        let Some(session) = inner.session().await else {
            debug!("No cache store handle, skipping health probe");
            continue;
        };

        let outcome = tokio::select! {
            _ = shutdown.changed() => break,
            outcome = probe(session.store.as_ref(), inner.settings.probe_timeout) => outcome,
        };
        drop(session);

        match outcome {
            Ok(()) => {
                if failures > 0 {
                    info!(previous_failures = failures, "Cache store recovered");
                    mark_live(&inner, ConnectionState::Connected).await;
                }
                failures = 0;
            }
            Err(err) => {
                failures += 1;
                warn!(failures, threshold, error = %err, "Cache store health probe failed");

                if failures >= threshold {
                    inner.reconnect().await;
                    failures = 0;
                } else {
                    mark_live(&inner, ConnectionState::Degraded).await;
                }
            }
        }
        inner.failures.store(failures, Ordering::SeqCst);
    }

    debug!("Cache health check task stopped");
}

/// Moves between Connected and Degraded; leaves every other state alone.
async fn mark_live(inner: &Inner, state: ConnectionState) {
    let mut slot = inner.slot.write().await;
    if slot.session.is_some()
        && matches!(
            slot.state,
            ConnectionState::Connected | ConnectionState::Degraded
        )
    {
        slot.state = state;
    }
}
