use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::store::TransitionStore;
use super::types::{MonitorStatus, StatusEvent, Target, TransitionOutcome};
use crate::error::PipelineError;

/// Decides whether a probe result is a transition and records it.
///
/// The status update is a compare-and-swap against the status seen in the
/// tick snapshot, committed together with its event while holding a lock for
/// that address only.
pub struct ChangeDetector {
    store: Arc<dyn TransitionStore>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ChangeDetector {
    pub fn new(store: Arc<dyn TransitionStore>) -> Self {
        Self { store, locks: Mutex::new(HashMap::new()) }
    }

    pub async fn reconcile(
        &self,
        target: &Target,
        new_status: MonitorStatus,
    ) -> Result<TransitionOutcome, PipelineError> {
        if new_status == target.last_status {
            debug!(address = %target.address, status = %new_status, "Status unchanged");
            return Ok(TransitionOutcome::NoChange);
        }

        let lock = self.lock_for(&target.address);
        let result = {
            let _guard = lock.lock().await;
            self.record_transition(target, new_status).await
        };
        self.release(&target.address, lock);

        result
    }

    async fn record_transition(
        &self,
        target: &Target,
        new_status: MonitorStatus,
    ) -> Result<TransitionOutcome, PipelineError> {
        let now = next_timestamp(target.last_checked_at);
        let event = StatusEvent::new(target.address.clone(), new_status, now);

        if !self.store.record_transition(target.last_status, &event).await? {
            return match self.store.get(&target.address).await? {
                None => Err(PipelineError::TargetRemoved(target.address.clone())),
                Some(_) => Err(PipelineError::Conflict(target.address.clone())),
            };
        }

        info!(
            address = %target.address,
            from = %target.last_status,
            to = %new_status,
            "Status changed"
        );
        Ok(TransitionOutcome::Transitioned(new_status))
    }

    fn lock_for(&self, address: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(address.to_string()).or_default().clone()
    }

    /// Drop the address lock once nobody else holds or waits on it
    fn release(&self, address: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = locks.get(address) {
            if Arc::ptr_eq(entry, &lock) && Arc::strong_count(&lock) == 2 {
                locks.remove(address);
            }
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap().len()
    }
}

/// Event timestamps for one target strictly increase even if the wall clock
/// steps backwards between transitions.
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(previous) if now <= previous => previous + TimeDelta::milliseconds(1),
        _ => now,
    }
}
