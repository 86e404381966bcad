//! Storage seams consumed by the monitoring engine.
//!
//! The engine only ever reads targets and records transitions, where a
//! transition is a conditional status update plus its event. Creating and
//! deleting targets belongs to whoever owns the store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{MonitorStatus, StatusEvent, Target};
use crate::error::StoreError;

#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Snapshot of every target, in a stable order
    async fn list_all(&self) -> Result<Vec<Target>, StoreError>;

    async fn get(&self, address: &str) -> Result<Option<Target>, StoreError>;

    /// Set `last_status` and `last_checked_at` only if the stored status still
    /// equals `expected`. Returns whether the update was applied.
    async fn compare_and_update(
        &self,
        address: &str,
        expected: MonitorStatus,
        new_status: MonitorStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn append(&self, event: &StatusEvent) -> Result<(), StoreError>;
}

/// A store that can apply a status change and its event as one unit
#[async_trait]
pub trait TransitionStore: TargetStore + EventSink {
    /// Compare-and-update the target named by `event` and append `event`,
    /// atomically. Returns `false` and writes nothing if the stored status no
    /// longer equals `expected`. On error neither write is visible.
    async fn record_transition(
        &self,
        expected: MonitorStatus,
        event: &StatusEvent,
    ) -> Result<bool, StoreError>;
}
