//! In-process `TargetStore` and `EventSink` for engine tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use super::store::{EventSink, TargetStore, TransitionStore};
use super::types::{MonitorStatus, StatusEvent, Target};
use crate::error::StoreError;

/// Insertion-ordered store that can be told to fail
#[derive(Default)]
pub struct MemoryStore {
    targets: RwLock<Vec<Target>>,
    events: Mutex<Vec<StatusEvent>>,
    unavailable: AtomicBool,
    failing: Mutex<HashSet<String>>,
    fail_next_append: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targets(targets: impl IntoIterator<Item = Target>) -> Self {
        let store = Self::new();
        for target in targets {
            store.insert(target);
        }
        store
    }

    /// Insert or replace a target
    pub fn insert(&self, target: Target) {
        let mut targets = self.targets.write().unwrap_or_else(|e| e.into_inner());
        match targets.iter_mut().find(|t| t.address == target.address) {
            Some(existing) => *existing = target,
            None => targets.push(target),
        }
    }

    pub fn remove(&self, address: &str) -> bool {
        let mut targets = self.targets.write().unwrap_or_else(|e| e.into_inner());
        let before = targets.len();
        targets.retain(|t| t.address != address);
        targets.len() != before
    }

    pub fn target(&self, address: &str) -> Option<Target> {
        let targets = self.targets.read().unwrap_or_else(|e| e.into_inner());
        targets.iter().find(|t| t.address == address).cloned()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn events_for(&self, address: &str) -> Vec<StatusEvent> {
        self.events().into_iter().filter(|e| e.address == address).collect()
    }

    /// Make every operation fail as if the backing database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make writes for one address fail
    pub fn fail_writes_for(&self, address: &str) {
        self.failing.lock().unwrap_or_else(|e| e.into_inner()).insert(address.to_string());
    }

    /// Make the next event append fail once
    pub fn fail_next_append(&self) {
        self.fail_next_append.store(true, Ordering::SeqCst);
    }

    fn check_append(&self) -> Result<(), StoreError> {
        if self.fail_next_append.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("event append failed".into()));
        }
        Ok(())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked unavailable".into()));
        }
        Ok(())
    }

    fn check_writable(&self, address: &str) -> Result<(), StoreError> {
        self.check_available()?;
        if self.failing.lock().unwrap_or_else(|e| e.into_inner()).contains(address) {
            return Err(StoreError::Unavailable(format!("writes for {address} are failing")));
        }
        Ok(())
    }
}

#[async_trait]
impl TargetStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<Target>, StoreError> {
        self.check_available()?;
        Ok(self.targets.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn get(&self, address: &str) -> Result<Option<Target>, StoreError> {
        self.check_available()?;
        Ok(self.target(address))
    }

    async fn compare_and_update(
        &self,
        address: &str,
        expected: MonitorStatus,
        new_status: MonitorStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.check_writable(address)?;
        let mut targets = self.targets.write().unwrap_or_else(|e| e.into_inner());
        match targets.iter_mut().find(|t| t.address == address) {
            Some(target) if target.last_status == expected => {
                target.last_status = new_status;
                target.last_checked_at = Some(checked_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl EventSink for MemoryStore {
    async fn append(&self, event: &StatusEvent) -> Result<(), StoreError> {
        self.check_writable(&event.address)?;
        self.check_append()?;
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event.clone());
        Ok(())
    }
}

#[async_trait]
impl TransitionStore for MemoryStore {
    async fn record_transition(
        &self,
        expected: MonitorStatus,
        event: &StatusEvent,
    ) -> Result<bool, StoreError> {
        self.check_writable(&event.address)?;

        // Both locks are held so neither write is visible without the other
        let mut targets = self.targets.write().unwrap_or_else(|e| e.into_inner());
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());

        let Some(target) = targets.iter_mut().find(|t| t.address == event.address) else {
            return Ok(false);
        };
        if target.last_status != expected {
            return Ok(false);
        }

        self.check_append()?;
        target.last_status = event.status;
        target.last_checked_at = Some(event.timestamp);
        events.push(event.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_compare_and_update_requires_expected_status() {
        let store = MemoryStore::with_targets([Target::new("8.8.8.8")]);
        let now = Utc::now();

        let applied = store
            .compare_and_update("8.8.8.8", MonitorStatus::Online, MonitorStatus::Offline, now)
            .await
            .unwrap();
        assert!(!applied);
        assert_eq!(store.target("8.8.8.8").unwrap().last_status, MonitorStatus::Unknown);

        let applied = store
            .compare_and_update("8.8.8.8", MonitorStatus::Unknown, MonitorStatus::Online, now)
            .await
            .unwrap();
        assert!(applied);

        let target = store.target("8.8.8.8").unwrap();
        assert_eq!(target.last_status, MonitorStatus::Online);
        assert_eq!(target.last_checked_at, Some(now));
    }

    #[tokio::test]
    async fn test_missing_target_is_not_updated() {
        let store = MemoryStore::new();
        let applied = store
            .compare_and_update("gone", MonitorStatus::Unknown, MonitorStatus::Online, Utc::now())
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let store = MemoryStore::with_targets([
            Target::new("https://b.example"),
            Target::new("1.1.1.1"),
            Target::new("https://a.example"),
        ]);
        let addresses: Vec<_> =
            store.list_all().await.unwrap().into_iter().map(|t| t.address).collect();
        assert_eq!(addresses, ["https://b.example", "1.1.1.1", "https://a.example"]);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = MemoryStore::with_targets([Target::new("1.1.1.1")]);
        store.set_unavailable(true);
        assert!(store.list_all().await.is_err());
        assert!(store.get("1.1.1.1").await.is_err());
    }
}
