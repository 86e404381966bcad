use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, params};

use super::models::{
    EVENT_COLUMNS, TARGET_COLUMNS, datetime_to_millis, event_from_row, target_from_row,
};
use crate::error::StoreError;
use crate::monitoring::store::{EventSink, TargetStore, TransitionStore};
use crate::monitoring::types::{MonitorStatus, StatusEvent, Target};
use crate::pool::{LibsqlManager, LibsqlPool};

/// libsql-backed target store and event log
pub struct LibsqlStore {
    pool: LibsqlPool,
}

impl LibsqlStore {
    /// Create a new store from a pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>, StoreError> {
        self.pool.get().await.map_err(|e| StoreError::Pool(e.to_string()))
    }

    /// Insert a new target. Its status starts as `unknown`.
    pub async fn add_target(&self, target: &Target) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;
        let inserted = conn
            .execute(
                "INSERT INTO targets (address, last_status, last_checked_at, webhook_url, created_at) VALUES (?, ?, ?, ?, ?) ON CONFLICT (address) DO NOTHING",
                params![
                    target.address.clone(),
                    target.last_status.to_string(),
                    target.last_checked_at.map(datetime_to_millis),
                    target.webhook_url.clone(),
                    datetime_to_millis(Utc::now())
                ],
            )
            .await?;

        if inserted == 0 {
            return Err(StoreError::AlreadyExists(target.address.clone()));
        }
        Ok(())
    }

    /// Delete a target. Its events stay in the log.
    pub async fn remove_target(&self, address: &str) -> Result<bool, StoreError> {
        let conn = self.get_conn().await?;
        let deleted = conn
            .execute("DELETE FROM targets WHERE address = ?", params![address.to_string()])
            .await?;
        Ok(deleted > 0)
    }

    /// Set or clear the webhook subscriber of a target
    pub async fn set_webhook(&self, address: &str, url: Option<&str>) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;
        let updated = conn
            .execute(
                "UPDATE targets SET webhook_url = ? WHERE address = ?",
                params![url.map(str::to_string), address.to_string()],
            )
            .await?;

        if updated == 0 {
            return Err(StoreError::NotFound(address.to_string()));
        }
        Ok(())
    }

    /// Most recent events for a target, newest first
    pub async fn list_events(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<StatusEvent>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM status_events WHERE address = ? ORDER BY timestamp DESC, id DESC LIMIT ?"
                ),
                params![address.to_string(), limit as i64],
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(event_from_row(&row)?);
        }
        Ok(events)
    }
}

#[async_trait]
impl TargetStore for LibsqlStore {
    async fn list_all(&self) -> Result<Vec<Target>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(&format!("SELECT {TARGET_COLUMNS} FROM targets ORDER BY rowid"), ())
            .await?;

        let mut targets = Vec::new();
        while let Some(row) = rows.next().await? {
            targets.push(target_from_row(&row)?);
        }
        Ok(targets)
    }

    async fn get(&self, address: &str) -> Result<Option<Target>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {TARGET_COLUMNS} FROM targets WHERE address = ?"),
                params![address.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(target_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn compare_and_update(
        &self,
        address: &str,
        expected: MonitorStatus,
        new_status: MonitorStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let conn = self.get_conn().await?;
        update_status(&conn, address, expected, new_status, checked_at).await
    }
}

#[async_trait]
impl EventSink for LibsqlStore {
    async fn append(&self, event: &StatusEvent) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;
        insert_event(&conn, event).await
    }
}

#[async_trait]
impl TransitionStore for LibsqlStore {
    async fn record_transition(
        &self,
        expected: MonitorStatus,
        event: &StatusEvent,
    ) -> Result<bool, StoreError> {
        let conn = self.get_conn().await?;
        let tx = conn.transaction().await?;

        match update_status(&tx, &event.address, expected, event.status, event.timestamp).await {
            Ok(true) => {}
            Ok(false) => {
                tx.rollback().await?;
                return Ok(false);
            }
            Err(e) => {
                tx.rollback().await?;
                return Err(e);
            }
        }

        if let Err(e) = insert_event(&tx, event).await {
            tx.rollback().await?;
            return Err(e);
        }

        tx.commit().await?;
        Ok(true)
    }
}

/// Conditional status update; true iff exactly one row changed
async fn update_status(
    conn: &Connection,
    address: &str,
    expected: MonitorStatus,
    new_status: MonitorStatus,
    checked_at: DateTime<Utc>,
) -> Result<bool, StoreError> {
    let updated = conn
        .execute(
            "UPDATE targets SET last_status = ?, last_checked_at = ? WHERE address = ? AND last_status = ?",
            params![
                new_status.to_string(),
                datetime_to_millis(checked_at),
                address.to_string(),
                expected.to_string()
            ],
        )
        .await?;
    Ok(updated == 1)
}

async fn insert_event(conn: &Connection, event: &StatusEvent) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO status_events (address, status, timestamp) VALUES (?, ?, ?)",
        params![
            event.address.clone(),
            event.status.to_string(),
            datetime_to_millis(event.timestamp)
        ],
    )
    .await?;
    Ok(())
}
