use chrono::{DateTime, Utc};
use libsql::Row;

use crate::error::StoreError;
use crate::monitoring::types::{StatusEvent, Target};

/// Columns selected for a target, in `target_from_row` order
pub const TARGET_COLUMNS: &str = "address, last_status, last_checked_at, webhook_url";

/// Columns selected for an event, in `event_from_row` order
pub const EVENT_COLUMNS: &str = "address, status, timestamp";

/// Timestamps are stored as unix milliseconds
pub fn datetime_to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

pub fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(millis).ok_or(StoreError::Timestamp(millis))
}

pub fn target_from_row(row: &Row) -> Result<Target, StoreError> {
    let status: String = row.get(1)?;
    let last_checked_at = row.get::<Option<i64>>(2)?.map(millis_to_datetime).transpose()?;

    Ok(Target {
        address: row.get(0)?,
        last_status: status.parse()?,
        last_checked_at,
        webhook_url: row.get(3)?,
    })
}

pub fn event_from_row(row: &Row) -> Result<StatusEvent, StoreError> {
    let status: String = row.get(1)?;
    let timestamp: i64 = row.get(2)?;

    Ok(StatusEvent {
        address: row.get(0)?,
        status: status.parse()?,
        timestamp: millis_to_datetime(timestamp)?,
    })
}
