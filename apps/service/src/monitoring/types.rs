use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ParseStatusError;

/// Resolved reachability of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Unknown,
    Online,
    Offline,
    Timeout,
}

impl MonitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorStatus::Unknown => "unknown",
            MonitorStatus::Online => "online",
            MonitorStatus::Offline => "offline",
            MonitorStatus::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for MonitorStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(MonitorStatus::Unknown),
            "online" => Ok(MonitorStatus::Online),
            "offline" => Ok(MonitorStatus::Offline),
            "timeout" => Ok(MonitorStatus::Timeout),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// How a probe that ran out of time is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutStatus {
    /// Keep `Timeout` as its own status
    #[default]
    Timeout,
    /// Collapse `Timeout` into `Offline`
    Offline,
}

impl TimeoutStatus {
    pub fn apply(&self, status: MonitorStatus) -> MonitorStatus {
        match (self, status) {
            (TimeoutStatus::Offline, MonitorStatus::Timeout) => MonitorStatus::Offline,
            (_, status) => status,
        }
    }
}

impl std::fmt::Display for TimeoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutStatus::Timeout => write!(f, "timeout"),
            TimeoutStatus::Offline => write!(f, "offline"),
        }
    }
}

/// A monitored address and the last status recorded for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// IPv4 literal or URL, unique
    pub address: String,

    /// Status after the most recent transition
    pub last_status: MonitorStatus,

    /// When `last_status` last changed; checks without a change leave it alone
    pub last_checked_at: Option<DateTime<Utc>>,

    /// Subscriber notified on every transition
    pub webhook_url: Option<String>,
}

impl Target {
    /// Create a target that has never been probed
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            last_status: MonitorStatus::Unknown,
            last_checked_at: None,
            webhook_url: None,
        }
    }

    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    pub fn with_status(mut self, status: MonitorStatus) -> Self {
        self.last_status = status;
        self
    }
}

/// Append-only record of a single transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub address: String,
    pub status: MonitorStatus,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub fn new(address: impl Into<String>, status: MonitorStatus, timestamp: DateTime<Utc>) -> Self {
        Self { address: address.into(), status, timestamp }
    }
}

/// What the change detector did with a fresh probe result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    NoChange,
    Transitioned(MonitorStatus),
}

/// Result of a single probe. `status` is never `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: MonitorStatus,

    /// Round trip in milliseconds, when a reply arrived
    pub latency_ms: Option<u64>,

    /// HTTP status code, for URL probes that got a response
    pub status_code: Option<u16>,

    /// Why the probe did not come back online
    pub detail: Option<String>,
}

impl ProbeOutcome {
    pub fn online(latency_ms: u64, status_code: Option<u16>) -> Self {
        Self { status: MonitorStatus::Online, latency_ms: Some(latency_ms), status_code, detail: None }
    }

    pub fn offline(detail: impl Into<String>) -> Self {
        Self {
            status: MonitorStatus::Offline,
            latency_ms: None,
            status_code: None,
            detail: Some(detail.into()),
        }
    }

    /// A response arrived but its status code does not count as reachable
    pub fn rejected(latency_ms: u64, status_code: u16) -> Self {
        Self {
            status: MonitorStatus::Offline,
            latency_ms: Some(latency_ms),
            status_code: Some(status_code),
            detail: Some(format!("HTTP status {status_code}")),
        }
    }

    pub fn timed_out(detail: impl Into<String>) -> Self {
        Self {
            status: MonitorStatus::Timeout,
            latency_ms: None,
            status_code: None,
            detail: Some(detail.into()),
        }
    }
}
