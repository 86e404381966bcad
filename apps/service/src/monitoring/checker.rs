use std::net::IpAddr;
use std::time::{Duration, Instant};

use surge_ping::{PingIdentifier, PingSequence, SurgeError};
use tokio::time::timeout;
use tracing::warn;

use super::types::ProbeOutcome;

const ICMP_PAYLOAD: [u8; 56] = [0; 56];

/// A single reachability check against one address.
///
/// Implementations resolve every failure into a `ProbeOutcome`; nothing is
/// returned as an error.
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self, target: &str, deadline: Duration) -> ProbeOutcome;
}

/// HTTP HEAD checker for URL targets
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("uppe-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn check(&self, target: &str, deadline: Duration) -> ProbeOutcome {
        let start = Instant::now();

        // Dropping the send future on expiry cancels the in-flight request
        let response = match timeout(deadline, self.client.head(target).send()).await {
            Err(_) => {
                return ProbeOutcome::timed_out(format!(
                    "No response within {} ms",
                    deadline.as_millis()
                ));
            }
            Ok(Err(e)) if e.is_timeout() => {
                return ProbeOutcome::timed_out(format!("HTTP request timed out: {e}"));
            }
            Ok(Err(e)) => return ProbeOutcome::offline(format!("HTTP request failed: {e}")),
            Ok(Ok(response)) => response,
        };

        let latency = start.elapsed().as_millis() as u64;
        let status = response.status();

        if status.is_success() {
            ProbeOutcome::online(latency, Some(status.as_u16()))
        } else {
            ProbeOutcome::rejected(latency, status.as_u16())
        }
    }
}

/// ICMP echo checker for IPv4 literals.
///
/// Raw ICMP sockets need elevated privileges (or `net.ipv4.ping_group_range`
/// on Linux). Without one the checker still works but reports every target
/// offline.
pub struct IcmpChecker {
    client: Option<surge_ping::Client>,
}

impl IcmpChecker {
    /// Must be called from inside a Tokio runtime.
    pub fn new() -> Self {
        match surge_ping::Client::new(&surge_ping::Config::default()) {
            Ok(client) => Self { client: Some(client) },
            Err(e) => {
                warn!("ICMP socket unavailable, IP targets will report offline: {}", e);
                Self { client: None }
            }
        }
    }
}

impl Default for IcmpChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Checker for IcmpChecker {
    async fn check(&self, target: &str, deadline: Duration) -> ProbeOutcome {
        let addr: IpAddr = match target.parse() {
            Ok(addr) => addr,
            Err(e) => return ProbeOutcome::offline(format!("Invalid IP address: {e}")),
        };

        let Some(client) = &self.client else {
            return ProbeOutcome::offline("ICMP socket unavailable");
        };

        let mut pinger = client.pinger(addr, PingIdentifier(rand::random())).await;
        pinger.timeout(deadline);

        match timeout(deadline, pinger.ping(PingSequence(0), &ICMP_PAYLOAD)).await {
            Ok(Ok((_reply, rtt))) => ProbeOutcome::online(rtt.as_millis() as u64, None),
            Ok(Err(SurgeError::Timeout { .. })) | Err(_) => ProbeOutcome::timed_out(format!(
                "No echo reply within {} ms",
                deadline.as_millis()
            )),
            Ok(Err(e)) => ProbeOutcome::offline(format!("ICMP probe failed: {e}")),
        }
    }
}
