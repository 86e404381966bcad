use std::sync::Arc;
use std::time::Duration;

use super::checker::{Checker, HttpChecker, IcmpChecker};
use super::classifier::{TargetKind, classify};
use super::types::{MonitorStatus, ProbeOutcome, TimeoutStatus};

/// Probes targets with the strategy their address calls for
pub struct MonitoringExecutor {
    http_checker: Arc<dyn Checker>,
    icmp_checker: Arc<dyn Checker>,
    probe_timeout: Duration,
    timeout_status: TimeoutStatus,
}

impl MonitoringExecutor {
    /// Create an executor backed by the real HTTP and ICMP checkers
    pub fn new(probe_timeout: Duration, timeout_status: TimeoutStatus) -> reqwest::Result<Self> {
        Ok(Self::with_checkers(
            Arc::new(HttpChecker::new()?),
            Arc::new(IcmpChecker::new()),
            probe_timeout,
            timeout_status,
        ))
    }

    pub fn with_checkers(
        http_checker: Arc<dyn Checker>,
        icmp_checker: Arc<dyn Checker>,
        probe_timeout: Duration,
        timeout_status: TimeoutStatus,
    ) -> Self {
        Self { http_checker, icmp_checker, probe_timeout, timeout_status }
    }

    /// Probe one address. Always resolves to Online, Offline or Timeout.
    pub async fn probe(&self, address: &str) -> ProbeOutcome {
        let checker: &dyn Checker = match classify(address) {
            TargetKind::IpLiteral => self.icmp_checker.as_ref(),
            TargetKind::Url => self.http_checker.as_ref(),
        };

        let mut outcome = checker.check(address, self.probe_timeout).await;

        outcome.status = match self.timeout_status.apply(outcome.status) {
            MonitorStatus::Unknown => MonitorStatus::Offline,
            status => status,
        };
        outcome
    }
}
