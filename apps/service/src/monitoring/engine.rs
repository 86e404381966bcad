use futures::future::join_all;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::detector::ChangeDetector;
use super::executor::MonitoringExecutor;
use super::notifier::Notifier;
use super::store::TransitionStore;
use super::types::{Target, TransitionOutcome};
use crate::error::{EngineError, PipelineError};

/// Counters for one completed tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub targets: usize,
    pub transitions: usize,
    pub unchanged: usize,
    pub failures: usize,
    /// Webhook deliveries started; they finish outside the tick
    pub notifications: usize,
}

/// Runs the probe → reconcile → notify pipeline for every target, one tick at
/// a time.
pub struct MonitorEngine {
    store: Arc<dyn TransitionStore>,
    executor: Arc<MonitoringExecutor>,
    detector: Arc<ChangeDetector>,
    notifier: Arc<Notifier>,
    probe_limit: Option<Arc<Semaphore>>,
    tick_gate: tokio::sync::Mutex<()>,
    notifications: Arc<Mutex<JoinSet<bool>>>,
}

impl MonitorEngine {
    pub fn new(
        store: Arc<dyn TransitionStore>,
        executor: MonitoringExecutor,
        notifier: Notifier,
    ) -> Self {
        Self {
            detector: Arc::new(ChangeDetector::new(store.clone())),
            store,
            executor: Arc::new(executor),
            notifier: Arc::new(notifier),
            probe_limit: None,
            tick_gate: tokio::sync::Mutex::new(()),
            notifications: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Cap the number of pipelines running at once within a tick. Zero means
    /// no cap.
    pub fn with_probe_limit(mut self, max_concurrent: usize) -> Self {
        self.probe_limit = (max_concurrent > 0).then(|| Arc::new(Semaphore::new(max_concurrent)));
        self
    }

    pub fn is_ticking(&self) -> bool {
        self.tick_gate.try_lock().is_err()
    }

    /// Run one tick over a snapshot of all targets and wait for every
    /// pipeline to finish. Fails only if a tick is already running or the
    /// snapshot cannot be taken; per-target failures are counted instead.
    pub async fn run_tick(&self) -> Result<TickSummary, EngineError> {
        let _gate = self.tick_gate.try_lock().map_err(|_| EngineError::TickInProgress)?;
        self.reap_notifications();

        let targets = self.store.list_all().await?;
        let mut summary = TickSummary { targets: targets.len(), ..Default::default() };
        info!(targets = summary.targets, "Tick started");

        let (addresses, handles): (Vec<String>, Vec<_>) = targets
            .into_iter()
            .map(|target| {
                let pipeline = self.pipeline();
                (target.address.clone(), tokio::spawn(pipeline.run(target)))
            })
            .unzip();

        for (address, joined) in addresses.iter().zip(join_all(handles).await) {
            match joined {
                Ok(Ok(report)) => {
                    match report.outcome {
                        TransitionOutcome::Transitioned(_) => summary.transitions += 1,
                        TransitionOutcome::NoChange => summary.unchanged += 1,
                    }
                    if report.notified {
                        summary.notifications += 1;
                    }
                }
                Ok(Err(e)) => {
                    summary.failures += 1;
                    error!(address = %address, "Pipeline failed: {}", e);
                }
                Err(e) => {
                    summary.failures += 1;
                    error!(address = %address, "Pipeline task aborted: {}", e);
                }
            }
        }

        info!(
            targets = summary.targets,
            transitions = summary.transitions,
            unchanged = summary.unchanged,
            failures = summary.failures,
            "Tick finished"
        );
        Ok(summary)
    }

    /// Wait for every webhook delivery started so far. Returns how many were
    /// accepted by their subscriber.
    pub async fn drain_notifications(&self) -> usize {
        let mut pending = {
            let mut notifications = self.notifications.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *notifications)
        };

        let mut delivered = 0;
        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok(true) => delivered += 1,
                Ok(false) => {}
                Err(e) => warn!("Notification task aborted: {}", e),
            }
        }
        delivered
    }

    /// Forget notification tasks that already finished
    fn reap_notifications(&self) {
        let mut notifications = self.notifications.lock().unwrap_or_else(|e| e.into_inner());
        while notifications.try_join_next().is_some() {}
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline {
            executor: self.executor.clone(),
            detector: self.detector.clone(),
            notifier: self.notifier.clone(),
            probe_limit: self.probe_limit.clone(),
            notifications: self.notifications.clone(),
        }
    }
}

struct PipelineReport {
    outcome: TransitionOutcome,
    notified: bool,
}

/// Everything one target's pipeline needs, detached from the engine borrow
struct Pipeline {
    executor: Arc<MonitoringExecutor>,
    detector: Arc<ChangeDetector>,
    notifier: Arc<Notifier>,
    probe_limit: Option<Arc<Semaphore>>,
    notifications: Arc<Mutex<JoinSet<bool>>>,
}

impl Pipeline {
    async fn run(self, target: Target) -> Result<PipelineReport, PipelineError> {
        let _permit = match &self.probe_limit {
            Some(limit) => limit.clone().acquire_owned().await.ok(),
            None => None,
        };

        let probe = self.executor.probe(&target.address).await;
        debug!(
            address = %target.address,
            status = %probe.status,
            latency_ms = ?probe.latency_ms,
            detail = ?probe.detail,
            "Probe finished"
        );

        let outcome = self.detector.reconcile(&target, probe.status).await?;

        let notified = match outcome {
            TransitionOutcome::Transitioned(status) if target.webhook_url.is_some() => {
                let notifier = self.notifier.clone();
                let mut notifications =
                    self.notifications.lock().unwrap_or_else(|e| e.into_inner());
                notifications.spawn(async move { notifier.notify(&target, status).await });
                true
            }
            _ => false,
        };

        Ok(PipelineReport { outcome, notified })
    }
}
