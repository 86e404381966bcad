use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use super::engine::MonitorEngine;
use crate::error::EngineError;

/// Drives the engine on a fixed interval. A tick always runs to completion
/// before the timer is polled again, so ticks never overlap.
pub struct MonitoringScheduler {
    engine: Arc<MonitorEngine>,
    tick_interval: Duration,
}

impl MonitoringScheduler {
    pub fn new(engine: Arc<MonitorEngine>, tick_interval: Duration) -> Self {
        Self { engine, tick_interval }
    }

    /// Start ticking. The first tick fires immediately. Dropping the returned
    /// handle also stops the loop after the current tick.
    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let engine = self.engine.clone();
        let tick_interval = self.tick_interval;

        let task = tokio::spawn(async move {
            let mut timer = interval(tick_interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_ms = tick_interval.as_millis() as u64, "Scheduler started");

            loop {
                tokio::select! {
                    _ = timer.tick() => {}
                    _ = stop_rx.changed() => break,
                }

                match engine.run_tick().await {
                    Ok(_) => {}
                    Err(EngineError::TickInProgress) => {
                        warn!("Skipping tick, previous tick still running");
                    }
                    Err(e) => error!("Tick failed: {}", e),
                }

                if *stop_rx.borrow() {
                    break;
                }
            }

            info!("Scheduler stopped");
        });

        SchedulerHandle { stop_tx, task, engine: self.engine }
    }
}

pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
    engine: Arc<MonitorEngine>,
}

impl SchedulerHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop after the in-flight tick, then wait for outstanding webhooks
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            error!("Scheduler task ended abnormally: {}", e);
        }
        let delivered = self.engine.drain_notifications().await;
        info!(delivered, "Pending notifications drained");
    }
}
