/// Monitoring engine module - decides and records target reachability
///
/// This module is responsible for:
/// - Classifying addresses and probing them (ICMP for IPv4 literals, HTTP HEAD otherwise)
/// - Detecting status transitions against the stored state
/// - Notifying webhook subscribers of transitions
/// - Ticking over every target on a fixed interval without overlapping ticks
pub mod checker;
pub mod classifier;
pub mod detector;
pub mod engine;
pub mod executor;
#[cfg(test)]
pub mod memory;
pub mod notifier;
pub mod scheduler;
pub mod store;
pub mod types;


pub use engine::MonitorEngine;
pub use executor::MonitoringExecutor;
pub use notifier::{Notifier, ReqwestWebhookClient};
pub use scheduler::MonitoringScheduler;
pub use store::TargetStore;
pub use types::Target;
