//! Shared tracing setup for the Uppe binaries.

mod subscriber;

pub use subscriber::{init, init_with_level};
