//! Utility module: errors, logging, metrics, and clock helpers.

pub mod errors;
pub mod metrics;
pub mod logging;
pub mod time;

pub use errors::{VoteChainError, Result};
pub use metrics::{MetricsRegistry, MetricsSnapshot, METRICS};
pub use logging::init_logging;
pub use time::now_millis;
