pub mod cli;
pub mod config;
pub mod node;
pub mod service_handle;

pub use cli::run_cli;
pub use config::{NetworkConfig, NodeConfig, TrackerConfig};
pub use node::{BlockOutcome, ChainState, Node};
pub use service_handle::ServiceHandle;
