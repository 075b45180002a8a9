//! RPC module
//!
//! - JSON-RPC 2.0 over HTTP/WebSocket (jsonrpsee), methods under `vote_`
//! - Read-only snapshots: chainInfo, block, results, peers, metrics
//! - Actions: submitTransaction, castVote, requestMine
//!
//! To integrate: implement `RpcDeps` (the node does) and pass it to `start_rpc_server`.

pub mod api;
pub mod handlers;
pub mod server;

pub use api::VoteApiServer;
pub use handlers::{RpcDeps, RpcHandler};
pub use server::start_rpc_server;
