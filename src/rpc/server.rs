use std::sync::Arc;
use jsonrpsee::server::{Server, ServerHandle};
use tracing::info;
use crate::rpc::api::VoteApiServer;
use crate::rpc::handlers::{RpcDeps, RpcHandler};

/// Serve the JSON-RPC API on `addr` (HTTP and WebSocket). Stop it through the handle.
pub async fn start_rpc_server<D: RpcDeps>(addr: &str, deps: D) -> anyhow::Result<ServerHandle> {
    let server = Server::builder().build(addr).await?;
    let local = server.local_addr()?;
    let handle = server.start(RpcHandler::new(Arc::new(deps)).into_rpc());
    info!(addr = %local, "RPC server listening");
    Ok(handle)
}
