use std::sync::Arc;
use async_trait::async_trait;
use jsonrpsee::core::{async_trait as rpc_async_trait, RpcResult};
use jsonrpsee::types::ErrorObjectOwned;
use crate::ledger::{BlockDetail, ChainInfo, Transaction, VoteTally};
use crate::node::Node;
use crate::rpc::api::VoteApiServer;
use crate::utils::{MetricsSnapshot, VoteChainError, METRICS};

pub const REJECTED_TRANSACTION: i32 = -32001;
pub const NOT_FOUND: i32 = -32004;
pub const INTERNAL: i32 = -32000;

/// Trait describing what the RPC handlers need from a node.
#[async_trait]
pub trait RpcDeps: Send + Sync + 'static {
    fn chain_info(&self) -> ChainInfo;
    fn block_detail(&self, index: u64) -> Option<BlockDetail>;
    fn vote_results(&self) -> VoteTally;
    async fn submit_transaction(&self, tx: Transaction) -> crate::utils::Result<Transaction>;
    async fn cast_vote(&self, vote_data: &str) -> crate::utils::Result<Transaction>;
    fn request_mine(&self) -> bool;
    async fn peers(&self) -> Vec<String>;
}

#[async_trait]
impl RpcDeps for Node {
    fn chain_info(&self) -> ChainInfo {
        Node::chain_info(self)
    }

    fn block_detail(&self, index: u64) -> Option<BlockDetail> {
        Node::block_detail(self, index)
    }

    fn vote_results(&self) -> VoteTally {
        Node::vote_results(self)
    }

    async fn submit_transaction(&self, tx: Transaction) -> crate::utils::Result<Transaction> {
        Node::submit_transaction(self, tx).await
    }

    async fn cast_vote(&self, vote_data: &str) -> crate::utils::Result<Transaction> {
        Node::cast_vote(self, vote_data).await
    }

    fn request_mine(&self) -> bool {
        Node::request_mine(self)
    }

    async fn peers(&self) -> Vec<String> {
        self.peers().list_peers().await.into_iter().map(|p| p.peer_id).collect()
    }
}

/// JSON-RPC surface over any `RpcDeps`.
pub struct RpcHandler<D: RpcDeps> {
    deps: Arc<D>,
}

impl<D: RpcDeps> RpcHandler<D> {
    pub fn new(deps: Arc<D>) -> Self {
        Self { deps }
    }
}

fn to_rpc_error(e: VoteChainError) -> ErrorObjectOwned {
    let code = match e {
        VoteChainError::MalformedTransaction(_)
        | VoteChainError::BadSignature { .. }
        | VoteChainError::DuplicateVote { .. }
        | VoteChainError::DuplicateTransaction { .. }
        | VoteChainError::MempoolFull { .. } => REJECTED_TRANSACTION,
        _ => INTERNAL,
    };
    ErrorObjectOwned::owned(code, e.to_string(), None::<()>)
}

#[rpc_async_trait]
impl<D: RpcDeps> VoteApiServer for RpcHandler<D> {
    fn chain_info(&self) -> RpcResult<ChainInfo> {
        Ok(self.deps.chain_info())
    }

    fn block(&self, index: u64) -> RpcResult<BlockDetail> {
        self.deps
            .block_detail(index)
            .ok_or_else(|| ErrorObjectOwned::owned(NOT_FOUND, format!("no block at index {index}"), None::<()>))
    }

    fn results(&self) -> RpcResult<VoteTally> {
        Ok(self.deps.vote_results())
    }

    async fn submit_transaction(&self, tx: Transaction) -> RpcResult<Transaction> {
        self.deps.submit_transaction(tx).await.map_err(to_rpc_error)
    }

    async fn cast_vote(&self, vote_data: String) -> RpcResult<Transaction> {
        self.deps.cast_vote(&vote_data).await.map_err(to_rpc_error)
    }

    fn request_mine(&self) -> RpcResult<bool> {
        Ok(self.deps.request_mine())
    }

    async fn peers(&self) -> RpcResult<Vec<String>> {
        Ok(self.deps.peers().await)
    }

    fn metrics(&self) -> RpcResult<MetricsSnapshot> {
        Ok(METRICS.snapshot())
    }
}
