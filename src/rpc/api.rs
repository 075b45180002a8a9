use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use crate::ledger::{BlockDetail, ChainInfo, Transaction, VoteTally};
use crate::utils::MetricsSnapshot;

/// Presentation-facing JSON-RPC methods, all under the `vote_` prefix.
#[rpc(server, namespace = "vote")]
pub trait VoteApi {
    #[method(name = "chainInfo")]
    fn chain_info(&self) -> RpcResult<ChainInfo>;

    /// Block plus its derived hash and difficulty.
    #[method(name = "block")]
    fn block(&self, index: u64) -> RpcResult<BlockDetail>;

    #[method(name = "results")]
    fn results(&self) -> RpcResult<VoteTally>;

    /// Admit a client-signed transaction; errors carry the rejection reason.
    #[method(name = "submitTransaction")]
    async fn submit_transaction(&self, tx: Transaction) -> RpcResult<Transaction>;

    /// Sign and submit a vote with the node's own key.
    #[method(name = "castVote")]
    async fn cast_vote(&self, vote_data: String) -> RpcResult<Transaction>;

    #[method(name = "requestMine")]
    fn request_mine(&self) -> RpcResult<bool>;

    #[method(name = "peers")]
    async fn peers(&self) -> RpcResult<Vec<String>>;

    #[method(name = "metrics")]
    fn metrics(&self) -> RpcResult<MetricsSnapshot>;
}
