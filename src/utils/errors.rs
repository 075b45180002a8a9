use thiserror::Error;

/// Unified error type for the vote chain.
///
/// Every variant is recoverable: callers surface it as a structured response or log it.
#[derive(Error, Debug)]
pub enum VoteChainError {
    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("bad signature on transaction {tx_id}")]
    BadSignature { tx_id: String },

    #[error("transaction {tx_id} is already pending or confirmed")]
    DuplicateTransaction { tx_id: String },

    #[error("voter {voter_id} has already voted")]
    DuplicateVote { voter_id: String },

    #[error("mempool full ({capacity} transactions)")]
    MempoolFull { capacity: usize },

    #[error("invalid block at index {index}: {reason}")]
    InvalidBlock { index: u64, reason: String },

    #[error("chain validation failed at index {index}: {reason}")]
    ChainValidationFailure { index: u64, reason: String },

    #[error("mining work is stale")]
    StaleMiningWork,

    #[error("peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    #[error("peer {peer} did not answer within the sync timeout")]
    SyncTimeout { peer: String },

    #[error("unknown peer {0}")]
    UnknownPeer(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VoteChainError {
    /// Network-layer failures after which a sync attempt moves on to another neighbour.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            VoteChainError::PeerUnreachable { .. }
                | VoteChainError::SyncTimeout { .. }
                | VoteChainError::Codec(_)
                | VoteChainError::Io(_)
        )
    }
}

impl From<serde_json::Error> for VoteChainError {
    fn from(e: serde_json::Error) -> Self {
        VoteChainError::Codec(e.to_string())
    }
}

/// Convenience alias
pub type Result<T> = std::result::Result<T, VoteChainError>;
