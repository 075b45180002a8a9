pub mod ingest;
pub mod pool;

pub use ingest::{TxValidator, VoteValidator};
pub use pool::Mempool;
