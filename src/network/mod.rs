//! Network module - wire codec, transport, listener, topology, peer store, gossip.
//! Exposes Envelope/Message types, the PeerTransport seam and the MessageHandler seam.

pub mod codec;
pub mod gossip;
pub mod message;
pub mod peerstore;
pub mod server;
pub mod topology;
pub mod transport;

pub use gossip::Gossiper;
pub use message::{Envelope, HeartbeatPayload, Message, MessageKind, MinerInfo, PeerEndpoint, PeerListPayload};
pub use peerstore::PeerStore;
pub use server::{serve, MessageHandler, ServerConfig};
pub use topology::Topology;
pub use transport::{PeerTransport, TcpTransport};
