//! Outbound side of the protocol: one connection per exchange.
//!
//! `send` is fire-and-forget delivery of a single envelope; `request` additionally waits
//! for exactly one reply frame. Every connect and read is bounded by a timeout so a dead
//! peer can never stall the caller.

use std::time::Duration;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use crate::network::codec::EnvelopeCodec;
use crate::network::message::{Envelope, Message};
use crate::utils::{Result, VoteChainError};

#[async_trait]
pub trait PeerTransport: Send + Sync + 'static {
    async fn send(&self, peer: &str, message: Message) -> Result<()>;
    async fn request(&self, peer: &str, message: Message) -> Result<Envelope>;
}

#[derive(Debug, Clone)]
pub struct TcpTransport {
    local_id: String,
    connect_timeout: Duration,
    io_timeout: Duration,
    max_frame_len: usize,
}

impl TcpTransport {
    pub fn new(local_id: impl Into<String>, connect_timeout: Duration, io_timeout: Duration, max_frame_len: usize) -> Self {
        Self { local_id: local_id.into(), connect_timeout, io_timeout, max_frame_len }
    }

    async fn open(&self, peer: &str) -> Result<Framed<TcpStream, EnvelopeCodec>> {
        let unreachable = |reason: String| VoteChainError::PeerUnreachable { peer: peer.to_string(), reason };
        match timeout(self.connect_timeout, TcpStream::connect(peer)).await {
            Err(_) => Err(unreachable("connect timed out".into())),
            Ok(Err(e)) => Err(unreachable(e.to_string())),
            Ok(Ok(stream)) => {
                let _ = stream.set_nodelay(true);
                Ok(Framed::new(stream, EnvelopeCodec::new(self.max_frame_len)))
            }
        }
    }

    async fn write(&self, framed: &mut Framed<TcpStream, EnvelopeCodec>, peer: &str, message: Message) -> Result<()> {
        let envelope = Envelope::new(self.local_id.clone(), message);
        match timeout(self.io_timeout, framed.send(envelope)).await {
            Err(_) => Err(VoteChainError::PeerUnreachable { peer: peer.to_string(), reason: "write timed out".into() }),
            Ok(result) => result,
        }
    }
}

#[async_trait]
impl PeerTransport for TcpTransport {
    async fn send(&self, peer: &str, message: Message) -> Result<()> {
        let mut framed = self.open(peer).await?;
        self.write(&mut framed, peer, message).await
    }

    async fn request(&self, peer: &str, message: Message) -> Result<Envelope> {
        let mut framed = self.open(peer).await?;
        self.write(&mut framed, peer, message).await?;
        match timeout(self.io_timeout, framed.next()).await {
            Err(_) => Err(VoteChainError::SyncTimeout { peer: peer.to_string() }),
            Ok(None) => Err(VoteChainError::PeerUnreachable {
                peer: peer.to_string(),
                reason: "connection closed without a reply".into(),
            }),
            Ok(Some(reply)) => reply,
        }
    }
}
