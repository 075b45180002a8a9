//! Inbound side: accept loop feeding a bounded pool of connection workers.
//!
//! Each connection carries one envelope and at most one reply. The loop stops taking
//! new connections while every worker slot is busy, and exits when the shutdown watch
//! flips.

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};
use crate::network::codec::EnvelopeCodec;
use crate::network::message::{Envelope, Message};

/// Whatever sits behind a listener: a peer node or the tracker.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Handle one inbound envelope; `Some` is written back as the reply.
    async fn handle(&self, envelope: Envelope) -> Option<Message>;
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub local_id: String,
    pub max_connections: usize,
    pub io_timeout: Duration,
    pub max_frame_len: usize,
}

pub async fn serve<H: MessageHandler>(
    listener: TcpListener,
    handler: Arc<H>,
    cfg: ServerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let workers = Arc::new(Semaphore::new(cfg.max_connections.max(1)));
    let cfg = Arc::new(cfg);
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, id = %cfg.local_id, "listening");
    }

    loop {
        if *shutdown.borrow() {
            break;
        }
        let permit = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() { break; }
                continue;
            }
            permit = workers.clone().acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => break,
            },
        };
        let accepted = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() { break; }
                continue;
            }
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, remote)) => {
                let handler = handler.clone();
                let cfg = cfg.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    serve_connection(stream, handler, &cfg).await;
                    debug!(%remote, "connection done");
                });
            }
            Err(e) => {
                warn!("accept failed: {e}");
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
    info!(id = %cfg.local_id, "listener stopped");
}

async fn serve_connection<H: MessageHandler>(stream: TcpStream, handler: Arc<H>, cfg: &ServerConfig) {
    let mut framed = Framed::new(stream, EnvelopeCodec::new(cfg.max_frame_len));
    let envelope = match timeout(cfg.io_timeout, framed.next()).await {
        Err(_) => {
            debug!("peer sent nothing before the read timeout");
            return;
        }
        Ok(None) => return,
        Ok(Some(Err(e))) => {
            warn!("dropping undecodable frame: {e}");
            return;
        }
        Ok(Some(Ok(envelope))) => envelope,
    };

    let kind = envelope.kind();
    let sender = envelope.sender.clone();
    debug!(?kind, %sender, "inbound message");
    if let Some(reply) = handler.handle(envelope).await {
        let reply = Envelope::new(cfg.local_id.clone(), reply);
        match timeout(cfg.io_timeout, framed.send(reply)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(%sender, "reply failed: {e}"),
            Err(_) => debug!(%sender, "reply timed out"),
        }
    }
}
