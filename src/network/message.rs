//! Wire protocol: every frame carries one JSON envelope
//! `{"type": KIND, "data": ..., "timestamp": "<unix millis>", "sender": "<peer id>"}`.
//!
//! The raw envelope is decoded exactly once into a typed `Message`; nothing past the
//! codec looks at `serde_json::Value`.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::ledger::{Block, Transaction, VoteTally};
use crate::utils::{now_millis, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Register,
    PeerList,
    NewBlock,
    NewTransaction,
    ChainRequest,
    ChainResponse,
    Heartbeat,
    GetMiner,
    GetVoteResults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEndpoint {
    pub host: String,
    pub port: u16,
}

impl PeerEndpoint {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Split a `host:port` peer id.
    pub fn parse(addr: &str) -> Option<Self> {
        let (host, port) = addr.rsplit_once(':')?;
        Some(Self { host: host.to_string(), port: port.parse().ok()? })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerListPayload {
    pub peers: BTreeMap<String, PeerEndpoint>,
    /// the recipient's stake, present on the direct reply to REGISTER
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stake: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPayload {
    pub chain_length: u64,
    pub last_hash: String,
    #[serde(default)]
    pub chain: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinerInfo {
    pub peer_id: String,
    pub stake_value: u64,
    pub difficulty: u32,
}

/// Typed protocol message. Request/reply pairs: CHAIN_REQUEST gets CHAIN_RESPONSE,
/// REGISTER gets PEER_LIST, and GET_MINER / GET_VOTE_RESULTS are answered with the same
/// kind carrying a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Register(PeerEndpoint),
    PeerList(PeerListPayload),
    NewBlock(Block),
    NewTransaction(Transaction),
    ChainRequest,
    ChainResponse(Vec<Block>),
    Heartbeat(HeartbeatPayload),
    GetMiner(Option<MinerInfo>),
    GetVoteResults(Option<VoteTally>),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Register(_) => MessageKind::Register,
            Message::PeerList(_) => MessageKind::PeerList,
            Message::NewBlock(_) => MessageKind::NewBlock,
            Message::NewTransaction(_) => MessageKind::NewTransaction,
            Message::ChainRequest => MessageKind::ChainRequest,
            Message::ChainResponse(_) => MessageKind::ChainResponse,
            Message::Heartbeat(_) => MessageKind::Heartbeat,
            Message::GetMiner(_) => MessageKind::GetMiner,
            Message::GetVoteResults(_) => MessageKind::GetVoteResults,
        }
    }

    fn into_data(self) -> Result<Value> {
        let data = match self {
            Message::Register(p) => serde_json::to_value(p)?,
            Message::PeerList(p) => serde_json::to_value(p)?,
            Message::NewBlock(b) => serde_json::to_value(b)?,
            Message::NewTransaction(t) => serde_json::to_value(t)?,
            Message::ChainRequest => Value::Null,
            Message::ChainResponse(chain) => serde_json::to_value(chain)?,
            Message::Heartbeat(h) => serde_json::to_value(h)?,
            Message::GetMiner(m) => serde_json::to_value(m)?,
            Message::GetVoteResults(t) => serde_json::to_value(t)?,
        };
        Ok(data)
    }

    fn from_data(kind: MessageKind, data: Value) -> Result<Self> {
        let msg = match kind {
            MessageKind::Register => Message::Register(serde_json::from_value(data)?),
            MessageKind::PeerList => Message::PeerList(serde_json::from_value(data)?),
            MessageKind::NewBlock => Message::NewBlock(serde_json::from_value(data)?),
            MessageKind::NewTransaction => Message::NewTransaction(serde_json::from_value(data)?),
            MessageKind::ChainRequest => Message::ChainRequest,
            MessageKind::ChainResponse => Message::ChainResponse(serde_json::from_value(data)?),
            MessageKind::Heartbeat => Message::Heartbeat(serde_json::from_value(data)?),
            MessageKind::GetMiner => Message::GetMiner(serde_json::from_value(data)?),
            MessageKind::GetVoteResults => Message::GetVoteResults(serde_json::from_value(data)?),
        };
        Ok(msg)
    }
}

/// The envelope exactly as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEnvelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub data: Value,
    pub timestamp: String,
    pub sender: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub sender: String,
    pub timestamp: String,
    pub message: Message,
}

impl Envelope {
    pub fn new(sender: impl Into<String>, message: Message) -> Self {
        Self { sender: sender.into(), timestamp: now_millis().to_string(), message }
    }

    pub fn kind(&self) -> MessageKind {
        self.message.kind()
    }

    pub fn encode(self) -> Result<Vec<u8>> {
        let wire = WireEnvelope {
            kind: self.message.kind(),
            data: self.message.into_data()?,
            timestamp: self.timestamp,
            sender: self.sender,
        };
        Ok(serde_json::to_vec(&wire)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let wire: WireEnvelope = serde_json::from_slice(bytes)?;
        Ok(Self {
            message: Message::from_data(wire.kind, wire.data)?,
            timestamp: wire.timestamp,
            sender: wire.sender,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::VoteChainError;

    #[test]
    fn envelope_shape_on_the_wire() {
        let env = Envelope::new("127.0.0.1:5001", Message::ChainRequest);
        let bytes = env.clone().encode().unwrap();
        let raw: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(raw["type"], "CHAIN_REQUEST");
        assert_eq!(raw["sender"], "127.0.0.1:5001");
        assert!(raw["timestamp"].is_string());
        assert_eq!(Envelope::decode(&bytes).unwrap(), env);
    }

    #[test]
    fn block_payload_survives_the_trip() {
        let block = Block::genesis();
        let env = Envelope::new("n", Message::NewBlock(block.clone()));
        let decoded = Envelope::decode(&env.encode().unwrap()).unwrap();
        assert_eq!(decoded.kind(), MessageKind::NewBlock);
        assert_eq!(decoded.message, Message::NewBlock(block));
    }

    #[test]
    fn query_without_body_decodes_as_request() {
        let raw = br#"{"type":"GET_MINER","timestamp":"1","sender":"n"}"#;
        let env = Envelope::decode(raw).unwrap();
        assert_eq!(env.message, Message::GetMiner(None));
    }

    #[test]
    fn unknown_kind_and_bad_payload_are_codec_errors() {
        let unknown = br#"{"type":"PING","data":null,"timestamp":"1","sender":"n"}"#;
        assert!(matches!(Envelope::decode(unknown), Err(VoteChainError::Codec(_))));

        let bad = br#"{"type":"NEW_BLOCK","data":{"index":"x"},"timestamp":"1","sender":"n"}"#;
        assert!(matches!(Envelope::decode(bad), Err(VoteChainError::Codec(_))));
    }

    #[test]
    fn endpoint_parses_peer_ids() {
        let ep = PeerEndpoint::parse("10.0.0.2:5003").unwrap();
        assert_eq!(ep.host, "10.0.0.2");
        assert_eq!(ep.port, 5003);
        assert_eq!(ep.address(), "10.0.0.2:5003");
        assert!(PeerEndpoint::parse("nohost").is_none());
    }
}
