use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use crate::crypto::{Keypair, SigningService};
use crate::ledger::merkle::sha256_hex;
use crate::utils::{now_millis, Result, VoteChainError};

/// A single vote. Immutable once signed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    /// hex-encoded public key of the voter
    pub voter_id: String,
    /// opaque candidate identifier
    pub vote_data: String,
    pub signature: String,
    /// unix millis
    pub timestamp: u64,
}

/// The signed fields, declared in sorted key order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedFields<'a> {
    id: &'a str,
    timestamp: u64,
    vote_data: &'a str,
    voter_id: &'a str,
}

impl Transaction {
    /// Build and sign a vote with `keypair`; the voter id is the keypair's public key.
    pub fn signed(vote_data: impl Into<String>, keypair: &Keypair, signer: &dyn SigningService) -> Result<Self> {
        let mut id = [0u8; 16];
        OsRng.fill_bytes(&mut id);
        let mut tx = Transaction {
            id: hex::encode(id),
            voter_id: keypair.public_hex(),
            vote_data: vote_data.into(),
            signature: String::new(),
            timestamp: now_millis(),
        };
        tx.signature = signer.sign(&tx.canonical_bytes(), &keypair.secret_hex())?;
        Ok(tx)
    }

    /// Canonical encoding: sorted-key JSON of every field except the signature.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let fields = SignedFields {
            id: &self.id,
            timestamp: self.timestamp,
            vote_data: &self.vote_data,
            voter_id: &self.voter_id,
        };
        // strings and integers always serialize
        serde_json::to_vec(&fields).unwrap_or_default()
    }

    /// Merkle leaf hash.
    pub fn hash(&self) -> String {
        sha256_hex(&self.canonical_bytes())
    }

    pub fn check_well_formed(&self) -> Result<()> {
        let missing = [
            ("id", &self.id),
            ("voterId", &self.voter_id),
            ("voteData", &self.vote_data),
            ("signature", &self.signature),
        ]
        .into_iter()
        .find(|(_, v)| v.trim().is_empty());

        match missing {
            Some((field, _)) => Err(VoteChainError::MalformedTransaction(format!("{field} is empty"))),
            None => Ok(()),
        }
    }

    pub fn verify_signature(&self, signer: &dyn SigningService) -> bool {
        signer.verify(&self.canonical_bytes(), &self.signature, &self.voter_id)
    }
}
