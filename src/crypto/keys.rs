use ed25519_dalek::{SigningKey, VerifyingKey, SECRET_KEY_LENGTH, PUBLIC_KEY_LENGTH};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use crate::utils::{Result, VoteChainError};

/// Ed25519 key pair. Both halves travel as lowercase hex strings; the public half is a voter id.
#[derive(Clone)]
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        let mut secret = [0u8; SECRET_KEY_LENGTH];
        OsRng.fill_bytes(&mut secret);
        Self { signing: SigningKey::from_bytes(&secret) }
    }

    /// Construct from a hex-encoded 32-byte secret
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self> {
        let secret = decode_fixed::<SECRET_KEY_LENGTH>(secret_hex, "secret key")?;
        Ok(Self { signing: SigningKey::from_bytes(&secret) })
    }

    /// Hex-encoded public key (the voter id)
    pub fn public_hex(&self) -> String {
        hex::encode(self.signing.verifying_key().to_bytes())
    }

    /// Export secret as hex
    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair").field("public", &self.public_hex()).finish_non_exhaustive()
    }
}

pub(crate) fn signing_key_from_hex(secret_hex: &str) -> Result<SigningKey> {
    let secret = decode_fixed::<SECRET_KEY_LENGTH>(secret_hex, "secret key")?;
    Ok(SigningKey::from_bytes(&secret))
}

pub(crate) fn verifying_key_from_hex(public_hex: &str) -> Result<VerifyingKey> {
    let public = decode_fixed::<PUBLIC_KEY_LENGTH>(public_hex, "public key")?;
    VerifyingKey::from_bytes(&public).map_err(|e| VoteChainError::Crypto(e.to_string()))
}

fn decode_fixed<const N: usize>(s: &str, what: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(s).map_err(|e| VoteChainError::Crypto(format!("{what}: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| VoteChainError::Crypto(format!("{what}: expected {N} bytes")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_round_trips_to_the_same_public_key() {
        let kp = Keypair::generate();
        let restored = Keypair::from_secret_hex(&kp.secret_hex()).unwrap();
        assert_eq!(kp.public_hex(), restored.public_hex());
        assert_eq!(kp.public_hex().len(), 64);
    }

    #[test]
    fn rejects_short_secret() {
        assert!(Keypair::from_secret_hex("abcd").is_err());
        assert!(Keypair::from_secret_hex("not hex").is_err());
    }
}
