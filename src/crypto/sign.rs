use ed25519_dalek::{Signature, Signer, Verifier};
use crate::crypto::keys::{signing_key_from_hex, verifying_key_from_hex};
use crate::utils::Result;

/// The signing contract the core depends on. Keys and signatures are opaque strings;
/// the core never looks at key material beyond these two calls.
pub trait SigningService: Send + Sync + 'static {
    fn sign(&self, message: &[u8], private_key: &str) -> Result<String>;
    fn verify(&self, message: &[u8], signature: &str, public_key: &str) -> bool;
}

/// Ed25519 over hex-encoded keys and signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Signer;

impl SigningService for Ed25519Signer {
    fn sign(&self, message: &[u8], private_key: &str) -> Result<String> {
        let key = signing_key_from_hex(private_key)?;
        Ok(hex::encode(key.sign(message).to_bytes()))
    }

    fn verify(&self, message: &[u8], signature: &str, public_key: &str) -> bool {
        let Ok(key) = verifying_key_from_hex(public_key) else {
            return false;
        };
        let Ok(sig_bytes) = hex::decode(signature) else {
            return false;
        };
        match Signature::from_slice(&sig_bytes) {
            Ok(sig) => key.verify(message, &sig).is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    #[test]
    fn sign_then_verify() {
        let kp = Keypair::generate();
        let signer = Ed25519Signer;
        let sig = signer.sign(b"ballot", &kp.secret_hex()).unwrap();
        assert!(signer.verify(b"ballot", &sig, &kp.public_hex()));
        assert!(!signer.verify(b"ballot!", &sig, &kp.public_hex()));
    }

    #[test]
    fn verify_rejects_foreign_key_and_garbage() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let signer = Ed25519Signer;
        let sig = signer.sign(b"ballot", &alice.secret_hex()).unwrap();
        assert!(!signer.verify(b"ballot", &sig, &bob.public_hex()));
        assert!(!signer.verify(b"ballot", "zz", &alice.public_hex()));
        assert!(!signer.verify(b"ballot", &sig, "not-a-key"));
    }
}
