//! Crypto module: key management and the signing service.
//!
//! - Keys: generation, hex import/export
//! - Sign: the `SigningService` contract and its Ed25519 implementation

pub mod keys;
pub mod sign;

pub use keys::Keypair;
pub use sign::{Ed25519Signer, SigningService};
