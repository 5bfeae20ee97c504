//! BLS signature primitives for relayer attestations.
//!
//! Relayers hold a BLS12-381 secret key `sk` with public key `pk = sk·G2`.
//! To vouch for an inbound cross-chain message a relayer signs its message id:
//!
//! 1. Compute `id = SHA-256("XCAM_MESSAGE_V1:" || source_chain || payload)`
//! 2. Hash `id` to a G1 point `H(id)`
//! 3. Sign: `σ = sk·H(id)`
//!
//! The message processor accepts the attestation when
//! `e(σ, G2) == e(H(id), pk)` and the relayer identity derived from `pk` is
//! in its trusted set.

pub mod attestation;
pub mod curve;
pub mod error;

pub use attestation::{verify_attestation, verify_signature, RelayerKey};
pub use curve::{compress_g1, compress_g2, decompress_g1, decompress_g2, hash_to_g1};
pub use error::CryptoError;
