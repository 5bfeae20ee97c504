//! Relayer keys and attestations over cross-chain messages.

use bls12_381::{pairing, G1Projective, G2Affine, G2Projective, Scalar};
use ff::Field;
use group::Curve;
use rand::{CryptoRng, RngCore};
use std::fmt;

use auction_types::{
    compute_message_id, relayer_address, Address, ChainId, G1Point, G2Point, RelayerAttestation,
};

use crate::curve::{compress_g1, compress_g2, decompress_g1, decompress_g2, hash_to_g1};
use crate::error::CryptoError;

/// A relayer's BLS signing key.
#[derive(Clone)]
pub struct RelayerKey {
    secret: Scalar,
    public: G2Affine,
}

impl RelayerKey {
    /// Generate a fresh key.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        loop {
            let secret = Scalar::random(&mut *rng);
            if !bool::from(secret.is_zero()) {
                return Self::from_scalar(secret);
            }
        }
    }

    /// Restore a key from its 32-byte little-endian secret.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret: Option<Scalar> = Scalar::from_bytes(bytes).into();
        match secret {
            Some(s) if !bool::from(s.is_zero()) => Ok(Self::from_scalar(s)),
            _ => Err(CryptoError::InvalidSecretKey),
        }
    }

    fn from_scalar(secret: Scalar) -> Self {
        let public = (G2Projective::generator() * secret).to_affine();
        Self { secret, public }
    }

    /// Secret scalar bytes, for persisting the key.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Compressed public key.
    pub fn public_key(&self) -> G2Point {
        compress_g2(&self.public)
    }

    /// Account identity registered with message processors.
    pub fn address(&self) -> Address {
        relayer_address(&self.public_key())
    }

    /// Sign arbitrary bytes: `σ = sk·H(message)`.
    pub fn sign(&self, message: &[u8]) -> G1Point {
        let h = hash_to_g1(message);
        compress_g1(&(G1Projective::from(h) * self.secret).to_affine())
    }

    /// Attest to a message from `source_chain_id` carrying `payload`.
    pub fn attest(&self, source_chain_id: ChainId, payload: &[u8]) -> RelayerAttestation {
        let message_id = compute_message_id(source_chain_id, payload);
        RelayerAttestation {
            relayer_pubkey: self.public_key(),
            signature: self.sign(&message_id),
        }
    }
}

impl fmt::Debug for RelayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayerKey")
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Verify `signature` over `message` under `public_key`.
///
/// Checks `e(σ, G2) == e(H(message), pk)`.
pub fn verify_signature(
    public_key: &G2Point,
    message: &[u8],
    signature: &G1Point,
) -> Result<(), CryptoError> {
    let pk = decompress_g2(public_key)?;
    if bool::from(pk.is_identity()) {
        return Err(CryptoError::InvalidG2Point);
    }
    let sig = decompress_g1(signature)?;
    let h = hash_to_g1(message);

    if pairing(&sig, &G2Affine::generator()) == pairing(&h, &pk) {
        Ok(())
    } else {
        Err(CryptoError::SignatureVerificationFailed)
    }
}

/// Verify an attestation and return the identity of the relayer behind it.
pub fn verify_attestation(
    attestation: &RelayerAttestation,
    source_chain_id: ChainId,
    payload: &[u8],
) -> Result<Address, CryptoError> {
    let message_id = compute_message_id(source_chain_id, payload);
    verify_signature(&attestation.relayer_pubkey, &message_id, &attestation.signature)?;
    Ok(relayer_address(&attestation.relayer_pubkey))
}
