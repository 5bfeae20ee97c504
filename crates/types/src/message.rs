//! Cross-chain message wire format.
//!
//! A payload is `MESSAGE_MAGIC || MESSAGE_VERSION || borsh(MessagePayload)`.
//! The proof travelling next to it is a borsh encoded [`RelayerAttestation`]
//! whose signature covers the message id returned by [`compute_message_id`].

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use thiserror::Error;

use crate::{Address, Amount, ChainId, G1Point, G2Point};

/// Leading bytes of every recognised payload.
pub const MESSAGE_MAGIC: [u8; 4] = *b"XCAM";

/// Current payload format version.
pub const MESSAGE_VERSION: u8 = 1;

const HEADER_LEN: usize = MESSAGE_MAGIC.len() + 1;

/// Errors raised while encoding or decoding message bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("Empty payload")]
    Empty,

    #[error("Unrecognized payload encoding")]
    UnknownEncoding,

    #[error("Unsupported payload version: {0}")]
    UnsupportedVersion(u8),

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Malformed proof: {0}")]
    MalformedProof(String),
}

/// Action requested by a cross-chain message.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum Instruction {
    /// Release a locked asset to `recipient`.
    Unlock {
        bridge: Address,
        lock_id: u64,
        recipient: Address,
    },

    /// Point a live lock at a different destination chain.
    Retarget {
        bridge: Address,
        lock_id: u64,
        target_chain_id: ChainId,
    },

    /// Place a bid escrowed on the source chain.
    Bid {
        auction: Address,
        bidder: Address,
        amount: Amount,
    },
}

/// Decoded body of a cross-chain message.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Sender-side sequence number, makes otherwise equal messages distinct
    pub nonce: u64,
    /// Bridge contract on the source chain that emitted the message
    pub emitter: Address,
    /// Chain the message is addressed to
    pub destination_chain_id: ChainId,
    pub instruction: Instruction,
}

impl MessagePayload {
    /// Encode into the versioned wire format.
    pub fn encode(&self) -> Result<Vec<u8>, MessageError> {
        let body = borsh::to_vec(self).map_err(|e| MessageError::Malformed(e.to_string()))?;
        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(&MESSAGE_MAGIC);
        out.push(MESSAGE_VERSION);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode and structurally validate wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        if bytes.is_empty() {
            return Err(MessageError::Empty);
        }
        if bytes.len() < HEADER_LEN || bytes[..MESSAGE_MAGIC.len()] != MESSAGE_MAGIC {
            return Err(MessageError::UnknownEncoding);
        }
        let version = bytes[MESSAGE_MAGIC.len()];
        if version != MESSAGE_VERSION {
            return Err(MessageError::UnsupportedVersion(version));
        }
        borsh::from_slice(&bytes[HEADER_LEN..]).map_err(|e| MessageError::Malformed(e.to_string()))
    }
}

/// An inbound message as submitted to the processor.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct CrossChainMessage {
    pub source_chain_id: ChainId,
    #[serde_as(as = "Hex")]
    pub payload: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub proof: Vec<u8>,
}

impl CrossChainMessage {
    /// Identifier used for replay protection.
    pub fn id(&self) -> [u8; 32] {
        compute_message_id(self.source_chain_id, &self.payload)
    }
}

/// BLS attestation by a relayer over a message id.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct RelayerAttestation {
    pub relayer_pubkey: G2Point,
    pub signature: G1Point,
}

impl RelayerAttestation {
    /// Encode as proof bytes.
    pub fn encode(&self) -> Result<Vec<u8>, MessageError> {
        borsh::to_vec(self).map_err(|e| MessageError::MalformedProof(e.to_string()))
    }

    /// Decode proof bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        borsh::from_slice(bytes).map_err(|e| MessageError::MalformedProof(e.to_string()))
    }
}

/// Compute the id of a message from its source chain and raw payload.
pub fn compute_message_id(source_chain_id: ChainId, payload: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"XCAM_MESSAGE_V1:");
    hasher.update(source_chain_id.to_le_bytes());
    hasher.update(payload);
    hasher.finalize().into()
}
