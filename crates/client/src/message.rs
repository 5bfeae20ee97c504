//! Cross-chain message construction and attestation.

use thiserror::Error;

use auction_crypto::RelayerKey;
use auction_types::{
    Address, Amount, ChainId, CrossChainMessage, Instruction, MessageError, MessagePayload,
};

/// Errors that can occur while building a message.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Source and destination chain must differ")]
    SameChain,

    #[error("Chain id must be non-zero")]
    ZeroChainId,

    #[error("Encoding failed: {0}")]
    Encoding(#[from] MessageError),
}

/// Builds messages emitted by one source bridge towards one destination.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    source_chain_id: ChainId,
    destination_chain_id: ChainId,
    /// Source-side bridge the destination processor has routed
    emitter: Address,
}

impl MessageBuilder {
    pub fn new(
        source_chain_id: ChainId,
        destination_chain_id: ChainId,
        emitter: Address,
    ) -> Result<Self, BuildError> {
        if source_chain_id == 0 || destination_chain_id == 0 {
            return Err(BuildError::ZeroChainId);
        }
        if source_chain_id == destination_chain_id {
            return Err(BuildError::SameChain);
        }
        Ok(Self {
            source_chain_id,
            destination_chain_id,
            emitter,
        })
    }

    pub fn unlock(&self, nonce: u64, bridge: Address, lock_id: u64, recipient: Address) -> MessagePayload {
        self.payload(
            nonce,
            Instruction::Unlock {
                bridge,
                lock_id,
                recipient,
            },
        )
    }

    pub fn retarget(
        &self,
        nonce: u64,
        bridge: Address,
        lock_id: u64,
        target_chain_id: ChainId,
    ) -> MessagePayload {
        self.payload(
            nonce,
            Instruction::Retarget {
                bridge,
                lock_id,
                target_chain_id,
            },
        )
    }

    pub fn bid(&self, nonce: u64, auction: Address, bidder: Address, amount: Amount) -> MessagePayload {
        self.payload(
            nonce,
            Instruction::Bid {
                auction,
                bidder,
                amount,
            },
        )
    }

    fn payload(&self, nonce: u64, instruction: Instruction) -> MessagePayload {
        MessagePayload {
            nonce,
            emitter: self.emitter,
            destination_chain_id: self.destination_chain_id,
            instruction,
        }
    }

    /// Encode `payload` and attach the relayer's attestation.
    pub fn attest(
        &self,
        payload: &MessagePayload,
        relayer: &RelayerKey,
    ) -> Result<CrossChainMessage, BuildError> {
        let bytes = payload.encode()?;
        let proof = relayer.attest(self.source_chain_id, &bytes).encode()?;
        Ok(CrossChainMessage {
            source_chain_id: self.source_chain_id,
            payload: bytes,
            proof,
        })
    }
}
