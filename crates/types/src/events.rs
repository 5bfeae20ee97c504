//! Records emitted by the contracts for indexers and relayers.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, ChainId, Currency};

/// Everything a contract can emit.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum Event {
    // === Host ===
    ContractDeployed {
        kind: String,
        address: Address,
        deployer: Address,
    },
    NftMinted {
        collection: Address,
        token_id: u64,
        owner: Address,
        token_uri: String,
    },
    NftTransferred {
        collection: Address,
        from: Address,
        to: Address,
        token_id: u64,
    },

    // === Factory / Auction ===
    AuctionCreated {
        factory: Address,
        auction_id: u64,
        auction: Address,
        seller: Address,
        asset_contract: Address,
        asset_id: u64,
        starting_price: Amount,
        end_time: u64,
    },
    BidPlaced {
        auction: Address,
        bidder: Address,
        amount: Amount,
        currency: Currency,
    },
    BidRefunded {
        auction: Address,
        bidder: Address,
        amount: Amount,
        currency: Currency,
    },
    RefundDeferred {
        auction: Address,
        bidder: Address,
        amount: Amount,
        currency: Currency,
    },
    RefundWithdrawn {
        auction: Address,
        bidder: Address,
        amount: Amount,
        currency: Currency,
    },
    RemotePaymentDue {
        auction: Address,
        chain_id: ChainId,
        recipient: Address,
        amount: Amount,
    },
    AuctionCancelled {
        auction: Address,
        seller: Address,
    },
    AuctionEnded {
        auction: Address,
        winner: Option<Address>,
        amount: Amount,
        currency: Option<Currency>,
    },

    // === Bridge ===
    AssetLocked {
        bridge: Address,
        lock_id: u64,
        owner: Address,
        asset_contract: Address,
        asset_id: u64,
        target_chain_id: ChainId,
    },
    AssetUnlocked {
        bridge: Address,
        lock_id: u64,
        recipient: Address,
    },
    LockRetargeted {
        bridge: Address,
        lock_id: u64,
        previous_chain_id: ChainId,
        target_chain_id: ChainId,
    },

    // === Message processor ===
    BridgeAdded {
        processor: Address,
        chain_id: ChainId,
        bridge: Address,
    },
    BridgeRemoved {
        processor: Address,
        chain_id: ChainId,
        bridge: Address,
    },
    RelayerAdded {
        processor: Address,
        relayer: Address,
    },
    RelayerRemoved {
        processor: Address,
        relayer: Address,
    },
    AuctionContractSet {
        processor: Address,
        auction_contract: Address,
    },
    OwnershipTransferred {
        processor: Address,
        previous_owner: Address,
        new_owner: Address,
    },
    MessageProcessed {
        processor: Address,
        message_id: [u8; 32],
        source_chain_id: ChainId,
        relayer: Address,
    },
}

impl Event {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::ContractDeployed { .. } => "ContractDeployed",
            Event::NftMinted { .. } => "NftMinted",
            Event::NftTransferred { .. } => "NftTransferred",
            Event::AuctionCreated { .. } => "AuctionCreated",
            Event::BidPlaced { .. } => "BidPlaced",
            Event::BidRefunded { .. } => "BidRefunded",
            Event::RefundDeferred { .. } => "RefundDeferred",
            Event::RefundWithdrawn { .. } => "RefundWithdrawn",
            Event::RemotePaymentDue { .. } => "RemotePaymentDue",
            Event::AuctionCancelled { .. } => "AuctionCancelled",
            Event::AuctionEnded { .. } => "AuctionEnded",
            Event::AssetLocked { .. } => "AssetLocked",
            Event::AssetUnlocked { .. } => "AssetUnlocked",
            Event::LockRetargeted { .. } => "LockRetargeted",
            Event::BridgeAdded { .. } => "BridgeAdded",
            Event::BridgeRemoved { .. } => "BridgeRemoved",
            Event::RelayerAdded { .. } => "RelayerAdded",
            Event::RelayerRemoved { .. } => "RelayerRemoved",
            Event::AuctionContractSet { .. } => "AuctionContractSet",
            Event::OwnershipTransferred { .. } => "OwnershipTransferred",
            Event::MessageProcessed { .. } => "MessageProcessed",
        }
    }
}

/// An event together with its position in the log.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct EventRecord {
    pub index: u64,
    pub block_height: u64,
    pub timestamp: u64,
    pub event: Event,
}
