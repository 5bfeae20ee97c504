//! RPC-compatible types for the mock chain.
//!
//! Addresses and ids are hex strings and amounts are decimal strings, since
//! JSON numbers cannot carry a full `u128`. Event payloads travel as hex
//! encoded borsh so clients can decode them with `auction-types`.

use serde::{Deserialize, Serialize};

use auction_module::{AuctionSummary, CallOutcome, ProcessorInfo};
use auction_types::{AuctionInfo, AuctionStatus, EventRecord, LockRecord, LockStatus, OwedAmount};

/// Block info response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub chain_id: u64,
    pub height: u64,
    pub timestamp: u64,
}

/// Result of a committed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceiptRpc {
    pub block_height: u64,
    pub timestamp: u64,
    pub outcome: CallOutcomeRpc,
    /// Records emitted by this transaction
    pub events: Vec<EventRpc>,
}

/// Flattened call outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallOutcomeRpc {
    /// "unit", "deployed", "auction_created", "nft_minted", "locked",
    /// "withdrawn" or "message_processed"
    pub kind: String,
    pub address: Option<String>,
    pub id: Option<u64>,
    /// Refunds paid by a withdraw, per currency
    #[serde(default)]
    pub owed: Vec<OwedAmountRpc>,
    pub message_id: Option<String>,
}

/// Deferred refund total in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwedAmountRpc {
    /// "native", "token:<hex>" or "remote:<chain id>"
    pub currency: String,
    pub amount: String,
}

impl From<&OwedAmount> for OwedAmountRpc {
    fn from(o: &OwedAmount) -> Self {
        Self {
            currency: o.currency.to_string(),
            amount: o.amount.to_string(),
        }
    }
}

impl From<CallOutcome> for CallOutcomeRpc {
    fn from(outcome: CallOutcome) -> Self {
        match outcome {
            CallOutcome::Unit => Self {
                kind: "unit".into(),
                ..Default::default()
            },
            CallOutcome::Deployed(address) => Self {
                kind: "deployed".into(),
                address: Some(hex::encode(address)),
                ..Default::default()
            },
            CallOutcome::AuctionCreated {
                auction_id,
                auction,
            } => Self {
                kind: "auction_created".into(),
                address: Some(hex::encode(auction)),
                id: Some(auction_id),
                ..Default::default()
            },
            CallOutcome::NftMinted(token_id) => Self {
                kind: "nft_minted".into(),
                id: Some(token_id),
                ..Default::default()
            },
            CallOutcome::Locked(lock_id) => Self {
                kind: "locked".into(),
                id: Some(lock_id),
                ..Default::default()
            },
            CallOutcome::Withdrawn(owed) => Self {
                kind: "withdrawn".into(),
                owed: owed.iter().map(OwedAmountRpc::from).collect(),
                ..Default::default()
            },
            CallOutcome::MessageProcessed(message_id) => Self {
                kind: "message_processed".into(),
                message_id: Some(hex::encode(message_id)),
                ..Default::default()
            },
        }
    }
}

/// Emitted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRpc {
    pub index: u64,
    pub block_height: u64,
    pub timestamp: u64,
    pub name: String,
    /// Hex-encoded borsh `Event`
    pub data: String,
}

impl From<&EventRecord> for EventRpc {
    fn from(r: &EventRecord) -> Self {
        Self {
            index: r.index,
            block_height: r.block_height,
            timestamp: r.timestamp,
            name: r.event.name().to_string(),
            data: borsh::to_vec(&r.event).map(hex::encode).unwrap_or_default(),
        }
    }
}

fn status_str(status: AuctionStatus) -> String {
    match status {
        AuctionStatus::Open => "open",
        AuctionStatus::Cancelled => "cancelled",
        AuctionStatus::Ended => "ended",
    }
    .to_string()
}

/// Auction details for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionRpc {
    pub auction_id: u64,
    pub address: String,
    pub factory: String,
    pub seller: String,
    pub asset_contract: String,
    pub asset_id: u64,
    pub starting_price: String,
    pub start_time: u64,
    pub end_time: u64,
    pub status: String,
    pub highest_bidder: Option<String>,
    pub highest_bid: String,
    pub currency: Option<String>,
    pub pending_returns: usize,
}

impl From<&AuctionInfo> for AuctionRpc {
    fn from(a: &AuctionInfo) -> Self {
        Self {
            auction_id: a.auction_id,
            address: hex::encode(a.address),
            factory: hex::encode(a.factory),
            seller: hex::encode(a.seller),
            asset_contract: hex::encode(a.asset_contract),
            asset_id: a.asset_id,
            starting_price: a.starting_price.to_string(),
            start_time: a.start_time,
            end_time: a.end_time,
            status: status_str(a.status),
            highest_bidder: a.highest_bid.as_ref().map(|b| hex::encode(b.bidder)),
            highest_bid: a.highest_amount().to_string(),
            currency: a.highest_bid.as_ref().map(|b| b.currency.to_string()),
            pending_returns: a.pending_returns.len(),
        }
    }
}

/// Auction listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionSummaryRpc {
    pub auction_id: u64,
    pub address: String,
    pub seller: String,
    pub status: String,
    pub end_time: u64,
    pub highest_bid: String,
}

impl From<AuctionSummary> for AuctionSummaryRpc {
    fn from(s: AuctionSummary) -> Self {
        Self {
            auction_id: s.auction_id,
            address: hex::encode(s.address),
            seller: hex::encode(s.seller),
            status: status_str(s.status),
            end_time: s.end_time,
            highest_bid: s
                .highest_bid
                .map(|b| b.amount)
                .unwrap_or(0)
                .to_string(),
        }
    }
}

/// Bridge lock for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRpc {
    pub lock_id: u64,
    pub owner: String,
    pub asset_contract: String,
    pub asset_id: u64,
    pub target_chain_id: u64,
    pub status: String,
}

impl From<LockRecord> for LockRpc {
    fn from(l: LockRecord) -> Self {
        Self {
            lock_id: l.lock_id,
            owner: hex::encode(l.owner),
            asset_contract: hex::encode(l.asset_contract),
            asset_id: l.asset_id,
            target_chain_id: l.target_chain_id,
            status: match l.status {
                LockStatus::Locked => "locked",
                LockStatus::Released => "released",
            }
            .to_string(),
        }
    }
}

/// Message processor configuration for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorRpc {
    pub address: String,
    pub owner: String,
    pub auction_contract: Option<String>,
    pub trusted_relayers: Vec<String>,
    /// (source bridge, source chain id)
    pub bridge_routes: Vec<(String, u64)>,
    pub processed_count: usize,
}

impl From<ProcessorInfo> for ProcessorRpc {
    fn from(p: ProcessorInfo) -> Self {
        Self {
            address: hex::encode(p.address),
            owner: hex::encode(p.owner),
            auction_contract: p.auction_contract.map(hex::encode),
            trusted_relayers: p.trusted_relayers.iter().map(hex::encode).collect(),
            bridge_routes: p
                .bridge_routes
                .iter()
                .map(|(bridge, chain)| (hex::encode(bridge), *chain))
                .collect(),
            processed_count: p.processed_count,
        }
    }
}
