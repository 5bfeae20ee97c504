//! Core type definitions for NFT auctions and the cross-chain bridge.
//!
//! This crate provides the shared data structures used across the system:
//! auction and lock records, currencies, the cross-chain message wire format,
//! emitted event records, and address derivation helpers.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::fmt;

pub mod events;
pub mod message;

pub use events::{Event, EventRecord};
pub use message::{
    compute_message_id, CrossChainMessage, Instruction, MessageError, MessagePayload,
    RelayerAttestation, MESSAGE_MAGIC, MESSAGE_VERSION,
};

// =========================
// PRIMITIVES
// =========================

/// Generic address type (32 bytes)
pub type Address = [u8; 32];

/// Identifier of a ledger participating in cross-chain messaging
pub type ChainId = u64;

/// Token, native and bid amounts
pub type Amount = u128;

/// The all-zero address, never owned by anyone
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Compressed G1 point on BLS12-381 (48 bytes)
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct G1Point(#[serde_as(as = "[_; 48]")] pub [u8; 48]);

impl Default for G1Point {
    fn default() -> Self {
        Self([0u8; 48])
    }
}

/// Compressed G2 point on BLS12-381 (96 bytes)
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct G2Point(#[serde_as(as = "[_; 96]")] pub [u8; 96]);

impl Default for G2Point {
    fn default() -> Self {
        Self([0u8; 96])
    }
}

// =========================
// AUCTION TYPES
// =========================

/// Currency a bid was placed in.
///
/// Bids are compared on raw amount regardless of currency; the currency is
/// tracked so refunds and proceeds go back in the right denomination.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum Currency {
    /// Native ledger value attached to the call
    Native,
    /// Fungible token at the given contract address
    Token(Address),
    /// Value escrowed on another ledger, settled by relayers
    Remote(ChainId),
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Native => write!(f, "native"),
            Currency::Token(addr) => write!(f, "token:{}", hex::encode(addr)),
            Currency::Remote(chain) => write!(f, "remote:{}", chain),
        }
    }
}

/// Auction lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionStatus {
    /// Listed; accepting bids while inside the time window
    Open,
    /// Cancelled by the seller
    Cancelled,
    /// Settled through `end`
    Ended,
}

/// The currently leading bid.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct HighestBid {
    pub bidder: Address,
    pub amount: Amount,
    pub currency: Currency,
}

/// A refund that could not be pushed and waits for `withdraw`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct PendingReturn {
    pub bidder: Address,
    pub currency: Currency,
    pub amount: Amount,
}

/// Total deferred refunds owed to one bidder in one currency.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct OwedAmount {
    pub currency: Currency,
    pub amount: Amount,
}

/// Full state of one auction instance.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AuctionInfo {
    /// Sequential id assigned by the owning factory
    pub auction_id: u64,
    /// Contract address of this instance
    pub address: Address,
    /// Factory that created and tracks this instance
    pub factory: Address,
    pub seller: Address,

    // Asset under auction
    pub asset_contract: Address,
    pub asset_id: u64,

    // Rules
    pub starting_price: Amount,

    // Timing (inclusive window)
    pub start_time: u64,
    pub end_time: u64,

    pub highest_bid: Option<HighestBid>,
    pub status: AuctionStatus,
    pub pending_returns: Vec<PendingReturn>,
}

impl AuctionInfo {
    /// Whether a bid at `now` falls inside the live window.
    pub fn accepts_bids_at(&self, now: u64) -> bool {
        self.status == AuctionStatus::Open && now >= self.start_time && now <= self.end_time
    }

    /// Whether the instance has been cancelled or ended.
    pub fn is_ended(&self) -> bool {
        self.status != AuctionStatus::Open
    }

    /// Current leading amount, zero when no bid exists.
    pub fn highest_amount(&self) -> Amount {
        self.highest_bid.as_ref().map(|b| b.amount).unwrap_or(0)
    }

    /// Deferred refunds owed to `bidder`, one entry per currency in the
    /// order each currency was first deferred.
    pub fn owed_to(&self, bidder: &Address) -> Vec<OwedAmount> {
        let mut owed: Vec<OwedAmount> = Vec::new();
        for entry in self.pending_returns.iter().filter(|r| r.bidder == *bidder) {
            match owed.iter_mut().find(|o| o.currency == entry.currency) {
                Some(total) => total.amount = total.amount.saturating_add(entry.amount),
                None => owed.push(OwedAmount {
                    currency: entry.currency,
                    amount: entry.amount,
                }),
            }
        }
        owed
    }
}

// =========================
// BRIDGE TYPES
// =========================

/// Lock lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum LockStatus {
    Locked,
    Released,
}

/// Record of an asset held in bridge custody.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct LockRecord {
    pub lock_id: u64,
    pub owner: Address,
    pub asset_contract: Address,
    pub asset_id: u64,
    pub target_chain_id: ChainId,
    pub status: LockStatus,
}

// =========================
// HELPER FUNCTIONS
// =========================

/// Derive the address of a contract deployed by `deployer` at `nonce`.
pub fn compute_contract_address(kind: &str, deployer: &Address, nonce: u64) -> Address {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"CONTRACT_ADDRESS_V1:");
    hasher.update(kind.as_bytes());
    hasher.update(b":");
    hasher.update(deployer);
    hasher.update(nonce.to_le_bytes());
    hasher.finalize().into()
}

/// Derive the account identity of a relayer from its BLS public key.
pub fn relayer_address(public_key: &G2Point) -> Address {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"RELAYER_ADDRESS_V1:");
    hasher.update(public_key.0);
    hasher.finalize().into()
}

/// Parse a hex address, with or without `0x` prefix. Must be exactly 32 bytes.
pub fn parse_address(s: &str) -> Option<Address> {
    let bytes = hex::decode(s.trim_start_matches("0x")).ok()?;
    bytes.try_into().ok()
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    Sha256::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_auction() -> AuctionInfo {
        AuctionInfo {
            auction_id: 1,
            address: [9u8; 32],
            factory: [8u8; 32],
            seller: [1u8; 32],
            asset_contract: [2u8; 32],
            asset_id: 1,
            starting_price: 1000,
            start_time: 100,
            end_time: 200,
            highest_bid: None,
            status: AuctionStatus::Open,
            pending_returns: Vec::new(),
        }
    }

    #[test]
    fn test_contract_address_depends_on_all_inputs() {
        let deployer = [1u8; 32];
        let a = compute_contract_address("factory", &deployer, 0);
        let b = compute_contract_address("factory", &deployer, 1);
        let c = compute_contract_address("bridge", &deployer, 0);
        let d = compute_contract_address("factory", &[2u8; 32], 0);

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a, compute_contract_address("factory", &deployer, 0));
    }

    #[test]
    fn test_bid_window_is_inclusive() {
        let auction = sample_auction();
        assert!(!auction.accepts_bids_at(99));
        assert!(auction.accepts_bids_at(100));
        assert!(auction.accepts_bids_at(200));
        assert!(!auction.accepts_bids_at(201));
    }

    #[test]
    fn test_ended_auction_rejects_inside_window() {
        let mut auction = sample_auction();
        auction.status = AuctionStatus::Cancelled;
        assert!(auction.is_ended());
        assert!(!auction.accepts_bids_at(150));
    }

    #[test]
    fn test_owed_amounts_are_kept_per_currency() {
        let alice = [3u8; 32];
        let token = [4u8; 32];
        let mut auction = sample_auction();
        for (bidder, currency, amount) in [
            (alice, Currency::Token(token), 50),
            (alice, Currency::Native, 10),
            ([5u8; 32], Currency::Native, 99),
            (alice, Currency::Native, 20),
        ] {
            auction.pending_returns.push(PendingReturn {
                bidder,
                currency,
                amount,
            });
        }

        assert_eq!(
            auction.owed_to(&alice),
            vec![
                OwedAmount {
                    currency: Currency::Token(token),
                    amount: 50
                },
                OwedAmount {
                    currency: Currency::Native,
                    amount: 30
                },
            ]
        );
        assert!(auction.owed_to(&[6u8; 32]).is_empty());
    }

    #[test]
    fn test_parse_address() {
        let addr = [0xabu8; 32];
        let encoded = hex::encode(addr);
        assert_eq!(parse_address(&encoded), Some(addr));
        assert_eq!(parse_address(&format!("0x{}", encoded)), Some(addr));
        assert_eq!(parse_address("abcd"), None);
        assert_eq!(parse_address("not hex"), None);
    }

    #[test]
    fn test_currency_display() {
        assert_eq!(Currency::Native.to_string(), "native");
        assert_eq!(Currency::Remote(7).to_string(), "remote:7");
        assert!(Currency::Token([1u8; 32]).to_string().starts_with("token:0101"));
    }

    #[test]
    fn test_g1_point_serialization() {
        let point = G1Point([42u8; 48]);
        let encoded = borsh::to_vec(&point).unwrap();
        let decoded: G1Point = borsh::from_slice(&encoded).unwrap();
        assert_eq!(point, decoded);
    }
}
