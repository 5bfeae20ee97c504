//! Auction module error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use auction_types::{Address, Amount, ChainId};

/// Rejection categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad call parameters
    Validation,
    /// Caller identity check failed
    Authorization,
    /// Operation not valid in the current state
    State,
    /// Funds or bid amount insufficient
    Economic,
    /// Cross-chain message or lock rejected
    Trust,
}

/// Errors that can occur in the auction module.
///
/// Every error aborts the whole call; the runtime discards all side effects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    // === Validation ===
    #[error("Starting price must be greater than zero")]
    InvalidStartingPrice,

    #[error("Duration must be greater than zero")]
    InvalidDuration,

    #[error("Chain id must be non-zero")]
    InvalidChainId,

    #[error("Call does not accept value")]
    UnexpectedValue,

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Zero address not allowed")]
    ZeroAddress,

    // === Authorization ===
    #[error("Only seller can call this function")]
    NotSeller,

    #[error("Ownable: caller is not the owner")]
    NotOwner,

    #[error("Caller does not own the asset")]
    NotAssetOwner,

    #[error("Asset not approved for transfer")]
    NotApproved,

    #[error("Not authorized")]
    NotAuthorized,

    // === State ===
    #[error("Auction has not started")]
    AuctionNotStarted,

    #[error("Auction has ended")]
    AuctionEnded,

    #[error("Auction already ended")]
    AlreadyEnded,

    #[error("Auction is still open")]
    AuctionStillOpen,

    #[error("Auction not found: {0}")]
    AuctionNotFound(u64),

    #[error("Unknown contract: {}", hex::encode(.0))]
    UnknownContract(Address),

    #[error("Unknown asset: {0}")]
    UnknownAsset(u64),

    #[error("Message processor has no auction contract set")]
    AuctionContractNotSet,

    #[error("No bridge configured for this factory")]
    BridgeNotConfigured,

    #[error("Relayer not registered: {}", hex::encode(.0))]
    UnknownRelayer(Address),

    #[error("Bridge route not registered for chain {chain_id}")]
    UnknownRoute { bridge: Address, chain_id: ChainId },

    // === Economic ===
    #[error("Bid not high enough")]
    BidTooLow,

    #[error("Insufficient allowance: need {required}, have {available}")]
    InsufficientAllowance { required: Amount, available: Amount },

    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Nothing to withdraw")]
    NothingToWithdraw,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    // === Trust ===
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Message already processed")]
    ReplayDetected,

    #[error("Unknown lock: {0}")]
    UnknownLock(u64),
}

impl AuctionError {
    /// Category of this rejection.
    pub fn kind(&self) -> ErrorKind {
        use AuctionError::*;
        match self {
            InvalidStartingPrice | InvalidDuration | InvalidChainId | UnexpectedValue
            | ZeroAmount | ZeroAddress => ErrorKind::Validation,

            NotSeller | NotOwner | NotAssetOwner | NotApproved | NotAuthorized => {
                ErrorKind::Authorization
            }

            AuctionNotStarted | AuctionEnded | AlreadyEnded | AuctionStillOpen
            | AuctionNotFound(_) | UnknownContract(_) | UnknownAsset(_)
            | AuctionContractNotSet | BridgeNotConfigured | UnknownRelayer(_)
            | UnknownRoute { .. } => ErrorKind::State,

            BidTooLow | InsufficientAllowance { .. } | InsufficientBalance { .. }
            | NothingToWithdraw | ArithmeticOverflow => ErrorKind::Economic,

            InvalidMessage(_) | ReplayDetected | UnknownLock(_) => ErrorKind::Trust,
        }
    }

    /// Stable rejection code.
    pub fn code(&self) -> &'static str {
        use AuctionError::*;
        match self {
            InvalidStartingPrice => "InvalidStartingPrice",
            InvalidDuration => "InvalidDuration",
            InvalidChainId => "InvalidChainId",
            UnexpectedValue => "UnexpectedValue",
            ZeroAmount => "ZeroAmount",
            ZeroAddress => "ZeroAddress",
            NotSeller => "NotSeller",
            NotOwner => "NotOwner",
            NotAssetOwner => "NotAssetOwner",
            NotApproved => "NotApproved",
            NotAuthorized => "NotAuthorized",
            AuctionNotStarted => "AuctionNotStarted",
            AuctionEnded => "AuctionEnded",
            AlreadyEnded => "AlreadyEnded",
            AuctionStillOpen => "AuctionStillOpen",
            AuctionNotFound(_) => "AuctionNotFound",
            UnknownContract(_) => "UnknownContract",
            UnknownAsset(_) => "UnknownAsset",
            AuctionContractNotSet => "AuctionContractNotSet",
            BridgeNotConfigured => "BridgeNotConfigured",
            UnknownRelayer(_) => "UnknownRelayer",
            UnknownRoute { .. } => "UnknownRoute",
            BidTooLow => "BidTooLow",
            InsufficientAllowance { .. } => "InsufficientAllowance",
            InsufficientBalance { .. } => "InsufficientBalance",
            NothingToWithdraw => "NothingToWithdraw",
            ArithmeticOverflow => "ArithmeticOverflow",
            InvalidMessage(_) => "InvalidMessage",
            ReplayDetected => "ReplayDetected",
            UnknownLock(_) => "UnknownLock",
        }
    }
}
