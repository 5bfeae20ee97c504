//! NFT auction module with a cross-chain message processor and bridge.
//!
//! This module implements on-chain logic for time-boxed NFT auctions:
//!
//! - Auction factory that takes custody of listed assets
//! - Bids in native value, fungible tokens, or relayed from another chain
//! - Immediate refunds of displaced bids, with a withdrawable fallback
//! - Settlement to the winner, or through the bridge for remote winners
//! - Message processor that checks relayer attestations and replay
//! - Bridge custody released only by validated unlock instructions
//!
//! # Architecture
//!
//! - `call`: Message types for state-changing operations
//! - `runtime`: Atomic execution of calls
//! - `handlers`: Factory and auction logic
//! - `processor` / `bridge`: Cross-chain contracts
//! - `host` / `ledger`: In-memory tokens, collections and native balances
//! - `queries`: Read-only state access
//! - `state`: On-chain state structures
//! - `genesis`: Initial configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```ignore
//! use auction_module::{execute, AuctionCall, CallContext, ModuleState};
//!
//! let mut state = ModuleState::new(1);
//! let ctx = CallContext::new(seller, height, timestamp);
//!
//! // List an asset the factory has been approved for
//! execute(&mut state, &ctx, AuctionCall::CreateAuction { .. })?;
//!
//! // Bid with attached native value
//! execute(&mut state, &ctx.with_value(2_000), AuctionCall::PlaceBidWithNative { auction })?;
//! ```

pub mod bridge;
pub mod call;
pub mod error;
pub mod events;
pub mod genesis;
pub mod handlers;
pub mod host;
pub mod ledger;
pub mod processor;
pub mod queries;
pub mod runtime;
pub mod state;

pub use call::{AuctionCall, CallOutcome};
pub use error::{AuctionError, ErrorKind};
pub use events::EventLog;
pub use genesis::{GenesisAccount, GenesisConfig, GenesisValidationError};
pub use handlers::{CallContext, HandlerResult};
pub use ledger::{AssetRegistry, FungibleToken};
pub use queries::{handle_query, AuctionQuery, AuctionQueryResponse, AuctionSummary, ProcessorInfo};
pub use runtime::execute;
pub use state::ModuleState;
