//! Client SDK for NFT auctions and the cross-chain bridge.
//!
//! This crate provides a high-level API for:
//! - Building and attesting cross-chain messages
//! - Submitting calls to the mock chain
//! - Querying auction, bridge and processor state

pub mod message;
pub mod rpc;

pub use message::{BuildError, MessageBuilder};
pub use rpc::{ChainClient, OwedAmountRpc, RpcError, TxReceipt};
