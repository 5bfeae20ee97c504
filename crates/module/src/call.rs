//! Call message types for the auction module.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use auction_types::{Address, Amount, ChainId, CrossChainMessage, OwedAmount};

/// Call messages for the auction module.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionCall {
    // === Host ledger ===
    DeployCollection {
        name: String,
    },
    DeployToken {
        symbol: String,
    },
    MintNft {
        collection: Address,
        to: Address,
        token_uri: String,
    },
    MintTokens {
        token: Address,
        to: Address,
        amount: Amount,
    },
    ApproveNft {
        collection: Address,
        spender: Address,
        token_id: u64,
    },
    ApproveTokens {
        token: Address,
        spender: Address,
        amount: Amount,
    },
    TransferNft {
        collection: Address,
        to: Address,
        token_id: u64,
    },
    TransferTokens {
        token: Address,
        to: Address,
        amount: Amount,
    },
    TransferNative {
        to: Address,
        amount: Amount,
    },

    // === Factory ===
    /// Deploy an auction factory, optionally bound to a bridge and processor.
    DeployFactory {
        bridge: Option<Address>,
        message_processor: Option<Address>,
    },

    /// List an asset. The factory must be approved for it.
    CreateAuction {
        factory: Address,
        asset_contract: Address,
        asset_id: u64,
        starting_price: Amount,
        duration_secs: u64,
    },

    // === Auction instance ===
    /// Bid the attached native value.
    PlaceBidWithNative { auction: Address },

    /// Bid `amount` of `token`; the auction must hold an allowance.
    PlaceBidWithToken {
        auction: Address,
        token: Address,
        amount: Amount,
    },

    /// Seller cancels a live auction.
    Cancel { auction: Address },

    /// Settle an expired auction (permissionless).
    End { auction: Address },

    /// Collect deferred refunds.
    Withdraw { auction: Address },

    // === Message processor ===
    DeployProcessor,
    AddTrustedRelayer {
        processor: Address,
        relayer: Address,
    },
    RemoveTrustedRelayer {
        processor: Address,
        relayer: Address,
    },
    AddBridgeContract {
        processor: Address,
        bridge: Address,
        chain_id: ChainId,
    },
    RemoveBridgeContract {
        processor: Address,
        bridge: Address,
        chain_id: ChainId,
    },
    SetAuctionContract {
        processor: Address,
        auction_contract: Address,
    },
    TransferOwnership {
        processor: Address,
        new_owner: Address,
    },

    /// Submit a relayed message (permissionless; trust comes from the proof).
    ProcessCrossChainMessage {
        processor: Address,
        message: CrossChainMessage,
    },

    // === Bridge ===
    DeployBridge {
        message_processor: Address,
    },
    LockNft {
        bridge: Address,
        asset_contract: Address,
        asset_id: u64,
        target_chain_id: ChainId,
    },
}

impl AuctionCall {
    /// Contract credited with the attached value, for the one payable call.
    pub fn payee(&self) -> Option<Address> {
        match self {
            AuctionCall::PlaceBidWithNative { auction } => Some(*auction),
            _ => None,
        }
    }

    pub fn is_payable(&self) -> bool {
        self.payee().is_some()
    }

    /// Call name used in logs and receipts.
    pub fn name(&self) -> &'static str {
        match self {
            AuctionCall::DeployCollection { .. } => "deploy_collection",
            AuctionCall::DeployToken { .. } => "deploy_token",
            AuctionCall::MintNft { .. } => "mint_nft",
            AuctionCall::MintTokens { .. } => "mint_tokens",
            AuctionCall::ApproveNft { .. } => "approve_nft",
            AuctionCall::ApproveTokens { .. } => "approve_tokens",
            AuctionCall::TransferNft { .. } => "transfer_nft",
            AuctionCall::TransferTokens { .. } => "transfer_tokens",
            AuctionCall::TransferNative { .. } => "transfer_native",
            AuctionCall::DeployFactory { .. } => "deploy_factory",
            AuctionCall::CreateAuction { .. } => "create_auction",
            AuctionCall::PlaceBidWithNative { .. } => "place_bid_with_native",
            AuctionCall::PlaceBidWithToken { .. } => "place_bid_with_token",
            AuctionCall::Cancel { .. } => "cancel",
            AuctionCall::End { .. } => "end",
            AuctionCall::Withdraw { .. } => "withdraw",
            AuctionCall::DeployProcessor => "deploy_processor",
            AuctionCall::AddTrustedRelayer { .. } => "add_trusted_relayer",
            AuctionCall::RemoveTrustedRelayer { .. } => "remove_trusted_relayer",
            AuctionCall::AddBridgeContract { .. } => "add_bridge_contract",
            AuctionCall::RemoveBridgeContract { .. } => "remove_bridge_contract",
            AuctionCall::SetAuctionContract { .. } => "set_auction_contract",
            AuctionCall::TransferOwnership { .. } => "transfer_ownership",
            AuctionCall::ProcessCrossChainMessage { .. } => "process_cross_chain_message",
            AuctionCall::DeployBridge { .. } => "deploy_bridge",
            AuctionCall::LockNft { .. } => "lock_nft",
        }
    }
}

/// Value returned by a successful call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    Unit,
    Deployed(Address),
    AuctionCreated { auction_id: u64, auction: Address },
    NftMinted(u64),
    Locked(u64),
    Withdrawn(Vec<OwedAmount>),
    MessageProcessed([u8; 32]),
}
