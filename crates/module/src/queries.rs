//! Query handlers for the auction module.
//!
//! These functions provide read-only access to module state.

use serde::{Deserialize, Serialize};

use auction_types::{
    Address, Amount, AuctionInfo, AuctionStatus, ChainId, EventRecord, HighestBid, LockRecord,
    OwedAmount,
};

use crate::state::{ModuleState, ProcessorState};

/// Query request types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQuery {
    /// Full state of one auction instance.
    GetAuction { auction: Address },

    /// Number of live auctions tracked by a factory.
    GetAuctionCount { factory: Address },

    /// Address of a live auction by its factory id.
    GetAuctionById { factory: Address, auction_id: u64 },

    /// Auctions currently accepting bids.
    ListActiveAuctions { now: u64 },

    /// Auctions past their window that nobody has ended yet.
    ListExpiredAuctions { now: u64 },

    /// Deferred refunds owed to `bidder`.
    GetPendingReturns { auction: Address, bidder: Address },

    GetLock { bridge: Address, lock_id: u64 },

    GetProcessor { processor: Address },

    IsMessageProcessed {
        processor: Address,
        message_id: [u8; 32],
    },

    NativeBalance { owner: Address },

    TokenBalance { token: Address, owner: Address },

    TokenAllowance {
        token: Address,
        owner: Address,
        spender: Address,
    },

    NftOwner { collection: Address, token_id: u64 },

    /// Emitted records, oldest first.
    GetEvents { from_index: u64, limit: usize },
}

/// Query response types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQueryResponse {
    Auction(Option<AuctionInfo>),
    AuctionCount(u64),
    AuctionAddress(Option<Address>),
    AuctionList(Vec<AuctionSummary>),
    PendingReturns(Vec<OwedAmount>),
    Lock(Option<LockRecord>),
    Processor(Option<ProcessorInfo>),
    MessageProcessed(bool),
    Balance(Amount),
    Owner(Option<Address>),
    Events(Vec<EventRecord>),
}

/// Handle a query.
pub fn handle_query(state: &ModuleState, query: AuctionQuery) -> AuctionQueryResponse {
    match query {
        AuctionQuery::GetAuction { auction } => {
            AuctionQueryResponse::Auction(state.auctions.get(&auction).cloned())
        }

        AuctionQuery::GetAuctionCount { factory } => AuctionQueryResponse::AuctionCount(
            state
                .factories
                .get(&factory)
                .map(|f| f.auction_count())
                .unwrap_or(0),
        ),

        AuctionQuery::GetAuctionById {
            factory,
            auction_id,
        } => AuctionQueryResponse::AuctionAddress(
            state
                .factories
                .get(&factory)
                .and_then(|f| f.live_auctions.get(&auction_id).copied()),
        ),

        AuctionQuery::ListActiveAuctions { now } => {
            AuctionQueryResponse::AuctionList(get_active_auctions(state, now))
        }

        AuctionQuery::ListExpiredAuctions { now } => {
            AuctionQueryResponse::AuctionList(get_expired_auctions(state, now))
        }

        AuctionQuery::GetPendingReturns { auction, bidder } => {
            let owed = state
                .auctions
                .get(&auction)
                .map(|info| info.owed_to(&bidder))
                .unwrap_or_default();
            AuctionQueryResponse::PendingReturns(owed)
        }

        AuctionQuery::GetLock { bridge, lock_id } => AuctionQueryResponse::Lock(
            state
                .bridges
                .get(&bridge)
                .and_then(|b| b.locks.get(&lock_id).cloned()),
        ),

        AuctionQuery::GetProcessor { processor } => AuctionQueryResponse::Processor(
            state.processors.get(&processor).map(ProcessorInfo::from),
        ),

        AuctionQuery::IsMessageProcessed {
            processor,
            message_id,
        } => AuctionQueryResponse::MessageProcessed(
            state
                .processors
                .get(&processor)
                .map(|p| p.processed_messages.contains(&message_id))
                .unwrap_or(false),
        ),

        AuctionQuery::NativeBalance { owner } => {
            AuctionQueryResponse::Balance(state.ledger.native_balance(&owner))
        }

        AuctionQuery::TokenBalance { token, owner } => AuctionQueryResponse::Balance(
            state
                .ledger
                .token(&token)
                .map(|t| t.balance_of(&owner))
                .unwrap_or(0),
        ),

        AuctionQuery::TokenAllowance {
            token,
            owner,
            spender,
        } => AuctionQueryResponse::Balance(
            state
                .ledger
                .token(&token)
                .map(|t| t.allowance(&owner, &spender))
                .unwrap_or(0),
        ),

        AuctionQuery::NftOwner {
            collection,
            token_id,
        } => AuctionQueryResponse::Owner(
            state
                .ledger
                .asset_registry(&collection)
                .and_then(|c| c.owner_of(token_id))
                .ok(),
        ),

        AuctionQuery::GetEvents { from_index, limit } => {
            AuctionQueryResponse::Events(state.events.since(from_index, limit).to_vec())
        }
    }
}

/// Summary of an auction for listing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuctionSummary {
    pub auction_id: u64,
    pub address: Address,
    pub factory: Address,
    pub seller: Address,
    pub status: AuctionStatus,
    pub end_time: u64,
    pub highest_bid: Option<HighestBid>,
}

impl From<&AuctionInfo> for AuctionSummary {
    fn from(info: &AuctionInfo) -> Self {
        Self {
            auction_id: info.auction_id,
            address: info.address,
            factory: info.factory,
            seller: info.seller,
            status: info.status,
            end_time: info.end_time,
            highest_bid: info.highest_bid.clone(),
        }
    }
}

/// Read view of a message processor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessorInfo {
    pub address: Address,
    pub owner: Address,
    pub auction_contract: Option<Address>,
    pub trusted_relayers: Vec<Address>,
    pub bridge_routes: Vec<(Address, ChainId)>,
    pub processed_count: usize,
}

impl From<&ProcessorState> for ProcessorInfo {
    fn from(p: &ProcessorState) -> Self {
        Self {
            address: p.address,
            owner: p.owner,
            auction_contract: p.auction_contract,
            trusted_relayers: p.trusted_relayers.iter().copied().collect(),
            bridge_routes: p.bridge_routes.iter().copied().collect(),
            processed_count: p.processed_messages.len(),
        }
    }
}

/// Get active auctions (currently accepting bids).
pub fn get_active_auctions(state: &ModuleState, now: u64) -> Vec<AuctionSummary> {
    state
        .auctions
        .values()
        .filter(|info| info.accepts_bids_at(now))
        .map(AuctionSummary::from)
        .collect()
}

/// Get auctions that can be ended now.
pub fn get_expired_auctions(state: &ModuleState, now: u64) -> Vec<AuctionSummary> {
    state
        .auctions
        .values()
        .filter(|info| !info.is_ended() && now > info.end_time)
        .map(AuctionSummary::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{self, CallContext};
    use crate::host;

    const SELLER: Address = [1u8; 32];

    fn state_with_auction() -> (ModuleState, Address, Address) {
        let mut state = ModuleState::new(1);
        let ctx = CallContext::new(SELLER, 1, 1_000);
        let factory = handlers::handle_deploy_factory(&mut state, &ctx, None, None).unwrap();
        let collection = host::handle_deploy_collection(&mut state, &ctx, "Art".into()).unwrap();
        let token_id =
            host::handle_mint_nft(&mut state, &ctx, collection, SELLER, String::new()).unwrap();
        host::handle_approve_nft(&mut state, &ctx, collection, factory, token_id).unwrap();
        let (_, auction) =
            handlers::handle_create_auction(&mut state, &ctx, factory, collection, token_id, 10, 100)
                .unwrap();
        (state, factory, auction)
    }

    #[test]
    fn test_factory_lookups() {
        let (state, factory, auction) = state_with_auction();
        assert!(matches!(
            handle_query(&state, AuctionQuery::GetAuctionCount { factory }),
            AuctionQueryResponse::AuctionCount(1)
        ));
        match handle_query(
            &state,
            AuctionQuery::GetAuctionById {
                factory,
                auction_id: 1,
            },
        ) {
            AuctionQueryResponse::AuctionAddress(found) => assert_eq!(found, Some(auction)),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_active_and_expired_views() {
        let (state, _, auction) = state_with_auction();
        assert_eq!(get_active_auctions(&state, 1_100).len(), 1);
        assert!(get_expired_auctions(&state, 1_100).is_empty());

        assert!(get_active_auctions(&state, 1_101).is_empty());
        let expired = get_expired_auctions(&state, 1_101);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].address, auction);
    }

    #[test]
    fn test_unknown_token_balance_is_zero() {
        let state = ModuleState::new(1);
        assert!(matches!(
            handle_query(
                &state,
                AuctionQuery::TokenBalance {
                    token: [9u8; 32],
                    owner: SELLER
                }
            ),
            AuctionQueryResponse::Balance(0)
        ));
    }
}
