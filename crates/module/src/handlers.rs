//! Call handlers for the auction factory and auction instances.
//!
//! These functions implement the business logic for each call type. They
//! mutate state in place; atomicity comes from the runtime, which runs them
//! against a staged copy.

use tracing::warn;

use auction_types::{
    Address, Amount, AuctionInfo, AuctionStatus, ChainId, Currency, Event, HighestBid,
    OwedAmount, PendingReturn,
};

use crate::bridge;
use crate::error::AuctionError;
use crate::state::{FactoryState, ModuleState};

/// Context provided by the runtime for each call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// Sender of the transaction, or the calling contract
    pub sender: Address,
    /// Current block height
    pub block_height: u64,
    /// Current timestamp
    pub timestamp: u64,
    /// Native value attached to the call
    pub value: Amount,
}

impl CallContext {
    pub fn new(sender: Address, block_height: u64, timestamp: u64) -> Self {
        Self {
            sender,
            block_height,
            timestamp,
            value: 0,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    /// Context for a call made by `contract` during this call.
    pub fn as_contract(&self, contract: Address) -> Self {
        Self {
            sender: contract,
            block_height: self.block_height,
            timestamp: self.timestamp,
            value: 0,
        }
    }
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, AuctionError>;

// =========================
// FACTORY
// =========================

/// Handle DeployFactory call.
pub fn handle_deploy_factory(
    state: &mut ModuleState,
    ctx: &CallContext,
    bridge: Option<Address>,
    message_processor: Option<Address>,
) -> HandlerResult<Address> {
    if let Some(bridge) = bridge {
        state.bridge(&bridge)?;
    }
    if let Some(processor) = message_processor {
        state.processor(&processor)?;
    }

    let address = state.allocate_contract_address("factory", &ctx.sender);
    state.factories.insert(
        address,
        FactoryState::new(address, ctx.sender, bridge, message_processor),
    );
    state.events.emit(
        ctx,
        Event::ContractDeployed {
            kind: "factory".into(),
            address,
            deployer: ctx.sender,
        },
    );
    Ok(address)
}

/// Handle CreateAuction call.
///
/// The seller must have approved the factory for the asset. Custody moves
/// straight to the new auction instance.
pub fn handle_create_auction(
    state: &mut ModuleState,
    ctx: &CallContext,
    factory: Address,
    asset_contract: Address,
    asset_id: u64,
    starting_price: Amount,
    duration_secs: u64,
) -> HandlerResult<(u64, Address)> {
    state.factory(&factory)?;

    if starting_price == 0 {
        return Err(AuctionError::InvalidStartingPrice);
    }
    if duration_secs == 0 {
        return Err(AuctionError::InvalidDuration);
    }

    let registry = state.ledger.asset_registry(&asset_contract)?;
    if registry.owner_of(asset_id)? != ctx.sender {
        return Err(AuctionError::NotAssetOwner);
    }
    if registry.get_approved(asset_id)? != Some(factory) {
        return Err(AuctionError::NotApproved);
    }

    let end_time = ctx
        .timestamp
        .checked_add(duration_secs)
        .ok_or(AuctionError::ArithmeticOverflow)?;

    let address = state.allocate_contract_address("auction", &factory);
    state
        .ledger
        .asset_registry_mut(&asset_contract)?
        .transfer_from(&factory, &ctx.sender, address, asset_id)?;

    let factory_state = state.factory_mut(&factory)?;
    let auction_id = factory_state.allocate_auction_id();
    factory_state.live_auctions.insert(auction_id, address);

    state.auctions.insert(
        address,
        AuctionInfo {
            auction_id,
            address,
            factory,
            seller: ctx.sender,
            asset_contract,
            asset_id,
            starting_price,
            start_time: ctx.timestamp,
            end_time,
            highest_bid: None,
            status: AuctionStatus::Open,
            pending_returns: Vec::new(),
        },
    );

    state.events.emit(
        ctx,
        Event::AuctionCreated {
            factory,
            auction_id,
            auction: address,
            seller: ctx.sender,
            asset_contract,
            asset_id,
            starting_price,
            end_time,
        },
    );

    Ok((auction_id, address))
}

/// Remove a closed auction from its factory's live set.
///
/// Only the auction instance registered under `auction_id` may call this.
pub fn handle_deregister_auction(
    state: &mut ModuleState,
    ctx: &CallContext,
    factory: Address,
    auction_id: u64,
) -> HandlerResult<()> {
    let factory_state = state.factory_mut(&factory)?;
    match factory_state.live_auctions.get(&auction_id) {
        Some(registered) if *registered == ctx.sender => {
            factory_state.live_auctions.remove(&auction_id);
            Ok(())
        }
        _ => Err(AuctionError::NotAuthorized),
    }
}

// =========================
// AUCTION INSTANCE
// =========================

/// Reject bids outside the live window. The window, not the status flag, is
/// the primary gate: an expired auction rejects bids before `end` runs.
fn ensure_accepting_bids(auction: &AuctionInfo, now: u64) -> HandlerResult<()> {
    if auction.is_ended() || now > auction.end_time {
        return Err(AuctionError::AuctionEnded);
    }
    if now < auction.start_time {
        return Err(AuctionError::AuctionNotStarted);
    }
    Ok(())
}

/// First bid must reach the starting price; later bids must beat the leader.
fn ensure_outbids(auction: &AuctionInfo, amount: Amount) -> HandlerResult<()> {
    let too_low = match &auction.highest_bid {
        None => amount < auction.starting_price,
        Some(leader) => amount <= leader.amount,
    };
    if too_low {
        return Err(AuctionError::BidTooLow);
    }
    Ok(())
}

/// Handle PlaceBidWithNative call. The bid amount is the attached value,
/// already moved into the auction's balance by the runtime.
pub fn handle_place_bid_with_native(
    state: &mut ModuleState,
    ctx: &CallContext,
    auction: Address,
) -> HandlerResult<()> {
    let info = state.auction(&auction)?;
    ensure_accepting_bids(info, ctx.timestamp)?;
    ensure_outbids(info, ctx.value)?;

    record_highest_bid(
        state,
        ctx,
        auction,
        HighestBid {
            bidder: ctx.sender,
            amount: ctx.value,
            currency: Currency::Native,
        },
    )
}

/// Handle PlaceBidWithToken call.
///
/// The allowance is checked before the amount so a bidder who has spent
/// their approval learns that first.
pub fn handle_place_bid_with_token(
    state: &mut ModuleState,
    ctx: &CallContext,
    auction: Address,
    token: Address,
    amount: Amount,
) -> HandlerResult<()> {
    let info = state.auction(&auction)?;
    ensure_accepting_bids(info, ctx.timestamp)?;

    let available = state.ledger.token(&token)?.allowance(&ctx.sender, &auction);
    if available < amount {
        return Err(AuctionError::InsufficientAllowance {
            required: amount,
            available,
        });
    }
    ensure_outbids(state.auction(&auction)?, amount)?;

    state
        .ledger
        .token_mut(&token)?
        .transfer_from(&auction, &ctx.sender, auction, amount)?;

    record_highest_bid(
        state,
        ctx,
        auction,
        HighestBid {
            bidder: ctx.sender,
            amount,
            currency: Currency::Token(token),
        },
    )
}

/// Handle a bid escrowed on another chain, forwarded by the factory's
/// message processor.
pub fn handle_place_remote_bid(
    state: &mut ModuleState,
    ctx: &CallContext,
    auction: Address,
    source_chain_id: ChainId,
    bidder: Address,
    amount: Amount,
) -> HandlerResult<()> {
    let info = state.auction(&auction)?;
    let factory = state.factory(&info.factory)?;
    if factory.message_processor != Some(ctx.sender) {
        return Err(AuctionError::NotAuthorized);
    }
    if factory.bridge.is_none() {
        return Err(AuctionError::BridgeNotConfigured);
    }
    if source_chain_id == 0 {
        return Err(AuctionError::InvalidChainId);
    }

    ensure_accepting_bids(info, ctx.timestamp)?;
    ensure_outbids(info, amount)?;

    record_highest_bid(
        state,
        ctx,
        auction,
        HighestBid {
            bidder,
            amount,
            currency: Currency::Remote(source_chain_id),
        },
    )
}

/// Install `bid` as the leader and refund whoever it displaced.
fn record_highest_bid(
    state: &mut ModuleState,
    ctx: &CallContext,
    auction: Address,
    bid: HighestBid,
) -> HandlerResult<()> {
    let event = Event::BidPlaced {
        auction,
        bidder: bid.bidder,
        amount: bid.amount,
        currency: bid.currency,
    };
    let displaced = state.auction_mut(&auction)?.highest_bid.replace(bid);
    if let Some(previous) = displaced {
        refund_bid(state, ctx, auction, previous)?;
    }
    state.events.emit(ctx, event);
    Ok(())
}

/// Pay funds held by `auction` out to `recipient`.
///
/// Remote funds never sit on this ledger; they are announced with a
/// `RemotePaymentDue` record for relayers to settle.
fn push_funds(
    state: &mut ModuleState,
    ctx: &CallContext,
    auction: Address,
    recipient: Address,
    currency: Currency,
    amount: Amount,
) -> HandlerResult<()> {
    match currency {
        Currency::Native => state.ledger.transfer_native(&auction, recipient, amount),
        Currency::Token(token) => state
            .ledger
            .token_mut(&token)?
            .transfer(&auction, recipient, amount),
        Currency::Remote(chain_id) => {
            state.events.emit(
                ctx,
                Event::RemotePaymentDue {
                    auction,
                    chain_id,
                    recipient,
                    amount,
                },
            );
            Ok(())
        }
    }
}

/// Return a displaced bid. A failed push never blocks the caller: the
/// amount is parked in `pending_returns` for the bidder to withdraw.
fn refund_bid(
    state: &mut ModuleState,
    ctx: &CallContext,
    auction: Address,
    bid: HighestBid,
) -> HandlerResult<()> {
    match push_funds(state, ctx, auction, bid.bidder, bid.currency, bid.amount) {
        Ok(()) => {
            state.events.emit(
                ctx,
                Event::BidRefunded {
                    auction,
                    bidder: bid.bidder,
                    amount: bid.amount,
                    currency: bid.currency,
                },
            );
        }
        Err(e) => {
            warn!(
                auction = %hex::encode(auction),
                bidder = %hex::encode(bid.bidder),
                amount = %bid.amount,
                "refund deferred: {}", e
            );
            state.auction_mut(&auction)?.pending_returns.push(PendingReturn {
                bidder: bid.bidder,
                currency: bid.currency,
                amount: bid.amount,
            });
            state.events.emit(
                ctx,
                Event::RefundDeferred {
                    auction,
                    bidder: bid.bidder,
                    amount: bid.amount,
                    currency: bid.currency,
                },
            );
        }
    }
    Ok(())
}

/// Handle Withdraw call: pay out every deferred refund owed to the caller.
/// Returns what was paid, totalled per currency.
pub fn handle_withdraw(
    state: &mut ModuleState,
    ctx: &CallContext,
    auction: Address,
) -> HandlerResult<Vec<OwedAmount>> {
    let info = state.auction(&auction)?;
    let paid = info.owed_to(&ctx.sender);
    if paid.is_empty() {
        return Err(AuctionError::NothingToWithdraw);
    }
    let owed: Vec<PendingReturn> = info
        .pending_returns
        .iter()
        .filter(|r| r.bidder == ctx.sender)
        .cloned()
        .collect();

    for entry in owed {
        push_funds(state, ctx, auction, entry.bidder, entry.currency, entry.amount)?;
        state.events.emit(
            ctx,
            Event::RefundWithdrawn {
                auction,
                bidder: entry.bidder,
                amount: entry.amount,
                currency: entry.currency,
            },
        );
    }
    state
        .auction_mut(&auction)?
        .pending_returns
        .retain(|r| r.bidder != ctx.sender);
    Ok(paid)
}

/// Handle Cancel call: seller only, while the auction is live.
pub fn handle_cancel(
    state: &mut ModuleState,
    ctx: &CallContext,
    auction: Address,
) -> HandlerResult<()> {
    let info = state.auction(&auction)?;
    if ctx.sender != info.seller {
        return Err(AuctionError::NotSeller);
    }
    if info.is_ended() || ctx.timestamp > info.end_time {
        return Err(AuctionError::AuctionEnded);
    }
    let seller = info.seller;
    let factory = info.factory;
    let auction_id = info.auction_id;
    let asset_contract = info.asset_contract;
    let asset_id = info.asset_id;

    let outstanding = state.auction_mut(&auction)?.highest_bid.take();
    if let Some(bid) = outstanding {
        refund_bid(state, ctx, auction, bid)?;
    }

    state
        .ledger
        .asset_registry_mut(&asset_contract)?
        .transfer_from(&auction, &auction, seller, asset_id)?;

    state.auction_mut(&auction)?.status = AuctionStatus::Cancelled;
    handle_deregister_auction(state, &ctx.as_contract(auction), factory, auction_id)?;

    state
        .events
        .emit(ctx, Event::AuctionCancelled { auction, seller });
    Ok(())
}

/// Handle End call: anyone, once the window has passed.
///
/// A local winner receives the asset and the seller the escrowed funds. A
/// remote winner gets the asset locked in the factory's bridge, targeted at
/// the chain the bid came from.
pub fn handle_end(
    state: &mut ModuleState,
    ctx: &CallContext,
    auction: Address,
) -> HandlerResult<()> {
    let info = state.auction(&auction)?.clone();
    if info.is_ended() {
        return Err(AuctionError::AlreadyEnded);
    }
    if ctx.timestamp <= info.end_time {
        return Err(AuctionError::AuctionStillOpen);
    }

    match &info.highest_bid {
        None => {
            state
                .ledger
                .asset_registry_mut(&info.asset_contract)?
                .transfer_from(&auction, &auction, info.seller, info.asset_id)?;
        }
        Some(HighestBid {
            bidder,
            currency: Currency::Remote(chain_id),
            ..
        }) => {
            let bridge = state
                .factory(&info.factory)?
                .bridge
                .ok_or(AuctionError::BridgeNotConfigured)?;
            state
                .ledger
                .asset_registry_mut(&info.asset_contract)?
                .approve(&auction, bridge, info.asset_id)?;
            bridge::lock_asset(
                state,
                &ctx.as_contract(auction),
                bridge,
                info.asset_contract,
                info.asset_id,
                *bidder,
                *chain_id,
            )?;
        }
        Some(winner) => {
            state
                .ledger
                .asset_registry_mut(&info.asset_contract)?
                .transfer_from(&auction, &auction, winner.bidder, info.asset_id)?;
        }
    }

    if let Some(winner) = &info.highest_bid {
        push_funds(
            state,
            ctx,
            auction,
            info.seller,
            winner.currency,
            winner.amount,
        )?;
    }

    state.auction_mut(&auction)?.status = AuctionStatus::Ended;
    handle_deregister_auction(state, &ctx.as_contract(auction), info.factory, info.auction_id)?;

    state.events.emit(
        ctx,
        Event::AuctionEnded {
            auction,
            winner: info.highest_bid.as_ref().map(|b| b.bidder),
            amount: info.highest_amount(),
            currency: info.highest_bid.as_ref().map(|b| b.currency),
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host;

    const SELLER: Address = [1u8; 32];
    const ALICE: Address = [2u8; 32];
    const BOB: Address = [3u8; 32];
    const DEPLOYER: Address = [4u8; 32];

    fn test_context(sender: Address, timestamp: u64) -> CallContext {
        CallContext::new(sender, 100, timestamp)
    }

    struct Fixture {
        state: ModuleState,
        factory: Address,
        collection: Address,
        token_id: u64,
    }

    fn setup() -> Fixture {
        let mut state = ModuleState::new(1);
        let deploy = test_context(DEPLOYER, 1_000);

        let factory = handle_deploy_factory(&mut state, &deploy, None, None).unwrap();
        let collection = host::handle_deploy_collection(&mut state, &deploy, "Art".into()).unwrap();
        let token_id =
            host::handle_mint_nft(&mut state, &deploy, collection, SELLER, "ipfs://art/1".into())
                .unwrap();

        for addr in [ALICE, BOB] {
            state.ledger.credit_native(addr, 10_000).unwrap();
        }

        Fixture {
            state,
            factory,
            collection,
            token_id,
        }
    }

    fn list(fx: &mut Fixture, starting_price: Amount, duration: u64) -> Address {
        let ctx = test_context(SELLER, 1_000);
        host::handle_approve_nft(&mut fx.state, &ctx, fx.collection, fx.factory, fx.token_id)
            .unwrap();
        let (_, auction) = handle_create_auction(
            &mut fx.state,
            &ctx,
            fx.factory,
            fx.collection,
            fx.token_id,
            starting_price,
            duration,
        )
        .unwrap();
        auction
    }

    /// Mimic the runtime: move attached value into the auction first.
    fn bid_native(fx: &mut Fixture, bidder: Address, auction: Address, amount: Amount, ts: u64) -> HandlerResult<()> {
        let mut staged = fx.state.clone();
        let ctx = test_context(bidder, ts).with_value(amount);
        staged.ledger.transfer_native(&bidder, auction, amount)?;
        handle_place_bid_with_native(&mut staged, &ctx, auction)?;
        fx.state = staged;
        Ok(())
    }

    fn owner_of(fx: &Fixture) -> Address {
        fx.state
            .ledger
            .asset_registry(&fx.collection)
            .unwrap()
            .owner_of(fx.token_id)
            .unwrap()
    }

    #[test]
    fn test_create_auction_takes_custody() {
        let mut fx = setup();
        let auction = list(&mut fx, 1000, 3600);

        let info = fx.state.auction(&auction).unwrap();
        assert_eq!(info.auction_id, 1);
        assert_eq!(info.start_time, 1_000);
        assert_eq!(info.end_time, 4_600);
        assert_eq!(owner_of(&fx), auction);
        assert_eq!(fx.state.factory(&fx.factory).unwrap().auction_count(), 1);
    }

    #[test]
    fn test_create_auction_requires_factory_approval() {
        let mut fx = setup();
        let ctx = test_context(SELLER, 1_000);
        let result = handle_create_auction(
            &mut fx.state,
            &ctx,
            fx.factory,
            fx.collection,
            fx.token_id,
            1000,
            3600,
        );
        assert_eq!(result, Err(AuctionError::NotApproved));
    }

    #[test]
    fn test_create_auction_rejects_zero_parameters() {
        let mut fx = setup();
        let ctx = test_context(SELLER, 1_000);
        host::handle_approve_nft(&mut fx.state, &ctx, fx.collection, fx.factory, fx.token_id)
            .unwrap();

        let zero_price = handle_create_auction(
            &mut fx.state, &ctx, fx.factory, fx.collection, fx.token_id, 0, 3600,
        );
        assert_eq!(zero_price, Err(AuctionError::InvalidStartingPrice));

        let zero_duration = handle_create_auction(
            &mut fx.state, &ctx, fx.factory, fx.collection, fx.token_id, 1000, 0,
        );
        assert_eq!(zero_duration, Err(AuctionError::InvalidDuration));
    }

    #[test]
    fn test_create_auction_by_non_owner() {
        let mut fx = setup();
        let ctx = test_context(ALICE, 1_000);
        let result = handle_create_auction(
            &mut fx.state, &ctx, fx.factory, fx.collection, fx.token_id, 1000, 3600,
        );
        assert_eq!(result, Err(AuctionError::NotAssetOwner));
    }

    #[test]
    fn test_outbid_refunds_previous_bidder() {
        let mut fx = setup();
        let auction = list(&mut fx, 1000, 3600);

        bid_native(&mut fx, ALICE, auction, 2000, 1_100).unwrap();
        assert_eq!(fx.state.ledger.native_balance(&ALICE), 8_000);

        assert_eq!(
            bid_native(&mut fx, BOB, auction, 1500, 1_200),
            Err(AuctionError::BidTooLow)
        );
        assert_eq!(
            bid_native(&mut fx, BOB, auction, 2000, 1_200),
            Err(AuctionError::BidTooLow)
        );

        bid_native(&mut fx, BOB, auction, 3000, 1_300).unwrap();
        assert_eq!(fx.state.ledger.native_balance(&ALICE), 10_000);
        assert_eq!(fx.state.ledger.native_balance(&auction), 3_000);

        let leader = fx.state.auction(&auction).unwrap().highest_bid.clone().unwrap();
        assert_eq!(leader.bidder, BOB);
        assert_eq!(leader.amount, 3000);
    }

    #[test]
    fn test_first_bid_may_equal_starting_price() {
        let mut fx = setup();
        let auction = list(&mut fx, 1000, 3600);
        assert_eq!(
            bid_native(&mut fx, ALICE, auction, 999, 1_100),
            Err(AuctionError::BidTooLow)
        );
        assert!(bid_native(&mut fx, ALICE, auction, 1000, 1_100).is_ok());
    }

    #[test]
    fn test_bid_after_window_rejected_before_end() {
        let mut fx = setup();
        let auction = list(&mut fx, 1000, 3600);
        assert!(bid_native(&mut fx, ALICE, auction, 2000, 4_600).is_ok());
        assert_eq!(
            bid_native(&mut fx, BOB, auction, 3000, 4_601),
            Err(AuctionError::AuctionEnded)
        );
    }

    #[test]
    fn test_end_before_expiry_rejected() {
        let mut fx = setup();
        let auction = list(&mut fx, 1000, 3600);
        let ctx = test_context(BOB, 4_600);
        assert_eq!(
            handle_end(&mut fx.state, &ctx, auction),
            Err(AuctionError::AuctionStillOpen)
        );
    }

    #[test]
    fn test_end_settles_winner_and_seller() {
        let mut fx = setup();
        let auction = list(&mut fx, 1000, 3600);
        bid_native(&mut fx, ALICE, auction, 2500, 1_100).unwrap();

        let ctx = test_context(BOB, 5_000);
        handle_end(&mut fx.state, &ctx, auction).unwrap();

        assert_eq!(owner_of(&fx), ALICE);
        assert_eq!(fx.state.ledger.native_balance(&SELLER), 2_500);
        assert_eq!(fx.state.ledger.native_balance(&auction), 0);
        assert_eq!(fx.state.factory(&fx.factory).unwrap().auction_count(), 0);
        assert_eq!(
            handle_end(&mut fx.state, &ctx, auction),
            Err(AuctionError::AlreadyEnded)
        );
    }

    #[test]
    fn test_end_without_bids_returns_asset() {
        let mut fx = setup();
        let auction = list(&mut fx, 1000, 60);
        handle_end(&mut fx.state, &test_context(ALICE, 2_000), auction).unwrap();
        assert_eq!(owner_of(&fx), SELLER);
        assert_eq!(
            fx.state.auction(&auction).unwrap().status,
            AuctionStatus::Ended
        );
    }

    #[test]
    fn test_cancel_is_seller_only_and_refunds() {
        let mut fx = setup();
        let auction = list(&mut fx, 1000, 3600);
        bid_native(&mut fx, ALICE, auction, 1500, 1_100).unwrap();

        assert_eq!(
            handle_cancel(&mut fx.state, &test_context(ALICE, 1_200), auction),
            Err(AuctionError::NotSeller)
        );

        handle_cancel(&mut fx.state, &test_context(SELLER, 1_200), auction).unwrap();
        assert_eq!(owner_of(&fx), SELLER);
        assert_eq!(fx.state.ledger.native_balance(&ALICE), 10_000);
        assert_eq!(fx.state.factory(&fx.factory).unwrap().auction_count(), 0);
        assert_eq!(
            bid_native(&mut fx, BOB, auction, 5000, 1_300),
            Err(AuctionError::AuctionEnded)
        );
    }

    #[test]
    fn test_token_bid_requires_allowance() {
        let mut fx = setup();
        let auction = list(&mut fx, 1, 3600);
        let deploy = test_context(DEPLOYER, 1_000);
        let token = host::handle_deploy_token(&mut fx.state, &deploy, "LINK".into()).unwrap();
        host::handle_mint_tokens(&mut fx.state, &deploy, token, ALICE, 10).unwrap();

        let ctx = test_context(ALICE, 1_100);
        host::handle_approve_tokens(&mut fx.state, &ctx, token, auction, 1).unwrap();
        handle_place_bid_with_token(&mut fx.state, &ctx, auction, token, 1).unwrap();

        let result = handle_place_bid_with_token(&mut fx.state, &ctx, auction, token, 1);
        assert_eq!(
            result,
            Err(AuctionError::InsufficientAllowance {
                required: 1,
                available: 0
            })
        );
        let token_ledger = fx.state.ledger.token(&token).unwrap();
        assert_eq!(token_ledger.balance_of(&auction), 1);
        assert_eq!(token_ledger.balance_of(&ALICE), 9);
    }

    #[test]
    fn test_mixed_currency_refund_goes_back_in_token() {
        let mut fx = setup();
        let auction = list(&mut fx, 1, 3600);
        let deploy = test_context(DEPLOYER, 1_000);
        let token = host::handle_deploy_token(&mut fx.state, &deploy, "LINK".into()).unwrap();
        host::handle_mint_tokens(&mut fx.state, &deploy, token, ALICE, 100).unwrap();

        let ctx = test_context(ALICE, 1_100);
        host::handle_approve_tokens(&mut fx.state, &ctx, token, auction, 50).unwrap();
        handle_place_bid_with_token(&mut fx.state, &ctx, auction, token, 50).unwrap();

        bid_native(&mut fx, BOB, auction, 51, 1_200).unwrap();

        let token_ledger = fx.state.ledger.token(&token).unwrap();
        assert_eq!(token_ledger.balance_of(&ALICE), 100);
        assert_eq!(token_ledger.balance_of(&auction), 0);
        assert_eq!(
            fx.state.auction(&auction).unwrap().highest_bid.as_ref().unwrap().currency,
            Currency::Native
        );
    }

    #[test]
    fn test_failed_refund_is_deferred_then_withdrawn() {
        let mut fx = setup();
        let auction = list(&mut fx, 1000, 3600);
        bid_native(&mut fx, ALICE, auction, 2000, 1_100).unwrap();

        // Alice's balance can no longer absorb the refund.
        fx.state.ledger.native.insert(ALICE, Amount::MAX - 10);

        bid_native(&mut fx, BOB, auction, 3000, 1_200).unwrap();
        let info = fx.state.auction(&auction).unwrap();
        assert_eq!(info.highest_bid.as_ref().unwrap().bidder, BOB);
        assert_eq!(info.pending_returns.len(), 1);
        assert!(matches!(
            fx.state.events.last(),
            Some(Event::BidPlaced { .. })
        ));

        let ctx = test_context(ALICE, 1_300);
        assert!(matches!(
            handle_withdraw(&mut fx.state, &ctx, auction),
            Err(AuctionError::ArithmeticOverflow)
        ));

        fx.state.ledger.native.insert(ALICE, 0);
        assert_eq!(
            handle_withdraw(&mut fx.state, &ctx, auction),
            Ok(vec![OwedAmount {
                currency: Currency::Native,
                amount: 2000
            }])
        );
        assert_eq!(fx.state.ledger.native_balance(&ALICE), 2000);
        assert_eq!(
            handle_withdraw(&mut fx.state, &ctx, auction),
            Err(AuctionError::NothingToWithdraw)
        );
    }

    #[test]
    fn test_withdraw_reports_each_currency() {
        let mut fx = setup();
        let auction = list(&mut fx, 1000, 3600);
        let deploy = test_context(DEPLOYER, 1_000);
        let token = host::handle_deploy_token(&mut fx.state, &deploy, "LINK".into()).unwrap();
        host::handle_mint_tokens(&mut fx.state, &deploy, token, auction, 50).unwrap();
        fx.state.ledger.credit_native(auction, 30).unwrap();

        for (currency, amount) in [
            (Currency::Native, 10),
            (Currency::Token(token), 50),
            (Currency::Native, 20),
        ] {
            fx.state.auction_mut(&auction).unwrap().pending_returns.push(PendingReturn {
                bidder: ALICE,
                currency,
                amount,
            });
        }

        let owed = vec![
            OwedAmount {
                currency: Currency::Native,
                amount: 30,
            },
            OwedAmount {
                currency: Currency::Token(token),
                amount: 50,
            },
        ];
        let query = crate::queries::handle_query(
            &fx.state,
            crate::queries::AuctionQuery::GetPendingReturns {
                auction,
                bidder: ALICE,
            },
        );
        assert!(matches!(
            query,
            crate::queries::AuctionQueryResponse::PendingReturns(ref o) if *o == owed
        ));

        let ctx = test_context(ALICE, 1_300);
        assert_eq!(handle_withdraw(&mut fx.state, &ctx, auction), Ok(owed));
        assert_eq!(fx.state.ledger.native_balance(&ALICE), 10_030);
        assert_eq!(fx.state.ledger.token(&token).unwrap().balance_of(&ALICE), 50);
        assert!(fx.state.auction(&auction).unwrap().pending_returns.is_empty());
    }

    #[test]
    fn test_deregister_rejects_spoofed_caller() {
        let mut fx = setup();
        let auction = list(&mut fx, 1000, 3600);

        let spoof = test_context(ALICE, 1_100);
        assert_eq!(
            handle_deregister_auction(&mut fx.state, &spoof, fx.factory, 1),
            Err(AuctionError::NotAuthorized)
        );

        let genuine = spoof.as_contract(auction);
        handle_deregister_auction(&mut fx.state, &genuine, fx.factory, 1).unwrap();
        assert_eq!(
            handle_deregister_auction(&mut fx.state, &genuine, fx.factory, 1),
            Err(AuctionError::NotAuthorized)
        );
    }

    #[test]
    fn test_remote_bid_requires_bound_processor() {
        let mut fx = setup();
        let auction = list(&mut fx, 1000, 3600);
        let ctx = test_context(ALICE, 1_100);
        assert_eq!(
            handle_place_remote_bid(&mut fx.state, &ctx, auction, 5, ALICE, 2000),
            Err(AuctionError::NotAuthorized)
        );
    }
}
