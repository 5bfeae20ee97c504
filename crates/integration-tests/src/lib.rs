//! End-to-end integration tests for NFT auctions and the cross-chain bridge.
//!
//! These tests drive the module through `execute`, the same entry point the
//! mock chain uses, and cover:
//! 1. Native and token auction lifecycles
//! 2. Cancellation and end timing
//! 3. Relayed unlock and replay rejection
//! 4. Remote bids settled through the bridge

#![cfg(test)]

use auction_client::MessageBuilder;
use auction_crypto::RelayerKey;
use auction_module::{
    execute, handle_query, AuctionCall, AuctionError, AuctionQuery, AuctionQueryResponse,
    CallContext, CallOutcome, GenesisAccount, GenesisConfig, ModuleState,
};
use auction_types::{
    compute_message_id, Address, Amount, AuctionStatus, ChainId, Currency, CrossChainMessage,
    Event, LockStatus, MessagePayload,
};
use rand::rngs::OsRng;

const LOCAL_CHAIN: ChainId = 1;
const SOURCE_CHAIN: ChainId = 5;
const SOURCE_BRIDGE: Address = [0xbb; 32];

const SELLER: Address = [1u8; 32];
const ALICE: Address = [2u8; 32];
const BOB: Address = [3u8; 32];
const CAROL: Address = [4u8; 32];
const ADMIN: Address = [9u8; 32];

const FUNDING: Amount = 1_000;

/// A single ledger with a manual clock.
struct Chain {
    state: ModuleState,
    height: u64,
    now: u64,
}

impl Chain {
    fn new() -> Self {
        let genesis = GenesisConfig {
            chain_id: LOCAL_CHAIN,
            accounts: [SELLER, ALICE, BOB, CAROL, ADMIN]
                .into_iter()
                .map(|address| GenesisAccount {
                    address,
                    balance: FUNDING,
                })
                .collect(),
            ..Default::default()
        };
        Self {
            state: genesis.build_state().unwrap(),
            height: 1,
            now: genesis.genesis_timestamp,
        }
    }

    fn call(&mut self, sender: Address, value: Amount, call: AuctionCall) -> Result<CallOutcome, AuctionError> {
        let ctx = CallContext::new(sender, self.height, self.now).with_value(value);
        execute(&mut self.state, &ctx, call)
    }

    fn ok(&mut self, sender: Address, call: AuctionCall) -> CallOutcome {
        self.call(sender, 0, call).unwrap()
    }

    fn deploy(&mut self, sender: Address, call: AuctionCall) -> Address {
        match self.ok(sender, call) {
            CallOutcome::Deployed(address) => address,
            other => panic!("expected deployment, got {:?}", other),
        }
    }

    fn advance(&mut self, secs: u64) {
        self.height += 1;
        self.now += secs;
    }

    fn query(&self, query: AuctionQuery) -> AuctionQueryResponse {
        handle_query(&self.state, query)
    }

    fn native(&self, owner: Address) -> Amount {
        match self.query(AuctionQuery::NativeBalance { owner }) {
            AuctionQueryResponse::Balance(amount) => amount,
            other => panic!("unexpected response {:?}", other),
        }
    }

    fn tokens(&self, token: Address, owner: Address) -> Amount {
        match self.query(AuctionQuery::TokenBalance { token, owner }) {
            AuctionQueryResponse::Balance(amount) => amount,
            other => panic!("unexpected response {:?}", other),
        }
    }

    fn nft_owner(&self, collection: Address, token_id: u64) -> Option<Address> {
        match self.query(AuctionQuery::NftOwner {
            collection,
            token_id,
        }) {
            AuctionQueryResponse::Owner(owner) => owner,
            other => panic!("unexpected response {:?}", other),
        }
    }

    fn auction_count(&self, factory: Address) -> u64 {
        match self.query(AuctionQuery::GetAuctionCount { factory }) {
            AuctionQueryResponse::AuctionCount(count) => count,
            other => panic!("unexpected response {:?}", other),
        }
    }

    fn status(&self, auction: Address) -> AuctionStatus {
        self.state.auctions[&auction].status
    }

    /// Mint a fresh NFT to the seller and list it on `factory`.
    fn list(&mut self, factory: Address, starting_price: Amount, duration_secs: u64) -> (Address, u64, Address) {
        let collection = self.deploy(
            SELLER,
            AuctionCall::DeployCollection {
                name: "Art".into(),
            },
        );
        let token_id = match self.ok(
            SELLER,
            AuctionCall::MintNft {
                collection,
                to: SELLER,
                token_uri: "ipfs://art/1".into(),
            },
        ) {
            CallOutcome::NftMinted(id) => id,
            other => panic!("expected mint, got {:?}", other),
        };
        self.ok(
            SELLER,
            AuctionCall::ApproveNft {
                collection,
                spender: factory,
                token_id,
            },
        );
        let auction = match self.ok(
            SELLER,
            AuctionCall::CreateAuction {
                factory,
                asset_contract: collection,
                asset_id: token_id,
                starting_price,
                duration_secs,
            },
        ) {
            CallOutcome::AuctionCreated { auction, .. } => auction,
            other => panic!("expected auction, got {:?}", other),
        };
        (collection, token_id, auction)
    }

    fn local_factory(&mut self) -> Address {
        self.deploy(
            SELLER,
            AuctionCall::DeployFactory {
                bridge: None,
                message_processor: None,
            },
        )
    }

    fn bid_native(&mut self, bidder: Address, auction: Address, amount: Amount) -> Result<CallOutcome, AuctionError> {
        self.call(bidder, amount, AuctionCall::PlaceBidWithNative { auction })
    }
}

// ========================================
// Auction lifecycle
// ========================================

#[test]
fn test_native_auction_full_flow() {
    let mut chain = Chain::new();
    let factory = chain.local_factory();
    let (collection, token_id, auction) = chain.list(factory, 100, 3_600);

    assert_eq!(chain.nft_owner(collection, token_id), Some(auction));
    assert_eq!(chain.auction_count(factory), 1);

    chain.bid_native(ALICE, auction, 100).unwrap();
    assert_eq!(chain.native(ALICE), FUNDING - 100);

    // Equal bids do not displace the leader, and the attached value is returned
    assert_eq!(chain.bid_native(BOB, auction, 100), Err(AuctionError::BidTooLow));
    assert_eq!(chain.native(BOB), FUNDING);

    chain.bid_native(BOB, auction, 150).unwrap();
    assert_eq!(chain.native(ALICE), FUNDING);
    assert_eq!(chain.native(auction), 150);

    assert_eq!(
        chain.call(CAROL, 0, AuctionCall::End { auction }),
        Err(AuctionError::AuctionStillOpen)
    );

    chain.advance(3_601);
    assert_eq!(chain.bid_native(ALICE, auction, 500), Err(AuctionError::AuctionEnded));

    // Anyone may settle
    chain.ok(CAROL, AuctionCall::End { auction });
    assert_eq!(chain.nft_owner(collection, token_id), Some(BOB));
    assert_eq!(chain.native(SELLER), FUNDING + 150);
    assert_eq!(chain.native(auction), 0);
    assert_eq!(chain.status(auction), AuctionStatus::Ended);
    assert_eq!(chain.auction_count(factory), 0);

    assert_eq!(
        chain.call(CAROL, 0, AuctionCall::End { auction }),
        Err(AuctionError::AlreadyEnded)
    );
    assert_eq!(
        chain.call(ALICE, 0, AuctionCall::Withdraw { auction }),
        Err(AuctionError::NothingToWithdraw)
    );

    let ended = chain
        .state
        .events
        .iter()
        .filter(|e| matches!(e, Event::AuctionEnded { winner: Some(w), amount: 150, .. } if *w == BOB))
        .count();
    assert_eq!(ended, 1);
}

#[test]
fn test_token_bid_requires_allowance() {
    let mut chain = Chain::new();
    let factory = chain.local_factory();
    let (_, _, auction) = chain.list(factory, 100, 3_600);

    let token = chain.deploy(ADMIN, AuctionCall::DeployToken { symbol: "USD".into() });
    chain.ok(
        ADMIN,
        AuctionCall::MintTokens {
            token,
            to: ALICE,
            amount: 1_000,
        },
    );

    let bid = AuctionCall::PlaceBidWithToken {
        auction,
        token,
        amount: 200,
    };
    assert_eq!(
        chain.call(ALICE, 0, bid.clone()),
        Err(AuctionError::InsufficientAllowance {
            required: 200,
            available: 0
        })
    );

    chain.ok(
        ALICE,
        AuctionCall::ApproveTokens {
            token,
            spender: auction,
            amount: 150,
        },
    );
    assert_eq!(
        chain.call(ALICE, 0, bid.clone()),
        Err(AuctionError::InsufficientAllowance {
            required: 200,
            available: 150
        })
    );

    chain.ok(
        ALICE,
        AuctionCall::ApproveTokens {
            token,
            spender: auction,
            amount: 200,
        },
    );
    chain.ok(ALICE, bid);
    assert_eq!(chain.tokens(token, ALICE), 800);
    assert_eq!(chain.tokens(token, auction), 200);
    assert!(matches!(
        chain.query(AuctionQuery::TokenAllowance {
            token,
            owner: ALICE,
            spender: auction
        }),
        AuctionQueryResponse::Balance(0)
    ));

    chain.advance(3_601);
    chain.ok(SELLER, AuctionCall::End { auction });
    assert_eq!(chain.tokens(token, SELLER), 200);
}

#[test]
fn test_mixed_currency_refunds() {
    let mut chain = Chain::new();
    let factory = chain.local_factory();
    let (collection, token_id, auction) = chain.list(factory, 50, 600);

    let token = chain.deploy(ADMIN, AuctionCall::DeployToken { symbol: "USD".into() });
    chain.ok(
        ADMIN,
        AuctionCall::MintTokens {
            token,
            to: BOB,
            amount: 500,
        },
    );
    chain.ok(
        BOB,
        AuctionCall::ApproveTokens {
            token,
            spender: auction,
            amount: 150,
        },
    );

    chain.bid_native(ALICE, auction, 100).unwrap();
    chain.ok(
        BOB,
        AuctionCall::PlaceBidWithToken {
            auction,
            token,
            amount: 150,
        },
    );
    // Alice gets native value back
    assert_eq!(chain.native(ALICE), FUNDING);

    chain.bid_native(CAROL, auction, 200).unwrap();
    // Bob gets tokens back
    assert_eq!(chain.tokens(token, BOB), 500);
    assert_eq!(chain.tokens(token, auction), 0);

    let leader = chain.state.auctions[&auction].highest_bid.clone().unwrap();
    assert_eq!(leader.bidder, CAROL);
    assert_eq!(leader.currency, Currency::Native);

    chain.advance(601);
    chain.ok(ALICE, AuctionCall::End { auction });
    assert_eq!(chain.nft_owner(collection, token_id), Some(CAROL));
    assert_eq!(chain.native(SELLER), FUNDING + 200);
}

#[test]
fn test_cancel_refunds_and_returns_asset() {
    let mut chain = Chain::new();
    let factory = chain.local_factory();
    let (collection, token_id, auction) = chain.list(factory, 10, 600);

    chain.bid_native(ALICE, auction, 40).unwrap();
    assert_eq!(
        chain.call(BOB, 0, AuctionCall::Cancel { auction }),
        Err(AuctionError::NotSeller)
    );

    chain.ok(SELLER, AuctionCall::Cancel { auction });
    assert_eq!(chain.native(ALICE), FUNDING);
    assert_eq!(chain.nft_owner(collection, token_id), Some(SELLER));
    assert_eq!(chain.status(auction), AuctionStatus::Cancelled);
    assert_eq!(chain.auction_count(factory), 0);

    assert_eq!(chain.bid_native(BOB, auction, 50), Err(AuctionError::AuctionEnded));
    assert_eq!(
        chain.call(SELLER, 0, AuctionCall::End { auction }),
        Err(AuctionError::AlreadyEnded)
    );
}

#[test]
fn test_cancel_rejected_after_window() {
    let mut chain = Chain::new();
    let factory = chain.local_factory();
    let (_, _, auction) = chain.list(factory, 10, 600);

    chain.advance(600);
    // Last second of the window still accepts bids
    chain.bid_native(ALICE, auction, 10).unwrap();

    chain.advance(1);
    assert_eq!(
        chain.call(SELLER, 0, AuctionCall::Cancel { auction }),
        Err(AuctionError::AuctionEnded)
    );

    let expired = match chain.query(AuctionQuery::ListExpiredAuctions { now: chain.now }) {
        AuctionQueryResponse::AuctionList(list) => list,
        other => panic!("unexpected response {:?}", other),
    };
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].address, auction);

    chain.ok(BOB, AuctionCall::End { auction });
    assert_eq!(chain.status(auction), AuctionStatus::Ended);
}

#[test]
fn test_rejected_call_reverts_everything() {
    let mut chain = Chain::new();
    let factory = chain.local_factory();
    let (_, _, auction) = chain.list(factory, 10, 600);
    let events_before = chain.state.events.len();

    // More value than the bidder holds
    assert!(matches!(
        chain.bid_native(ALICE, auction, FUNDING + 1),
        Err(AuctionError::InsufficientBalance { .. })
    ));
    // Value on a call that does not take it
    assert_eq!(
        chain.call(ALICE, 5, AuctionCall::Withdraw { auction }),
        Err(AuctionError::UnexpectedValue)
    );

    assert_eq!(chain.native(ALICE), FUNDING);
    assert_eq!(chain.native(auction), 0);
    assert_eq!(chain.state.events.len(), events_before);
}

// ========================================
// Cross-chain
// ========================================

struct CrossChain {
    chain: Chain,
    processor: Address,
    bridge: Address,
    factory: Address,
    relayer: RelayerKey,
    builder: MessageBuilder,
}

impl CrossChain {
    fn new() -> Self {
        let mut chain = Chain::new();
        let processor = chain.deploy(ADMIN, AuctionCall::DeployProcessor);
        let bridge = chain.deploy(
            ADMIN,
            AuctionCall::DeployBridge {
                message_processor: processor,
            },
        );
        let factory = chain.deploy(
            SELLER,
            AuctionCall::DeployFactory {
                bridge: Some(bridge),
                message_processor: Some(processor),
            },
        );
        let relayer = RelayerKey::generate(&mut OsRng);

        chain.ok(
            ADMIN,
            AuctionCall::SetAuctionContract {
                processor,
                auction_contract: factory,
            },
        );
        chain.ok(
            ADMIN,
            AuctionCall::AddTrustedRelayer {
                processor,
                relayer: relayer.address(),
            },
        );
        chain.ok(
            ADMIN,
            AuctionCall::AddBridgeContract {
                processor,
                bridge: SOURCE_BRIDGE,
                chain_id: SOURCE_CHAIN,
            },
        );

        Self {
            chain,
            processor,
            bridge,
            factory,
            relayer,
            builder: MessageBuilder::new(SOURCE_CHAIN, LOCAL_CHAIN, SOURCE_BRIDGE).unwrap(),
        }
    }

    fn attest(&self, payload: &MessagePayload) -> CrossChainMessage {
        self.builder.attest(payload, &self.relayer).unwrap()
    }

    fn deliver(&mut self, message: CrossChainMessage) -> Result<CallOutcome, AuctionError> {
        let processor = self.processor;
        // Submission is permissionless; the proof carries the trust
        self.chain.call(
            CAROL,
            0,
            AuctionCall::ProcessCrossChainMessage { processor, message },
        )
    }

    fn lock(&self, lock_id: u64) -> Option<auction_types::LockRecord> {
        match self.chain.query(AuctionQuery::GetLock {
            bridge: self.bridge,
            lock_id,
        }) {
            AuctionQueryResponse::Lock(lock) => lock,
            other => panic!("unexpected response {:?}", other),
        }
    }
}

#[test]
fn test_relayed_unlock_applies_once() {
    let mut xc = CrossChain::new();
    let collection = xc.chain.deploy(ALICE, AuctionCall::DeployCollection { name: "Relic".into() });
    xc.chain.ok(
        ALICE,
        AuctionCall::MintNft {
            collection,
            to: ALICE,
            token_uri: String::new(),
        },
    );
    let bridge = xc.bridge;
    xc.chain.ok(
        ALICE,
        AuctionCall::ApproveNft {
            collection,
            spender: bridge,
            token_id: 1,
        },
    );
    let lock_id = match xc.chain.ok(
        ALICE,
        AuctionCall::LockNft {
            bridge,
            asset_contract: collection,
            asset_id: 1,
            target_chain_id: SOURCE_CHAIN,
        },
    ) {
        CallOutcome::Locked(id) => id,
        other => panic!("expected lock, got {:?}", other),
    };
    assert_eq!(xc.chain.nft_owner(collection, 1), Some(bridge));
    assert_eq!(xc.lock(lock_id).unwrap().status, LockStatus::Locked);

    let payload = xc.builder.unlock(1, bridge, lock_id, BOB);
    let message = xc.attest(&payload);
    let expected_id = compute_message_id(SOURCE_CHAIN, &message.payload);

    assert_eq!(
        xc.deliver(message.clone()),
        Ok(CallOutcome::MessageProcessed(expected_id))
    );
    assert_eq!(xc.chain.nft_owner(collection, 1), Some(BOB));
    assert_eq!(xc.lock(lock_id).unwrap().status, LockStatus::Released);
    assert!(matches!(
        xc.chain.query(AuctionQuery::IsMessageProcessed {
            processor: xc.processor,
            message_id: expected_id
        }),
        AuctionQueryResponse::MessageProcessed(true)
    ));

    // Retransmission is rejected without touching state
    let events_before = xc.chain.state.events.len();
    assert_eq!(xc.deliver(message), Err(AuctionError::ReplayDetected));
    assert_eq!(xc.chain.state.events.len(), events_before);
    assert_eq!(xc.chain.nft_owner(collection, 1), Some(BOB));
}

#[test]
fn test_untrusted_relayer_rejected() {
    let mut xc = CrossChain::new();
    let impostor = RelayerKey::generate(&mut OsRng);
    let payload = xc.builder.unlock(1, xc.bridge, 1, BOB);
    let message = xc.builder.attest(&payload, &impostor).unwrap();
    let message_id = message.id();

    assert!(matches!(
        xc.deliver(message),
        Err(AuctionError::InvalidMessage(_))
    ));
    assert!(matches!(
        xc.chain.query(AuctionQuery::IsMessageProcessed {
            processor: xc.processor,
            message_id
        }),
        AuctionQueryResponse::MessageProcessed(false)
    ));

    // A revoked relayer loses its trust as well
    let processor = xc.processor;
    let relayer = xc.relayer.address();
    xc.chain.ok(ADMIN, AuctionCall::RemoveTrustedRelayer { processor, relayer });
    let message = xc.attest(&xc.builder.unlock(2, xc.bridge, 1, BOB));
    assert!(matches!(
        xc.deliver(message),
        Err(AuctionError::InvalidMessage(_))
    ));
}

#[test]
fn test_message_from_unrouted_chain_rejected() {
    let mut xc = CrossChain::new();
    let builder = MessageBuilder::new(7, LOCAL_CHAIN, SOURCE_BRIDGE).unwrap();
    let message = builder
        .attest(&builder.unlock(1, xc.bridge, 1, BOB), &xc.relayer)
        .unwrap();
    assert!(matches!(
        xc.deliver(message),
        Err(AuctionError::InvalidMessage(_))
    ));
}

#[test]
fn test_remote_bid_wins_and_is_bridged() {
    let mut xc = CrossChain::new();
    let factory = xc.factory;
    let (collection, token_id, auction) = xc.chain.list(factory, 10, 600);

    // Remote Alice opens, local Bob outbids, remote Carol wins
    let message = xc.attest(&xc.builder.bid(1, auction, ALICE, 10));
    xc.deliver(message).unwrap();
    xc.chain.bid_native(BOB, auction, 20).unwrap();
    assert!(xc.chain.state.events.iter().any(|e| matches!(
        e,
        Event::RemotePaymentDue {
            chain_id: SOURCE_CHAIN,
            recipient,
            amount: 10,
            ..
        } if *recipient == ALICE
    )));

    let message = xc.attest(&xc.builder.bid(2, auction, CAROL, 30));
    xc.deliver(message).unwrap();
    assert_eq!(xc.chain.native(BOB), FUNDING);

    let leader = xc.chain.state.auctions[&auction].highest_bid.clone().unwrap();
    assert_eq!(leader.bidder, CAROL);
    assert_eq!(leader.currency, Currency::Remote(SOURCE_CHAIN));

    xc.chain.advance(601);
    xc.chain.ok(BOB, AuctionCall::End { auction });

    // The asset waits in the bridge for the winner's chain
    assert_eq!(xc.chain.nft_owner(collection, token_id), Some(xc.bridge));
    let lock_id = xc
        .chain
        .state
        .events
        .iter()
        .find_map(|e| match e {
            Event::AssetLocked { lock_id, .. } => Some(*lock_id),
            _ => None,
        })
        .unwrap();
    let lock = xc.lock(lock_id).unwrap();
    assert_eq!(lock.owner, CAROL);
    assert_eq!(lock.target_chain_id, SOURCE_CHAIN);
    assert_eq!(lock.asset_contract, collection);

    // Seller proceeds are owed on the source chain
    assert!(xc.chain.state.events.iter().any(|e| matches!(
        e,
        Event::RemotePaymentDue {
            recipient,
            amount: 30,
            ..
        } if *recipient == SELLER
    )));
    assert_eq!(xc.chain.native(SELLER), FUNDING);

    // Relayers can still release the asset back on this chain
    let message = xc.attest(&xc.builder.unlock(3, xc.bridge, lock_id, CAROL));
    xc.deliver(message).unwrap();
    assert_eq!(xc.chain.nft_owner(collection, token_id), Some(CAROL));
}

#[test]
fn test_remote_bid_for_foreign_factory_rejected() {
    let mut xc = CrossChain::new();
    let other_factory = xc.chain.local_factory();
    let (_, _, auction) = xc.chain.list(other_factory, 10, 600);

    let message = xc.attest(&xc.builder.bid(1, auction, ALICE, 50));
    assert!(matches!(
        xc.deliver(message),
        Err(AuctionError::InvalidMessage(_))
    ));
    assert!(xc.chain.state.auctions[&auction].highest_bid.is_none());
}

#[test]
fn test_retarget_updates_lock() {
    let mut xc = CrossChain::new();
    let factory = xc.factory;
    let (_, _, auction) = xc.chain.list(factory, 10, 60);
    let message = xc.attest(&xc.builder.bid(1, auction, ALICE, 10));
    xc.deliver(message).unwrap();
    xc.chain.advance(61);
    xc.chain.ok(ALICE, AuctionCall::End { auction });

    let lock_id = 1;
    let message = xc.attest(&xc.builder.retarget(2, xc.bridge, lock_id, 9));
    xc.deliver(message).unwrap();
    let lock = xc.lock(lock_id).unwrap();
    assert_eq!(lock.target_chain_id, 9);
    assert_eq!(lock.status, LockStatus::Locked);
}

#[test]
fn test_genesis_round_trips_through_json() {
    let json = serde_json::json!({
        "chain_id": 3,
        "genesis_timestamp": 1_000,
        "block_time_secs": 6,
        "accounts": [{ "address": hex::encode(ALICE), "balance": 77 }]
    });
    let genesis: GenesisConfig = serde_json::from_value(json).unwrap();
    let state = genesis.build_state().unwrap();
    assert_eq!(state.chain_id, 3);
    assert_eq!(state.ledger.native_balance(&ALICE), 77);
}
