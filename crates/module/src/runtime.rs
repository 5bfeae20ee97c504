//! Atomic call execution.
//!
//! [`execute`] runs a call against a staged copy of the module state and
//! commits it only on success. A rejected call leaves balances, custody and
//! the event log exactly as they were.

use tracing::{debug, info};

use crate::bridge;
use crate::call::{AuctionCall, CallOutcome};
use crate::error::AuctionError;
use crate::handlers::{self, CallContext, HandlerResult};
use crate::host;
use crate::processor;
use crate::state::ModuleState;

/// Execute `call` atomically.
pub fn execute(
    state: &mut ModuleState,
    ctx: &CallContext,
    call: AuctionCall,
) -> HandlerResult<CallOutcome> {
    let name = call.name();
    let mut staged = state.clone();

    match apply(&mut staged, ctx, call) {
        Ok(outcome) => {
            *state = staged;
            info!(
                call = name,
                sender = %hex::encode(ctx.sender),
                height = ctx.block_height,
                "call committed"
            );
            Ok(outcome)
        }
        Err(e) => {
            debug!(call = name, code = e.code(), "call rejected: {}", e);
            Err(e)
        }
    }
}

/// Move attached value to the payee, then dispatch.
fn apply(
    state: &mut ModuleState,
    ctx: &CallContext,
    call: AuctionCall,
) -> HandlerResult<CallOutcome> {
    if ctx.value > 0 {
        let payee = call.payee().ok_or(AuctionError::UnexpectedValue)?;
        state.auction(&payee)?;
        state.ledger.transfer_native(&ctx.sender, payee, ctx.value)?;
    }
    dispatch(state, ctx, call)
}

fn dispatch(
    state: &mut ModuleState,
    ctx: &CallContext,
    call: AuctionCall,
) -> HandlerResult<CallOutcome> {
    use CallOutcome::{Deployed, Unit};

    match call {
        // === Host ledger ===
        AuctionCall::DeployCollection { name } => {
            host::handle_deploy_collection(state, ctx, name).map(Deployed)
        }
        AuctionCall::DeployToken { symbol } => {
            host::handle_deploy_token(state, ctx, symbol).map(Deployed)
        }
        AuctionCall::MintNft {
            collection,
            to,
            token_uri,
        } => host::handle_mint_nft(state, ctx, collection, to, token_uri).map(CallOutcome::NftMinted),
        AuctionCall::MintTokens { token, to, amount } => {
            host::handle_mint_tokens(state, ctx, token, to, amount).map(|_| Unit)
        }
        AuctionCall::ApproveNft {
            collection,
            spender,
            token_id,
        } => host::handle_approve_nft(state, ctx, collection, spender, token_id).map(|_| Unit),
        AuctionCall::ApproveTokens {
            token,
            spender,
            amount,
        } => host::handle_approve_tokens(state, ctx, token, spender, amount).map(|_| Unit),
        AuctionCall::TransferNft {
            collection,
            to,
            token_id,
        } => host::handle_transfer_nft(state, ctx, collection, to, token_id).map(|_| Unit),
        AuctionCall::TransferTokens { token, to, amount } => {
            host::handle_transfer_tokens(state, ctx, token, to, amount).map(|_| Unit)
        }
        AuctionCall::TransferNative { to, amount } => {
            host::handle_transfer_native(state, ctx, to, amount).map(|_| Unit)
        }

        // === Factory ===
        AuctionCall::DeployFactory {
            bridge,
            message_processor,
        } => handlers::handle_deploy_factory(state, ctx, bridge, message_processor).map(Deployed),
        AuctionCall::CreateAuction {
            factory,
            asset_contract,
            asset_id,
            starting_price,
            duration_secs,
        } => {
            let (auction_id, auction) = handlers::handle_create_auction(
                state,
                ctx,
                factory,
                asset_contract,
                asset_id,
                starting_price,
                duration_secs,
            )?;
            Ok(CallOutcome::AuctionCreated {
                auction_id,
                auction,
            })
        }

        // === Auction instance ===
        AuctionCall::PlaceBidWithNative { auction } => {
            handlers::handle_place_bid_with_native(state, ctx, auction).map(|_| Unit)
        }
        AuctionCall::PlaceBidWithToken {
            auction,
            token,
            amount,
        } => handlers::handle_place_bid_with_token(state, ctx, auction, token, amount).map(|_| Unit),
        AuctionCall::Cancel { auction } => {
            handlers::handle_cancel(state, ctx, auction).map(|_| Unit)
        }
        AuctionCall::End { auction } => handlers::handle_end(state, ctx, auction).map(|_| Unit),
        AuctionCall::Withdraw { auction } => {
            handlers::handle_withdraw(state, ctx, auction).map(CallOutcome::Withdrawn)
        }

        // === Message processor ===
        AuctionCall::DeployProcessor => processor::handle_deploy_processor(state, ctx).map(Deployed),
        AuctionCall::AddTrustedRelayer { processor, relayer } => {
            processor::handle_add_trusted_relayer(state, ctx, processor, relayer).map(|_| Unit)
        }
        AuctionCall::RemoveTrustedRelayer { processor, relayer } => {
            processor::handle_remove_trusted_relayer(state, ctx, processor, relayer).map(|_| Unit)
        }
        AuctionCall::AddBridgeContract {
            processor,
            bridge,
            chain_id,
        } => processor::handle_add_bridge_contract(state, ctx, processor, bridge, chain_id)
            .map(|_| Unit),
        AuctionCall::RemoveBridgeContract {
            processor,
            bridge,
            chain_id,
        } => processor::handle_remove_bridge_contract(state, ctx, processor, bridge, chain_id)
            .map(|_| Unit),
        AuctionCall::SetAuctionContract {
            processor,
            auction_contract,
        } => processor::handle_set_auction_contract(state, ctx, processor, auction_contract)
            .map(|_| Unit),
        AuctionCall::TransferOwnership {
            processor,
            new_owner,
        } => processor::handle_transfer_ownership(state, ctx, processor, new_owner).map(|_| Unit),
        AuctionCall::ProcessCrossChainMessage { processor, message } => {
            processor::handle_process_message(state, ctx, processor, message)
                .map(CallOutcome::MessageProcessed)
        }

        // === Bridge ===
        AuctionCall::DeployBridge { message_processor } => {
            bridge::handle_deploy_bridge(state, ctx, message_processor).map(Deployed)
        }
        AuctionCall::LockNft {
            bridge,
            asset_contract,
            asset_id,
            target_chain_id,
        } => bridge::handle_lock_nft(state, ctx, bridge, asset_contract, asset_id, target_chain_id)
            .map(CallOutcome::Locked),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_types::Address;

    const ALICE: Address = [2u8; 32];
    const BOB: Address = [3u8; 32];

    #[test]
    fn test_rejected_call_leaves_state_untouched() {
        let mut state = ModuleState::new(1);
        state.ledger.credit_native(ALICE, 100).unwrap();
        let events_before = state.events.len();

        let ctx = CallContext::new(ALICE, 1, 10);
        let result = execute(
            &mut state,
            &ctx,
            AuctionCall::TransferNative { to: BOB, amount: 101 },
        );
        assert!(matches!(result, Err(AuctionError::InsufficientBalance { .. })));
        assert_eq!(state.ledger.native_balance(&ALICE), 100);
        assert_eq!(state.events.len(), events_before);
    }

    #[test]
    fn test_value_on_non_payable_call_rejected() {
        let mut state = ModuleState::new(1);
        state.ledger.credit_native(ALICE, 100).unwrap();
        let ctx = CallContext::new(ALICE, 1, 10).with_value(5);
        assert_eq!(
            execute(&mut state, &ctx, AuctionCall::DeployProcessor),
            Err(AuctionError::UnexpectedValue)
        );
        assert_eq!(state.ledger.native_balance(&ALICE), 100);
    }

    #[test]
    fn test_failed_bid_returns_attached_value() {
        let mut state = ModuleState::new(1);
        state.ledger.credit_native(ALICE, 100).unwrap();
        let ctx = CallContext::new(ALICE, 1, 10);

        let factory = match execute(
            &mut state,
            &ctx,
            AuctionCall::DeployFactory {
                bridge: None,
                message_processor: None,
            },
        ) {
            Ok(CallOutcome::Deployed(addr)) => addr,
            other => panic!("unexpected outcome: {:?}", other),
        };
        let collection = match execute(
            &mut state,
            &ctx,
            AuctionCall::DeployCollection { name: "Art".into() },
        ) {
            Ok(CallOutcome::Deployed(addr)) => addr,
            other => panic!("unexpected outcome: {:?}", other),
        };
        execute(
            &mut state,
            &ctx,
            AuctionCall::MintNft {
                collection,
                to: ALICE,
                token_uri: String::new(),
            },
        )
        .unwrap();
        execute(
            &mut state,
            &ctx,
            AuctionCall::ApproveNft {
                collection,
                spender: factory,
                token_id: 1,
            },
        )
        .unwrap();
        let auction = match execute(
            &mut state,
            &ctx,
            AuctionCall::CreateAuction {
                factory,
                asset_contract: collection,
                asset_id: 1,
                starting_price: 50,
                duration_secs: 60,
            },
        ) {
            Ok(CallOutcome::AuctionCreated { auction, .. }) => auction,
            other => panic!("unexpected outcome: {:?}", other),
        };

        let low = CallContext::new(ALICE, 2, 20).with_value(40);
        assert_eq!(
            execute(&mut state, &low, AuctionCall::PlaceBidWithNative { auction }),
            Err(AuctionError::BidTooLow)
        );
        assert_eq!(state.ledger.native_balance(&ALICE), 100);
        assert_eq!(state.ledger.native_balance(&auction), 0);

        let ok = CallContext::new(ALICE, 2, 20).with_value(60);
        execute(&mut state, &ok, AuctionCall::PlaceBidWithNative { auction }).unwrap();
        assert_eq!(state.ledger.native_balance(&ALICE), 40);
        assert_eq!(state.ledger.native_balance(&auction), 60);
    }
}
