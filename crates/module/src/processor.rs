//! Cross-chain message processor.
//!
//! Holds the trusted relayer set and the `(source bridge, source chain)`
//! routing table. An inbound message is decoded, checked against both, and
//! only then forwarded to a bridge or to the bound auction factory. Every
//! check runs before any bridge or auction state is touched.

use tracing::debug;

use auction_crypto::verify_attestation;
use auction_types::{
    Address, ChainId, CrossChainMessage, Event, Instruction, MessagePayload, RelayerAttestation,
    ZERO_ADDRESS,
};

use crate::bridge;
use crate::error::AuctionError;
use crate::handlers::{self, CallContext, HandlerResult};
use crate::state::{ModuleState, ProcessorState};

/// Handle DeployProcessor call. The caller becomes the owner.
pub fn handle_deploy_processor(
    state: &mut ModuleState,
    ctx: &CallContext,
) -> HandlerResult<Address> {
    let address = state.allocate_contract_address("processor", &ctx.sender);
    state
        .processors
        .insert(address, ProcessorState::new(address, ctx.sender));
    state.events.emit(
        ctx,
        Event::ContractDeployed {
            kind: "processor".into(),
            address,
            deployer: ctx.sender,
        },
    );
    Ok(address)
}

fn owned_processor<'a>(
    state: &'a mut ModuleState,
    ctx: &CallContext,
    processor: &Address,
) -> HandlerResult<&'a mut ProcessorState> {
    let processor_state = state.processor_mut(processor)?;
    if processor_state.owner != ctx.sender {
        return Err(AuctionError::NotOwner);
    }
    Ok(processor_state)
}

// =========================
// ADMINISTRATION
// =========================

pub fn handle_add_trusted_relayer(
    state: &mut ModuleState,
    ctx: &CallContext,
    processor: Address,
    relayer: Address,
) -> HandlerResult<()> {
    let processor_state = owned_processor(state, ctx, &processor)?;
    if relayer == ZERO_ADDRESS {
        return Err(AuctionError::ZeroAddress);
    }
    processor_state.trusted_relayers.insert(relayer);
    state
        .events
        .emit(ctx, Event::RelayerAdded { processor, relayer });
    Ok(())
}

pub fn handle_remove_trusted_relayer(
    state: &mut ModuleState,
    ctx: &CallContext,
    processor: Address,
    relayer: Address,
) -> HandlerResult<()> {
    let processor_state = owned_processor(state, ctx, &processor)?;
    if !processor_state.trusted_relayers.remove(&relayer) {
        return Err(AuctionError::UnknownRelayer(relayer));
    }
    state
        .events
        .emit(ctx, Event::RelayerRemoved { processor, relayer });
    Ok(())
}

/// Authorize `bridge` on `chain_id` as a message emitter.
pub fn handle_add_bridge_contract(
    state: &mut ModuleState,
    ctx: &CallContext,
    processor: Address,
    bridge: Address,
    chain_id: ChainId,
) -> HandlerResult<()> {
    let processor_state = owned_processor(state, ctx, &processor)?;
    if chain_id == 0 {
        return Err(AuctionError::InvalidChainId);
    }
    if bridge == ZERO_ADDRESS {
        return Err(AuctionError::ZeroAddress);
    }
    processor_state.bridge_routes.insert((bridge, chain_id));
    state.events.emit(
        ctx,
        Event::BridgeAdded {
            processor,
            chain_id,
            bridge,
        },
    );
    Ok(())
}

pub fn handle_remove_bridge_contract(
    state: &mut ModuleState,
    ctx: &CallContext,
    processor: Address,
    bridge: Address,
    chain_id: ChainId,
) -> HandlerResult<()> {
    let processor_state = owned_processor(state, ctx, &processor)?;
    if !processor_state.bridge_routes.remove(&(bridge, chain_id)) {
        return Err(AuctionError::UnknownRoute { bridge, chain_id });
    }
    state.events.emit(
        ctx,
        Event::BridgeRemoved {
            processor,
            chain_id,
            bridge,
        },
    );
    Ok(())
}

/// Bind the factory whose auctions accept forwarded bids.
pub fn handle_set_auction_contract(
    state: &mut ModuleState,
    ctx: &CallContext,
    processor: Address,
    auction_contract: Address,
) -> HandlerResult<()> {
    owned_processor(state, ctx, &processor)?;
    state.factory(&auction_contract)?;
    state.processor_mut(&processor)?.auction_contract = Some(auction_contract);
    state.events.emit(
        ctx,
        Event::AuctionContractSet {
            processor,
            auction_contract,
        },
    );
    Ok(())
}

pub fn handle_transfer_ownership(
    state: &mut ModuleState,
    ctx: &CallContext,
    processor: Address,
    new_owner: Address,
) -> HandlerResult<()> {
    let processor_state = owned_processor(state, ctx, &processor)?;
    if new_owner == ZERO_ADDRESS {
        return Err(AuctionError::ZeroAddress);
    }
    let previous_owner = std::mem::replace(&mut processor_state.owner, new_owner);
    state.events.emit(
        ctx,
        Event::OwnershipTransferred {
            processor,
            previous_owner,
            new_owner,
        },
    );
    Ok(())
}

// =========================
// MESSAGE PROCESSING
// =========================

/// Validate an inbound message and apply its instruction exactly once.
///
/// Returns the message id. The id is recorded only after the instruction
/// has been applied, so a rejected forward may be retried.
pub fn handle_process_message(
    state: &mut ModuleState,
    ctx: &CallContext,
    processor: Address,
    message: CrossChainMessage,
) -> HandlerResult<[u8; 32]> {
    let processor_state = state.processor(&processor)?;

    let payload = MessagePayload::decode(&message.payload)
        .map_err(|e| AuctionError::InvalidMessage(e.to_string()))?;
    if payload.destination_chain_id != state.chain_id {
        return Err(AuctionError::InvalidMessage(format!(
            "addressed to chain {}",
            payload.destination_chain_id
        )));
    }

    let message_id = message.id();
    if processor_state.processed_messages.contains(&message_id) {
        return Err(AuctionError::ReplayDetected);
    }

    let attestation = RelayerAttestation::decode(&message.proof)
        .map_err(|e| AuctionError::InvalidMessage(e.to_string()))?;
    let relayer = verify_attestation(&attestation, message.source_chain_id, &message.payload)
        .map_err(|e| AuctionError::InvalidMessage(format!("attestation rejected: {}", e)))?;
    if !processor_state.trusted_relayers.contains(&relayer) {
        return Err(AuctionError::InvalidMessage("untrusted relayer".into()));
    }
    if !processor_state.is_route_authorized(&payload.emitter, message.source_chain_id) {
        return Err(AuctionError::InvalidMessage(format!(
            "emitter not authorized for chain {}",
            message.source_chain_id
        )));
    }
    let auction_contract = processor_state.auction_contract;

    debug!(
        message_id = %hex::encode(message_id),
        source_chain = message.source_chain_id,
        nonce = payload.nonce,
        "forwarding message"
    );

    let forward = ctx.as_contract(processor);
    match payload.instruction {
        Instruction::Unlock {
            bridge,
            lock_id,
            recipient,
        } => bridge::handle_receive_unlock(state, &forward, bridge, lock_id, recipient)?,
        Instruction::Retarget {
            bridge,
            lock_id,
            target_chain_id,
        } => bridge::handle_receive_retarget(state, &forward, bridge, lock_id, target_chain_id)?,
        Instruction::Bid {
            auction,
            bidder,
            amount,
        } => {
            let factory = auction_contract.ok_or(AuctionError::AuctionContractNotSet)?;
            if state.auction(&auction)?.factory != factory {
                return Err(AuctionError::InvalidMessage(
                    "auction not managed by the bound factory".into(),
                ));
            }
            handlers::handle_place_remote_bid(
                state,
                &forward,
                auction,
                message.source_chain_id,
                bidder,
                amount,
            )?
        }
    }

    state
        .processor_mut(&processor)?
        .processed_messages
        .insert(message_id);
    state.events.emit(
        ctx,
        Event::MessageProcessed {
            processor,
            message_id,
            source_chain_id: message.source_chain_id,
            relayer,
        },
    );
    Ok(message_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_crypto::RelayerKey;
    use auction_types::{AuctionStatus, Currency};
    use rand::rngs::OsRng;

    use crate::host;

    const OWNER: Address = [1u8; 32];
    const ALICE: Address = [2u8; 32];
    const SOURCE_BRIDGE: Address = [0xbb; 32];
    const SOURCE_CHAIN: ChainId = 5;

    struct Fixture {
        state: ModuleState,
        processor: Address,
        bridge: Address,
        relayer: RelayerKey,
    }

    fn owner_ctx() -> CallContext {
        CallContext::new(OWNER, 1, 100)
    }

    fn setup() -> Fixture {
        let mut state = ModuleState::new(1);
        let ctx = owner_ctx();
        let processor = handle_deploy_processor(&mut state, &ctx).unwrap();
        let bridge = bridge::handle_deploy_bridge(&mut state, &ctx, processor).unwrap();
        let relayer = RelayerKey::generate(&mut OsRng);

        handle_add_trusted_relayer(&mut state, &ctx, processor, relayer.address()).unwrap();
        handle_add_bridge_contract(&mut state, &ctx, processor, SOURCE_BRIDGE, SOURCE_CHAIN)
            .unwrap();

        Fixture {
            state,
            processor,
            bridge,
            relayer,
        }
    }

    fn signed(key: &RelayerKey, payload: &MessagePayload) -> CrossChainMessage {
        let bytes = payload.encode().unwrap();
        let proof = key.attest(SOURCE_CHAIN, &bytes).encode().unwrap();
        CrossChainMessage {
            source_chain_id: SOURCE_CHAIN,
            payload: bytes,
            proof,
        }
    }

    fn payload(nonce: u64, instruction: Instruction) -> MessagePayload {
        MessagePayload {
            nonce,
            emitter: SOURCE_BRIDGE,
            destination_chain_id: 1,
            instruction,
        }
    }

    /// Lock an asset owned by ALICE and return (collection, token_id, lock_id).
    fn lock_asset_for_alice(fx: &mut Fixture) -> (Address, u64, u64) {
        let ctx = owner_ctx();
        let collection = host::handle_deploy_collection(&mut fx.state, &ctx, "Art".into()).unwrap();
        let token_id =
            host::handle_mint_nft(&mut fx.state, &ctx, collection, ALICE, String::new()).unwrap();
        let alice = CallContext::new(ALICE, 1, 100);
        host::handle_approve_nft(&mut fx.state, &alice, collection, fx.bridge, token_id).unwrap();
        let lock_id = bridge::handle_lock_nft(
            &mut fx.state,
            &alice,
            fx.bridge,
            collection,
            token_id,
            SOURCE_CHAIN,
        )
        .unwrap();
        (collection, token_id, lock_id)
    }

    #[test]
    fn test_admin_calls_are_owner_only() {
        let mut fx = setup();
        let alice = CallContext::new(ALICE, 1, 100);
        assert_eq!(
            handle_add_trusted_relayer(&mut fx.state, &alice, fx.processor, ALICE),
            Err(AuctionError::NotOwner)
        );
        assert_eq!(
            handle_add_bridge_contract(&mut fx.state, &alice, fx.processor, ALICE, 3),
            Err(AuctionError::NotOwner)
        );
        assert_eq!(
            handle_transfer_ownership(&mut fx.state, &alice, fx.processor, ALICE),
            Err(AuctionError::NotOwner)
        );
    }

    #[test]
    fn test_remove_route_and_relayer() {
        let mut fx = setup();
        let ctx = owner_ctx();
        handle_remove_bridge_contract(&mut fx.state, &ctx, fx.processor, SOURCE_BRIDGE, SOURCE_CHAIN)
            .unwrap();
        assert_eq!(
            handle_remove_bridge_contract(&mut fx.state, &ctx, fx.processor, SOURCE_BRIDGE, SOURCE_CHAIN),
            Err(AuctionError::UnknownRoute {
                bridge: SOURCE_BRIDGE,
                chain_id: SOURCE_CHAIN
            })
        );

        let relayer = fx.relayer.address();
        handle_remove_trusted_relayer(&mut fx.state, &ctx, fx.processor, relayer).unwrap();
        assert_eq!(
            handle_remove_trusted_relayer(&mut fx.state, &ctx, fx.processor, relayer),
            Err(AuctionError::UnknownRelayer(relayer))
        );
    }

    #[test]
    fn test_transfer_ownership_moves_admin_rights() {
        let mut fx = setup();
        handle_transfer_ownership(&mut fx.state, &owner_ctx(), fx.processor, ALICE).unwrap();
        assert_eq!(
            handle_add_trusted_relayer(&mut fx.state, &owner_ctx(), fx.processor, ALICE),
            Err(AuctionError::NotOwner)
        );
        let alice = CallContext::new(ALICE, 1, 100);
        handle_add_trusted_relayer(&mut fx.state, &alice, fx.processor, ALICE).unwrap();
    }

    #[test]
    fn test_unlock_message_releases_asset_once() {
        let mut fx = setup();
        let (collection, token_id, lock_id) = lock_asset_for_alice(&mut fx);

        let message = signed(
            &fx.relayer,
            &payload(
                1,
                Instruction::Unlock {
                    bridge: fx.bridge,
                    lock_id,
                    recipient: OWNER,
                },
            ),
        );
        let ctx = CallContext::new(ALICE, 2, 110);
        let id = handle_process_message(&mut fx.state, &ctx, fx.processor, message.clone()).unwrap();
        assert_eq!(id, message.id());

        let owner = fx
            .state
            .ledger
            .asset_registry(&collection)
            .unwrap()
            .owner_of(token_id)
            .unwrap();
        assert_eq!(owner, OWNER);

        assert_eq!(
            handle_process_message(&mut fx.state, &ctx, fx.processor, message),
            Err(AuctionError::ReplayDetected)
        );
    }

    #[test]
    fn test_untrusted_relayer_rejected() {
        let mut fx = setup();
        let (_, _, lock_id) = lock_asset_for_alice(&mut fx);
        let rogue = RelayerKey::generate(&mut OsRng);
        let message = signed(
            &rogue,
            &payload(
                1,
                Instruction::Unlock {
                    bridge: fx.bridge,
                    lock_id,
                    recipient: OWNER,
                },
            ),
        );
        let ctx = CallContext::new(ALICE, 2, 110);
        assert!(matches!(
            handle_process_message(&mut fx.state, &ctx, fx.processor, message),
            Err(AuctionError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_unrouted_emitter_and_bad_payload_rejected() {
        let mut fx = setup();
        let ctx = CallContext::new(ALICE, 2, 110);

        let mut unrouted = payload(
            1,
            Instruction::Retarget {
                bridge: fx.bridge,
                lock_id: 1,
                target_chain_id: 9,
            },
        );
        unrouted.emitter = [0xcc; 32];
        let message = signed(&fx.relayer, &unrouted);
        assert!(matches!(
            handle_process_message(&mut fx.state, &ctx, fx.processor, message),
            Err(AuctionError::InvalidMessage(_))
        ));

        let empty = CrossChainMessage {
            source_chain_id: SOURCE_CHAIN,
            payload: Vec::new(),
            proof: Vec::new(),
        };
        assert!(matches!(
            handle_process_message(&mut fx.state, &ctx, fx.processor, empty),
            Err(AuctionError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_tampered_payload_fails_attestation() {
        let mut fx = setup();
        let ctx = CallContext::new(ALICE, 2, 110);
        let mut message = signed(
            &fx.relayer,
            &payload(
                1,
                Instruction::Retarget {
                    bridge: fx.bridge,
                    lock_id: 1,
                    target_chain_id: 9,
                },
            ),
        );
        let retargeted = payload(
            1,
            Instruction::Retarget {
                bridge: fx.bridge,
                lock_id: 1,
                target_chain_id: 10,
            },
        );
        message.payload = retargeted.encode().unwrap();
        assert!(matches!(
            handle_process_message(&mut fx.state, &ctx, fx.processor, message),
            Err(AuctionError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_wrong_destination_rejected() {
        let mut fx = setup();
        let mut misaddressed = payload(
            1,
            Instruction::Retarget {
                bridge: fx.bridge,
                lock_id: 1,
                target_chain_id: 9,
            },
        );
        misaddressed.destination_chain_id = 77;
        let message = signed(&fx.relayer, &misaddressed);
        let ctx = CallContext::new(ALICE, 2, 110);
        assert!(matches!(
            handle_process_message(&mut fx.state, &ctx, fx.processor, message),
            Err(AuctionError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_bid_instruction_places_remote_bid() {
        let mut fx = setup();
        let ctx = owner_ctx();
        let factory =
            handlers::handle_deploy_factory(&mut fx.state, &ctx, Some(fx.bridge), Some(fx.processor))
                .unwrap();
        let bid = payload(
            1,
            Instruction::Bid {
                auction: [0xaa; 32],
                bidder: ALICE,
                amount: 10,
            },
        );
        assert_eq!(
            handle_process_message(&mut fx.state, &ctx, fx.processor, signed(&fx.relayer, &bid)),
            Err(AuctionError::AuctionContractNotSet)
        );
        handle_set_auction_contract(&mut fx.state, &ctx, fx.processor, factory).unwrap();

        let collection = host::handle_deploy_collection(&mut fx.state, &ctx, "Art".into()).unwrap();
        let token_id =
            host::handle_mint_nft(&mut fx.state, &ctx, collection, OWNER, String::new()).unwrap();
        host::handle_approve_nft(&mut fx.state, &ctx, collection, factory, token_id).unwrap();
        let (_, auction) =
            handlers::handle_create_auction(&mut fx.state, &ctx, factory, collection, token_id, 5, 60)
                .unwrap();

        let bid = payload(
            2,
            Instruction::Bid {
                auction,
                bidder: ALICE,
                amount: 10,
            },
        );
        handle_process_message(&mut fx.state, &ctx, fx.processor, signed(&fx.relayer, &bid))
            .unwrap();

        let info = fx.state.auction(&auction).unwrap();
        let leader = info.highest_bid.as_ref().unwrap();
        assert_eq!(leader.bidder, ALICE);
        assert_eq!(leader.currency, Currency::Remote(SOURCE_CHAIN));
        assert_eq!(info.status, AuctionStatus::Open);
    }
}
