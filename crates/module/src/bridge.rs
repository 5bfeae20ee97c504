//! Cross-chain bridge: asset custody keyed by lock id.
//!
//! An asset enters custody through a lock and leaves only through an
//! unlock instruction delivered by the bridge's message processor.

use auction_types::{Address, ChainId, Event, LockRecord, LockStatus};

use crate::error::AuctionError;
use crate::handlers::{CallContext, HandlerResult};
use crate::state::{BridgeState, ModuleState};

/// Handle DeployBridge call.
pub fn handle_deploy_bridge(
    state: &mut ModuleState,
    ctx: &CallContext,
    message_processor: Address,
) -> HandlerResult<Address> {
    state.processor(&message_processor)?;

    let address = state.allocate_contract_address("bridge", &ctx.sender);
    state.bridges.insert(
        address,
        BridgeState::new(address, ctx.sender, message_processor),
    );
    state.events.emit(
        ctx,
        Event::ContractDeployed {
            kind: "bridge".into(),
            address,
            deployer: ctx.sender,
        },
    );
    Ok(address)
}

/// Handle LockNft call: the asset owner, or the operator it approved,
/// moves the asset into custody. The lock is recorded for the owner.
pub fn handle_lock_nft(
    state: &mut ModuleState,
    ctx: &CallContext,
    bridge: Address,
    asset_contract: Address,
    asset_id: u64,
    target_chain_id: ChainId,
) -> HandlerResult<u64> {
    if target_chain_id == 0 {
        return Err(AuctionError::InvalidChainId);
    }
    state.bridge(&bridge)?;

    let registry = state.ledger.asset_registry_mut(&asset_contract)?;
    let owner = registry.owner_of(asset_id)?;
    if ctx.sender != owner && registry.get_approved(asset_id)? != Some(ctx.sender) {
        return Err(AuctionError::NotAssetOwner);
    }
    registry.transfer_from(&ctx.sender, &owner, bridge, asset_id)?;

    record_lock(state, ctx, bridge, asset_contract, asset_id, owner, target_chain_id)
}

/// Move an asset held by `ctx.sender` into bridge custody on behalf of
/// `beneficiary`. The bridge must already be approved for the asset.
pub fn lock_asset(
    state: &mut ModuleState,
    ctx: &CallContext,
    bridge: Address,
    asset_contract: Address,
    asset_id: u64,
    beneficiary: Address,
    target_chain_id: ChainId,
) -> HandlerResult<u64> {
    if target_chain_id == 0 {
        return Err(AuctionError::InvalidChainId);
    }
    state.bridge(&bridge)?;

    let registry = state.ledger.asset_registry_mut(&asset_contract)?;
    if registry.get_approved(asset_id)? != Some(bridge) {
        return Err(AuctionError::NotApproved);
    }
    registry.transfer_from(&bridge, &ctx.sender, bridge, asset_id)?;

    record_lock(state, ctx, bridge, asset_contract, asset_id, beneficiary, target_chain_id)
}

fn record_lock(
    state: &mut ModuleState,
    ctx: &CallContext,
    bridge: Address,
    asset_contract: Address,
    asset_id: u64,
    owner: Address,
    target_chain_id: ChainId,
) -> HandlerResult<u64> {
    let bridge_state = state.bridge_mut(&bridge)?;
    let lock_id = bridge_state.allocate_lock_id();
    bridge_state.locks.insert(
        lock_id,
        LockRecord {
            lock_id,
            owner,
            asset_contract,
            asset_id,
            target_chain_id,
            status: LockStatus::Locked,
        },
    );

    state.events.emit(
        ctx,
        Event::AssetLocked {
            bridge,
            lock_id,
            owner,
            asset_contract,
            asset_id,
            target_chain_id,
        },
    );
    Ok(lock_id)
}

/// Look up a lock that is still in custody, checking the caller is the
/// bridge's message processor.
fn live_lock(
    state: &ModuleState,
    ctx: &CallContext,
    bridge: &Address,
    lock_id: u64,
) -> HandlerResult<LockRecord> {
    let bridge_state = state.bridge(bridge)?;
    if ctx.sender != bridge_state.message_processor {
        return Err(AuctionError::NotAuthorized);
    }
    match bridge_state.locks.get(&lock_id) {
        Some(lock) if lock.status == LockStatus::Locked => Ok(lock.clone()),
        _ => Err(AuctionError::UnknownLock(lock_id)),
    }
}

/// Release a locked asset to `recipient`.
pub fn handle_receive_unlock(
    state: &mut ModuleState,
    ctx: &CallContext,
    bridge: Address,
    lock_id: u64,
    recipient: Address,
) -> HandlerResult<()> {
    let lock = live_lock(state, ctx, &bridge, lock_id)?;

    state
        .ledger
        .asset_registry_mut(&lock.asset_contract)?
        .transfer_from(&bridge, &bridge, recipient, lock.asset_id)?;

    if let Some(record) = state.bridge_mut(&bridge)?.locks.get_mut(&lock_id) {
        record.status = LockStatus::Released;
    }
    state.events.emit(
        ctx,
        Event::AssetUnlocked {
            bridge,
            lock_id,
            recipient,
        },
    );
    Ok(())
}

/// Point a live lock at a different destination chain.
pub fn handle_receive_retarget(
    state: &mut ModuleState,
    ctx: &CallContext,
    bridge: Address,
    lock_id: u64,
    target_chain_id: ChainId,
) -> HandlerResult<()> {
    let lock = live_lock(state, ctx, &bridge, lock_id)?;
    if target_chain_id == 0 {
        return Err(AuctionError::InvalidChainId);
    }

    if let Some(record) = state.bridge_mut(&bridge)?.locks.get_mut(&lock_id) {
        record.target_chain_id = target_chain_id;
    }
    state.events.emit(
        ctx,
        Event::LockRetargeted {
            bridge,
            lock_id,
            previous_chain_id: lock.target_chain_id,
            target_chain_id,
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host;
    use crate::processor::handle_deploy_processor;

    const OWNER: Address = [1u8; 32];
    const ALICE: Address = [2u8; 32];
    const OPERATOR: Address = [3u8; 32];

    struct Fixture {
        state: ModuleState,
        processor: Address,
        bridge: Address,
        collection: Address,
        token_id: u64,
    }

    fn setup() -> Fixture {
        let mut state = ModuleState::new(1);
        let ctx = CallContext::new(OWNER, 1, 100);
        let processor = handle_deploy_processor(&mut state, &ctx).unwrap();
        let bridge = handle_deploy_bridge(&mut state, &ctx, processor).unwrap();
        let collection = host::handle_deploy_collection(&mut state, &ctx, "Art".into()).unwrap();
        let token_id =
            host::handle_mint_nft(&mut state, &ctx, collection, ALICE, String::new()).unwrap();
        Fixture {
            state,
            processor,
            bridge,
            collection,
            token_id,
        }
    }

    fn lock(fx: &mut Fixture) -> u64 {
        let alice = CallContext::new(ALICE, 1, 100);
        host::handle_approve_nft(&mut fx.state, &alice, fx.collection, fx.bridge, fx.token_id)
            .unwrap();
        handle_lock_nft(&mut fx.state, &alice, fx.bridge, fx.collection, fx.token_id, 5).unwrap()
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
    fn test_lock_takes_custody() {
        let mut fx = setup();
        assert_eq!(lock(&mut fx), 1);
        assert_eq!(owner_of(&fx), fx.bridge);

        let record = &fx.state.bridge(&fx.bridge).unwrap().locks[&1];
        assert_eq!(record.owner, ALICE);
        assert_eq!(record.target_chain_id, 5);
        assert!(matches!(
            fx.state.events.last(),
            Some(Event::AssetLocked { lock_id: 1, .. })
        ));
    }

    #[test]
    fn test_owner_locks_without_approval() {
        let mut fx = setup();
        let alice = CallContext::new(ALICE, 1, 100);
        let lock_id =
            handle_lock_nft(&mut fx.state, &alice, fx.bridge, fx.collection, fx.token_id, 5)
                .unwrap();
        assert_eq!(owner_of(&fx), fx.bridge);
        assert_eq!(fx.state.bridge(&fx.bridge).unwrap().locks[&lock_id].owner, ALICE);
    }

    #[test]
    fn test_approved_operator_locks_for_owner() {
        let mut fx = setup();
        let alice = CallContext::new(ALICE, 1, 100);
        host::handle_approve_nft(&mut fx.state, &alice, fx.collection, OPERATOR, fx.token_id)
            .unwrap();

        let operator = CallContext::new(OPERATOR, 1, 100);
        let lock_id =
            handle_lock_nft(&mut fx.state, &operator, fx.bridge, fx.collection, fx.token_id, 5)
                .unwrap();
        assert_eq!(owner_of(&fx), fx.bridge);

        let record = &fx.state.bridge(&fx.bridge).unwrap().locks[&lock_id];
        assert_eq!(record.owner, ALICE);
        assert!(matches!(
            fx.state.events.last(),
            Some(Event::AssetLocked { owner: ALICE, .. })
        ));
    }

    #[test]
    fn test_lock_rejects_stranger_and_zero_chain() {
        let mut fx = setup();
        let owner = CallContext::new(OWNER, 1, 100);
        assert_eq!(
            handle_lock_nft(&mut fx.state, &owner, fx.bridge, fx.collection, fx.token_id, 5),
            Err(AuctionError::NotAssetOwner)
        );

        // approving the bridge does not let a third party lock
        let alice = CallContext::new(ALICE, 1, 100);
        host::handle_approve_nft(&mut fx.state, &alice, fx.collection, fx.bridge, fx.token_id)
            .unwrap();
        assert_eq!(
            handle_lock_nft(&mut fx.state, &owner, fx.bridge, fx.collection, fx.token_id, 5),
            Err(AuctionError::NotAssetOwner)
        );
        assert_eq!(
            handle_lock_nft(&mut fx.state, &alice, fx.bridge, fx.collection, fx.token_id, 0),
            Err(AuctionError::InvalidChainId)
        );
        assert_eq!(owner_of(&fx), ALICE);
    }

    #[test]
    fn test_unlock_only_via_processor_and_once() {
        let mut fx = setup();
        let lock_id = lock(&mut fx);

        let outsider = CallContext::new(ALICE, 2, 110);
        assert_eq!(
            handle_receive_unlock(&mut fx.state, &outsider, fx.bridge, lock_id, ALICE),
            Err(AuctionError::NotAuthorized)
        );

        let processor = outsider.as_contract(fx.processor);
        handle_receive_unlock(&mut fx.state, &processor, fx.bridge, lock_id, OWNER).unwrap();
        assert_eq!(owner_of(&fx), OWNER);
        assert_eq!(
            handle_receive_unlock(&mut fx.state, &processor, fx.bridge, lock_id, OWNER),
            Err(AuctionError::UnknownLock(lock_id))
        );
        assert_eq!(
            handle_receive_unlock(&mut fx.state, &processor, fx.bridge, 42, OWNER),
            Err(AuctionError::UnknownLock(42))
        );
    }

    #[test]
    fn test_retarget_updates_live_lock() {
        let mut fx = setup();
        let lock_id = lock(&mut fx);
        let processor = CallContext::new(ALICE, 2, 110).as_contract(fx.processor);

        handle_receive_retarget(&mut fx.state, &processor, fx.bridge, lock_id, 9).unwrap();
        assert_eq!(
            fx.state.bridge(&fx.bridge).unwrap().locks[&lock_id].target_chain_id,
            9
        );
        assert!(matches!(
            fx.state.events.last(),
            Some(Event::LockRetargeted {
                previous_chain_id: 5,
                target_chain_id: 9,
                ..
            })
        ));
    }
}
