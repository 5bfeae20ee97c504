//! Host ledger calls: deploying and driving test tokens and collections,
//! and moving native value between accounts.

use auction_types::{Address, Amount, Event};

use crate::error::AuctionError;
use crate::handlers::{CallContext, HandlerResult};
use crate::ledger::{NftCollection, TokenLedger};
use crate::state::ModuleState;

/// Deploy an NFT collection minted by the caller.
pub fn handle_deploy_collection(
    state: &mut ModuleState,
    ctx: &CallContext,
    name: String,
) -> HandlerResult<Address> {
    let address = state.allocate_contract_address("collection", &ctx.sender);
    state
        .ledger
        .collections
        .insert(address, NftCollection::new(address, name, ctx.sender));
    state.events.emit(
        ctx,
        Event::ContractDeployed {
            kind: "collection".into(),
            address,
            deployer: ctx.sender,
        },
    );
    Ok(address)
}

/// Deploy a fungible token minted by the caller.
pub fn handle_deploy_token(
    state: &mut ModuleState,
    ctx: &CallContext,
    symbol: String,
) -> HandlerResult<Address> {
    let address = state.allocate_contract_address("token", &ctx.sender);
    state
        .ledger
        .tokens
        .insert(address, TokenLedger::new(address, symbol, ctx.sender));
    state.events.emit(
        ctx,
        Event::ContractDeployed {
            kind: "token".into(),
            address,
            deployer: ctx.sender,
        },
    );
    Ok(address)
}

pub fn handle_mint_nft(
    state: &mut ModuleState,
    ctx: &CallContext,
    collection: Address,
    to: Address,
    token_uri: String,
) -> HandlerResult<u64> {
    let nft = state
        .ledger
        .collections
        .get_mut(&collection)
        .ok_or(AuctionError::UnknownContract(collection))?;
    let token_id = nft.mint(&ctx.sender, to, token_uri.clone())?;
    state.events.emit(
        ctx,
        Event::NftMinted {
            collection,
            token_id,
            owner: to,
            token_uri,
        },
    );
    Ok(token_id)
}

pub fn handle_mint_tokens(
    state: &mut ModuleState,
    ctx: &CallContext,
    token: Address,
    to: Address,
    amount: Amount,
) -> HandlerResult<()> {
    state
        .ledger
        .tokens
        .get_mut(&token)
        .ok_or(AuctionError::UnknownContract(token))?
        .mint(&ctx.sender, to, amount)
}

pub fn handle_approve_nft(
    state: &mut ModuleState,
    ctx: &CallContext,
    collection: Address,
    spender: Address,
    token_id: u64,
) -> HandlerResult<()> {
    state
        .ledger
        .asset_registry_mut(&collection)?
        .approve(&ctx.sender, spender, token_id)
}

pub fn handle_approve_tokens(
    state: &mut ModuleState,
    ctx: &CallContext,
    token: Address,
    spender: Address,
    amount: Amount,
) -> HandlerResult<()> {
    state
        .ledger
        .token_mut(&token)?
        .approve(&ctx.sender, spender, amount)
}

pub fn handle_transfer_nft(
    state: &mut ModuleState,
    ctx: &CallContext,
    collection: Address,
    to: Address,
    token_id: u64,
) -> HandlerResult<()> {
    state
        .ledger
        .asset_registry_mut(&collection)?
        .transfer_from(&ctx.sender, &ctx.sender, to, token_id)?;
    state.events.emit(
        ctx,
        Event::NftTransferred {
            collection,
            from: ctx.sender,
            to,
            token_id,
        },
    );
    Ok(())
}

pub fn handle_transfer_tokens(
    state: &mut ModuleState,
    ctx: &CallContext,
    token: Address,
    to: Address,
    amount: Amount,
) -> HandlerResult<()> {
    state.ledger.token_mut(&token)?.transfer(&ctx.sender, to, amount)
}

pub fn handle_transfer_native(
    state: &mut ModuleState,
    ctx: &CallContext,
    to: Address,
    amount: Amount,
) -> HandlerResult<()> {
    if amount == 0 {
        return Err(AuctionError::ZeroAmount);
    }
    state.ledger.transfer_native(&ctx.sender, to, amount)
}
