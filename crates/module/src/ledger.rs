//! In-memory host ledger: native balances, fungible tokens and NFT collections.
//!
//! Contracts only reach tokens and collections through the [`FungibleToken`]
//! and [`AssetRegistry`] traits. Every operation validates before it mutates,
//! so a rejected call leaves the ledger untouched.

use std::collections::BTreeMap;

use auction_types::{Address, Amount};

use crate::error::AuctionError;
use crate::handlers::HandlerResult;

/// Ownership registry for non-fungible assets.
pub trait AssetRegistry {
    /// Current owner of `token_id`.
    fn owner_of(&self, token_id: u64) -> HandlerResult<Address>;

    /// Address approved to move `token_id`, if any.
    fn get_approved(&self, token_id: u64) -> HandlerResult<Option<Address>>;

    /// Approve `spender` to move `token_id`. Caller must own it.
    fn approve(&mut self, caller: &Address, spender: Address, token_id: u64) -> HandlerResult<()>;

    /// Move `token_id` from `from` to `to`. Caller must be the owner or approved.
    fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: Address,
        token_id: u64,
    ) -> HandlerResult<()>;
}

/// Balance and allowance ledger for a fungible token.
pub trait FungibleToken {
    fn balance_of(&self, owner: &Address) -> Amount;

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    /// Set the allowance of `spender` over the caller's balance.
    fn approve(&mut self, caller: &Address, spender: Address, amount: Amount) -> HandlerResult<()>;

    /// Move `amount` from the caller to `to`.
    fn transfer(&mut self, caller: &Address, to: Address, amount: Amount) -> HandlerResult<()>;

    /// Move `amount` from `from` to `to`, consuming the caller's allowance.
    fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: Address,
        amount: Amount,
    ) -> HandlerResult<()>;
}

/// Minimal NFT collection with a single minter.
#[derive(Clone, Debug)]
pub struct NftCollection {
    pub address: Address,
    pub name: String,
    pub minter: Address,
    pub next_token_id: u64,
    pub owners: BTreeMap<u64, Address>,
    pub approvals: BTreeMap<u64, Address>,
    pub token_uris: BTreeMap<u64, String>,
}

impl NftCollection {
    pub fn new(address: Address, name: String, minter: Address) -> Self {
        Self {
            address,
            name,
            minter,
            next_token_id: 1,
            owners: BTreeMap::new(),
            approvals: BTreeMap::new(),
            token_uris: BTreeMap::new(),
        }
    }

    /// Mint the next token to `to`. Only the minter may call this.
    pub fn mint(&mut self, caller: &Address, to: Address, token_uri: String) -> HandlerResult<u64> {
        if *caller != self.minter {
            return Err(AuctionError::NotOwner);
        }
        let token_id = self.next_token_id;
        self.next_token_id = token_id
            .checked_add(1)
            .ok_or(AuctionError::ArithmeticOverflow)?;
        self.owners.insert(token_id, to);
        self.token_uris.insert(token_id, token_uri);
        Ok(token_id)
    }

    pub fn token_uri(&self, token_id: u64) -> Option<&str> {
        self.token_uris.get(&token_id).map(String::as_str)
    }
}

impl AssetRegistry for NftCollection {
    fn owner_of(&self, token_id: u64) -> HandlerResult<Address> {
        self.owners
            .get(&token_id)
            .copied()
            .ok_or(AuctionError::UnknownAsset(token_id))
    }

    fn get_approved(&self, token_id: u64) -> HandlerResult<Option<Address>> {
        self.owner_of(token_id)?;
        Ok(self.approvals.get(&token_id).copied())
    }

    fn approve(&mut self, caller: &Address, spender: Address, token_id: u64) -> HandlerResult<()> {
        if self.owner_of(token_id)? != *caller {
            return Err(AuctionError::NotAssetOwner);
        }
        self.approvals.insert(token_id, spender);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: Address,
        token_id: u64,
    ) -> HandlerResult<()> {
        let owner = self.owner_of(token_id)?;
        if owner != *from {
            return Err(AuctionError::NotAssetOwner);
        }
        if *caller != owner && self.approvals.get(&token_id) != Some(caller) {
            return Err(AuctionError::NotApproved);
        }
        self.approvals.remove(&token_id);
        self.owners.insert(token_id, to);
        Ok(())
    }
}

/// Minimal fungible token with a single minter.
#[derive(Clone, Debug)]
pub struct TokenLedger {
    pub address: Address,
    pub symbol: String,
    pub minter: Address,
    pub total_supply: Amount,
    pub balances: BTreeMap<Address, Amount>,
    pub allowances: BTreeMap<(Address, Address), Amount>,
}

impl TokenLedger {
    pub fn new(address: Address, symbol: String, minter: Address) -> Self {
        Self {
            address,
            symbol,
            minter,
            total_supply: 0,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
        }
    }

    /// Create `amount` new units for `to`. Only the minter may call this.
    pub fn mint(&mut self, caller: &Address, to: Address, amount: Amount) -> HandlerResult<()> {
        if *caller != self.minter {
            return Err(AuctionError::NotOwner);
        }
        if amount == 0 {
            return Err(AuctionError::ZeroAmount);
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(AuctionError::ArithmeticOverflow)?;
        let balance = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(AuctionError::ArithmeticOverflow)?;
        self.total_supply = supply;
        self.balances.insert(to, balance);
        Ok(())
    }

    fn move_balance(&mut self, from: &Address, to: Address, amount: Amount) -> HandlerResult<()> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(AuctionError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if *from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(AuctionError::ArithmeticOverflow)?;
        self.balances.insert(*from, available - amount);
        self.balances.insert(to, credited);
        Ok(())
    }
}

impl FungibleToken for TokenLedger {
    fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn approve(&mut self, caller: &Address, spender: Address, amount: Amount) -> HandlerResult<()> {
        self.allowances.insert((*caller, spender), amount);
        Ok(())
    }

    fn transfer(&mut self, caller: &Address, to: Address, amount: Amount) -> HandlerResult<()> {
        self.move_balance(caller, to, amount)
    }

    fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: Address,
        amount: Amount,
    ) -> HandlerResult<()> {
        let available = self.allowance(from, caller);
        if available < amount {
            return Err(AuctionError::InsufficientAllowance {
                required: amount,
                available,
            });
        }
        self.move_balance(from, to, amount)?;
        self.allowances.insert((*from, *caller), available - amount);
        Ok(())
    }
}

/// All ledger-level state hosted by the module.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    pub native: BTreeMap<Address, Amount>,
    pub tokens: BTreeMap<Address, TokenLedger>,
    pub collections: BTreeMap<Address, NftCollection>,
}

impl Ledger {
    pub fn native_balance(&self, owner: &Address) -> Amount {
        self.native.get(owner).copied().unwrap_or(0)
    }

    /// Add native value to `owner`.
    pub fn credit_native(&mut self, owner: Address, amount: Amount) -> HandlerResult<()> {
        let balance = self
            .native_balance(&owner)
            .checked_add(amount)
            .ok_or(AuctionError::ArithmeticOverflow)?;
        self.native.insert(owner, balance);
        Ok(())
    }

    /// Move native value between accounts.
    pub fn transfer_native(&mut self, from: &Address, to: Address, amount: Amount) -> HandlerResult<()> {
        let available = self.native_balance(from);
        if available < amount {
            return Err(AuctionError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if *from == to {
            return Ok(());
        }
        let credited = self
            .native_balance(&to)
            .checked_add(amount)
            .ok_or(AuctionError::ArithmeticOverflow)?;
        self.native.insert(*from, available - amount);
        self.native.insert(to, credited);
        Ok(())
    }

    pub fn asset_registry(&self, contract: &Address) -> HandlerResult<&dyn AssetRegistry> {
        self.collections
            .get(contract)
            .map(|c| c as &dyn AssetRegistry)
            .ok_or(AuctionError::UnknownContract(*contract))
    }

    pub fn asset_registry_mut(&mut self, contract: &Address) -> HandlerResult<&mut dyn AssetRegistry> {
        self.collections
            .get_mut(contract)
            .map(|c| c as &mut dyn AssetRegistry)
            .ok_or(AuctionError::UnknownContract(*contract))
    }

    pub fn token(&self, contract: &Address) -> HandlerResult<&dyn FungibleToken> {
        self.tokens
            .get(contract)
            .map(|t| t as &dyn FungibleToken)
            .ok_or(AuctionError::UnknownContract(*contract))
    }

    pub fn token_mut(&mut self, contract: &Address) -> HandlerResult<&mut dyn FungibleToken> {
        self.tokens
            .get_mut(contract)
            .map(|t| t as &mut dyn FungibleToken)
            .ok_or(AuctionError::UnknownContract(*contract))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINTER: Address = [1u8; 32];
    const ALICE: Address = [2u8; 32];
    const BOB: Address = [3u8; 32];

    #[test]
    fn test_nft_mint_is_minter_only() {
        let mut nft = NftCollection::new([9u8; 32], "Art".into(), MINTER);
        assert_eq!(nft.mint(&MINTER, ALICE, "ipfs://1".into()), Ok(1));
        assert_eq!(nft.mint(&MINTER, ALICE, "ipfs://2".into()), Ok(2));
        assert_eq!(
            nft.mint(&ALICE, ALICE, "ipfs://3".into()),
            Err(AuctionError::NotOwner)
        );
        assert_eq!(nft.token_uri(2), Some("ipfs://2"));
    }

    #[test]
    fn test_nft_transfer_requires_owner_or_approval() {
        let mut nft = NftCollection::new([9u8; 32], "Art".into(), MINTER);
        let id = nft.mint(&MINTER, ALICE, String::new()).unwrap();

        assert_eq!(
            nft.transfer_from(&BOB, &ALICE, BOB, id),
            Err(AuctionError::NotApproved)
        );
        assert_eq!(nft.approve(&BOB, BOB, id), Err(AuctionError::NotAssetOwner));

        nft.approve(&ALICE, BOB, id).unwrap();
        assert_eq!(nft.get_approved(id), Ok(Some(BOB)));
        nft.transfer_from(&BOB, &ALICE, BOB, id).unwrap();

        assert_eq!(nft.owner_of(id), Ok(BOB));
        // approval cleared on transfer
        assert_eq!(nft.get_approved(id), Ok(None));
    }

    #[test]
    fn test_nft_unknown_token() {
        let nft = NftCollection::new([9u8; 32], "Art".into(), MINTER);
        assert_eq!(nft.owner_of(5), Err(AuctionError::UnknownAsset(5)));
    }

    #[test]
    fn test_token_transfer_from_consumes_allowance() {
        let mut token = TokenLedger::new([8u8; 32], "LINK".into(), MINTER);
        token.mint(&MINTER, ALICE, 10).unwrap();
        token.approve(&ALICE, BOB, 4).unwrap();

        token.transfer_from(&BOB, &ALICE, BOB, 3).unwrap();
        assert_eq!(token.allowance(&ALICE, &BOB), 1);
        assert_eq!(token.balance_of(&ALICE), 7);
        assert_eq!(token.balance_of(&BOB), 3);

        assert_eq!(
            token.transfer_from(&BOB, &ALICE, BOB, 2),
            Err(AuctionError::InsufficientAllowance {
                required: 2,
                available: 1
            })
        );
    }

    #[test]
    fn test_token_insufficient_balance_leaves_allowance() {
        let mut token = TokenLedger::new([8u8; 32], "LINK".into(), MINTER);
        token.mint(&MINTER, ALICE, 1).unwrap();
        token.approve(&ALICE, BOB, 5).unwrap();

        assert!(matches!(
            token.transfer_from(&BOB, &ALICE, BOB, 5),
            Err(AuctionError::InsufficientBalance { .. })
        ));
        assert_eq!(token.allowance(&ALICE, &BOB), 5);
    }

    #[test]
    fn test_token_mint_overflow() {
        let mut token = TokenLedger::new([8u8; 32], "LINK".into(), MINTER);
        token.mint(&MINTER, ALICE, Amount::MAX).unwrap();
        assert_eq!(
            token.mint(&MINTER, BOB, 1),
            Err(AuctionError::ArithmeticOverflow)
        );
    }

    #[test]
    fn test_native_transfer() {
        let mut ledger = Ledger::default();
        ledger.credit_native(ALICE, 100).unwrap();
        ledger.transfer_native(&ALICE, BOB, 60).unwrap();
        assert_eq!(ledger.native_balance(&ALICE), 40);
        assert_eq!(ledger.native_balance(&BOB), 60);
        assert!(matches!(
            ledger.transfer_native(&ALICE, BOB, 41),
            Err(AuctionError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_unknown_contracts() {
        let ledger = Ledger::default();
        assert!(matches!(
            ledger.token(&ALICE),
            Err(AuctionError::UnknownContract(_))
        ));
        assert!(matches!(
            ledger.asset_registry(&ALICE),
            Err(AuctionError::UnknownContract(_))
        ));
    }
}
