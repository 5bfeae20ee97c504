//! Genesis configuration for the auction module.
//!
//! This module defines the initial state of the hosting ledger: its chain
//! id, clock and pre-funded accounts.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use auction_types::{Address, Amount, ChainId};

use crate::state::ModuleState;

/// Genesis configuration for the auction module.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Id of this ledger; inbound messages must be addressed to it
    pub chain_id: ChainId,

    /// Block timestamp at height 0
    pub genesis_timestamp: u64,

    /// Seconds the clock advances per produced block
    pub block_time_secs: u64,

    /// Accounts funded with native value at genesis
    #[serde(default)]
    pub accounts: Vec<GenesisAccount>,
}

/// A pre-funded account.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisAccount {
    #[serde_as(as = "Hex")]
    pub address: Address,
    pub balance: Amount,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            genesis_timestamp: 1_700_000_000,
            block_time_secs: 12,
            accounts: Vec::new(),
        }
    }
}

impl GenesisConfig {
    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.chain_id == 0 {
            return Err(GenesisValidationError::InvalidChainId);
        }
        if self.block_time_secs == 0 {
            return Err(GenesisValidationError::InvalidBlockTime);
        }

        let mut seen = BTreeSet::new();
        for account in &self.accounts {
            if !seen.insert(account.address) {
                return Err(GenesisValidationError::DuplicateAccount(hex::encode(
                    account.address,
                )));
            }
        }
        Ok(())
    }

    /// Validate and build the initial module state.
    pub fn build_state(&self) -> Result<ModuleState, GenesisValidationError> {
        self.validate()?;
        let mut state = ModuleState::new(self.chain_id);
        for account in &self.accounts {
            state.ledger.native.insert(account.address, account.balance);
        }
        Ok(state)
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Chain id cannot be zero")]
    InvalidChainId,

    #[error("Block time cannot be zero")]
    InvalidBlockTime,

    #[error("Duplicate genesis account: {0}")]
    DuplicateAccount(String),
}
