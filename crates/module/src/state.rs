//! On-chain state structures for the auction module.

use std::collections::{BTreeMap, BTreeSet};

use auction_types::{compute_contract_address, Address, AuctionInfo, ChainId, LockRecord};

use crate::error::AuctionError;
use crate::events::EventLog;
use crate::handlers::HandlerResult;
use crate::ledger::Ledger;

/// Auction registry and factory.
#[derive(Clone, Debug)]
pub struct FactoryState {
    pub address: Address,
    pub owner: Address,
    /// Bridge used to settle auctions won by remote bidders
    pub bridge: Option<Address>,
    /// Processor allowed to forward remote bids
    pub message_processor: Option<Address>,
    /// Next auction id to assign; ids are never reused
    pub next_auction_id: u64,
    /// Live auctions by id
    pub live_auctions: BTreeMap<u64, Address>,
}

impl FactoryState {
    pub fn new(
        address: Address,
        owner: Address,
        bridge: Option<Address>,
        message_processor: Option<Address>,
    ) -> Self {
        Self {
            address,
            owner,
            bridge,
            message_processor,
            next_auction_id: 1,
            live_auctions: BTreeMap::new(),
        }
    }

    /// Get the next auction ID and increment.
    pub fn allocate_auction_id(&mut self) -> u64 {
        let id = self.next_auction_id;
        self.next_auction_id += 1;
        id
    }

    pub fn auction_count(&self) -> u64 {
        self.live_auctions.len() as u64
    }
}

/// Cross-chain message processor.
#[derive(Clone, Debug)]
pub struct ProcessorState {
    pub address: Address,
    pub owner: Address,
    /// Factory whose auctions may receive forwarded bids
    pub auction_contract: Option<Address>,
    pub trusted_relayers: BTreeSet<Address>,
    /// Authorized (source bridge, source chain) pairs
    pub bridge_routes: BTreeSet<(Address, ChainId)>,
    pub processed_messages: BTreeSet<[u8; 32]>,
}

impl ProcessorState {
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            auction_contract: None,
            trusted_relayers: BTreeSet::new(),
            bridge_routes: BTreeSet::new(),
            processed_messages: BTreeSet::new(),
        }
    }

    pub fn is_route_authorized(&self, bridge: &Address, chain_id: ChainId) -> bool {
        self.bridge_routes.contains(&(*bridge, chain_id))
    }
}

/// Cross-chain bridge custody.
#[derive(Clone, Debug)]
pub struct BridgeState {
    pub address: Address,
    pub deployer: Address,
    /// The only caller allowed to deliver unlock and retarget instructions
    pub message_processor: Address,
    pub next_lock_id: u64,
    pub locks: BTreeMap<u64, LockRecord>,
}

impl BridgeState {
    pub fn new(address: Address, deployer: Address, message_processor: Address) -> Self {
        Self {
            address,
            deployer,
            message_processor,
            next_lock_id: 1,
            locks: BTreeMap::new(),
        }
    }

    pub fn allocate_lock_id(&mut self) -> u64 {
        let id = self.next_lock_id;
        self.next_lock_id += 1;
        id
    }
}

/// Auction module state.
///
/// Every contract lives here keyed by address. The runtime clones this before
/// each call and commits the clone only on success.
#[derive(Clone, Debug)]
pub struct ModuleState {
    /// Id of the ledger hosting this module
    pub chain_id: ChainId,
    pub next_contract_nonce: u64,
    pub ledger: Ledger,
    pub factories: BTreeMap<Address, FactoryState>,
    pub auctions: BTreeMap<Address, AuctionInfo>,
    pub processors: BTreeMap<Address, ProcessorState>,
    pub bridges: BTreeMap<Address, BridgeState>,
    pub events: EventLog,
}

impl ModuleState {
    /// Create a new, empty module state.
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            next_contract_nonce: 0,
            ledger: Ledger::default(),
            factories: BTreeMap::new(),
            auctions: BTreeMap::new(),
            processors: BTreeMap::new(),
            bridges: BTreeMap::new(),
            events: EventLog::default(),
        }
    }

    /// Derive a fresh contract address and bump the nonce.
    pub fn allocate_contract_address(&mut self, kind: &str, deployer: &Address) -> Address {
        let nonce = self.next_contract_nonce;
        self.next_contract_nonce += 1;
        compute_contract_address(kind, deployer, nonce)
    }

    pub fn factory(&self, address: &Address) -> HandlerResult<&FactoryState> {
        self.factories
            .get(address)
            .ok_or(AuctionError::UnknownContract(*address))
    }

    pub fn factory_mut(&mut self, address: &Address) -> HandlerResult<&mut FactoryState> {
        self.factories
            .get_mut(address)
            .ok_or(AuctionError::UnknownContract(*address))
    }

    pub fn auction(&self, address: &Address) -> HandlerResult<&AuctionInfo> {
        self.auctions
            .get(address)
            .ok_or(AuctionError::UnknownContract(*address))
    }

    pub fn auction_mut(&mut self, address: &Address) -> HandlerResult<&mut AuctionInfo> {
        self.auctions
            .get_mut(address)
            .ok_or(AuctionError::UnknownContract(*address))
    }

    pub fn processor(&self, address: &Address) -> HandlerResult<&ProcessorState> {
        self.processors
            .get(address)
            .ok_or(AuctionError::UnknownContract(*address))
    }

    pub fn processor_mut(&mut self, address: &Address) -> HandlerResult<&mut ProcessorState> {
        self.processors
            .get_mut(address)
            .ok_or(AuctionError::UnknownContract(*address))
    }

    pub fn bridge(&self, address: &Address) -> HandlerResult<&BridgeState> {
        self.bridges
            .get(address)
            .ok_or(AuctionError::UnknownContract(*address))
    }

    pub fn bridge_mut(&mut self, address: &Address) -> HandlerResult<&mut BridgeState> {
        self.bridges
            .get_mut(address)
            .ok_or(AuctionError::UnknownContract(*address))
    }

    /// Whether any contract or ledger object lives at `address`.
    pub fn contract_exists(&self, address: &Address) -> bool {
        self.factories.contains_key(address)
            || self.auctions.contains_key(address)
            || self.processors.contains_key(address)
            || self.bridges.contains_key(address)
            || self.ledger.tokens.contains_key(address)
            || self.ledger.collections.contains_key(address)
    }
}
