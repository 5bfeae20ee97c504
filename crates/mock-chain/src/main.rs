//! Mock chain server for local testing of the auction and bridge contracts.
//!
//! This provides a JSON-RPC server that hosts the auction module as a single
//! ledger with a manually advanced clock, without requiring a real
//! blockchain.

use anyhow::{Context, Result};
use clap::Parser;
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::Server;
use jsonrpsee::types::ErrorObjectOwned;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use auction_module::{
    execute, handle_query, AuctionCall, AuctionError, AuctionQuery, AuctionQueryResponse,
    CallContext, GenesisConfig, ModuleState,
};
use auction_types::{parse_address, Address, Amount};

mod types;
use types::*;

#[derive(Parser)]
#[command(name = "mock-chain")]
#[command(about = "Local JSON-RPC ledger hosting the auction module")]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:9944")]
    listen: SocketAddr,

    /// Genesis config (JSON); defaults apply when omitted
    #[arg(long)]
    genesis: Option<PathBuf>,
}

/// Shared chain state.
struct ChainState {
    /// Module state
    module: ModuleState,
    /// Current block height (simulated)
    block_height: u64,
    /// Current timestamp (simulated, can be advanced)
    timestamp: u64,
    block_time_secs: u64,
}

impl ChainState {
    fn from_genesis(genesis: &GenesisConfig) -> Result<Self> {
        Ok(Self {
            module: genesis.build_state()?,
            block_height: 0,
            timestamp: genesis.genesis_timestamp,
            block_time_secs: genesis.block_time_secs,
        })
    }

    fn advance_block(&mut self) {
        self.block_height += 1;
        self.timestamp += self.block_time_secs;
    }

    fn block_info(&self) -> BlockInfo {
        BlockInfo {
            chain_id: self.module.chain_id,
            height: self.block_height,
            timestamp: self.timestamp,
        }
    }
}

/// RPC API definition for the mock chain.
#[rpc(server)]
pub trait MockChainApi {
    // ============ Admin Methods ============

    /// Advance the chain by one block.
    #[method(name = "admin_advanceBlock")]
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Set the current timestamp (for testing time-dependent logic).
    #[method(name = "admin_setTimestamp")]
    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned>;

    // ============ Chain Methods ============

    /// Get current block info.
    #[method(name = "chain_getBlockInfo")]
    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Get emitted records starting at `from_index`.
    #[method(name = "chain_getEvents")]
    async fn chain_get_events(
        &self,
        from_index: u64,
        limit: usize,
    ) -> Result<Vec<EventRpc>, ErrorObjectOwned>;

    /// Execute a hex-encoded borsh `AuctionCall` from `sender` with
    /// `value` (decimal) attached.
    #[method(name = "tx_submit")]
    async fn tx_submit(
        &self,
        sender: String,
        value: String,
        call: String,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned>;

    // ============ Query Methods ============

    #[method(name = "query_getAuction")]
    async fn query_get_auction(&self, auction: String)
        -> Result<Option<AuctionRpc>, ErrorObjectOwned>;

    #[method(name = "query_getAuctionCount")]
    async fn query_get_auction_count(&self, factory: String) -> Result<u64, ErrorObjectOwned>;

    #[method(name = "query_getAuctionById")]
    async fn query_get_auction_by_id(
        &self,
        factory: String,
        auction_id: u64,
    ) -> Result<Option<String>, ErrorObjectOwned>;

    /// Auctions accepting bids at the current timestamp.
    #[method(name = "query_listActiveAuctions")]
    async fn query_list_active_auctions(&self)
        -> Result<Vec<AuctionSummaryRpc>, ErrorObjectOwned>;

    /// Auctions past their window and not yet ended.
    #[method(name = "query_listExpiredAuctions")]
    async fn query_list_expired_auctions(
        &self,
    ) -> Result<Vec<AuctionSummaryRpc>, ErrorObjectOwned>;

    #[method(name = "query_getPendingReturns")]
    async fn query_get_pending_returns(
        &self,
        auction: String,
        bidder: String,
    ) -> Result<Vec<OwedAmountRpc>, ErrorObjectOwned>;

    #[method(name = "query_getLock")]
    async fn query_get_lock(
        &self,
        bridge: String,
        lock_id: u64,
    ) -> Result<Option<LockRpc>, ErrorObjectOwned>;

    #[method(name = "query_getProcessor")]
    async fn query_get_processor(
        &self,
        processor: String,
    ) -> Result<Option<ProcessorRpc>, ErrorObjectOwned>;

    #[method(name = "query_isMessageProcessed")]
    async fn query_is_message_processed(
        &self,
        processor: String,
        message_id: String,
    ) -> Result<bool, ErrorObjectOwned>;

    #[method(name = "query_nativeBalance")]
    async fn query_native_balance(&self, owner: String) -> Result<String, ErrorObjectOwned>;

    #[method(name = "query_tokenBalance")]
    async fn query_token_balance(
        &self,
        token: String,
        owner: String,
    ) -> Result<String, ErrorObjectOwned>;

    #[method(name = "query_tokenAllowance")]
    async fn query_token_allowance(
        &self,
        token: String,
        owner: String,
        spender: String,
    ) -> Result<String, ErrorObjectOwned>;

    #[method(name = "query_nftOwner")]
    async fn query_nft_owner(
        &self,
        collection: String,
        token_id: u64,
    ) -> Result<Option<String>, ErrorObjectOwned>;
}

/// Implementation of the mock chain RPC server.
struct MockChainServer {
    state: Arc<RwLock<ChainState>>,
}

impl MockChainServer {
    fn new(chain: ChainState) -> Self {
        Self {
            state: Arc::new(RwLock::new(chain)),
        }
    }

    fn rpc_error(msg: &str) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(-32000, msg.to_string(), None::<()>)
    }

    /// Rejections carry the stable code and category as error data.
    fn call_error(e: &AuctionError) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(
            -32000,
            e.to_string(),
            Some(serde_json::json!({ "code": e.code(), "kind": e.kind() })),
        )
    }

    fn address(s: &str) -> Result<Address, ErrorObjectOwned> {
        parse_address(s).ok_or_else(|| Self::rpc_error(&format!("Invalid address: {}", s)))
    }

    fn query(&self, query: AuctionQuery) -> AuctionQueryResponse {
        handle_query(&self.state.read().module, query)
    }

    fn unexpected(response: AuctionQueryResponse) -> ErrorObjectOwned {
        Self::rpc_error(&format!("Unexpected query response: {:?}", response))
    }

    fn balance(&self, query: AuctionQuery) -> Result<String, ErrorObjectOwned> {
        match self.query(query) {
            AuctionQueryResponse::Balance(amount) => Ok(amount.to_string()),
            other => Err(Self::unexpected(other)),
        }
    }

    fn auction_list(&self, query: AuctionQuery) -> Result<Vec<AuctionSummaryRpc>, ErrorObjectOwned> {
        match self.query(query) {
            AuctionQueryResponse::AuctionList(list) => {
                Ok(list.into_iter().map(AuctionSummaryRpc::from).collect())
            }
            other => Err(Self::unexpected(other)),
        }
    }
}

#[async_trait]
impl MockChainApiServer for MockChainServer {
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.advance_block();
        Ok(state.block_info())
    }

    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned> {
        let mut state = self.state.write();
        if timestamp < state.timestamp {
            return Err(Self::rpc_error("Timestamp cannot move backwards"));
        }
        state.timestamp = timestamp;
        info!("Timestamp set to {}", timestamp);
        Ok(true)
    }

    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        Ok(self.state.read().block_info())
    }

    async fn chain_get_events(
        &self,
        from_index: u64,
        limit: usize,
    ) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state
            .module
            .events
            .since(from_index, limit)
            .iter()
            .map(EventRpc::from)
            .collect())
    }

    async fn tx_submit(
        &self,
        sender: String,
        value: String,
        call: String,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned> {
        let sender = Self::address(&sender)?;
        let value: Amount = value
            .parse()
            .map_err(|e| Self::rpc_error(&format!("Invalid value: {}", e)))?;
        let call_bytes = hex::decode(call.trim_start_matches("0x"))
            .map_err(|e| Self::rpc_error(&format!("Invalid call hex: {}", e)))?;
        let call: AuctionCall = borsh::from_slice(&call_bytes)
            .map_err(|e| Self::rpc_error(&format!("Invalid call encoding: {}", e)))?;

        let mut state = self.state.write();
        let ctx = CallContext::new(sender, state.block_height, state.timestamp).with_value(value);
        let first_event = state.module.events.len() as u64;
        let name = call.name();

        let outcome = execute(&mut state.module, &ctx, call).map_err(|e| {
            warn!("{} from {} rejected: {}", name, hex::encode(sender), e);
            Self::call_error(&e)
        })?;

        let events: Vec<EventRpc> = state
            .module
            .events
            .since(first_event, usize::MAX)
            .iter()
            .map(EventRpc::from)
            .collect();

        info!(
            "{} from {} committed at height {} ({} events)",
            name,
            hex::encode(sender),
            state.block_height,
            events.len()
        );
        Ok(TxReceiptRpc {
            block_height: state.block_height,
            timestamp: state.timestamp,
            outcome: outcome.into(),
            events,
        })
    }

    async fn query_get_auction(
        &self,
        auction: String,
    ) -> Result<Option<AuctionRpc>, ErrorObjectOwned> {
        let auction = Self::address(&auction)?;
        match self.query(AuctionQuery::GetAuction { auction }) {
            AuctionQueryResponse::Auction(info) => Ok(info.as_ref().map(AuctionRpc::from)),
            other => Err(Self::unexpected(other)),
        }
    }

    async fn query_get_auction_count(&self, factory: String) -> Result<u64, ErrorObjectOwned> {
        let factory = Self::address(&factory)?;
        match self.query(AuctionQuery::GetAuctionCount { factory }) {
            AuctionQueryResponse::AuctionCount(count) => Ok(count),
            other => Err(Self::unexpected(other)),
        }
    }

    async fn query_get_auction_by_id(
        &self,
        factory: String,
        auction_id: u64,
    ) -> Result<Option<String>, ErrorObjectOwned> {
        let factory = Self::address(&factory)?;
        match self.query(AuctionQuery::GetAuctionById {
            factory,
            auction_id,
        }) {
            AuctionQueryResponse::AuctionAddress(addr) => Ok(addr.map(hex::encode)),
            other => Err(Self::unexpected(other)),
        }
    }

    async fn query_list_active_auctions(
        &self,
    ) -> Result<Vec<AuctionSummaryRpc>, ErrorObjectOwned> {
        let now = self.state.read().timestamp;
        self.auction_list(AuctionQuery::ListActiveAuctions { now })
    }

    async fn query_list_expired_auctions(
        &self,
    ) -> Result<Vec<AuctionSummaryRpc>, ErrorObjectOwned> {
        let now = self.state.read().timestamp;
        self.auction_list(AuctionQuery::ListExpiredAuctions { now })
    }

    async fn query_get_pending_returns(
        &self,
        auction: String,
        bidder: String,
    ) -> Result<Vec<OwedAmountRpc>, ErrorObjectOwned> {
        let query = AuctionQuery::GetPendingReturns {
            auction: Self::address(&auction)?,
            bidder: Self::address(&bidder)?,
        };
        match self.query(query) {
            AuctionQueryResponse::PendingReturns(owed) => {
                Ok(owed.iter().map(OwedAmountRpc::from).collect())
            }
            other => Err(Self::unexpected(other)),
        }
    }

    async fn query_get_lock(
        &self,
        bridge: String,
        lock_id: u64,
    ) -> Result<Option<LockRpc>, ErrorObjectOwned> {
        let bridge = Self::address(&bridge)?;
        match self.query(AuctionQuery::GetLock { bridge, lock_id }) {
            AuctionQueryResponse::Lock(lock) => Ok(lock.map(LockRpc::from)),
            other => Err(Self::unexpected(other)),
        }
    }

    async fn query_get_processor(
        &self,
        processor: String,
    ) -> Result<Option<ProcessorRpc>, ErrorObjectOwned> {
        let processor = Self::address(&processor)?;
        match self.query(AuctionQuery::GetProcessor { processor }) {
            AuctionQueryResponse::Processor(info) => Ok(info.map(ProcessorRpc::from)),
            other => Err(Self::unexpected(other)),
        }
    }

    async fn query_is_message_processed(
        &self,
        processor: String,
        message_id: String,
    ) -> Result<bool, ErrorObjectOwned> {
        let processor = Self::address(&processor)?;
        let message_id = parse_address(&message_id)
            .ok_or_else(|| Self::rpc_error("Message id must be 32 bytes of hex"))?;
        match self.query(AuctionQuery::IsMessageProcessed {
            processor,
            message_id,
        }) {
            AuctionQueryResponse::MessageProcessed(done) => Ok(done),
            other => Err(Self::unexpected(other)),
        }
    }

    async fn query_native_balance(&self, owner: String) -> Result<String, ErrorObjectOwned> {
        let owner = Self::address(&owner)?;
        self.balance(AuctionQuery::NativeBalance { owner })
    }

    async fn query_token_balance(
        &self,
        token: String,
        owner: String,
    ) -> Result<String, ErrorObjectOwned> {
        self.balance(AuctionQuery::TokenBalance {
            token: Self::address(&token)?,
            owner: Self::address(&owner)?,
        })
    }

    async fn query_token_allowance(
        &self,
        token: String,
        owner: String,
        spender: String,
    ) -> Result<String, ErrorObjectOwned> {
        self.balance(AuctionQuery::TokenAllowance {
            token: Self::address(&token)?,
            owner: Self::address(&owner)?,
            spender: Self::address(&spender)?,
        })
    }

    async fn query_nft_owner(
        &self,
        collection: String,
        token_id: u64,
    ) -> Result<Option<String>, ErrorObjectOwned> {
        let collection = Self::address(&collection)?;
        match self.query(AuctionQuery::NftOwner {
            collection,
            token_id,
        }) {
            AuctionQueryResponse::Owner(owner) => Ok(owner.map(hex::encode)),
            other => Err(Self::unexpected(other)),
        }
    }
}

fn load_genesis(path: Option<&PathBuf>) -> Result<GenesisConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading genesis file {}", path.display()))?;
            serde_json::from_str(&raw).context("parsing genesis file")
        }
        None => Ok(GenesisConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mock_chain=info".parse()?)
                .add_directive("auction_module=info".parse()?)
                .add_directive("jsonrpsee=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let genesis = load_genesis(cli.genesis.as_ref())?;
    let chain = ChainState::from_genesis(&genesis)?;

    info!(
        "Starting mock chain {} on {} ({} funded accounts)",
        genesis.chain_id,
        cli.listen,
        genesis.accounts.len()
    );

    let server = Server::builder().build(cli.listen).await?;
    let handle = server.start(MockChainServer::new(chain).into_rpc());

    info!("Mock chain server running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_module::{CallOutcome, GenesisAccount};
    use auction_types::{Currency, OwedAmount};

    const ALICE: Address = [2u8; 32];

    fn server() -> MockChainServer {
        let genesis = GenesisConfig {
            accounts: vec![GenesisAccount {
                address: ALICE,
                balance: 500,
            }],
            ..Default::default()
        };
        MockChainServer::new(ChainState::from_genesis(&genesis).unwrap())
    }

    fn encode(call: &AuctionCall) -> String {
        hex::encode(borsh::to_vec(call).unwrap())
    }

    #[tokio::test]
    async fn test_submit_then_query() {
        let server = server();
        let receipt = server
            .tx_submit(
                hex::encode(ALICE),
                "0".into(),
                encode(&AuctionCall::DeployCollection { name: "Art".into() }),
            )
            .await
            .unwrap();
        assert_eq!(receipt.outcome.kind, "deployed");
        assert!(receipt.events.iter().any(|e| e.name == "ContractDeployed"));

        let collection = receipt.outcome.address.unwrap();
        let minted = server
            .tx_submit(
                hex::encode(ALICE),
                "0".into(),
                encode(&AuctionCall::MintNft {
                    collection: parse_address(&collection).unwrap(),
                    to: ALICE,
                    token_uri: String::new(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(minted.outcome.kind, "nft_minted");
        assert_eq!(minted.outcome.id, Some(1));
        assert_eq!(
            server.query_nft_owner(collection, 1).await.unwrap(),
            Some(hex::encode(ALICE))
        );
    }

    #[tokio::test]
    async fn test_rejection_carries_code() {
        let server = server();
        let err = server
            .tx_submit(
                hex::encode(ALICE),
                "0".into(),
                encode(&AuctionCall::TransferNative {
                    to: [3u8; 32],
                    amount: 501,
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), -32000);
        assert!(err
            .data()
            .map(|d| d.get().contains("InsufficientBalance"))
            .unwrap_or(false));
        assert_eq!(
            server.query_native_balance(hex::encode(ALICE)).await.unwrap(),
            "500"
        );
    }

    #[tokio::test]
    async fn test_pending_returns_empty_for_unknown_auction() {
        let server = server();
        let owed = server
            .query_get_pending_returns(hex::encode([7u8; 32]), hex::encode(ALICE))
            .await
            .unwrap();
        assert!(owed.is_empty());
    }

    #[test]
    fn test_withdrawn_outcome_lists_each_currency() {
        let outcome = CallOutcomeRpc::from(CallOutcome::Withdrawn(vec![
            OwedAmount {
                currency: Currency::Native,
                amount: 30,
            },
            OwedAmount {
                currency: Currency::Remote(7),
                amount: u128::MAX,
            },
        ]));
        assert_eq!(outcome.kind, "withdrawn");
        assert_eq!(
            outcome.owed,
            vec![
                OwedAmountRpc {
                    currency: "native".into(),
                    amount: "30".into(),
                },
                OwedAmountRpc {
                    currency: "remote:7".into(),
                    amount: u128::MAX.to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_clock_only_moves_forward() {
        let server = server();
        let start = server.chain_get_block_info().await.unwrap();
        let next = server.admin_advance_block().await.unwrap();
        assert_eq!(next.height, start.height + 1);
        assert_eq!(next.timestamp, start.timestamp + 12);

        assert!(server.admin_set_timestamp(start.timestamp).await.is_err());
        assert!(server.admin_set_timestamp(next.timestamp + 100).await.unwrap());
    }
}
