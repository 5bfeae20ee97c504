//! JSON-RPC client for the mock chain.

use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use auction_module::AuctionCall;
use auction_types::{parse_address, Address, Amount, Event};

/// Errors returned by [`ChainClient`].
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("RPC failure: {0}")]
    Transport(#[from] jsonrpsee::core::ClientError),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub chain_id: u64,
    pub height: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallOutcomeRpc {
    pub kind: String,
    pub address: Option<String>,
    pub id: Option<u64>,
    #[serde(default)]
    pub owed: Vec<OwedAmountRpc>,
    pub message_id: Option<String>,
}

/// Deferred refund total in one currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwedAmountRpc {
    pub currency: String,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRpc {
    pub index: u64,
    pub block_height: u64,
    pub timestamp: u64,
    pub name: String,
    pub data: String,
}

impl EventRpc {
    /// Decode the borsh payload.
    pub fn decode(&self) -> Result<Event, RpcError> {
        let bytes = hex::decode(&self.data).map_err(|e| RpcError::InvalidResponse(e.to_string()))?;
        borsh::from_slice(&bytes).map_err(|e| RpcError::InvalidResponse(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceipt {
    pub block_height: u64,
    pub timestamp: u64,
    pub outcome: CallOutcomeRpc,
    pub events: Vec<EventRpc>,
}

impl TxReceipt {
    /// Address returned by a deploy or create call.
    pub fn address(&self) -> Result<Address, RpcError> {
        self.outcome
            .address
            .as_deref()
            .and_then(parse_address)
            .ok_or_else(|| RpcError::InvalidResponse(format!("no address in {}", self.outcome.kind)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionRpc {
    pub auction_id: u64,
    pub address: String,
    pub factory: String,
    pub seller: String,
    pub asset_contract: String,
    pub asset_id: u64,
    pub starting_price: String,
    pub start_time: u64,
    pub end_time: u64,
    pub status: String,
    pub highest_bidder: Option<String>,
    pub highest_bid: String,
    pub currency: Option<String>,
    pub pending_returns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionSummaryRpc {
    pub auction_id: u64,
    pub address: String,
    pub seller: String,
    pub status: String,
    pub end_time: u64,
    pub highest_bid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRpc {
    pub lock_id: u64,
    pub owner: String,
    pub asset_contract: String,
    pub asset_id: u64,
    pub target_chain_id: u64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorRpc {
    pub address: String,
    pub owner: String,
    pub auction_contract: Option<String>,
    pub trusted_relayers: Vec<String>,
    pub bridge_routes: Vec<(String, u64)>,
    pub processed_count: usize,
}

fn parse_amount(s: &str) -> Result<Amount, RpcError> {
    s.parse()
        .map_err(|_| RpcError::InvalidResponse(format!("bad amount: {}", s)))
}

/// Typed wrapper over the mock chain's JSON-RPC surface.
pub struct ChainClient {
    client: HttpClient,
}

impl ChainClient {
    pub fn new(url: &str) -> Result<Self, RpcError> {
        Ok(Self {
            client: HttpClientBuilder::default().build(url)?,
        })
    }

    pub async fn block_info(&self) -> Result<BlockInfo, RpcError> {
        Ok(self.client.request("chain_getBlockInfo", rpc_params![]).await?)
    }

    pub async fn advance_block(&self) -> Result<BlockInfo, RpcError> {
        Ok(self.client.request("admin_advanceBlock", rpc_params![]).await?)
    }

    pub async fn set_timestamp(&self, timestamp: u64) -> Result<(), RpcError> {
        let _: bool = self
            .client
            .request("admin_setTimestamp", rpc_params![timestamp])
            .await?;
        Ok(())
    }

    /// Submit `call` from `sender` with `value` attached.
    pub async fn submit(
        &self,
        sender: &Address,
        value: Amount,
        call: &AuctionCall,
    ) -> Result<TxReceipt, RpcError> {
        let encoded = borsh::to_vec(call).map_err(|e| RpcError::Encoding(e.to_string()))?;
        Ok(self
            .client
            .request(
                "tx_submit",
                rpc_params![hex::encode(sender), value.to_string(), hex::encode(encoded)],
            )
            .await?)
    }

    pub async fn events(&self, from_index: u64, limit: usize) -> Result<Vec<EventRpc>, RpcError> {
        Ok(self
            .client
            .request("chain_getEvents", rpc_params![from_index, limit])
            .await?)
    }

    pub async fn auction(&self, auction: &Address) -> Result<Option<AuctionRpc>, RpcError> {
        Ok(self
            .client
            .request("query_getAuction", rpc_params![hex::encode(auction)])
            .await?)
    }

    pub async fn auction_count(&self, factory: &Address) -> Result<u64, RpcError> {
        Ok(self
            .client
            .request("query_getAuctionCount", rpc_params![hex::encode(factory)])
            .await?)
    }

    pub async fn auction_by_id(
        &self,
        factory: &Address,
        auction_id: u64,
    ) -> Result<Option<String>, RpcError> {
        Ok(self
            .client
            .request(
                "query_getAuctionById",
                rpc_params![hex::encode(factory), auction_id],
            )
            .await?)
    }

    pub async fn active_auctions(&self) -> Result<Vec<AuctionSummaryRpc>, RpcError> {
        Ok(self
            .client
            .request("query_listActiveAuctions", rpc_params![])
            .await?)
    }

    pub async fn expired_auctions(&self) -> Result<Vec<AuctionSummaryRpc>, RpcError> {
        Ok(self
            .client
            .request("query_listExpiredAuctions", rpc_params![])
            .await?)
    }

    pub async fn pending_returns(
        &self,
        auction: &Address,
        bidder: &Address,
    ) -> Result<Vec<OwedAmountRpc>, RpcError> {
        let owed: Vec<OwedAmountRpc> = self
            .client
            .request(
                "query_getPendingReturns",
                rpc_params![hex::encode(auction), hex::encode(bidder)],
            )
            .await?;
        for entry in &owed {
            parse_amount(&entry.amount)?;
        }
        Ok(owed)
    }

    pub async fn lock(&self, bridge: &Address, lock_id: u64) -> Result<Option<LockRpc>, RpcError> {
        Ok(self
            .client
            .request("query_getLock", rpc_params![hex::encode(bridge), lock_id])
            .await?)
    }

    pub async fn processor(&self, processor: &Address) -> Result<Option<ProcessorRpc>, RpcError> {
        Ok(self
            .client
            .request("query_getProcessor", rpc_params![hex::encode(processor)])
            .await?)
    }

    pub async fn is_message_processed(
        &self,
        processor: &Address,
        message_id: &[u8; 32],
    ) -> Result<bool, RpcError> {
        Ok(self
            .client
            .request(
                "query_isMessageProcessed",
                rpc_params![hex::encode(processor), hex::encode(message_id)],
            )
            .await?)
    }

    pub async fn native_balance(&self, owner: &Address) -> Result<Amount, RpcError> {
        let raw: String = self
            .client
            .request("query_nativeBalance", rpc_params![hex::encode(owner)])
            .await?;
        parse_amount(&raw)
    }

    pub async fn token_balance(&self, token: &Address, owner: &Address) -> Result<Amount, RpcError> {
        let raw: String = self
            .client
            .request(
                "query_tokenBalance",
                rpc_params![hex::encode(token), hex::encode(owner)],
            )
            .await?;
        parse_amount(&raw)
    }

    pub async fn token_allowance(
        &self,
        token: &Address,
        owner: &Address,
        spender: &Address,
    ) -> Result<Amount, RpcError> {
        let raw: String = self
            .client
            .request(
                "query_tokenAllowance",
                rpc_params![hex::encode(token), hex::encode(owner), hex::encode(spender)],
            )
            .await?;
        parse_amount(&raw)
    }

    pub async fn nft_owner(&self, collection: &Address, token_id: u64) -> Result<Option<String>, RpcError> {
        Ok(self
            .client
            .request("query_nftOwner", rpc_params![hex::encode(collection), token_id])
            .await?)
    }
}
