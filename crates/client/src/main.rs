//! CLI for interacting with NFT auctions and the cross-chain bridge.
//!
//! This binary provides commands for:
//! - Deploying collections, tokens, factories, processors and bridges
//! - Listing assets and bidding in native value or tokens
//! - Ending, cancelling and withdrawing from auctions
//! - Querying auction, bridge and processor state

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use auction_client::rpc::{AuctionSummaryRpc, ChainClient, TxReceipt};
use auction_module::AuctionCall;
use auction_types::{parse_address, Address, Amount};

fn address_arg(s: &str) -> Result<Address, String> {
    parse_address(s).ok_or_else(|| format!("invalid 32-byte hex address: {}", s))
}

#[derive(Parser)]
#[command(name = "auction-cli")]
#[command(about = "CLI for NFT auctions and the cross-chain bridge")]
struct Cli {
    /// Mock chain RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9944")]
    rpc: String,

    /// Sender address (hex), required for transactions
    #[arg(long, global = true, value_parser = address_arg)]
    sender: Option<Address>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    // ============ Host ledger ============
    /// Deploy an NFT collection
    DeployCollection {
        #[arg(long)]
        name: String,
    },

    /// Deploy a fungible token
    DeployToken {
        #[arg(long)]
        symbol: String,
    },

    /// Mint an NFT (collection owner only)
    MintNft {
        #[arg(long, value_parser = address_arg)]
        collection: Address,
        #[arg(long, value_parser = address_arg)]
        to: Address,
        #[arg(long, default_value = "")]
        token_uri: String,
    },

    /// Mint fungible tokens (token owner only)
    MintTokens {
        #[arg(long, value_parser = address_arg)]
        token: Address,
        #[arg(long, value_parser = address_arg)]
        to: Address,
        #[arg(long)]
        amount: Amount,
    },

    /// Approve a spender for one NFT
    ApproveNft {
        #[arg(long, value_parser = address_arg)]
        collection: Address,
        #[arg(long, value_parser = address_arg)]
        spender: Address,
        #[arg(long)]
        token_id: u64,
    },

    /// Set a token allowance
    ApproveTokens {
        #[arg(long, value_parser = address_arg)]
        token: Address,
        #[arg(long, value_parser = address_arg)]
        spender: Address,
        #[arg(long)]
        amount: Amount,
    },

    /// Transfer an NFT (owner or approved spender)
    TransferNft {
        #[arg(long, value_parser = address_arg)]
        collection: Address,
        #[arg(long, value_parser = address_arg)]
        to: Address,
        #[arg(long)]
        token_id: u64,
    },

    /// Transfer fungible tokens
    TransferTokens {
        #[arg(long, value_parser = address_arg)]
        token: Address,
        #[arg(long, value_parser = address_arg)]
        to: Address,
        #[arg(long)]
        amount: Amount,
    },

    /// Transfer native value
    TransferNative {
        #[arg(long, value_parser = address_arg)]
        to: Address,
        #[arg(long)]
        amount: Amount,
    },

    // ============ Auctions ============
    /// Deploy an auction factory
    DeployFactory {
        /// Bridge that receives assets won by remote bidders
        #[arg(long, value_parser = address_arg)]
        bridge: Option<Address>,
        /// Processor allowed to forward remote bids
        #[arg(long, value_parser = address_arg)]
        processor: Option<Address>,
    },

    /// List an NFT for auction
    CreateAuction {
        #[arg(long, value_parser = address_arg)]
        factory: Address,
        #[arg(long, value_parser = address_arg)]
        asset_contract: Address,
        #[arg(long)]
        asset_id: u64,
        #[arg(long, default_value = "1")]
        starting_price: Amount,
        /// Bidding window length in seconds
        #[arg(long)]
        duration: u64,
    },

    /// Bid with native value
    Bid {
        #[arg(long, value_parser = address_arg)]
        auction: Address,
        #[arg(long)]
        value: Amount,
    },

    /// Bid with a fungible token (approve the auction first)
    BidToken {
        #[arg(long, value_parser = address_arg)]
        auction: Address,
        #[arg(long, value_parser = address_arg)]
        token: Address,
        #[arg(long)]
        amount: Amount,
    },

    /// Cancel an auction (seller only)
    Cancel {
        #[arg(long, value_parser = address_arg)]
        auction: Address,
    },

    /// End an expired auction
    End {
        #[arg(long, value_parser = address_arg)]
        auction: Address,
    },

    /// Collect deferred refunds
    Withdraw {
        #[arg(long, value_parser = address_arg)]
        auction: Address,
    },

    // ============ Processor ============
    /// Deploy a message processor
    DeployProcessor,

    /// Trust a relayer address
    AddRelayer {
        #[arg(long, value_parser = address_arg)]
        processor: Address,
        #[arg(long, value_parser = address_arg)]
        relayer: Address,
    },

    /// Revoke a relayer
    RemoveRelayer {
        #[arg(long, value_parser = address_arg)]
        processor: Address,
        #[arg(long, value_parser = address_arg)]
        relayer: Address,
    },

    /// Register a source-chain bridge
    AddRoute {
        #[arg(long, value_parser = address_arg)]
        processor: Address,
        #[arg(long, value_parser = address_arg)]
        bridge: Address,
        #[arg(long)]
        chain_id: u64,
    },

    /// Remove a source-chain bridge
    RemoveRoute {
        #[arg(long, value_parser = address_arg)]
        processor: Address,
        #[arg(long, value_parser = address_arg)]
        bridge: Address,
        #[arg(long)]
        chain_id: u64,
    },

    /// Point the processor at an auction factory
    SetAuctionContract {
        #[arg(long, value_parser = address_arg)]
        processor: Address,
        #[arg(long, value_parser = address_arg)]
        factory: Address,
    },

    /// Hand processor ownership to another account
    TransferOwnership {
        #[arg(long, value_parser = address_arg)]
        processor: Address,
        #[arg(long, value_parser = address_arg)]
        new_owner: Address,
    },

    // ============ Bridge ============
    /// Deploy a bridge bound to a processor
    DeployBridge {
        #[arg(long, value_parser = address_arg)]
        processor: Address,
    },

    /// Lock an NFT for transfer to another chain
    LockNft {
        #[arg(long, value_parser = address_arg)]
        bridge: Address,
        #[arg(long, value_parser = address_arg)]
        asset_contract: Address,
        #[arg(long)]
        asset_id: u64,
        #[arg(long)]
        target_chain: u64,
    },

    // ============ Queries ============
    /// Get auction details
    GetAuction {
        #[arg(long, value_parser = address_arg)]
        auction: Address,
    },

    /// Resolve an auction address from its factory id
    GetAuctionById {
        #[arg(long, value_parser = address_arg)]
        factory: Address,
        #[arg(long)]
        auction_id: u64,
    },

    /// List auctions accepting bids, or expired ones awaiting `end`
    ListAuctions {
        #[arg(long)]
        expired: bool,
    },

    /// Refunds owed to a bidder
    PendingReturns {
        #[arg(long, value_parser = address_arg)]
        auction: Address,
        #[arg(long, value_parser = address_arg)]
        bidder: Address,
    },

    /// Get a bridge lock
    GetLock {
        #[arg(long, value_parser = address_arg)]
        bridge: Address,
        #[arg(long)]
        lock_id: u64,
    },

    /// Get processor configuration
    GetProcessor {
        #[arg(long, value_parser = address_arg)]
        processor: Address,
    },

    /// Native or token balance
    Balance {
        #[arg(long, value_parser = address_arg)]
        owner: Address,
        #[arg(long, value_parser = address_arg)]
        token: Option<Address>,
    },

    /// Current NFT owner
    NftOwner {
        #[arg(long, value_parser = address_arg)]
        collection: Address,
        #[arg(long)]
        token_id: u64,
    },

    /// Live auctions on a factory
    AuctionCount {
        #[arg(long, value_parser = address_arg)]
        factory: Address,
    },

    /// Token allowance granted by `owner` to `spender`
    Allowance {
        #[arg(long, value_parser = address_arg)]
        token: Address,
        #[arg(long, value_parser = address_arg)]
        owner: Address,
        #[arg(long, value_parser = address_arg)]
        spender: Address,
    },

    /// Whether a processor has applied a message id
    MessageStatus {
        #[arg(long, value_parser = address_arg)]
        processor: Address,
        /// Message id (hex)
        #[arg(long, value_parser = address_arg)]
        message_id: [u8; 32],
    },

    /// Print emitted events
    Events {
        #[arg(long, default_value = "0")]
        from: u64,
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Advance chain time (for testing)
    AdvanceBlock,

    /// Set chain timestamp (for testing)
    SetTimestamp {
        #[arg(long)]
        timestamp: u64,
    },
}

/// Map a transaction subcommand to its call and attached value.
fn call_for(command: Commands) -> Result<(Amount, AuctionCall)> {
    let call = match command {
        Commands::DeployCollection { name } => AuctionCall::DeployCollection { name },
        Commands::DeployToken { symbol } => AuctionCall::DeployToken { symbol },
        Commands::MintNft {
            collection,
            to,
            token_uri,
        } => AuctionCall::MintNft {
            collection,
            to,
            token_uri,
        },
        Commands::MintTokens { token, to, amount } => AuctionCall::MintTokens { token, to, amount },
        Commands::ApproveNft {
            collection,
            spender,
            token_id,
        } => AuctionCall::ApproveNft {
            collection,
            spender,
            token_id,
        },
        Commands::ApproveTokens {
            token,
            spender,
            amount,
        } => AuctionCall::ApproveTokens {
            token,
            spender,
            amount,
        },
        Commands::TransferNft {
            collection,
            to,
            token_id,
        } => AuctionCall::TransferNft {
            collection,
            to,
            token_id,
        },
        Commands::TransferTokens { token, to, amount } => {
            AuctionCall::TransferTokens { token, to, amount }
        }
        Commands::TransferNative { to, amount } => AuctionCall::TransferNative { to, amount },
        Commands::DeployFactory { bridge, processor } => AuctionCall::DeployFactory {
            bridge,
            message_processor: processor,
        },
        Commands::CreateAuction {
            factory,
            asset_contract,
            asset_id,
            starting_price,
            duration,
        } => AuctionCall::CreateAuction {
            factory,
            asset_contract,
            asset_id,
            starting_price,
            duration_secs: duration,
        },
        Commands::Bid { auction, value } => {
            return Ok((value, AuctionCall::PlaceBidWithNative { auction }))
        }
        Commands::BidToken {
            auction,
            token,
            amount,
        } => AuctionCall::PlaceBidWithToken {
            auction,
            token,
            amount,
        },
        Commands::Cancel { auction } => AuctionCall::Cancel { auction },
        Commands::End { auction } => AuctionCall::End { auction },
        Commands::Withdraw { auction } => AuctionCall::Withdraw { auction },
        Commands::DeployProcessor => AuctionCall::DeployProcessor,
        Commands::AddRelayer { processor, relayer } => {
            AuctionCall::AddTrustedRelayer { processor, relayer }
        }
        Commands::RemoveRelayer { processor, relayer } => {
            AuctionCall::RemoveTrustedRelayer { processor, relayer }
        }
        Commands::AddRoute {
            processor,
            bridge,
            chain_id,
        } => AuctionCall::AddBridgeContract {
            processor,
            bridge,
            chain_id,
        },
        Commands::RemoveRoute {
            processor,
            bridge,
            chain_id,
        } => AuctionCall::RemoveBridgeContract {
            processor,
            bridge,
            chain_id,
        },
        Commands::SetAuctionContract { processor, factory } => AuctionCall::SetAuctionContract {
            processor,
            auction_contract: factory,
        },
        Commands::TransferOwnership {
            processor,
            new_owner,
        } => AuctionCall::TransferOwnership {
            processor,
            new_owner,
        },
        Commands::DeployBridge { processor } => AuctionCall::DeployBridge {
            message_processor: processor,
        },
        Commands::LockNft {
            bridge,
            asset_contract,
            asset_id,
            target_chain,
        } => AuctionCall::LockNft {
            bridge,
            asset_contract,
            asset_id,
            target_chain_id: target_chain,
        },
        _ => bail!("not a transaction command"),
    };
    Ok((0, call))
}

fn print_receipt(receipt: &TxReceipt) {
    let outcome = &receipt.outcome;
    println!(
        "Committed at height {} ({}): {}",
        receipt.block_height, receipt.timestamp, outcome.kind
    );
    if let Some(address) = &outcome.address {
        println!("  Address: {}", address);
    }
    if let Some(id) = outcome.id {
        println!("  Id: {}", id);
    }
    for owed in &outcome.owed {
        println!("  Paid: {} {}", owed.amount, owed.currency);
    }
    if let Some(message_id) = &outcome.message_id {
        println!("  Message: {}", message_id);
    }
    for event in &receipt.events {
        println!("  [{}] {}", event.index, event.name);
    }
}

fn print_summaries(label: &str, auctions: &[AuctionSummaryRpc]) {
    if auctions.is_empty() {
        println!("No {} auctions", label);
        return;
    }
    println!("{} auctions:", label);
    for a in auctions {
        println!(
            "  [{}] {} - {} (ends {}, high bid {})",
            a.auction_id, a.address, a.status, a.end_time, a.highest_bid
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("auction_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let client = ChainClient::new(&cli.rpc)?;

    match cli.command {
        Commands::GetAuction { auction } => match client.auction(&auction).await? {
            Some(a) => {
                println!("Auction {} ({}):", a.auction_id, a.address);
                println!("  Status: {}", a.status);
                println!("  Seller: {}", a.seller);
                println!("  Asset: {} #{}", a.asset_contract, a.asset_id);
                println!("  Starting Price: {}", a.starting_price);
                println!("  Window: {} - {}", a.start_time, a.end_time);
                match (&a.highest_bidder, &a.currency) {
                    (Some(bidder), Some(currency)) => {
                        println!("  Highest Bid: {} ({}) by {}", a.highest_bid, currency, bidder)
                    }
                    _ => println!("  Highest Bid: none"),
                }
                println!("  Pending Refunds: {}", a.pending_returns);
            }
            None => println!("Auction {} not found", hex::encode(auction)),
        },

        Commands::GetAuctionById {
            factory,
            auction_id,
        } => match client.auction_by_id(&factory, auction_id).await? {
            Some(address) => println!("Auction {}: {}", auction_id, address),
            None => println!("Auction {} not found", auction_id),
        },

        Commands::ListAuctions { expired } => {
            if expired {
                print_summaries("Expired", &client.expired_auctions().await?);
            } else {
                print_summaries("Active", &client.active_auctions().await?);
            }
        }

        Commands::PendingReturns { auction, bidder } => {
            let owed = client.pending_returns(&auction, &bidder).await?;
            if owed.is_empty() {
                println!("Pending returns: none");
            }
            for entry in owed {
                println!("Pending returns: {} {}", entry.amount, entry.currency);
            }
        }

        Commands::GetLock { bridge, lock_id } => match client.lock(&bridge, lock_id).await? {
            Some(l) => {
                println!("Lock {}:", l.lock_id);
                println!("  Owner: {}", l.owner);
                println!("  Asset: {} #{}", l.asset_contract, l.asset_id);
                println!("  Target Chain: {}", l.target_chain_id);
                println!("  Status: {}", l.status);
            }
            None => println!("Lock {} not found", lock_id),
        },

        Commands::GetProcessor { processor } => match client.processor(&processor).await? {
            Some(p) => {
                println!("Processor {}:", p.address);
                println!("  Owner: {}", p.owner);
                println!(
                    "  Auction Contract: {}",
                    p.auction_contract.as_deref().unwrap_or("unset")
                );
                for relayer in &p.trusted_relayers {
                    println!("  Relayer: {}", relayer);
                }
                for (bridge, chain_id) in &p.bridge_routes {
                    println!("  Route: chain {} via {}", chain_id, bridge);
                }
                println!("  Processed Messages: {}", p.processed_count);
            }
            None => println!("Processor {} not found", hex::encode(processor)),
        },

        Commands::Balance { owner, token } => {
            let balance = match token {
                Some(token) => client.token_balance(&token, &owner).await?,
                None => client.native_balance(&owner).await?,
            };
            println!("Balance: {}", balance);
        }

        Commands::NftOwner {
            collection,
            token_id,
        } => match client.nft_owner(&collection, token_id).await? {
            Some(owner) => println!("Owner: {}", owner),
            None => println!("Token {} not minted", token_id),
        },

        Commands::AuctionCount { factory } => {
            println!("Live auctions: {}", client.auction_count(&factory).await?);
        }

        Commands::Allowance {
            token,
            owner,
            spender,
        } => {
            let allowance = client.token_allowance(&token, &owner, &spender).await?;
            println!("Allowance: {}", allowance);
        }

        Commands::MessageStatus {
            processor,
            message_id,
        } => {
            let done = client.is_message_processed(&processor, &message_id).await?;
            println!(
                "Message {}: {}",
                hex::encode(message_id),
                if done { "processed" } else { "not processed" }
            );
        }

        Commands::Events { from, limit } => {
            for record in client.events(from, limit).await? {
                let event = record.decode()?;
                println!(
                    "[{}] height={} {} {:?}",
                    record.index, record.block_height, record.name, event
                );
            }
        }

        Commands::AdvanceBlock => {
            let info = client.advance_block().await?;
            println!("Block advanced: height={}, timestamp={}", info.height, info.timestamp);
        }

        Commands::SetTimestamp { timestamp } => {
            client.set_timestamp(timestamp).await?;
            println!("Timestamp set to {}", timestamp);
        }

        command => {
            let sender = cli
                .sender
                .ok_or_else(|| anyhow!("--sender is required for transactions"))?;
            let (value, call) = call_for(command)?;
            info!("Submitting {} from {}", call.name(), hex::encode(sender));
            let receipt = client.submit(&sender, value, &call).await?;
            print_receipt(&receipt);
        }
    }

    Ok(())
}
