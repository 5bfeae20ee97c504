//! Relayer for cross-chain auction messages.
//!
//! This binary manages a relayer's BLS key and:
//! - Builds and attests unlock, retarget and bid instructions
//! - Submits them to a destination chain's message processor
//! - Watches a chain for records that need relaying

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use auction_client::{ChainClient, MessageBuilder};
use auction_crypto::RelayerKey;
use auction_module::AuctionCall;
use auction_types::{compute_message_id, parse_address, Address, Amount, Event, MessagePayload};

fn address_arg(s: &str) -> Result<Address, String> {
    parse_address(s).ok_or_else(|| format!("invalid 32-byte hex address: {}", s))
}

#[derive(Parser)]
#[command(name = "relayer")]
#[command(about = "Cross-chain auction message relayer")]
struct Cli {
    /// Destination chain RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9944")]
    rpc: String,

    /// Path to store relayer state (keys, nonce)
    #[arg(long, default_value = "./relayer-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a relayer key
    Keygen {
        /// Replace an existing key
        #[arg(long)]
        force: bool,
    },

    /// Print the relayer address to register with `add-relayer`
    Address,

    /// Attest and submit a message to the destination processor
    Submit {
        /// Chain the message originates from
        #[arg(long)]
        source_chain: u64,

        /// Source-side bridge that emitted the message
        #[arg(long, value_parser = address_arg)]
        emitter: Address,

        /// Message processor on the destination chain
        #[arg(long, value_parser = address_arg)]
        processor: Address,

        /// Account submitting the transaction (defaults to the relayer address)
        #[arg(long, value_parser = address_arg)]
        sender: Option<Address>,

        /// Message nonce (defaults to the next stored nonce)
        #[arg(long)]
        nonce: Option<u64>,

        #[command(subcommand)]
        instruction: InstructionArgs,
    },

    /// Log records that need relaying
    Watch {
        /// First event index to read
        #[arg(long, default_value = "0")]
        from: u64,

        /// Poll interval in seconds
        #[arg(long, default_value = "5")]
        interval: u64,
    },
}

#[derive(Subcommand, Debug, Clone)]
enum InstructionArgs {
    /// Release a locked asset to a recipient
    Unlock {
        #[arg(long, value_parser = address_arg)]
        bridge: Address,
        #[arg(long)]
        lock_id: u64,
        #[arg(long, value_parser = address_arg)]
        recipient: Address,
    },

    /// Point a lock at another destination chain
    Retarget {
        #[arg(long, value_parser = address_arg)]
        bridge: Address,
        #[arg(long)]
        lock_id: u64,
        #[arg(long)]
        target_chain: u64,
    },

    /// Place a bid escrowed on the source chain
    Bid {
        #[arg(long, value_parser = address_arg)]
        auction: Address,
        #[arg(long, value_parser = address_arg)]
        bidder: Address,
        #[arg(long)]
        amount: Amount,
    },
}

/// Relayer state persisted to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RelayerState {
    /// BLS secret key, hex encoded
    secret_key: String,
    /// Compressed G2 public key, hex encoded
    public_key: String,
    address: String,
    next_nonce: u64,
}

impl RelayerState {
    fn from_key(key: &RelayerKey) -> Self {
        Self {
            secret_key: hex::encode(key.secret_bytes()),
            public_key: hex::encode(key.public_key().0),
            address: hex::encode(key.address()),
            next_nonce: 1,
        }
    }

    fn key(&self) -> Result<RelayerKey> {
        let bytes: [u8; 32] = hex::decode(&self.secret_key)?
            .try_into()
            .map_err(|_| anyhow!("Invalid secret key length"))?;
        Ok(RelayerKey::from_secret_bytes(&bytes)?)
    }

    /// Advance the stored nonce past one that has been used.
    fn record_nonce(&mut self, used: u64) {
        self.next_nonce = self.next_nonce.max(used.saturating_add(1));
    }

    fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read {:?} (run keygen first): {}", path, e))?;
        Ok(serde_json::from_str(&data)?)
    }

    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    fn state_file(data_dir: &Path) -> PathBuf {
        data_dir.join("relayer.json")
    }
}

fn build_payload(builder: &MessageBuilder, nonce: u64, instruction: &InstructionArgs) -> MessagePayload {
    match *instruction {
        InstructionArgs::Unlock {
            bridge,
            lock_id,
            recipient,
        } => builder.unlock(nonce, bridge, lock_id, recipient),
        InstructionArgs::Retarget {
            bridge,
            lock_id,
            target_chain,
        } => builder.retarget(nonce, bridge, lock_id, target_chain),
        InstructionArgs::Bid {
            auction,
            bidder,
            amount,
        } => builder.bid(nonce, auction, bidder, amount),
    }
}

#[allow(clippy::too_many_arguments)]
async fn submit(
    client: &ChainClient,
    state: &mut RelayerState,
    state_file: &Path,
    source_chain: u64,
    emitter: Address,
    processor: Address,
    sender: Option<Address>,
    nonce: Option<u64>,
    instruction: &InstructionArgs,
) -> Result<()> {
    let key = state.key()?;
    let destination = client.block_info().await?;
    let builder = MessageBuilder::new(source_chain, destination.chain_id, emitter)?;

    let nonce = nonce.unwrap_or(state.next_nonce);
    let payload = build_payload(&builder, nonce, instruction);
    let message = builder.attest(&payload, &key)?;
    let message_id = compute_message_id(source_chain, &message.payload);

    let sender = sender.unwrap_or_else(|| key.address());
    info!(
        "Submitting message {} (nonce {}) from chain {} to chain {}",
        hex::encode(message_id),
        nonce,
        source_chain,
        destination.chain_id
    );
    let receipt = client
        .submit(
            &sender,
            0,
            &AuctionCall::ProcessCrossChainMessage { processor, message },
        )
        .await?;

    state.record_nonce(nonce);
    state.save(state_file)?;

    println!("Message processed at height {}", receipt.block_height);
    println!("  Message ID: {}", hex::encode(message_id));
    for event in &receipt.events {
        println!("  [{}] {}", event.index, event.name);
    }
    Ok(())
}

async fn watch(client: &ChainClient, from: u64, interval: u64) -> Result<()> {
    let mut cursor = from;
    info!("Watching for relayable records from index {}", cursor);

    loop {
        match client.events(cursor, 100).await {
            Ok(records) => {
                for record in records {
                    cursor = record.index + 1;
                    match record.decode() {
                        Ok(Event::AssetLocked {
                            bridge,
                            lock_id,
                            owner,
                            target_chain_id,
                            ..
                        }) => info!(
                            "Lock {} on bridge {} for {} targets chain {}",
                            lock_id,
                            hex::encode(bridge),
                            hex::encode(owner),
                            target_chain_id
                        ),
                        Ok(Event::RemotePaymentDue {
                            auction,
                            chain_id,
                            recipient,
                            amount,
                        }) => info!(
                            "Auction {} owes {} to {} on chain {}",
                            hex::encode(auction),
                            amount,
                            hex::encode(recipient),
                            chain_id
                        ),
                        Ok(_) => {}
                        Err(e) => warn!("Skipping record {}: {}", record.index, e),
                    }
                }
            }
            Err(e) => warn!("Failed to fetch events: {}", e),
        }

        tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("relayer=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let state_file = RelayerState::state_file(&cli.data_dir);

    match cli.command {
        Commands::Keygen { force } => {
            if state_file.exists() && !force {
                return Err(anyhow!(
                    "Key already exists at {:?}; pass --force to replace it",
                    state_file
                ));
            }
            let key = RelayerKey::generate(&mut OsRng);
            let state = RelayerState::from_key(&key);
            state.save(&state_file)?;

            info!("Key generated and saved to {:?}", state_file);
            println!("Address: {}", state.address);
            println!("Public key: {}", state.public_key);
        }

        Commands::Address => {
            let state = RelayerState::load(&state_file)?;
            println!("{}", state.address);
        }

        Commands::Submit {
            source_chain,
            emitter,
            processor,
            sender,
            nonce,
            instruction,
        } => {
            let mut state = RelayerState::load(&state_file)?;
            let client = ChainClient::new(&cli.rpc)?;
            submit(
                &client,
                &mut state,
                &state_file,
                source_chain,
                emitter,
                processor,
                sender,
                nonce,
                &instruction,
            )
            .await?;
        }

        Commands::Watch { from, interval } => {
            let client = ChainClient::new(&cli.rpc)?;
            watch(&client, from, interval).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrip() {
        let key = RelayerKey::generate(&mut OsRng);
        let dir = std::env::temp_dir().join(format!("relayer-test-{}", hex::encode(key.address())));
        let path = RelayerState::state_file(&dir);

        let mut state = RelayerState::from_key(&key);
        state.next_nonce = 7;
        state.save(&path).unwrap();

        let loaded = RelayerState::load(&path).unwrap();
        assert_eq!(loaded.next_nonce, 7);
        assert_eq!(loaded.key().unwrap().address(), key.address());
        assert_eq!(loaded.address, hex::encode(key.address()));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_corrupt_secret_rejected() {
        let key = RelayerKey::generate(&mut OsRng);
        let mut state = RelayerState::from_key(&key);
        state.secret_key = "abcd".into();
        assert!(state.key().is_err());
    }

    #[test]
    fn test_record_nonce_only_moves_forward() {
        let key = RelayerKey::generate(&mut OsRng);
        let mut state = RelayerState::from_key(&key);

        state.record_nonce(4);
        assert_eq!(state.next_nonce, 5);
        state.record_nonce(2);
        assert_eq!(state.next_nonce, 5);
        state.record_nonce(u64::MAX);
        assert_eq!(state.next_nonce, u64::MAX);
    }

    #[test]
    fn test_build_payload_maps_instruction() {
        let builder = MessageBuilder::new(5, 1, [0xee; 32]).unwrap();
        let payload = build_payload(
            &builder,
            3,
            &InstructionArgs::Retarget {
                bridge: [1u8; 32],
                lock_id: 2,
                target_chain: 9,
            },
        );
        assert_eq!(payload, builder.retarget(3, [1u8; 32], 2, 9));
        assert_eq!(payload.destination_chain_id, 1);
        assert_eq!(payload.emitter, [0xee; 32]);
    }
}
