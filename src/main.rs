//! Bid history: prints every bid placed on the PodAuctionHouse since a start
//! block, with the time of the block it landed in.
//!
//! Usage:
//!   cargo run                                   # table, config from podhouse.toml / env
//!   cargo run -- --timestamps                   # JSON array of bid timestamps
//!   cargo run -- --json --start-block 25809105  # one JSON object per bid
//!
//! Flags: --config <path>, --contract <addr>, --event <name|signature>,
//!        --start-block <n>, --end-block <n>, --json, --timestamps

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use podhouse::config::Config;
use podhouse::history::{BidEvent, BidHistoryReconstructor, RpcLedger};

const DEFAULT_CONFIG_PATH: &str = "podhouse.toml";

// ─── CLI ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Table,
    Json,
    Timestamps,
}

#[derive(Debug)]
struct Args {
    config: Option<PathBuf>,
    contract: Option<String>,
    event: Option<String>,
    start_block: Option<u64>,
    end_block: Option<u64>,
    output: Output,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args {
        config: None,
        contract: None,
        event: None,
        start_block: None,
        end_block: None,
        output: Output::Table,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| -> Result<String> {
            iter.next()
                .cloned()
                .with_context(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
            "--contract" => parsed.contract = Some(value("--contract")?),
            "--event" => parsed.event = Some(value("--event")?),
            "--start-block" => {
                parsed.start_block = Some(
                    value("--start-block")?
                        .parse()
                        .context("--start-block must be a block number")?,
                )
            }
            "--end-block" => {
                parsed.end_block = Some(
                    value("--end-block")?
                        .parse()
                        .context("--end-block must be a block number")?,
                )
            }
            "--json" => parsed.output = Output::Json,
            "--timestamps" => parsed.output = Output::Timestamps,
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(parsed)
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            Config::load(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => Config::from_env()?,
    };

    if let Some(contract) = &args.contract {
        config.history.contract_address = contract.clone();
    }
    if let Some(event) = &args.event {
        config.history.event = event.clone();
    }
    if let Some(start) = args.start_block {
        config.history.start_block = start;
    }
    if args.end_block.is_some() {
        config.history.end_block = args.end_block;
    }
    Ok(config)
}

// ─── Main ───────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&argv)?;
    let config = load_config(&args)?;

    // Logs go to stderr so stdout stays clean for --json / --timestamps.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    info!("podhouse v{} starting", env!("CARGO_PKG_VERSION"));

    let contract = config.contract_address()?;
    let urls = config.rpc_urls()?;
    let ledger = RpcLedger::connect(&urls).await?;

    if config.ledger.verify_chain_id {
        if let Some(expected) = config.network().and_then(|n| n.chain_id) {
            let actual = ledger.chain_id().await?;
            if actual != expected {
                warn!(
                    url = %ledger.url(),
                    network = %config.ledger.network,
                    expected,
                    actual,
                    "RPC endpoint chain id does not match configured network"
                );
            }
        }
    }

    info!(
        contract = %contract,
        event = %config.history.event,
        start_block = config.history.start_block,
        end_block = ?config.history.end_block,
        "fetching bid history"
    );

    let reconstructor = BidHistoryReconstructor::new(ledger, config.reconstruct_options());
    let history = reconstructor
        .fetch_bid_history(contract, &config.history.event, config.history.start_block)
        .await?;

    match args.output {
        Output::Table => print_table(&history),
        Output::Json => {
            for event in &history {
                println!("{}", serde_json::to_string(&BidRow::from(event))?);
            }
        }
        Output::Timestamps => {
            let timestamps: Vec<u64> = history.iter().map(|e| e.timestamp).collect();
            println!("{}", serde_json::to_string(&timestamps)?);
        }
    }

    Ok(())
}

// ─── Output ─────────────────────────────────────────────────────────────────

/// JSON shape of one bid. Big integers are decimal strings.
#[derive(Debug, Serialize)]
struct BidRow {
    token_id: String,
    bidder: String,
    amount: String,
    block_number: u64,
    timestamp: u64,
    time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_index: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_hash: Option<String>,
}

impl From<&BidEvent> for BidRow {
    fn from(event: &BidEvent) -> Self {
        Self {
            token_id: event.token_id.to_string(),
            bidder: event.bidder.to_checksum(None),
            amount: event.amount.to_string(),
            block_number: event.block_number,
            timestamp: event.timestamp,
            time: fmt_ts(event.timestamp),
            log_index: event.log_index,
            transaction_hash: event.transaction_hash.map(|h| h.to_string()),
        }
    }
}

fn print_table(history: &[BidEvent]) {
    if history.is_empty() {
        println!("no bids found");
        return;
    }
    println!(
        "{:>10}  {:<23}  {:>8}  {:<42}  {}",
        "block", "time", "token", "bidder", "amount (wei)"
    );
    for event in history {
        println!(
            "{:>10}  {:<23}  {:>8}  {:<42}  {}",
            event.block_number,
            fmt_ts(event.timestamp),
            event.token_id,
            event.bidder.to_checksum(None),
            event.amount
        );
    }
    println!("{} bids", history.len());
}

fn fmt_ts(ts: u64) -> String {
    DateTime::<Utc>::from_timestamp(ts as i64, 0)
        .map(|d| d.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("ts={}", ts))
}
