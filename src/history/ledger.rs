//! Read access to the ledger: historical log queries and block metadata.
//!
//! `Ledger` is the only seam between the reconstructor and the chain.
//! `RpcLedger` implements it over JSON-RPC with an alloy HTTP provider.

use crate::history::types::{BlockInfo, LedgerError, RawLog};
use alloy::consensus::BlockHeader;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::{Filter, Log};
use alloy::transports::http::reqwest::Url;
use std::future::Future;
use tracing::{debug, info, warn};

/// A filtered historical log query over an inclusive block range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub topic0: B256,
    pub from_block: u64,
    pub to_block: u64,
}

pub trait Ledger {
    /// Height of the most recent block.
    fn latest_block(&self) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    /// All logs matching the query, in ledger order.
    fn query_logs(
        &self,
        query: &LogQuery,
    ) -> impl Future<Output = Result<Vec<RawLog>, LedgerError>> + Send;

    /// Metadata (timestamp) of the block at `number`.
    fn block(&self, number: u64) -> impl Future<Output = Result<BlockInfo, LedgerError>> + Send;
}

/// JSON-RPC ledger backed by an alloy HTTP provider.
#[derive(Clone)]
pub struct RpcLedger {
    provider: RootProvider,
    url: String,
}

impl RpcLedger {
    /// Try each URL in order (primary first, then fallbacks) and keep the
    /// first one that answers `eth_blockNumber`.
    pub async fn connect(urls: &[String]) -> Result<Self, LedgerError> {
        let mut last_error = None;
        for url in urls.iter().filter(|u| !u.is_empty()) {
            debug!(url = %url, "trying RPC endpoint");
            match Self::try_connect(url).await {
                Ok(ledger) => return Ok(ledger),
                Err(e) => {
                    warn!(url = %url, error = %e, "RPC endpoint unavailable");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| LedgerError::Unavailable("no RPC endpoints configured".to_string())))
    }

    async fn try_connect(url: &str) -> Result<Self, LedgerError> {
        let parsed: Url = url
            .parse()
            .map_err(|e| LedgerError::Unavailable(format!("invalid RPC url {url}: {e}")))?;
        let provider = RootProvider::new_http(parsed);
        let block = provider.get_block_number().await?;
        info!(url = %url, block = block, "connected to RPC endpoint");
        Ok(Self {
            provider,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn chain_id(&self) -> Result<u64, LedgerError> {
        Ok(self.provider.get_chain_id().await?)
    }
}

impl Ledger for RpcLedger {
    async fn latest_block(&self) -> Result<u64, LedgerError> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn query_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>, LedgerError> {
        let filter = Filter::new()
            .address(query.address)
            .event_signature(query.topic0)
            .from_block(query.from_block)
            .to_block(query.to_block);
        let logs = self.provider.get_logs(&filter).await?;
        Ok(logs.iter().map(raw_log).collect())
    }

    async fn block(&self, number: u64) -> Result<BlockInfo, LedgerError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .await?
            .ok_or(LedgerError::BlockNotFound(number))?;
        Ok(BlockInfo {
            number,
            timestamp: block.header.timestamp(),
        })
    }
}

fn raw_log(log: &Log) -> RawLog {
    RawLog {
        address: log.address(),
        topics: log.topics().to_vec(),
        data: log.data().data.clone(),
        block_number: log.block_number,
        log_index: log.log_index,
        transaction_hash: log.transaction_hash,
    }
}
