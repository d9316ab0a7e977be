//! Bid history reconstruction.
//!
//! Queries the ledger for bid logs emitted by the auction house from a start
//! block onward, decodes them, resolves each block's timestamp and returns the
//! bids in ledger order.
//!
//! - The start block is pushed into the log query and also re-checked on
//!   every returned log, since nodes are not required to honor ranges exactly.
//! - The range is paged in `chunk_size` blocks (RPC providers cap
//!   `eth_getLogs` ranges).
//! - Block timestamps are looked up once per distinct block, through
//!   `BlockTimestampCache`, with a bounded fan-out that yields in submission
//!   order.

use crate::history::abi;
use crate::history::cache::BlockTimestampCache;
use crate::history::ledger::{Ledger, LogQuery};
use crate::history::types::{
    BidEvent, DecodedBid, FailurePolicy, HistoryError, LedgerError, RawLog,
};

use alloy::primitives::{Address, B256};
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables for a reconstruction run.
#[derive(Debug, Clone)]
pub struct ReconstructOptions {
    /// Last block to query (inclusive). None = latest block at call time.
    pub end_block: Option<u64>,
    /// Max blocks per `eth_getLogs` request.
    pub chunk_size: u64,
    /// Max block lookups in flight.
    pub concurrency: usize,
    /// Timeout applied to every remote call.
    pub call_timeout: Duration,
    /// Overall deadline. On expiry the whole call fails, no partial results.
    pub deadline: Option<Duration>,
    pub on_event_error: FailurePolicy,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            end_block: None,
            chunk_size: 10_000,
            concurrency: 8,
            call_timeout: Duration::from_secs(30),
            deadline: Some(Duration::from_secs(600)),
            on_event_error: FailurePolicy::Abort,
        }
    }
}

/// Rebuilds bid history from a ledger. Holds the ledger handle and a block
/// timestamp cache reused across calls.
pub struct BidHistoryReconstructor<L> {
    ledger: L,
    timestamps: BlockTimestampCache,
    options: ReconstructOptions,
}

impl<L: Ledger> BidHistoryReconstructor<L> {
    pub fn new(ledger: L, options: ReconstructOptions) -> Self {
        Self {
            ledger,
            timestamps: BlockTimestampCache::new(),
            options,
        }
    }

    /// Share a timestamp cache with other reconstructors on the same chain.
    pub fn with_cache(mut self, timestamps: BlockTimestampCache) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn cache(&self) -> &BlockTimestampCache {
        &self.timestamps
    }

    pub fn options(&self) -> &ReconstructOptions {
        &self.options
    }

    /// All bids emitted by `contract` for `event` at or after `start_block`,
    /// in ledger order (ascending block, then in-block order).
    ///
    /// `event` is either a full signature or a name from
    /// [`abi::KNOWN_EVENTS`].
    pub async fn fetch_bid_history(
        &self,
        contract: Address,
        event: &str,
        start_block: u64,
    ) -> Result<Vec<BidEvent>, HistoryError> {
        let signature = abi::resolve_event_signature(event)
            .ok_or_else(|| HistoryError::UnknownEvent(event.to_string()))?;

        let run = self.reconstruct(contract, &signature, start_block);
        match self.options.deadline {
            Some(deadline) => tokio::time::timeout(deadline, run)
                .await
                .map_err(|_| HistoryError::DeadlineExceeded(deadline))?,
            None => run.await,
        }
    }

    async fn reconstruct(
        &self,
        contract: Address,
        signature: &str,
        start_block: u64,
    ) -> Result<Vec<BidEvent>, HistoryError> {
        let topic0 = abi::event_topic(signature);

        let end_block = match self.options.end_block {
            Some(end) => end,
            None => self
                .call(self.ledger.latest_block())
                .await
                .map_err(|source| HistoryError::LedgerQuery {
                    context: "eth_blockNumber".to_string(),
                    source,
                })?,
        };

        if start_block > end_block {
            debug!(start_block, end_block, "start block beyond range end, nothing to query");
            return Ok(Vec::new());
        }

        let logs = self
            .query_range(contract, topic0, start_block, end_block)
            .await?;

        let mut bids = Vec::with_capacity(logs.len());
        for log in &logs {
            // Out-of-range logs are dropped before their payload is touched.
            if matches!(log.block_number, Some(block) if block < start_block) {
                continue;
            }
            match abi::decode_bid(log, Some(topic0)) {
                Ok(bid) => bids.push(bid),
                Err(source) => self.event_failed(HistoryError::Decode {
                    block: log.block_number,
                    log_index: log.log_index,
                    source,
                })?,
            }
        }

        let (resolved, mut failed) = self.resolve_timestamps(&bids).await;

        let mut events = Vec::with_capacity(bids.len());
        for bid in bids {
            if let Some(&timestamp) = resolved.get(&bid.block_number) {
                events.push(bid.with_timestamp(timestamp));
            } else if let Some(source) = failed.remove(&bid.block_number) {
                self.event_failed(HistoryError::BlockResolution {
                    block: bid.block_number,
                    source,
                })?;
            } else {
                // Only reachable under Skip: the block's error was already reported.
                warn!(
                    block = bid.block_number,
                    log_index = ?bid.log_index,
                    "skipping bid in unresolved block"
                );
            }
        }

        info!(
            contract = %contract,
            event = %signature,
            start_block,
            end_block,
            logs = logs.len(),
            bids = events.len(),
            "bid history reconstructed"
        );
        Ok(events)
    }

    /// Page `eth_getLogs` over `from..=to` in ascending chunks.
    async fn query_range(
        &self,
        address: Address,
        topic0: B256,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, HistoryError> {
        let chunk_size = self.options.chunk_size.max(1);
        let total_chunks = (to - from) / chunk_size + 1;

        let mut logs = Vec::new();
        let mut start = from;
        let mut chunk = 0u64;
        loop {
            let end = start.saturating_add(chunk_size - 1).min(to);
            chunk += 1;

            let query = LogQuery {
                address,
                topic0,
                from_block: start,
                to_block: end,
            };
            let found = self
                .call(self.ledger.query_logs(&query))
                .await
                .map_err(|source| HistoryError::LedgerQuery {
                    context: format!("eth_getLogs blocks {start}..={end}"),
                    source,
                })?;
            debug!(
                chunk,
                total_chunks,
                from_block = start,
                to_block = end,
                logs = found.len(),
                "queried log chunk"
            );
            logs.extend(found);

            if end == to {
                break;
            }
            start = end + 1;
        }
        Ok(logs)
    }

    /// Timestamps for every distinct block among `bids`. Cached blocks are
    /// not looked up again. Under Abort, lookups stop at the first failure.
    async fn resolve_timestamps(
        &self,
        bids: &[DecodedBid],
    ) -> (HashMap<u64, u64>, HashMap<u64, LedgerError>) {
        let mut resolved = HashMap::new();
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for bid in bids {
            let number = bid.block_number;
            if !seen.insert(number) {
                continue;
            }
            match self.timestamps.get(number) {
                Some(timestamp) => {
                    resolved.insert(number, timestamp);
                }
                None => pending.push(number),
            }
        }
        debug!(
            blocks = seen.len(),
            cached = resolved.len(),
            to_fetch = pending.len(),
            "resolving block timestamps"
        );

        let mut failed = HashMap::new();
        let mut lookups = futures::stream::iter(pending)
            .map(|number| async move { (number, self.call(self.ledger.block(number)).await) })
            .buffered(self.options.concurrency.max(1));

        while let Some((number, result)) = lookups.next().await {
            match result {
                Ok(block) => {
                    self.timestamps.insert(number, block.timestamp);
                    resolved.insert(number, block.timestamp);
                }
                Err(e) => {
                    failed.insert(number, e);
                    if self.options.on_event_error == FailurePolicy::Abort {
                        break;
                    }
                }
            }
        }
        (resolved, failed)
    }

    async fn call<T>(
        &self,
        request: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, LedgerError> {
        let limit = self.options.call_timeout;
        tokio::time::timeout(limit, request)
            .await
            .map_err(|_| LedgerError::Timeout(limit))?
    }

    fn event_failed(&self, error: HistoryError) -> Result<(), HistoryError> {
        match self.options.on_event_error {
            FailurePolicy::Abort => Err(error),
            FailurePolicy::Skip => {
                warn!(error = %error, "skipping bid event");
                Ok(())
            }
        }
    }
}

/// One-shot reconstruction with default options.
pub async fn fetch_bid_history<L: Ledger>(
    ledger: L,
    contract: Address,
    event: &str,
    start_block: u64,
) -> Result<Vec<BidEvent>, HistoryError> {
    BidHistoryReconstructor::new(ledger, ReconstructOptions::default())
        .fetch_bid_history(contract, event, start_block)
        .await
}
