//! Bid history records and the error taxonomy of the reconstructor.

use alloy::primitives::{Address, Bytes, B256, U256};
use std::time::Duration;
use thiserror::Error;

/// A raw log entry as returned by a ledger, before any decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    /// topic0 followed by the indexed event arguments.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed arguments.
    pub data: Bytes,
    /// None for pending logs.
    pub block_number: Option<u64>,
    pub log_index: Option<u64>,
    pub transaction_hash: Option<B256>,
}

/// Block metadata needed by the reconstructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: u64,
}

/// A bid decoded from a log, before its block timestamp is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBid {
    pub token_id: U256,
    pub bidder: Address,
    pub amount: U256,
    pub block_number: u64,
    pub log_index: Option<u64>,
    pub transaction_hash: Option<B256>,
}

impl DecodedBid {
    pub fn with_timestamp(self, timestamp: u64) -> BidEvent {
        BidEvent {
            token_id: self.token_id,
            bidder: self.bidder,
            amount: self.amount,
            block_number: self.block_number,
            timestamp,
            log_index: self.log_index,
            transaction_hash: self.transaction_hash,
        }
    }
}

/// A single historical bid placed on the auction house.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidEvent {
    pub token_id: U256,
    pub bidder: Address,
    /// Bid value in wei.
    pub amount: U256,
    pub block_number: u64,
    /// Seconds since epoch of the containing block.
    pub timestamp: u64,
    pub log_index: Option<u64>,
    pub transaction_hash: Option<B256>,
}

impl std::fmt::Display for BidEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Bid(token={}, bidder={}, amount={}, block={})",
            self.token_id, self.bidder, self.amount, self.block_number
        )
    }
}

/// What to do when a single event cannot be decoded or its block cannot be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the whole reconstruction on the first bad event.
    #[default]
    Abort,
    /// Drop the event, log a warning and keep going.
    Skip,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(#[from] alloy::transports::TransportError),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("block {0} not found")]
    BlockNotFound(u64),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("log has no block number (pending log?)")]
    MissingBlockNumber,
    #[error("log has no topic0")]
    MissingTopic0,
    #[error("event topic {0} does not match the requested event")]
    TopicMismatch(B256),
    #[error("missing argument {index} (log has {available} words)")]
    MissingArgument { index: usize, available: usize },
    #[error("data length {0} is not a multiple of 32")]
    UnalignedData(usize),
    #[error("argument {0} is not a valid address")]
    InvalidAddress(usize),
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("ledger query failed ({context}): {source}")]
    LedgerQuery {
        context: String,
        #[source]
        source: LedgerError,
    },
    #[error("failed to resolve block {block}: {source}")]
    BlockResolution {
        block: u64,
        #[source]
        source: LedgerError,
    },
    #[error("failed to decode bid event (block {block:?}, log index {log_index:?}): {source}")]
    Decode {
        block: Option<u64>,
        log_index: Option<u64>,
        #[source]
        source: DecodeError,
    },
    #[error("unknown event {0:?}: pass a full signature like \"Name(type,...)\"")]
    UnknownEvent(String),
    #[error("bid history reconstruction exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),
}
