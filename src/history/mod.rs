//! Bid history reconstruction for the PodAuctionHouse contract.
//!
//! Rebuilds the auction's bid activity from `AuctionBid` event logs:
//! 1. Query the ledger for the contract's bid logs from a start block onward
//! 2. Decode each log into a typed bid at the boundary (`abi`)
//! 3. Resolve each bid's block timestamp, cached per block (`cache`)
//! 4. Return the bids in ledger order
//!
//! Architecture:
//! - `Ledger`: the read interface to the chain (`query_logs`, `block`),
//!   passed in explicitly; `RpcLedger` is the JSON-RPC implementation
//! - `BidHistoryReconstructor`: the query/filter/resolve pipeline
//! - Errors are typed (`HistoryError`); per-event failures follow a
//!   `FailurePolicy` (abort or skip)

pub mod abi;
pub mod cache;
pub mod ledger;
pub mod reconstruct;
pub mod types;

pub use cache::BlockTimestampCache;
pub use ledger::{Ledger, LogQuery, RpcLedger};
pub use reconstruct::{fetch_bid_history, BidHistoryReconstructor, ReconstructOptions};
pub use types::{BidEvent, BlockInfo, FailurePolicy, HistoryError, LedgerError, RawLog};
