//! Bid history tooling for the PodAuctionHouse auction contract.
//!
//! Exposes the reconstructor and configuration to the `podhouse` binary and
//! to any other consumer of the bid history.

pub mod config;
pub mod history;
