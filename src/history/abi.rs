//! Auction house event signatures, topic hashing and bid decoding.
//!
//! The auction house emits
//! `AuctionBid(uint256 indexed tokenId, address sender, uint256 value, bool extended)`.
//! Arguments are read positionally: indexed topics (after topic0) first, then
//! the 32-byte words of the data section. That order matches the declaration
//! order whenever indexed parameters are declared first, which holds for every
//! event in [`KNOWN_EVENTS`].

use crate::history::types::{DecodeError, DecodedBid, RawLog};
use alloy::primitives::{Address, B256, U256};

/// Short event name → canonical signature, for the events the auction house emits.
pub const KNOWN_EVENTS: &[(&str, &str)] = &[
    ("AuctionBid", "AuctionBid(uint256,address,uint256,bool)"),
    ("AuctionCreated", "AuctionCreated(uint256,uint256,uint256)"),
    ("AuctionExtended", "AuctionExtended(uint256,uint256)"),
    ("AuctionSettled", "AuctionSettled(uint256,address,uint256)"),
];

/// Default event for bid history.
pub const AUCTION_BID: &str = "AuctionBid";

const WORD: usize = 32;

/// Compute keccak256 hash of a byte slice.
pub fn keccak256(data: &[u8]) -> B256 {
    use tiny_keccak::{Hasher, Keccak};
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    B256::from(output)
}

/// topic0 of an event: keccak256 of its canonical signature.
pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// Canonical signature for `event`, which is either a signature or a bare
/// name from [`KNOWN_EVENTS`].
///
/// Solidity-style declarations are reduced to their types, so
/// `AuctionBid(uint256 indexed tokenId, address sender, ...)` becomes
/// `AuctionBid(uint256,address,...)`. Tuple parameters are not supported.
pub fn resolve_event_signature(event: &str) -> Option<String> {
    let event = event.trim();
    let Some(open) = event.find('(') else {
        return KNOWN_EVENTS
            .iter()
            .find(|(name, _)| *name == event)
            .map(|(_, sig)| sig.to_string());
    };

    let params = event[open + 1..].strip_suffix(')')?;
    let name = event[..open].trim();
    if name.is_empty() || name.contains(char::is_whitespace) || params.contains(['(', ')']) {
        return None;
    }

    let types = if params.trim().is_empty() {
        Vec::new()
    } else {
        // first token of each parameter is its type; `indexed` and names follow
        params
            .split(',')
            .map(|param| param.split_whitespace().next())
            .collect::<Option<Vec<_>>>()?
    };
    Some(format!("{name}({})", types.join(",")))
}

/// Decode a raw log into a bid, mapping words 0..3 onto
/// `[token_id, bidder, amount]`.
///
/// When `expected_topic` is given, logs with a different topic0 are rejected.
pub fn decode_bid(log: &RawLog, expected_topic: Option<B256>) -> Result<DecodedBid, DecodeError> {
    let block_number = log.block_number.ok_or(DecodeError::MissingBlockNumber)?;
    let topic0 = *log.topics.first().ok_or(DecodeError::MissingTopic0)?;
    if let Some(expected) = expected_topic {
        if topic0 != expected {
            return Err(DecodeError::TopicMismatch(topic0));
        }
    }

    let words = argument_words(log)?;
    let token_id = U256::from_be_bytes(*word_at(&words, 0)?);
    let bidder = word_to_address(word_at(&words, 1)?).ok_or(DecodeError::InvalidAddress(1))?;
    let amount = U256::from_be_bytes(*word_at(&words, 2)?);

    Ok(DecodedBid {
        token_id,
        bidder,
        amount,
        block_number,
        log_index: log.log_index,
        transaction_hash: log.transaction_hash,
    })
}

/// Indexed topics followed by data words, in declaration order.
fn argument_words(log: &RawLog) -> Result<Vec<&[u8; WORD]>, DecodeError> {
    let data = log.data.as_ref();
    if data.len() % WORD != 0 {
        return Err(DecodeError::UnalignedData(data.len()));
    }

    let mut words: Vec<&[u8; WORD]> = log.topics[1..].iter().map(|t| &t.0).collect();
    for chunk in data.chunks_exact(WORD) {
        // chunks_exact guarantees the length
        let word: &[u8; WORD] = chunk
            .try_into()
            .map_err(|_| DecodeError::UnalignedData(data.len()))?;
        words.push(word);
    }
    Ok(words)
}

fn word_at<'a>(words: &[&'a [u8; WORD]], index: usize) -> Result<&'a [u8; WORD], DecodeError> {
    words.get(index).copied().ok_or(DecodeError::MissingArgument {
        index,
        available: words.len(),
    })
}

/// An ABI address word is 12 zero bytes followed by the 20 address bytes.
fn word_to_address(word: &[u8; WORD]) -> Option<Address> {
    if word[..12].iter().any(|b| *b != 0) {
        return None;
    }
    Some(Address::from_slice(&word[12..]))
}
