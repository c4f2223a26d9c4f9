use crate::error::Result;
use crate::utils::{current_timestamp, is_hex_digest, sha256_hex};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

const GENESIS_TIMESTAMP: u64 = 1465154705;
const GENESIS_DATA: &str = "my genesis block!!";

/// The block every chain starts from; all nodes agree on it without talking.
pub static GENESIS_BLOCK: Lazy<Block> =
    Lazy::new(|| Block::new(0, GENESIS_TIMESTAMP, GENESIS_DATA.to_string(), String::new()));

/// One link of the ledger. Fields are private so a block built through `new`
/// always carries the digest of its own contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    index: u64,
    timestamp: u64,
    data: String,
    previous_hash: String,
    hash: String,
}

/// Digest over the content fields of a block.
///
/// Fields are concatenated as `index ‖ previous_hash ‖ timestamp ‖ data` before hashing.
pub fn compute_hash(index: u64, timestamp: u64, data: &str, previous_hash: &str) -> String {
    let preimage = format!("{index}{previous_hash}{timestamp}{data}");
    sha256_hex(preimage.as_bytes())
}

/// Field-level sanity: digest-shaped hashes, and an empty previous hash only at index 0.
pub fn is_valid_block_structure(block: &Block) -> bool {
    if !is_hex_digest(&block.hash) {
        return false;
    }
    if block.index == 0 {
        block.previous_hash.is_empty() || is_hex_digest(&block.previous_hash)
    } else {
        is_hex_digest(&block.previous_hash)
    }
}

impl Block {
    /// Build a block and stamp it with the digest of its fields
    pub fn new(index: u64, timestamp: u64, data: String, previous_hash: String) -> Block {
        let hash = compute_hash(index, timestamp, &data, &previous_hash);
        Block {
            index,
            timestamp,
            data,
            previous_hash,
            hash,
        }
    }

    /// Build a block extending `previous` with the current wall-clock time
    pub fn next_after(previous: &Block, data: String) -> Result<Block> {
        Ok(Block::new(
            previous.index + 1,
            current_timestamp()?,
            data,
            previous.hash.clone(),
        ))
    }

    pub fn genesis() -> Block {
        GENESIS_BLOCK.clone()
    }

    pub fn is_genesis(&self) -> bool {
        *self == *GENESIS_BLOCK
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn get_data(&self) -> &str {
        self.data.as_str()
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    /// Recompute the digest and compare it with the stored one
    pub fn has_valid_hash(&self) -> bool {
        compute_hash(self.index, self.timestamp, &self.data, &self.previous_hash) == self.hash
    }

    /// Build a block with arbitrary field values, skipping hash stamping (for testing only)
    #[cfg(test)]
    pub fn from_parts(
        index: u64,
        timestamp: u64,
        data: &str,
        previous_hash: &str,
        hash: &str,
    ) -> Block {
        Block {
            index,
            timestamp,
            data: data.to_string(),
            previous_hash: previous_hash.to_string(),
            hash: hash.to_string(),
        }
    }
}
