//! Chain validation and fork choice
//!
//! Everything here is a pure function over block slices. Longest valid chain wins;
//! equal lengths never replace. The rule trusts hash linkage only, so a peer can still
//! force a swap with a longer chain of meaningless payloads.

use crate::core::block::{is_valid_block_structure, Block};
use crate::error::{BlockchainError, Result};

/// Build the block that extends `tip` with `data`
pub fn generate_next_block(tip: &Block, data: &str) -> Result<Block> {
    Block::next_after(tip, data.to_string())
}

/// Check `candidate` as the direct successor of `previous`
pub fn validate_new_block(candidate: &Block, previous: &Block) -> Result<()> {
    if !is_valid_block_structure(candidate) {
        return Err(BlockchainError::InvalidBlock(format!(
            "malformed block at index {}",
            candidate.get_index()
        )));
    }
    if previous.get_index().checked_add(1) != Some(candidate.get_index()) {
        return Err(BlockchainError::InvalidBlock(format!(
            "index {} does not follow {}",
            candidate.get_index(),
            previous.get_index()
        )));
    }
    if candidate.get_previous_hash() != previous.get_hash() {
        return Err(BlockchainError::InvalidBlock(format!(
            "block {} does not link to {}",
            candidate.get_index(),
            previous.get_hash()
        )));
    }
    if !candidate.has_valid_hash() {
        return Err(BlockchainError::InvalidBlock(format!(
            "hash mismatch at index {}",
            candidate.get_index()
        )));
    }
    Ok(())
}

pub fn is_valid_new_block(candidate: &Block, previous: &Block) -> bool {
    validate_new_block(candidate, previous).is_ok()
}

/// Check genesis equality, then every link; stops at the first violation
pub fn validate_chain(chain: &[Block]) -> Result<()> {
    let first = chain
        .first()
        .ok_or_else(|| BlockchainError::InvalidChain("chain is empty".to_string()))?;
    if !first.is_genesis() {
        return Err(BlockchainError::InvalidChain(
            "first block is not the genesis block".to_string(),
        ));
    }
    for pair in chain.windows(2) {
        validate_new_block(&pair[1], &pair[0])
            .map_err(|e| BlockchainError::InvalidChain(e.to_string()))?;
    }
    Ok(())
}

pub fn is_valid_chain(chain: &[Block]) -> bool {
    validate_chain(chain).is_ok()
}

/// Explain why `candidate` would not replace `current`, if it would not.
///
/// Length is checked before validity so short candidates are never walked.
pub fn check_replacement(current: &[Block], candidate: &[Block]) -> Result<()> {
    if candidate.len() <= current.len() {
        return Err(BlockchainError::InvalidChain(format!(
            "received chain of length {} is not longer than ours ({})",
            candidate.len(),
            current.len()
        )));
    }
    validate_chain(candidate)
}

/// Pick between the current chain and a candidate
pub fn replace_chain<'a>(current: &'a [Block], candidate: &'a [Block]) -> &'a [Block] {
    match check_replacement(current, candidate) {
        Ok(()) => candidate,
        Err(_) => current,
    }
}
