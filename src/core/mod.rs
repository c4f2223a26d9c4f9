//! Core ledger functionality
//!
//! Blocks, the pure chain rules, and the shared chain value the node mutates.

pub mod block;
pub mod blockchain;
pub mod chain;

pub use block::{compute_hash, is_valid_block_structure, Block, GENESIS_BLOCK};
pub use blockchain::Blockchain;
pub use chain::{
    check_replacement, generate_next_block, is_valid_chain, is_valid_new_block, replace_chain,
    validate_chain, validate_new_block,
};
