//! # Peer Ledger - a minimal gossiping blockchain node
//!
//! An append-only chain of hash-linked blocks kept in memory and synchronized
//! with explicitly added peers over newline-delimited JSON channels.
//!
//! ## How the code is organized
//! - `core/`: blocks, the pure chain rules, and the lock-guarded chain value
//! - `network/`: peer channels, the connection registry, and the sync engine
//! - `api/`: request/response endpoint for reading the chain, mining and adding peers
//! - `config/`: endpoint and startup-peer settings
//! - `cli/`: command-line parsing for the node and its client commands
//! - `utils/`: hashing and clock helpers
//!
//! ## Synchronization in one paragraph
//! A new connection is asked for its tip. A tip that extends ours is appended and
//! relayed; a tip that is ahead but does not fit triggers a request for the whole
//! chain, which replaces ours only if it is valid and strictly longer. Convergence
//! is eventual: nothing orders concurrent miners beyond the longest-chain rule.

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod utils;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use api::{handle_request, send_request, ApiRequest, ApiResponse, ApiServer};
pub use cli::{Command, Opt};
pub use config::Config;
pub use core::{
    compute_hash, generate_next_block, is_valid_block_structure, is_valid_chain,
    is_valid_new_block, replace_chain, Block, Blockchain, GENESIS_BLOCK,
};
pub use error::{BlockchainError, Result};
pub use network::{Message, Node, Peer, PeerChannel, Registry, SyncState};
