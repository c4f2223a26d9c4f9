//! Configuration management
//!
//! This module resolves the node's listening endpoints and startup peers
//! from defaults, an optional TOML file and environment variables.

pub mod settings;

pub use settings::{parse_peer_list, Config, DEFAULT_API_ADDR, DEFAULT_P2P_ADDR};
