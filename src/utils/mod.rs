//! Utility functions and helpers
//!
//! Hashing and clock helpers shared by the block model.

pub mod crypto;

pub use crypto::{current_timestamp, is_hex_digest, sha256_digest, sha256_hex, HASH_HEX_LEN};
