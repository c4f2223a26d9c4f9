//! Error handling for the ledger node
//!
//! Chain and protocol failures are ordinary values here: peers are untrusted, so a
//! rejected block or a garbled frame is an expected outcome, not a crash.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error types for every layer of the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// A single block failed structural or linkage checks
    InvalidBlock(String),
    /// A candidate chain failed validation or is not longer than ours
    InvalidChain(String),
    /// Inbound envelope carried a type tag we do not know
    UnknownMessageType(i64),
    /// Envelope decoded but its contents make no sense
    Protocol(String),
    /// Connection setup or transport failure
    Network(String),
    /// Write attempted on a channel that has already been closed
    ChannelClosed(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
    /// A shared lock was poisoned by a panicking thread
    Lock(String),
}

impl BlockchainError {
    /// Decode and protocol errors concern one frame only; the channel stays usable.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            BlockchainError::UnknownMessageType(_)
                | BlockchainError::Protocol(_)
                | BlockchainError::Serialization(_)
        )
    }
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::InvalidChain(msg) => write!(f, "Invalid chain: {msg}"),
            BlockchainError::UnknownMessageType(kind) => {
                write!(f, "Unknown message type: {kind}")
            }
            BlockchainError::Protocol(msg) => write!(f, "Protocol error: {msg}"),
            BlockchainError::Network(msg) => write!(f, "Network error: {msg}"),
            BlockchainError::ChannelClosed(peer) => write!(f, "Channel to {peer} is closed"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::Lock(msg) => write!(f, "Lock error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_errors_are_distinguishable() {
        assert!(BlockchainError::UnknownMessageType(7).is_frame_error());
        assert!(BlockchainError::Protocol("empty".to_string()).is_frame_error());
        assert!(!BlockchainError::Network("reset".to_string()).is_frame_error());
        assert!(!BlockchainError::ChannelClosed("peer".to_string()).is_frame_error());
    }

    #[test]
    fn test_json_error_conversion() {
        let err: BlockchainError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert!(matches!(err, BlockchainError::Serialization(_)));
    }
}
