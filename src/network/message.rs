use crate::core::Block;
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};

const QUERY_LATEST: i64 = 0;
const QUERY_ALL: i64 = 1;
const RESPONSE_BLOCKCHAIN: i64 = 2;

/// Peer-to-peer protocol messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Ask for the peer's tip block
    QueryLatest,
    /// Ask for the peer's whole chain
    QueryAll,
    /// Either a single tip block or an entire chain, oldest first
    ResponseBlockchain(Vec<Block>),
}

/// On-the-wire shape: `{"type": <0|1|2>, "data": [blocks]}`, `data` absent for queries.
/// The tag is decoded as any integer so out-of-range tags still report as unknown.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Vec<Block>>,
}

impl Message {
    pub fn kind(&self) -> i64 {
        match self {
            Message::QueryLatest => QUERY_LATEST,
            Message::QueryAll => QUERY_ALL,
            Message::ResponseBlockchain(_) => RESPONSE_BLOCKCHAIN,
        }
    }

    /// Encode as one line of compact JSON, without the trailing newline
    pub fn to_frame(&self) -> Result<String> {
        let envelope = match self {
            Message::ResponseBlockchain(blocks) => Envelope {
                kind: RESPONSE_BLOCKCHAIN,
                data: Some(blocks.clone()),
            },
            other => Envelope {
                kind: other.kind(),
                data: None,
            },
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    /// Decode one frame. Unknown tags and empty responses are protocol errors; bytes that
    /// are not UTF-8 JSON are a serialization error.
    pub fn from_frame(frame: impl AsRef<[u8]>) -> Result<Message> {
        let envelope: Envelope = serde_json::from_slice(frame.as_ref())?;
        match envelope.kind {
            QUERY_LATEST => Ok(Message::QueryLatest),
            QUERY_ALL => Ok(Message::QueryAll),
            RESPONSE_BLOCKCHAIN => match envelope.data {
                Some(blocks) if !blocks.is_empty() => Ok(Message::ResponseBlockchain(blocks)),
                _ => Err(BlockchainError::Protocol(
                    "blockchain response carries no blocks".to_string(),
                )),
            },
            unknown => Err(BlockchainError::UnknownMessageType(unknown)),
        }
    }
}
