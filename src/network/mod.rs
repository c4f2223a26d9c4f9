//! Peer-to-peer networking
//!
//! Framed channels to individual peers, the registry that owns them, and the
//! synchronization engine that keeps every node converging on the longest valid chain.

pub mod channel;
pub mod message;
pub mod registry;
pub mod sync;

pub use channel::{Inbound, Peer, PeerChannel};
pub use message::Message;
pub use registry::Registry;
pub use sync::{Node, SyncState};
