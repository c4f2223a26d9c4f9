use crate::error::{BlockchainError, Result};
use crate::network::channel::Peer;
use crate::network::message::Message;
use log::{info, warn};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// The set of live peer channels
///
/// This is the only place channels are added or removed:
/// - Membership changes take the write lock briefly
/// - Broadcast copies the membership under the read lock and writes after releasing it,
///   so a stalled peer never blocks registration of others
pub struct Registry {
    channels: RwLock<HashMap<Uuid, Arc<dyn Peer>>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Add a channel. Returns false if it was already registered.
    pub fn register(&self, peer: Arc<dyn Peer>) -> Result<bool> {
        let mut channels = self
            .channels
            .write()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire registry lock: {e}")))?;

        if channels.contains_key(&peer.id()) {
            return Ok(false);
        }
        info!("Registered peer: {}", peer.remote_identity());
        channels.insert(peer.id(), peer);
        Ok(true)
    }

    /// Remove a channel; removing an unknown id is a no-op
    pub fn deregister(&self, id: &Uuid) -> Result<Option<Arc<dyn Peer>>> {
        let mut channels = self
            .channels
            .write()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire registry lock: {e}")))?;

        let removed = channels.remove(id);
        if let Some(peer) = &removed {
            info!("Deregistered peer: {}", peer.remote_identity());
        }
        Ok(removed)
    }

    /// Point-in-time copy of the registered channels
    pub fn snapshot(&self) -> Result<Vec<Arc<dyn Peer>>> {
        let channels = self
            .channels
            .read()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire registry lock: {e}")))?;
        Ok(channels.values().cloned().collect())
    }

    /// Send `message` to every open channel. Returns how many sends succeeded.
    pub fn broadcast(&self, message: &Message) -> Result<usize> {
        let peers = self.snapshot()?;
        let mut delivered = 0;

        for peer in peers.iter().filter(|peer| !peer.is_closed()) {
            match peer.send(message) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Broadcast to {} failed: {e}", peer.remote_identity()),
            }
        }
        Ok(delivered)
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let mut identities: Vec<String> = self
            .snapshot()?
            .iter()
            .map(|peer| peer.remote_identity().to_string())
            .collect();
        identities.sort();
        Ok(identities)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.snapshot()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::{BlockingPeer, RecordingPeer};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_register_and_deregister() {
        let registry = Registry::new();
        let peer = RecordingPeer::new("10.0.0.1:6001");

        assert!(registry.register(peer.clone()).unwrap());
        assert!(!registry.register(peer.clone()).unwrap());
        assert_eq!(registry.len().unwrap(), 1);

        assert!(registry.deregister(&peer.id()).unwrap().is_some());
        assert!(registry.deregister(&peer.id()).unwrap().is_none());
        assert!(registry.is_empty().unwrap());
    }

    #[test]
    fn test_list_returns_identities() {
        let registry = Registry::new();
        registry
            .register(RecordingPeer::new("10.0.0.2:6001"))
            .unwrap();
        registry
            .register(RecordingPeer::new("10.0.0.1:6001"))
            .unwrap();

        assert_eq!(
            registry.list().unwrap(),
            vec!["10.0.0.1:6001".to_string(), "10.0.0.2:6001".to_string()]
        );
    }

    #[test]
    fn test_broadcast_reaches_open_channels_only() {
        let registry = Registry::new();
        let open = RecordingPeer::new("10.0.0.1:6001");
        let closed = RecordingPeer::new("10.0.0.2:6001");
        closed.close();
        registry.register(open.clone()).unwrap();
        registry.register(closed.clone()).unwrap();

        assert_eq!(registry.broadcast(&Message::QueryLatest).unwrap(), 1);
        assert_eq!(open.sent(), vec![Message::QueryLatest]);
        assert!(closed.sent().is_empty());
    }

    #[test]
    fn test_failed_send_does_not_stop_broadcast() {
        let registry = Registry::new();
        let failing = RecordingPeer::failing("10.0.0.1:6001");
        let healthy = RecordingPeer::new("10.0.0.2:6001");
        registry.register(failing).unwrap();
        registry.register(healthy.clone()).unwrap();

        assert_eq!(registry.broadcast(&Message::QueryAll).unwrap(), 1);
        assert_eq!(healthy.sent(), vec![Message::QueryAll]);
    }

    #[test]
    fn test_stalled_peer_does_not_block_membership_changes() {
        let registry = Arc::new(Registry::new());
        let (stalled, release) = BlockingPeer::new("10.0.0.9:6001");
        registry.register(stalled.clone()).unwrap();

        let broadcaster = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.broadcast(&Message::QueryLatest))
        };
        stalled.wait_until_blocked();

        let (done_tx, done_rx) = mpsc::channel();
        let mover = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let other = RecordingPeer::new("10.0.0.1:6001");
                registry.register(other.clone()).unwrap();
                let listed = registry.list().unwrap();
                registry.deregister(&other.id()).unwrap();
                done_tx.send(listed).unwrap();
            })
        };

        let listed = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("membership change stalled behind a blocked broadcast");
        assert_eq!(listed.len(), 2);
        mover.join().unwrap();

        release.send(()).unwrap();
        assert_eq!(broadcaster.join().unwrap().unwrap(), 1);
    }
}
