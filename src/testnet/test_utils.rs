//! Test utilities for ledger and networking tests

use crate::core::Block;
use crate::error::{BlockchainError, Result};
use crate::network::{Message, Peer};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use uuid::Uuid;

/// Deterministic valid chain of `len` blocks starting at genesis
pub fn build_chain(len: usize) -> Vec<Block> {
    let mut chain = vec![Block::genesis()];
    while chain.len() < len {
        let tip = &chain[chain.len() - 1];
        let next = Block::new(
            tip.get_index() + 1,
            1_700_000_000 + tip.get_index(),
            format!("block {}", tip.get_index() + 1),
            tip.get_hash().to_string(),
        );
        chain.push(next);
    }
    chain
}

/// Two ends of a loopback TCP connection
pub fn tcp_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (server, _) = listener.accept().unwrap();
    (client, server)
}

/// Peer that keeps every message it is sent
pub struct RecordingPeer {
    id: Uuid,
    remote: String,
    sent: Mutex<Vec<Message>>,
    closed: AtomicBool,
    fail_sends: bool,
}

impl RecordingPeer {
    pub fn new(remote: &str) -> Arc<RecordingPeer> {
        Arc::new(Self::with_failure(remote, false))
    }

    /// A peer whose every send errors out
    pub fn failing(remote: &str) -> Arc<RecordingPeer> {
        Arc::new(Self::with_failure(remote, true))
    }

    fn with_failure(remote: &str, fail_sends: bool) -> RecordingPeer {
        RecordingPeer {
            id: Uuid::new_v4(),
            remote: remote.to_string(),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            fail_sends,
        }
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }

    /// Drain and return what has been sent so far
    pub fn take_sent(&self) -> Vec<Message> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

impl Peer for RecordingPeer {
    fn id(&self) -> Uuid {
        self.id
    }

    fn remote_identity(&self) -> &str {
        &self.remote
    }

    fn send(&self, message: &Message) -> Result<()> {
        if self.fail_sends {
            return Err(BlockchainError::Network("connection reset".to_string()));
        }
        if self.is_closed() {
            return Err(BlockchainError::ChannelClosed(self.remote.clone()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Peer whose send blocks until the test releases it
pub struct BlockingPeer {
    id: Uuid,
    remote: String,
    release: Mutex<Receiver<()>>,
    blocked: (Mutex<bool>, Condvar),
}

impl BlockingPeer {
    pub fn new(remote: &str) -> (Arc<BlockingPeer>, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let peer = BlockingPeer {
            id: Uuid::new_v4(),
            remote: remote.to_string(),
            release: Mutex::new(rx),
            blocked: (Mutex::new(false), Condvar::new()),
        };
        (Arc::new(peer), tx)
    }

    /// Wait until some thread is stuck inside `send`
    pub fn wait_until_blocked(&self) {
        let (flag, signal) = &self.blocked;
        let mut blocked = flag.lock().unwrap();
        while !*blocked {
            blocked = signal.wait(blocked).unwrap();
        }
    }
}

impl Peer for BlockingPeer {
    fn id(&self) -> Uuid {
        self.id
    }

    fn remote_identity(&self) -> &str {
        &self.remote
    }

    fn send(&self, _message: &Message) -> Result<()> {
        {
            let (flag, signal) = &self.blocked;
            *flag.lock().unwrap() = true;
            signal.notify_all();
        }
        let release = self.release.lock().unwrap();
        release
            .recv()
            .map_err(|_| BlockchainError::Network("released without a signal".to_string()))
    }

    fn close(&self) {}

    fn is_closed(&self) -> bool {
        false
    }
}
