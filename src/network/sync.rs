use crate::core::{Block, Blockchain};
use crate::error::{BlockchainError, Result};
use crate::network::channel::{Inbound, Peer, PeerChannel};
use crate::network::message::Message;
use crate::network::registry::Registry;
use log::{debug, error, info, warn};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const CONNECT_TIMEOUT: u64 = 5000;

/// Where the conversation with one peer stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Just registered; our `QUERY_LATEST` is in flight
    Connected,
    /// We asked for the full chain and are waiting for it
    AwaitingChain,
    /// Nothing outstanding
    Idle,
}

/// A ledger node: the local chain plus the peers it gossips with
///
/// Cloning is cheap and every clone drives the same chain and registry, so each peer
/// thread and the API thread hold their own handle.
#[derive(Clone)]
pub struct Node {
    blockchain: Blockchain,
    registry: Arc<Registry>,
}

impl Default for Node {
    fn default() -> Self {
        Self::new(Blockchain::new())
    }
}

impl Node {
    pub fn new(blockchain: Blockchain) -> Self {
        Self {
            blockchain,
            registry: Arc::new(Registry::new()),
        }
    }

    pub fn blockchain(&self) -> &Blockchain {
        &self.blockchain
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn get_chain(&self) -> Result<Vec<Block>> {
        self.blockchain.get_blocks()
    }

    pub fn list_peers(&self) -> Result<Vec<String>> {
        self.registry.list()
    }

    /// Mine a block from `data`, append it and announce it to every peer
    pub fn mine(&self, data: &str) -> Result<Block> {
        let block = self.blockchain.mine_block(data)?;
        self.broadcast_tip(block.clone())?;
        Ok(block)
    }

    fn broadcast_tip(&self, block: Block) -> Result<()> {
        let delivered = self
            .registry
            .broadcast(&Message::ResponseBlockchain(vec![block]))?;
        debug!("Announced new tip to {delivered} peers");
        Ok(())
    }

    /// Register a freshly opened channel and ask it for its tip
    pub fn connect(&self, peer: Arc<dyn Peer>) -> Result<SyncState> {
        self.registry.register(Arc::clone(&peer))?;
        peer.send(&Message::QueryLatest)?;
        Ok(SyncState::Connected)
    }

    /// React to one inbound message from `peer` and return the peer's next state
    pub fn handle_message(
        &self,
        peer: &dyn Peer,
        state: SyncState,
        message: Message,
    ) -> Result<SyncState> {
        match message {
            Message::QueryLatest => {
                let tip = self.blockchain.get_latest_block()?;
                peer.send(&Message::ResponseBlockchain(vec![tip]))?;
                Ok(state)
            }
            Message::QueryAll => {
                let blocks = self.blockchain.get_blocks()?;
                peer.send(&Message::ResponseBlockchain(blocks))?;
                Ok(state)
            }
            Message::ResponseBlockchain(mut blocks) => {
                if blocks.len() == 1 {
                    let block = blocks.remove(0);
                    self.handle_single_block(peer, state, block)
                } else {
                    self.handle_full_chain(peer, blocks)
                }
            }
        }
    }

    fn handle_single_block(
        &self,
        peer: &dyn Peer,
        state: SyncState,
        block: Block,
    ) -> Result<SyncState> {
        match self.blockchain.add_block(block.clone()) {
            Ok(()) => {
                info!(
                    "Block {} from {} extends our chain",
                    block.get_index(),
                    peer.remote_identity()
                );
                self.broadcast_tip(block)?;
                Ok(SyncState::Idle)
            }
            Err(BlockchainError::InvalidBlock(reason)) => {
                let tip = self.blockchain.get_latest_block()?;
                if block.get_index() > tip.get_index() {
                    info!(
                        "Peer {} is ahead (index {} vs {}), requesting full chain",
                        peer.remote_identity(),
                        block.get_index(),
                        tip.get_index()
                    );
                    peer.send(&Message::QueryAll)?;
                    Ok(SyncState::AwaitingChain)
                } else {
                    debug!(
                        "Ignoring block {} from {}: {reason}",
                        block.get_index(),
                        peer.remote_identity()
                    );
                    Ok(if state == SyncState::Connected {
                        SyncState::Idle
                    } else {
                        state
                    })
                }
            }
            Err(e) => Err(e),
        }
    }

    fn handle_full_chain(&self, peer: &dyn Peer, blocks: Vec<Block>) -> Result<SyncState> {
        let received = blocks.len();
        if self.blockchain.replace_chain(blocks)? {
            let tip = self.blockchain.get_latest_block()?;
            self.broadcast_tip(tip)?;
        } else {
            warn!(
                "Rejected chain of length {received} from {}",
                peer.remote_identity()
            );
        }
        Ok(SyncState::Idle)
    }

    /// Drive one channel until it closes: register, query, handle, deregister
    pub fn serve(&self, inbound: Inbound) {
        let channel = Arc::clone(inbound.channel());
        let remote = channel.remote_identity().to_string();

        let mut state = match self.connect(channel.clone()) {
            Ok(state) => state,
            Err(e) => {
                error!("Failed to start sync with {remote}: {e}");
                channel.close();
                let _ = self.registry.deregister(&channel.id());
                return;
            }
        };

        for message in inbound {
            let outcome = message.and_then(|message| {
                debug!("Received {message:?} from {remote}");
                self.handle_message(channel.as_ref(), state, message)
            });
            match outcome {
                Ok(next) => {
                    if next != state {
                        debug!("Peer {remote}: {state:?} -> {next:?}");
                    }
                    state = next;
                }
                Err(e) if e.is_frame_error() => {
                    warn!("Dropping message from {remote}: {e}");
                }
                Err(e) => {
                    error!("Error handling message from {remote}: {e}");
                }
            }
        }

        channel.close();
        if let Err(e) = self.registry.deregister(&channel.id()) {
            warn!("Failed to deregister {remote}: {e}");
        }
        info!("Disconnected from peer: {remote}");
    }

    /// Start a worker thread for an established connection
    pub fn spawn_peer(&self, stream: TcpStream) -> Result<()> {
        let (_channel, inbound) = PeerChannel::open(stream)?;
        let node = self.clone();
        thread::spawn(move || node.serve(inbound));
        Ok(())
    }

    /// Open an outbound connection to `addr` and start synchronizing with it
    pub fn add_peer(&self, addr: &str) -> Result<()> {
        let socket_addr = addr
            .parse::<SocketAddr>()
            .map_err(|e| BlockchainError::Network(format!("Invalid address {addr}: {e}")))?;

        let stream =
            TcpStream::connect_timeout(&socket_addr, Duration::from_millis(CONNECT_TIMEOUT))
                .map_err(|e| {
                    BlockchainError::Network(format!("Failed to connect to {addr}: {e}"))
                })?;

        info!("Connected to peer: {addr}");
        self.spawn_peer(stream)
    }

    /// Accept peer connections forever
    pub fn listen(&self, listener: TcpListener) {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(e) = self.spawn_peer(stream) {
                        error!("Failed to set up peer connection: {e}");
                    }
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }
    }
}
