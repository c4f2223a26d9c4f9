use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

pub const DEFAULT_API_ADDR: &str = "127.0.0.1:3001";
pub const DEFAULT_P2P_ADDR: &str = "127.0.0.1:6001";

const API_ADDRESS_KEY: &str = "API_ADDRESS";
const P2P_ADDRESS_KEY: &str = "P2P_ADDRESS";
const PEERS_KEY: &str = "PEERS";

/// Endpoints of one node and the peers it dials at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_addr: String,
    pub p2p_addr: String,
    pub peers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_addr: String::from(DEFAULT_API_ADDR),
            p2p_addr: String::from(DEFAULT_P2P_ADDR),
            peers: vec![],
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then environment variables
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Config> {
        Ok(toml::from_str(contents)?)
    }

    pub fn apply_env(&mut self) {
        if let Ok(addr) = env::var(API_ADDRESS_KEY) {
            self.api_addr = addr;
        }
        if let Ok(addr) = env::var(P2P_ADDRESS_KEY) {
            self.p2p_addr = addr;
        }
        if let Ok(peers) = env::var(PEERS_KEY) {
            self.peers = parse_peer_list(&peers);
        }
    }

    /// Every address must parse as a socket address
    pub fn validate(&self) -> Result<()> {
        for addr in [&self.api_addr, &self.p2p_addr].into_iter().chain(&self.peers) {
            addr.parse::<SocketAddr>()
                .map_err(|e| BlockchainError::Config(format!("Invalid address {addr}: {e}")))?;
        }
        if self.api_addr == self.p2p_addr {
            return Err(BlockchainError::Config(format!(
                "API and P2P endpoints must differ (both {})",
                self.api_addr
            )));
        }
        Ok(())
    }
}

/// Split a comma-separated peer list, dropping blanks
pub fn parse_peer_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|peer| !peer.is_empty())
        .map(String::from)
        .collect()
}
