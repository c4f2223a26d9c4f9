use crate::config::DEFAULT_API_ADDR;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "peer-ledger")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "startnode", about = "Start a ledger node")]
    StartNode {
        #[arg(long, help = "TOML file with api_addr, p2p_addr and peers")]
        config: Option<PathBuf>,
        #[arg(long = "api-addr", help = "Address for the request API")]
        api_addr: Option<String>,
        #[arg(long = "p2p-addr", help = "Address for peer connections")]
        p2p_addr: Option<String>,
        #[arg(long = "peer", help = "Peer to connect to at startup (repeatable)")]
        peers: Vec<String>,
    },
    #[command(name = "blocks", about = "Print the node's chain")]
    Blocks {
        #[arg(long, default_value = DEFAULT_API_ADDR, help = "API address of the node")]
        api: String,
    },
    #[command(name = "mine", about = "Mine a block with the given data")]
    Mine {
        #[arg(help = "Block payload")]
        data: String,
        #[arg(long, default_value = DEFAULT_API_ADDR, help = "API address of the node")]
        api: String,
    },
    #[command(name = "peers", about = "List connected peers")]
    Peers {
        #[arg(long, default_value = DEFAULT_API_ADDR, help = "API address of the node")]
        api: String,
    },
    #[command(name = "addpeer", about = "Connect the node to another peer")]
    AddPeer {
        #[arg(help = "Peer address (host:port of its P2P endpoint)")]
        peer: String,
        #[arg(long, default_value = DEFAULT_API_ADDR, help = "API address of the node")]
        api: String,
    },
}
