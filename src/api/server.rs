use crate::core::Block;
use crate::error::{BlockchainError, Result};
use crate::network::Node;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

const TCP_TIMEOUT: u64 = 5000;

/// Requests accepted on the API endpoint, one JSON line per connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiRequest {
    Blocks,
    MineBlock { data: String },
    Peers,
    AddPeer { peer: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiResponse {
    Blocks(Vec<Block>),
    Block(Block),
    Peers(Vec<String>),
    Ok,
    Error { error: String },
}

/// Route one request to the node
pub fn handle_request(node: &Node, request: ApiRequest) -> ApiResponse {
    let outcome = match request {
        ApiRequest::Blocks => node.get_chain().map(ApiResponse::Blocks),
        ApiRequest::MineBlock { data } => node.mine(&data).map(ApiResponse::Block),
        ApiRequest::Peers => node.list_peers().map(ApiResponse::Peers),
        ApiRequest::AddPeer { peer } => node.add_peer(&peer).map(|_| ApiResponse::Ok),
    };
    outcome.unwrap_or_else(|e| {
        error!("API request failed: {e}");
        ApiResponse::Error {
            error: e.to_string(),
        }
    })
}

/// Request/response endpoint in front of a [`Node`]
pub struct ApiServer {
    listener: TcpListener,
    node: Node,
}

impl ApiServer {
    pub fn bind(addr: &str, node: Node) -> Result<ApiServer> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| BlockchainError::Network(format!("Failed to bind to {addr}: {e}")))?;
        Ok(ApiServer { listener, node })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve requests forever, one thread per connection
    pub fn run(&self) -> Result<()> {
        info!("API server listening on {}", self.local_addr()?);

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let node = self.node.clone();
                    thread::spawn(move || {
                        if let Err(e) = Self::handle_connection(&node, stream) {
                            error!("Error handling API connection: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting API connection: {e}");
                }
            }
        }

        Ok(())
    }

    fn handle_connection(node: &Node, stream: TcpStream) -> Result<()> {
        stream.set_read_timeout(Some(Duration::from_millis(TCP_TIMEOUT)))?;

        let mut line = String::new();
        BufReader::new(&stream).read_line(&mut line)?;

        let response = match serde_json::from_str::<ApiRequest>(line.trim()) {
            Ok(request) => {
                info!("API request: {request:?}");
                handle_request(node, request)
            }
            Err(e) => ApiResponse::Error {
                error: format!("Malformed request: {e}"),
            },
        };

        let mut writer = &stream;
        serde_json::to_writer(&mut writer, &response)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        let _ = stream.shutdown(Shutdown::Both);
        Ok(())
    }
}

/// Send one request to the API endpoint at `addr` and wait for the answer
pub fn send_request(addr: &str, request: &ApiRequest) -> Result<ApiResponse> {
    let socket_addr = addr
        .parse::<SocketAddr>()
        .map_err(|e| BlockchainError::Network(format!("Invalid address {addr}: {e}")))?;

    let stream = TcpStream::connect_timeout(&socket_addr, Duration::from_millis(TCP_TIMEOUT))
        .map_err(|e| BlockchainError::Network(format!("Failed to connect to {addr}: {e}")))?;

    let mut writer = &stream;
    serde_json::to_writer(&mut writer, request)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    let mut line = String::new();
    BufReader::new(&stream).read_line(&mut line)?;
    Ok(serde_json::from_str(line.trim())?)
}
