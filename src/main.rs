// Entry point: run a ledger node, or talk to a running one through its request API
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use peer_ledger::{send_request, ApiRequest, ApiServer, Blockchain, Command, Config, Node, Opt};
use std::net::TcpListener;
use std::process;
use std::thread;
use std::time::Duration;

// Time given to in-flight requests and relays once a stop signal arrives
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn main() {
    // Info by default; RUST_LOG still takes precedence
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::StartNode {
            config,
            api_addr,
            p2p_addr,
            peers,
        } => {
            // Flags override file and environment settings
            let mut settings = Config::load(config.as_deref())?;
            if let Some(addr) = api_addr {
                settings.api_addr = addr;
            }
            if let Some(addr) = p2p_addr {
                settings.p2p_addr = addr;
            }
            if !peers.is_empty() {
                settings.peers = peers;
            }
            settings.validate()?;
            start_node(settings)?;
        }
        Command::Blocks { api } => print_response(&api, &ApiRequest::Blocks)?,
        Command::Mine { data, api } => print_response(&api, &ApiRequest::MineBlock { data })?,
        Command::Peers { api } => print_response(&api, &ApiRequest::Peers)?,
        Command::AddPeer { peer, api } => {
            print_response(&api, &ApiRequest::AddPeer { peer })?
        }
    }
    Ok(())
}

fn start_node(settings: Config) -> Result<(), Box<dyn std::error::Error>> {
    let node = Node::new(Blockchain::new());

    // Both endpoints are bound before anything else starts; failing here ends the process
    let p2p_listener = TcpListener::bind(&settings.p2p_addr)
        .map_err(|e| format!("Failed to bind P2P endpoint {}: {e}", settings.p2p_addr))?;
    let api_server = ApiServer::bind(&settings.api_addr, node.clone())?;
    info!("P2P endpoint listening on {}", settings.p2p_addr);

    for peer in &settings.peers {
        if let Err(e) = node.add_peer(peer) {
            warn!("Could not connect to initial peer {peer}: {e}");
        }
    }

    let p2p_node = node.clone();
    thread::spawn(move || p2p_node.listen(p2p_listener));
    spawn_shutdown_watcher()?;

    api_server.run()?;
    Ok(())
}

/// Log SIGINT/SIGTERM, give in-flight work a moment, then exit cleanly
fn spawn_shutdown_watcher() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = signal_runtime()?;
    // Handlers are installed before returning so an early signal is not missed
    let mut signals = runtime.block_on(async { StopSignals::install() })?;
    thread::spawn(move || {
        let name = runtime.block_on(signals.recv());
        info!(
            "Caught {name}, waiting {}s to finish processing",
            SHUTDOWN_GRACE.as_secs()
        );
        thread::sleep(SHUTDOWN_GRACE);
        process::exit(0);
    });
    Ok(())
}

fn signal_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
}

#[cfg(unix)]
struct StopSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl StopSignals {
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(StopSignals {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

#[cfg(not(unix))]
struct StopSignals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(not(unix))]
impl StopSignals {
    fn install() -> std::io::Result<Self> {
        Ok(StopSignals {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        self.ctrl_c.recv().await;
        "Ctrl+C"
    }
}

fn print_response(api: &str, request: &ApiRequest) -> Result<(), Box<dyn std::error::Error>> {
    let response = send_request(api, request)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
