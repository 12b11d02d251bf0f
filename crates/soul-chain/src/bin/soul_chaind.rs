//! soul-chaind — Peer Chain daemon launcher.
//!
//! Usage:
//!   soul-chaind init                  generate a new mnemonic and pairing config
//!   soul-chaind join <16-word token>   join an existing swarm using a shared mnemonic
//!   soul-chaind start                  run the sync daemon in the foreground
//!   soul-chaind status                 print the last-written .soul-chain-status
//!   soul-chaind stop                   request a running daemon to shut down

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use soul_chain::discovery::{DirectDiscovery, PeerAddr};
use soul_chain::{ChainConfig, ChainDaemon};
use soul_core::SoulPath;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "soul-chaind", about = "Peer Chain synchronization daemon")]
struct Cli {
    /// Soul directory root. Defaults to $SOUL_PATH or the parent of cwd.
    #[arg(long)]
    soul_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a fresh 16-word mnemonic and write the pairing secret.
    Init,
    /// Join an existing swarm by validating and adopting a shared mnemonic.
    Join {
        token: String,
        /// Peer to dial immediately after joining (host:port), may repeat.
        #[arg(long = "peer")]
        peers: Vec<String>,
    },
    /// Run the sync daemon in the foreground until interrupted.
    Start,
    /// Print the last-written chain status.
    Status,
    /// Request a running daemon to stop (best-effort; send SIGTERM yourself
    /// if this process is not the one that launched it).
    Stop,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soul_chain=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let soul = match cli.soul_path {
        Some(p) => SoulPath::new(soul_core::paths::expand_tilde(&p)),
        None => match SoulPath::from_env() {
            Ok(s) => s,
            Err(e) => {
                eprintln!("soul-chaind: could not resolve soul path: {e}");
                std::process::exit(1);
            }
        },
    };

    let exit_code = match cli.command {
        Command::Init => cmd_init(&soul),
        Command::Join { token, peers } => cmd_join(&soul, &token, peers),
        Command::Start => cmd_start(&soul).await,
        Command::Status => cmd_status(&soul),
        Command::Stop => cmd_stop(),
    };
    std::process::exit(exit_code);
}

fn secret_path(soul: &SoulPath) -> std::path::PathBuf {
    soul.root().join(".soul-chain-secret")
}

fn cmd_init(soul: &SoulPath) -> i32 {
    let mnemonic = soul_chain::mnemonic::generate();
    if let Err(e) = soul_core::atomic::write_atomic(&secret_path(soul), mnemonic.as_bytes()) {
        eprintln!("soul-chaind: failed to write pairing secret: {e}");
        return e.exit_code();
    }
    if let Err(e) = ChainConfig::default().save(soul) {
        eprintln!("soul-chaind: failed to write .soul-chain: {e}");
        return e.exit_code();
    }
    println!("New Peer Chain mnemonic (share this with devices to pair):");
    println!("{mnemonic}");
    0
}

fn cmd_join(soul: &SoulPath, token: &str, peers: Vec<String>) -> i32 {
    if let Err(e) = soul_chain::mnemonic::validate(token) {
        eprintln!("soul-chaind: invalid mnemonic: {e}");
        return e.exit_code();
    }
    let normalized = token.trim().to_lowercase();
    if let Err(e) = soul_core::atomic::write_atomic(&secret_path(soul), normalized.as_bytes()) {
        eprintln!("soul-chaind: failed to write pairing secret: {e}");
        return e.exit_code();
    }
    let mut config = match ChainConfig::load(soul) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("soul-chaind: failed to load .soul-chain: {e}");
            return e.exit_code();
        }
    };
    config.peers = peers;
    if let Err(e) = config.save(soul) {
        eprintln!("soul-chaind: failed to write .soul-chain: {e}");
        return e.exit_code();
    }
    println!("Joined swarm.");
    0
}

async fn cmd_start(soul: &SoulPath) -> i32 {
    let mnemonic = match std::fs::read_to_string(secret_path(soul)) {
        Ok(m) => m,
        Err(_) => {
            eprintln!("soul-chaind: no pairing secret found; run `init` or `join <token>` first");
            return 1;
        }
    };
    let entropy = match soul_chain::mnemonic::validate(mnemonic.trim()) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("soul-chaind: pairing secret is corrupt: {e}");
            return e.exit_code();
        }
    };
    let config = match ChainConfig::load(soul) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("soul-chaind: failed to load .soul-chain: {e}");
            return e.exit_code();
        }
    };
    let encryption_key = match soul_chain::kdf::encryption_key(&entropy) {
        Ok(k) => k,
        Err(e) => {
            eprintln!("soul-chaind: key derivation failed: {e}");
            return e.exit_code();
        }
    };
    let topic = match soul_chain::kdf::topic(&entropy) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("soul-chaind: key derivation failed: {e}");
            return e.exit_code();
        }
    };

    let peers: Vec<PeerAddr> = config
        .peers
        .iter()
        .filter_map(|p| p.parse::<SocketAddr>().ok())
        .map(|addr| PeerAddr { addr })
        .collect();

    let daemon = Arc::new(ChainDaemon::new(soul.clone(), config, encryption_key, topic));
    let cancel = CancellationToken::new();
    let run_cancel = cancel.clone();

    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        run_cancel.cancel();
    });

    match daemon.run(Arc::new(DirectDiscovery), peers, cancel).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("soul-chaind: daemon exited with error: {e}");
            e.exit_code()
        }
    }
}

fn cmd_status(soul: &SoulPath) -> i32 {
    match soul_chain::status::read_status(soul) {
        Ok(Some(status)) => {
            match serde_json::to_string_pretty(&status) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("soul-chaind: failed to render status: {e}"),
            }
            0
        }
        Ok(None) => {
            println!("no chain status yet (daemon has not run)");
            0
        }
        Err(e) => {
            eprintln!("soul-chaind: failed to read status: {e}");
            e.exit_code()
        }
    }
}

fn cmd_stop() -> i32 {
    println!("soul-chaind: send SIGTERM or Ctrl-C to the running process to stop it");
    0
}
