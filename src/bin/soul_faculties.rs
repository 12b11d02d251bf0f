//! soul-faculties — the fabric + guard daemon.
//!
//! Usage:
//!   soul-faculties start    run the watcher, the session-hook server (wake
//!                           and goodbye), and the heartbeat-triggered
//!                           consolidation loop
//!   soul-faculties stop     request a running daemon to shut down
//!   soul-faculties status   print session guard state
//!
//! Recovers a crashed session (if `.session-active` survived a restart)
//! before doing anything else. An agent signals session start by sending a
//! `wake` request to the session-hook server, which transitions the guard
//! to `active`. While a session is active, an incremental consolidation
//! pass runs on the configured heartbeat cadence; full consolidation still
//! only happens at session end via the Session Guard's `goodbye` hook.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use soul::config::SoulConfig;
use soul_core::error::Result;
use soul_core::SoulPath;
use soul_fabric::FabricWatcher;
use soul_guard::{GoodbyeDecision, SessionGuard};
use soul_llm::FallbackProvider;
use soul_seed::consolidate::{consolidate, ConsolidateMode, ConsolidationInput};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "soul-faculties", about = "Fabric watcher and session guard daemon")]
struct Cli {
    #[arg(long)]
    soul_path: Option<String>,

    /// Port the goodbye-hook server listens on.
    #[arg(long, default_value_t = 47_201)]
    hook_port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Start,
    Stop,
    Status,
}

/// One request per connection: either the agent is starting a session
/// (`wake`) or proposing to end one (`goodbye`, checked against the last
/// assistant message).
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum HookRequest {
    Wake,
    Goodbye { last_message: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
enum HookResponse {
    Allow,
    Block { reason: String },
    Error { message: String },
}

impl From<GoodbyeDecision> for HookResponse {
    fn from(decision: GoodbyeDecision) -> Self {
        match decision {
            GoodbyeDecision::Allow => HookResponse::Allow,
            GoodbyeDecision::Block { reason } => HookResponse::Block { reason },
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soul=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let soul = match cli.soul_path {
        Some(p) => SoulPath::new(soul_core::paths::expand_tilde(&p)),
        None => match SoulPath::from_env() {
            Ok(s) => s,
            Err(e) => {
                eprintln!("soul-faculties: could not resolve soul path: {e}");
                std::process::exit(1);
            }
        },
    };

    let exit_code = match cli.command {
        Command::Start => cmd_start(&soul, cli.hook_port).await,
        Command::Stop => cmd_stop(),
        Command::Status => cmd_status(&soul),
    };
    std::process::exit(exit_code);
}

fn config_path(soul: &SoulPath) -> PathBuf {
    soul.root().join(".soul-config.toml")
}

async fn cmd_start(soul: &SoulPath, hook_port: u16) -> i32 {
    let config = SoulConfig::load(&config_path(soul));
    let guard = Arc::new(Mutex::new(SessionGuard::new(soul.clone(), config.guard.clone())));

    {
        let mut guard = guard.lock().await;
        match guard.recover_if_needed(&FallbackProvider).await {
            Ok(true) => tracing::warn!("recovered a session that crashed without a clean goodbye"),
            Ok(false) => {}
            Err(e) => {
                eprintln!("soul-faculties: crash recovery failed: {e}");
                return e.exit_code();
            }
        }
    }

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        ctrl_c_cancel.cancel();
    });

    let hook_task = tokio::spawn(run_hook_server(guard.clone(), soul.clone(), hook_port, cancel.clone()));
    let watcher_task = tokio::spawn(run_watcher(soul.clone(), config.fabric.watcher_poll_ms, cancel.clone()));
    let heartbeat_task = tokio::spawn(run_heartbeat_consolidation(
        soul.clone(),
        config.fabric.consolidation_interval_ms,
        cancel.clone(),
    ));

    let (hook_result, watcher_result, heartbeat_result) =
        tokio::join!(hook_task, watcher_task, heartbeat_task);
    if let Err(e) = hook_result {
        eprintln!("soul-faculties: hook server task panicked: {e}");
        return 2;
    }
    if let Err(e) = watcher_result {
        eprintln!("soul-faculties: watcher task panicked: {e}");
        return 2;
    }
    if let Err(e) = heartbeat_result {
        eprintln!("soul-faculties: heartbeat consolidation task panicked: {e}");
        return 2;
    }
    0
}

/// Per-minute (configurable) heartbeat cadence that triggers an incremental
/// consolidation pass. Failures are logged and do not halt the daemon, per
/// the propagation policy: consolidation errors are recorded, not fatal.
async fn run_heartbeat_consolidation(soul: SoulPath, interval_ms: u64, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(interval_ms));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                if !soul_fabric::session_is_active(&soul) {
                    continue;
                }
                let result = consolidate(
                    &soul,
                    ConsolidateMode::Incremental,
                    &ConsolidationInput::default(),
                    &FallbackProvider,
                    Some(cancel.clone()),
                    std::time::Duration::from_secs(30),
                    false,
                )
                .await;
                match result {
                    Ok(seed) => tracing::debug!(blocks = seed.blocks.len(), "heartbeat consolidation"),
                    Err(e) => tracing::warn!(error = %e, "heartbeat consolidation failed"),
                }
            }
        }
    }
}

/// One-shot JSON-line request/response per connection, mirroring the
/// newline-delimited-JSON style used by the Peer Chain wire protocol:
/// write one `HookRequest` line, read one `HookResponse` line, close.
/// Loopback-only by convention (no auth — the hook caller and the daemon
/// run on the same host as the same user). Handles both the session-start
/// (`wake`) and session-end (`goodbye`) hooks.
async fn run_hook_server(
    guard: Arc<Mutex<SessionGuard>>,
    soul: SoulPath,
    port: u16,
    cancel: CancellationToken,
) {
    let listener = match TcpListener::bind(("127.0.0.1", port)).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(port, error = %e, "failed to bind session-hook server");
            return;
        }
    };
    tracing::info!(port, "session-hook server listening");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("hook server shutting down");
                return;
            }
            accepted = listener.accept() => {
                let (stream, _) = match accepted {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::warn!(error = %e, "hook server accept failed");
                        continue;
                    }
                };
                let guard = guard.clone();
                let soul = soul.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve_hook_connection(guard, soul, stream).await {
                        tracing::warn!(error = %e, "hook connection failed");
                    }
                });
            }
        }
    }
}

/// Next session number to record on `wake`: one past whatever `#sessions`
/// the last consolidation committed, or `1` if no seed exists yet.
fn next_session_number(soul: &SoulPath) -> u32 {
    std::fs::read_to_string(soul.seed_md())
        .ok()
        .and_then(|content| soul_seed::parse_seed(&content).ok())
        .map(|seed| seed.sessions + 1)
        .unwrap_or(1)
}

async fn serve_hook_connection(
    guard: Arc<Mutex<SessionGuard>>,
    soul: SoulPath,
    stream: tokio::net::TcpStream,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let request: HookRequest = serde_json::from_str(line.trim())?;
    let response: HookResponse = match request {
        HookRequest::Goodbye { last_message } => {
            let mut guard = guard.lock().await;
            guard.goodbye_hook(&last_message).into()
        }
        HookRequest::Wake => {
            let session = next_session_number(&soul);
            let guard = guard.lock().await;
            match guard.wake(session) {
                Ok(()) => {
                    tracing::info!(session, "session guard woke");
                    HookResponse::Allow
                }
                Err(e) => HookResponse::Error { message: e.to_string() },
            }
        }
    };

    let mut body = serde_json::to_string(&response)?;
    body.push('\n');
    write_half.write_all(body.as_bytes()).await?;
    write_half.flush().await?;
    Ok(())
}

async fn run_watcher(soul: SoulPath, poll_ms: u64, cancel: CancellationToken) {
    let targets = vec![soul.pulse_file(), soul.mood_file(), soul.events_current()];
    let scan_dirs = vec![soul.heartbeat_dir(), soul.memory_dir()];
    let watcher = FabricWatcher::new(targets, scan_dirs)
        .with_poll_interval(std::time::Duration::from_millis(poll_ms));

    let (tx, mut rx) = mpsc::channel(64);
    let watcher_handle = tokio::spawn(watcher.run(tx));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            change = rx.recv() => match change {
                Some(change) => tracing::debug!(path = %change.path.display(), bytes = change.delta.len(), "fabric change"),
                None => break,
            }
        }
    }
    watcher_handle.abort();
}

fn cmd_stop() -> i32 {
    println!("soul-faculties: send SIGTERM or Ctrl-C to the running process to stop it");
    0
}

fn cmd_status(soul: &SoulPath) -> i32 {
    let active = soul_fabric::session_is_active(soul);
    let state = if active { "active" } else { "quiescent" };
    match soul_fabric::read_session_marker(soul) {
        Ok(Some(marker)) => println!(
            "guard: {state} (session {}, started {})",
            marker.session,
            marker.start.to_rfc3339()
        ),
        Ok(None) => println!("guard: {state}"),
        Err(e) => {
            eprintln!("soul-faculties: failed to read session marker: {e}");
            return e.exit_code();
        }
    }
    0
}
