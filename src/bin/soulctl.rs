//! soulctl — operator CLI for the soul.
//!
//! Usage:
//!   soulctl start                            start soul-faculties in the foreground
//!   soulctl stop                             stop a running soul-faculties
//!   soulctl status                           print guard + fabric status
//!   soulctl seed consolidate [--full]        run a consolidation pass
//!   soulctl seed show <block>                print one parsed SEED.md block
//!   soulctl pulse <type> <label>              write a pulse observation

use std::process::Command as ProcessCommand;

use clap::{Parser, Subcommand};
use soul_core::SoulPath;
use soul_fabric::Pulse;
use soul_llm::FallbackProvider;
use soul_seed::consolidate::{consolidate, ConsolidateMode, ConsolidationInput};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "soulctl", about = "Operator CLI for the soul protocol", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[arg(long)]
    soul_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Start,
    Stop,
    Status,
    /// Seed Engine operations.
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },
    /// Write a pulse observation.
    Pulse { activity: String, label: String },
}

#[derive(Subcommand)]
enum SeedAction {
    /// Run a consolidation pass.
    Consolidate {
        #[arg(long, default_value_t = false)]
        full: bool,
        #[arg(long, default_value_t = false)]
        incremental: bool,
    },
    /// Print one parsed block from SEED.md.
    Show { block: String },
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
                eprintln!("soulctl: could not resolve soul path: {e}");
                std::process::exit(1);
            }
        },
    };

    let exit_code = match cli.command {
        Command::Start => cmd_start(),
        Command::Stop => cmd_stop(),
        Command::Status => cmd_status(&soul),
        Command::Seed { action } => match action {
            SeedAction::Consolidate { full, incremental } => {
                cmd_consolidate(&soul, full, incremental).await
            }
            SeedAction::Show { block } => cmd_show(&soul, &block),
        },
        Command::Pulse { activity, label } => cmd_pulse(&soul, &activity, &label),
    };
    std::process::exit(exit_code);
}

/// `soulctl start` is a thin convenience wrapper: the actual daemon is
/// `soul-faculties`, run as its own process so it survives `soulctl`
/// exiting.
fn cmd_start() -> i32 {
    match ProcessCommand::new("soul-faculties").arg("start").status() {
        Ok(status) => status.code().unwrap_or(2),
        Err(e) => {
            eprintln!("soulctl: failed to launch soul-faculties: {e}");
            2
        }
    }
}

fn cmd_stop() -> i32 {
    match ProcessCommand::new("soul-faculties").arg("stop").status() {
        Ok(status) => status.code().unwrap_or(2),
        Err(e) => {
            eprintln!("soulctl: failed to signal soul-faculties: {e}");
            2
        }
    }
}

fn cmd_status(soul: &SoulPath) -> i32 {
    match ProcessCommand::new("soul-faculties")
        .arg("--soul-path")
        .arg(soul.root())
        .arg("status")
        .status()
    {
        Ok(status) => status.code().unwrap_or(2),
        Err(e) => {
            eprintln!("soulctl: failed to query soul-faculties: {e}");
            2
        }
    }
}

async fn cmd_consolidate(soul: &SoulPath, full: bool, incremental: bool) -> i32 {
    let mode = if incremental && !full {
        ConsolidateMode::Incremental
    } else {
        ConsolidateMode::Full
    };
    match consolidate(
        soul,
        mode,
        &ConsolidationInput::default(),
        &FallbackProvider,
        None,
        std::time::Duration::from_secs(30),
        false,
    )
    .await
    {
        Ok(seed) => {
            println!("consolidated: session {}, {} blocks", seed.sessions, seed.blocks.len());
            0
        }
        Err(e) => {
            eprintln!("soulctl: consolidation failed: {e}");
            e.exit_code()
        }
    }
}

fn cmd_show(soul: &SoulPath, block_name: &str) -> i32 {
    let content = match std::fs::read_to_string(soul.seed_md()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("soulctl: failed to read SEED.md: {e}");
            return 2;
        }
    };
    let seed = match soul_seed::parse_seed(&content) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("soulctl: failed to parse SEED.md: {e}");
            return e.exit_code();
        }
    };
    match seed.get_block(block_name) {
        Some(block) => {
            println!("@{block_name}{{");
            println!("{}", block.render());
            println!("}}");
            0
        }
        None => {
            eprintln!("soulctl: no such block: {block_name}");
            1
        }
    }
}

fn cmd_pulse(soul: &SoulPath, activity: &str, label: &str) -> i32 {
    match soul_fabric::write_pulse(soul, &Pulse::new(activity, label)) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("soulctl: failed to write pulse: {e}");
            e.exit_code()
        }
    }
}

