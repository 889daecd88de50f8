mod bridge;
mod build_engine;
mod catalog;
mod config;
mod dispatch;
mod error;
mod logging;
mod paths;
mod region;
mod sandbox;
mod sanitizer;
mod schematic;
mod tools;

use crate::bridge::ClientBridge;
use crate::catalog::Catalog;
use crate::config::{Config, WorldEditMode};
use crate::tools::AppState;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "vibecraft", version)]
#[command(about = "VibeCraft — an MCP tool server that bridges an AI agent to a running Minecraft client.")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP tool server.
    Serve {
        /// Serve over stdio (line-oriented JSON-RPC). Default when no
        /// transport flag is given.
        #[arg(long)]
        stdio: bool,

        /// Serve over SSE-over-HTTP instead of stdio.
        #[arg(long)]
        sse: bool,

        /// Port for the SSE transport (overrides config/server.sse_port).
        #[arg(long)]
        port: Option<u16>,

        /// Bridge host to connect to (overrides config/env).
        #[arg(long)]
        bridge_host: Option<String>,

        /// Bridge port to connect to (overrides config/env).
        #[arg(long)]
        bridge_port: Option<u16>,

        /// WorldEdit command coalescing policy: auto, force, or off.
        #[arg(long)]
        worldedit_mode: Option<WorldEditMode>,
    },
    /// Diagnose installation and connectivity health.
    Doctor,
    /// Validate the configuration file and exit without starting a server.
    Check,
}

impl clap::ValueEnum for WorldEditMode {
    fn value_variants<'a>() -> &'a [Self] {
        &[WorldEditMode::Auto, WorldEditMode::Force, WorldEditMode::Off]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            WorldEditMode::Auto => clap::builder::PossibleValue::new("auto"),
            WorldEditMode::Force => clap::builder::PossibleValue::new("force"),
            WorldEditMode::Off => clap::builder::PossibleValue::new("off"),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let (mut config, config_path) = Config::load_with_path().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load config, using defaults: {e}");
        (Config::default(), None)
    });

    let cli = Cli::parse();

    match cli.cmd {
        Some(Command::Doctor) => {
            return run_doctor(&config, config_path.as_deref()).await;
        }
        Some(Command::Check) => {
            config.validate()?;
            println!("configuration OK{}", config_path.map(|p| format!(" ({})", p.display())).unwrap_or_default());
            return Ok(());
        }
        Some(Command::Serve {
            stdio,
            sse,
            port,
            bridge_host,
            bridge_port,
            worldedit_mode,
        }) => {
            if let Some(host) = bridge_host {
                config.bridge.host = host;
            }
            if let Some(p) = bridge_port {
                config.bridge.port = p;
            }
            if let Some(mode) = worldedit_mode {
                config.worldedit_mode = mode;
            }
            if let Some(p) = port {
                config.server.sse_port = p;
            }

            // SSE owns its own stdout-free terminal; stdio owns the process's
            // stdout as its wire format. Either way logging to stdout would
            // corrupt the stdio transport's frames, so it's suppressed
            // whenever stdio is in play (the default transport).
            let use_sse = sse && !stdio;
            let suppress_stdout = !use_sse;

            let _log_dir = logging::setup_tracing_with_settings(logging::LoggingSettings {
                level: config.logging.level.as_deref(),
                directory: config.logging.directory.as_deref(),
                retention_days: config.logging.retention_days,
                suppress_stdout,
            })
            .unwrap_or_else(|e| {
                eprintln!("Failed to initialize logging: {e}");
                paths::logs_dir()
            });

            config.validate()?;

            let catalog = Arc::new(Catalog::load()?);
            let bridge = ClientBridge::new(config.bridge.clone());
            bridge.start_in_background();

            let state = Arc::new(AppState {
                config: Arc::new(config.clone()),
                catalog,
                bridge,
            });

            if use_sse {
                info!(port = config.server.sse_port, "starting SSE transport");
                dispatch::sse::serve(config.server.sse_port, state).await?;
            } else {
                info!("starting stdio transport");
                dispatch::stdio::serve(state).await?;
            }
        }
        None => {
            // Bare `vibecraft` behaves like `vibecraft serve` with no
            // transport flags — stdio, since that's how an MCP client
            // normally launches this process as a subprocess.
            config.validate()?;
            let _log_dir = logging::setup_tracing_with_settings(logging::LoggingSettings {
                level: config.logging.level.as_deref(),
                directory: config.logging.directory.as_deref(),
                retention_days: config.logging.retention_days,
                suppress_stdout: true,
            })
            .unwrap_or_else(|e| {
                eprintln!("Failed to initialize logging: {e}");
                paths::logs_dir()
            });

            let catalog = Arc::new(Catalog::load()?);
            let bridge = ClientBridge::new(config.bridge.clone());
            bridge.start_in_background();

            let state = Arc::new(AppState {
                config: Arc::new(config),
                catalog,
                bridge,
            });

            info!("starting stdio transport");
            dispatch::stdio::serve(state).await?;
        }
    }

    Ok(())
}

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

fn ok(label: &str, detail: &str) {
    println!("  {GREEN}[OK]{RESET}   {label}: {detail}");
}

fn fail(label: &str, detail: &str) {
    println!("  {RED}[FAIL]{RESET} {label}: {detail}");
}

fn info_line(label: &str, detail: &str) {
    println!("  {CYAN}[INFO]{RESET} {label}: {detail}");
}

async fn run_doctor(config: &Config, config_path: Option<&std::path::Path>) -> Result<()> {
    println!("vibecraft doctor\n");

    ok("Version", env!("CARGO_PKG_VERSION"));

    match config_path {
        Some(p) => ok("Config", &p.display().to_string()),
        None => info_line("Config", "(default)"),
    }

    match config.validate() {
        Ok(()) => ok("Config validation", "passed"),
        Err(e) => fail("Config validation", &e.to_string()),
    }

    match Catalog::load() {
        Ok(catalog) => ok(
            "Catalog",
            &format!(
                "{} templates, {} furniture layouts, {} palettes",
                catalog.list_templates().len(),
                catalog.list_furniture().len(),
                catalog.list_palettes().len()
            ),
        ),
        Err(e) => fail("Catalog", &e.to_string()),
    }

    let bridge_url = config.bridge.url();
    match tokio::time::timeout(Duration::from_secs(2), tokio_tungstenite::connect_async(&bridge_url)).await {
        Ok(Ok(_)) => ok("Bridge", &format!("{bridge_url} is reachable")),
        Ok(Err(e)) => info_line("Bridge", &format!("{bridge_url} not reachable ({e})")),
        Err(_) => info_line("Bridge", &format!("{bridge_url} timed out")),
    }

    match &config.safety.build_box {
        Some(b) => ok(
            "Build box",
            &format!("[{},{},{}] to [{},{},{}]", b.min_x, b.min_y, b.min_z, b.max_x, b.max_y, b.max_z),
        ),
        None => info_line("Build box", "unrestricted"),
    }

    println!();
    Ok(())
}
