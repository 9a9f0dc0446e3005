//! Channel Relay - buffers content sent to a Telegram bot and republishes it
//! to a channel on a timer.

use anyhow::{Context, Result};
use channel_relay::{
    channels::TelegramAdapter,
    config::RelayAppConfig,
    gateway::GatewayBuilder,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "channel-relay")]
#[command(author = "A3S Lab Team")]
#[command(version)]
#[command(about = "Buffer content sent to a Telegram bot and republish it to a channel")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay bot until Ctrl+C
    Run {
        /// Destination channel (@username or numeric id)
        #[arg(short, long, env = "RELAY_DESTINATION")]
        destination: Option<String>,

        /// Seconds between flushes
        #[arg(short, long)]
        interval_secs: Option<u64>,
    },

    /// Check configuration and bot credentials
    Doctor,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("channel_relay={}", log_level).into());
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load configuration
    let config = match &cli.config {
        Some(path) => RelayAppConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => RelayAppConfig::default(),
    };

    match cli.command {
        Commands::Run {
            destination,
            interval_secs,
        } => {
            run_relay(config, destination, interval_secs).await?;
        }
        Commands::Doctor => {
            run_doctor(config).await?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run_relay(
    mut config: RelayAppConfig,
    destination: Option<String>,
    interval_secs: Option<u64>,
) -> Result<()> {
    if let Some(destination) = destination {
        config.relay.destination = destination;
    }
    if let Some(secs) = interval_secs {
        config.relay.flush_interval_secs = secs;
    }

    let gateway = GatewayBuilder::new().config(config).build()?;

    gateway.start().await?;

    tracing::info!("Channel Relay is running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    gateway.stop().await?;

    Ok(())
}

async fn run_doctor(config: RelayAppConfig) -> Result<()> {
    println!("Channel Relay Doctor");
    println!();

    println!("Checking configuration...");
    match config.validate() {
        Ok(()) => println!("  ✓ Configuration valid (destination {})", config.relay.destination),
        Err(e) => println!("  ✗ {}", e),
    }

    println!();
    println!("Checking bot token...");
    let token = match config.telegram.resolve_token() {
        Ok(token) => {
            println!("  ✓ Token found in ${}", config.telegram.bot_token_ref);
            token
        }
        Err(e) => {
            println!("  ✗ {}", e);
            return Ok(());
        }
    };

    let adapter = TelegramAdapter::with_token(config.telegram.clone(), token)?;
    match adapter.get_me().await {
        Ok(me) => println!(
            "  ✓ Authenticated as {} (id {})",
            me.username.as_deref().unwrap_or(&me.first_name),
            me.id
        ),
        Err(e) => println!("  ✗ Telegram rejected the token: {}", e),
    }

    println!();
    println!("Doctor check complete!");

    Ok(())
}

fn show_config(config: Option<&RelayAppConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
