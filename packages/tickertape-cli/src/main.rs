//! Tickertape CLI - brokerage market data agent for the command line
//!
//! This binary drives the core library:
//! - Authorize against the brokerage with the OAuth2 code flow
//! - Inspect the stored session
//! - Fetch symbol metadata and daily bar history

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tickertape_core::{
    config, store, BarStreamOptions, BrokerClient, BrokerConfig, TokenStatus,
};

#[derive(Parser)]
#[command(name = "tickertape")]
#[command(version)]
#[command(about = "Brokerage market data agent for the command line")]
#[command(long_about = "
Tickertape connects to a brokerage's OAuth2-protected market data API,
keeps the access token fresh across calls, and fetches symbol metadata
and daily bar history.

Quick start:
  1. Start authorization:   tickertape connect --redirect-uri <URI>
  2. Visit the printed URL, then finish with the code from the redirect:
                            tickertape authorize <CODE>
  3. Fetch data:            tickertape symbol MSFT
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the authorization flow and print the URL to visit
    #[command(alias = "login")]
    Connect {
        /// Redirect URI registered for your API client
        #[arg(long)]
        redirect_uri: String,

        /// Open the authorization URL in the default browser
        #[arg(long)]
        open: bool,
    },

    /// Finish the authorization flow with the code from the redirect
    Authorize {
        /// Authorization code handed back on the redirect URI
        code: String,
    },

    /// Show the stored session status
    Status,

    /// Fetch metadata for a symbol
    Symbol {
        /// Ticker symbol, e.g. MSFT
        symbol: String,
    },

    /// Collect daily bars for a symbol
    Bars {
        /// Ticker symbol, e.g. MSFT
        symbol: String,

        /// First session date to request, e.g. 2024-01-15
        #[arg(long)]
        start: NaiveDate,

        /// Stop collecting after this many seconds
        #[arg(long)]
        max_secs: Option<u64>,

        /// Stop collecting after this many bars
        #[arg(long)]
        max_bars: Option<usize>,
    },

    /// Show configuration paths and settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("tickertape={log_level},tickertape_core={log_level}").into()
            }),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Connect { ref redirect_uri, open } => cmd_connect(&cli, redirect_uri, open).await,
        Commands::Authorize { ref code } => cmd_authorize(&cli, code).await,
        Commands::Status => cmd_status(&cli).await,
        Commands::Symbol { ref symbol } => cmd_symbol(&cli, symbol).await,
        Commands::Bars {
            ref symbol,
            start,
            max_secs,
            max_bars,
        } => cmd_bars(&cli, &symbol, start, max_secs, max_bars).await,
        Commands::Config => cmd_config(&cli),
    }
}

fn build_client() -> Result<BrokerClient> {
    let config = BrokerConfig::load().context(
        "broker configuration incomplete; run 'tickertape config' for the expected layout",
    )?;
    let store = store::default_store().context("failed to open auth state storage")?;
    BrokerClient::new(config, store).context("failed to build API client")
}

async fn cmd_connect(cli: &Cli, redirect_uri: &str, open: bool) -> Result<()> {
    let client = build_client()?;
    let url = client.start_auth(redirect_uri).await?;

    if open {
        if let Err(e) = webbrowser::open(&url) {
            tracing::warn!("failed to open browser automatically: {e}");
        }
    }

    match cli.format {
        OutputFormat::Text => {
            println!("Visit the following URL to authorize this agent:");
            println!();
            println!("  {url}");
            println!();
            println!("Then finish with: tickertape authorize <CODE>");
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "status": "awaiting_authorization",
                    "authorization_url": url,
                })
            );
        }
    }

    Ok(())
}

async fn cmd_authorize(cli: &Cli, code: &str) -> Result<()> {
    let client = build_client()?;
    client.finish_auth(code).await?;
    let status = client.token_status().await?;

    match cli.format {
        OutputFormat::Text => {
            println!("Authorization complete ({status}).");
            println!("Try: tickertape symbol MSFT");
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "status": "authorized",
                    "token_status": status.to_string(),
                })
            );
        }
    }

    Ok(())
}

async fn cmd_status(cli: &Cli) -> Result<()> {
    let client = build_client()?;
    let status = client.token_status().await?;

    match cli.format {
        OutputFormat::Text => {
            match status {
                TokenStatus::Valid { expires_at } => {
                    println!("Status:  {status}");
                    println!("Expires: {expires_at}");
                }
                TokenStatus::Expired => {
                    println!("Status: {status}");
                    println!("The next authenticated call will refresh it automatically.");
                }
                TokenStatus::NoToken => {
                    println!("Status: {status}");
                    println!("Run 'tickertape connect --redirect-uri <URI>' to authorize.");
                }
            }
            println!();
            println!("Storage: {}", store::storage_description());
        }
        OutputFormat::Json => {
            let expires_at = match status {
                TokenStatus::Valid { expires_at } => Some(expires_at.to_rfc3339()),
                _ => None,
            };
            println!(
                "{}",
                serde_json::json!({
                    "token_status": status.to_string(),
                    "valid": status.is_valid(),
                    "expires_at": expires_at,
                    "storage": store::storage_description(),
                })
            );
        }
    }

    Ok(())
}

async fn cmd_symbol(cli: &Cli, symbol: &str) -> Result<()> {
    let client = build_client()?;
    let info = client.symbol_info(symbol).await?;

    match cli.format {
        OutputFormat::Text => {
            println!("{} ({})", info.name, info.description);
            println!("  Exchange: {}", info.exchange);
            println!("  Category: {}", info.category);
            println!("  Country:  {}", info.country);
            println!("  Currency: {}", info.currency);
            if !info.sector_name.is_empty() {
                println!("  Sector:   {}", info.sector_name);
            }
            if !info.industry_name.is_empty() {
                println!("  Industry: {}", info.industry_name);
            }
            println!("  Lot size: {}", info.lot_size);
            println!("  Min move: {}", info.min_move);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}

async fn cmd_bars(
    cli: &Cli,
    symbol: &str,
    start: NaiveDate,
    max_secs: Option<u64>,
    max_bars: Option<usize>,
) -> Result<()> {
    let client = build_client()?;
    let options = BarStreamOptions {
        max_duration: max_secs.map(Duration::from_secs),
        max_bars,
    };
    let bars = client.daily_bars_starting_on(symbol, start, options).await?;

    match cli.format {
        OutputFormat::Text => {
            println!("{} bars for {symbol} starting {start}:", bars.len());
            println!();
            println!(
                "  {:<22} {:>10} {:>10} {:>10} {:>10} {:>12}",
                "timestamp", "open", "high", "low", "close", "volume"
            );
            for bar in &bars {
                println!(
                    "  {:<22} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12}",
                    bar.time_stamp, bar.open, bar.high, bar.low, bar.close, bar.total_volume
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&bars)?);
        }
    }

    Ok(())
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let config_path = config::config_file_path_string();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration");
            println!("=============");
            println!();
            println!("Config file:   {config_path}");
            println!("Session store: {}", store::storage_description());
            println!();
            println!("Environment variables:");
            println!("  TICKERTAPE_BASE_URL      - API endpoint");
            println!("  TICKERTAPE_CLIENT_ID     - OAuth client id");
            println!("  TICKERTAPE_CLIENT_SECRET - OAuth client secret");
            println!();
            println!("Example config.toml:");
            println!();
            println!("{}", config::generate_example_config());
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "config_file": config_path,
                    "session_store": store::storage_description(),
                })
            );
        }
    }

    Ok(())
}
