//! Tickertape Core Library
//!
//! This crate provides the core functionality for Tickertape agents:
//! - OAuth2 authorization-code flow and transparent access-token refresh
//! - Durable auth state storage (keyring with file fallback)
//! - Authenticated market data access (symbol metadata, daily bar streams)
//!
//! # Features
//!
//! - `keyring-storage` (default): Use platform keyring for auth state storage
//! - `file-storage`: Use file-based auth state storage (for headless Linux)
//!
//! # Example
//!
//! ```no_run
//! use tickertape_core::{store, BarStreamOptions, BrokerClient, BrokerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BrokerConfig::load()?;
//!     let client = BrokerClient::new(config, store::default_store()?)?;
//!
//!     // First run: send the user through the authorization flow
//!     let url = client.start_auth("https://localhost/callback").await?;
//!     println!("Visit: {url}");
//!     // ...user comes back with a code...
//!     client.finish_auth("code-from-redirect").await?;
//!
//!     // Authenticated calls refresh the token automatically
//!     let info = client.symbol_info("MSFT").await?;
//!     println!("{} trades on {}", info.name, info.exchange);
//!
//!     let bars = client
//!         .daily_bars_starting_on("MSFT", "2024-01-15".parse()?, BarStreamOptions::default())
//!         .await?;
//!     println!("collected {} bars", bars.len());
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod market;
pub mod store;

// Re-export commonly used types
pub use auth::TokenStatus;
pub use client::BrokerClient;
pub use config::{BrokerConfig, ConfigError, ConfigSource};
pub use error::BrokerError;
pub use market::{BarStreamOptions, DailyBar, SymbolInfo};
pub use store::{FileStore, StateStore, StoreError};
