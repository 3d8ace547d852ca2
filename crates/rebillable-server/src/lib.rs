//! Web front end for the rebillable expense report.
//!
//! A visitor opens `/`, is sent to FreeAgent to approve access, comes back
//! on `/callback` and lands on `/expenses`, a single HTML page listing the
//! current month's expenses that are marked for rebilling to a client.
//!
//! ```text
//!  browser ──▶ handler ──▶ ReportBuilder ──▶ AccountingProvider ──▶ FreeAgent
//!                 │
//!                 └──▶ SessionStore (nonce, access token)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rebillable_providers::freeagent::FreeAgentProvider;
//! use rebillable_server::{FileConfig, ShutdownHandle, WebServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (server_config, freeagent_config) = FileConfig::load()?.resolve()?;
//!     let provider = Arc::new(FreeAgentProvider::new(freeagent_config)?);
//!
//!     let shutdown = ShutdownHandle::new();
//!     shutdown.spawn_listener();
//!     WebServer::bind(&server_config, provider).await?.run(shutdown).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod report;
mod secret;
pub mod server;
pub mod session;
pub mod signals;

pub use config::{FileConfig, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use handler::{AppState, WebError, build_router};
pub use report::ReportBuilder;
pub use server::WebServer;
pub use session::{SessionId, SessionSecret, SessionState, SessionStore};
pub use signals::ShutdownHandle;
