//! Command-line interface definition.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::FileConfig;

/// rebillable - this month's rebillable expenses from FreeAgent
#[derive(Debug, Parser)]
#[command(name = "rebillable")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "REBILLABLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// OAuth client id (supports env:: and pass:: references)
    #[arg(long, env = "CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret (supports env:: and pass:: references)
    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Address to listen on [default: 127.0.0.1:5009]
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Base URL browsers use to reach this server [default: http://localhost:5009]
    #[arg(long)]
    pub public_url: Option<String>,

    /// Use the FreeAgent sandbox
    #[arg(long)]
    pub sandbox: bool,

    /// Timeout in seconds for calls to FreeAgent
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Maximum number of visitor sessions kept in memory [default: 10000]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_sessions: Option<u64>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

impl Cli {
    /// Overlays command-line values on top of file configuration.
    pub fn apply(&self, mut file: FileConfig) -> FileConfig {
        if let Some(ref id) = self.client_id {
            file.freeagent.client_id = Some(id.clone());
        }
        if let Some(ref secret) = self.client_secret {
            file.freeagent.client_secret = Some(secret.clone());
        }
        if self.sandbox {
            file.freeagent.sandbox = true;
        }
        if let Some(bind) = self.bind {
            file.server.bind = Some(bind);
        }
        if let Some(ref url) = self.public_url {
            file.server.public_url = Some(url.clone());
        }
        if let Some(secs) = self.timeout {
            file.server.timeout = Some(secs);
        }
        if let Some(max) = self.max_sessions {
            file.server.max_sessions = Some(usize::try_from(max).unwrap_or(usize::MAX));
        }
        file
    }
}
