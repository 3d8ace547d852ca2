//! Server configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. built-in defaults ([`ServerConfig::default`])
//! 2. `~/.config/rebillable/config.toml` (or `--config`)
//! 3. command-line flags and their environment variables
//!
//! ```toml
//! [freeagent]
//! client_id = "env::FREEAGENT_CLIENT_ID"
//! client_secret = "pass::freeagent/secret"
//! sandbox = true
//! per_page = 100
//!
//! [server]
//! bind = "127.0.0.1:5009"
//! public_url = "http://localhost:5009"
//! timeout = 30
//! session_ttl = 3600
//! max_sessions = 10000
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rebillable_providers::freeagent::{FreeAgentConfig, OAuthCredentials};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ServerError, ServerResult};
use crate::secret;

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:5009";

/// Default externally visible base URL.
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:5009";

/// Runtime configuration of the web server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: SocketAddr,

    /// Base URL browsers use to reach this server; the OAuth redirect URI
    /// is derived from it.
    pub public_url: Url,

    /// Idle lifetime of a visitor session.
    pub session_ttl: Duration,

    /// Upper bound on live sessions.
    pub max_sessions: usize,

    /// Timeout for every outbound provider call.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5009)),
            public_url: Url::parse(DEFAULT_PUBLIC_URL).expect("default public URL is valid"),
            session_ttl: Duration::from_secs(3600),
            max_sessions: 10_000,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_public_url(mut self, url: Url) -> Self {
        self.public_url = url;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The OAuth redirect URI, `{public_url}/callback`.
    pub fn redirect_uri(&self) -> String {
        format!("{}/callback", self.public_url.as_str().trim_end_matches('/'))
    }

    /// Session cookies are marked `Secure` when served over https.
    pub fn secure_cookies(&self) -> bool {
        self.public_url.scheme() == "https"
    }
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub freeagent: FreeAgentSettings,
    pub server: ServerSettings,
}

/// `[freeagent]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeAgentSettings {
    /// OAuth client id (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Use the FreeAgent sandbox.
    pub sandbox: bool,

    /// Override the API base entirely.
    pub api_base: Option<String>,

    /// Page size of the expense query (1..=100).
    pub per_page: Option<u32>,
}

/// `[server]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: Option<SocketAddr>,
    pub public_url: Option<String>,
    /// Provider request timeout in seconds.
    pub timeout: Option<u64>,
    /// Session idle lifetime in seconds.
    pub session_ttl: Option<u64>,
    /// Upper bound on concurrently stored sessions.
    pub max_sessions: Option<usize>,
}

impl FileConfig {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> ServerResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| ServerError::config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rebillable")
            .join("config.toml")
    }

    /// Builds the runtime configuration, resolving secret references.
    pub fn resolve(&self) -> ServerResult<(ServerConfig, FreeAgentConfig)> {
        let mut server = ServerConfig::default();
        if let Some(bind) = self.server.bind {
            server = server.with_bind_addr(bind);
        }
        if let Some(ref public_url) = self.server.public_url {
            let url = Url::parse(public_url).map_err(|e| {
                ServerError::config(format!("invalid public_url '{}': {}", public_url, e))
            })?;
            server = server.with_public_url(url);
        }
        if let Some(secs) = self.server.timeout {
            server = server.with_request_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.server.session_ttl {
            server = server.with_session_ttl(Duration::from_secs(secs));
        }
        if let Some(max) = self.server.max_sessions {
            if max == 0 {
                return Err(ServerError::config("max_sessions must be at least 1"));
            }
            server = server.with_max_sessions(max);
        }

        let client_id =
            secret::resolve_credential("client_id", self.freeagent.client_id.as_deref())?;
        let client_secret =
            secret::resolve_credential("client_secret", self.freeagent.client_secret.as_deref())?;

        let mut freeagent = FreeAgentConfig::new(
            OAuthCredentials::new(client_id, client_secret),
            server.redirect_uri(),
        )
        .with_timeout(server.request_timeout);

        if let Some(ref api_base) = self.freeagent.api_base {
            freeagent = freeagent.with_api_base(api_base.as_str());
        } else if self.freeagent.sandbox {
            freeagent = freeagent.with_sandbox();
        }
        if let Some(per_page) = self.freeagent.per_page {
            freeagent = freeagent.with_per_page(per_page);
        }

        freeagent.validate().map_err(ServerError::config)?;

        Ok((server, freeagent))
    }
}
