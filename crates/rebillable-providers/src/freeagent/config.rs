//! FreeAgent provider configuration.

use std::time::Duration;

use url::Url;

/// Production API base.
pub const PRODUCTION_API_BASE: &str = "https://api.freeagent.com/v2";

/// Sandbox API base, for apps registered as sandbox apps.
pub const SANDBOX_API_BASE: &str = "https://api.sandbox.freeagent.com/v2";

/// OAuth 2.0 client credentials issued by the FreeAgent developer dashboard.
#[derive(Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Checks that both values are present.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.trim().is_empty() {
            return Err("client_id is required");
        }
        if self.client_secret.trim().is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Configuration for the FreeAgent provider.
#[derive(Debug, Clone)]
pub struct FreeAgentConfig {
    pub credentials: OAuthCredentials,

    /// Where FreeAgent sends the user back after consent.
    ///
    /// Must match the redirect URI registered for the app.
    pub redirect_uri: String,

    /// Consent page. Defaults to `{api_base}/approve_app`.
    pub authorize_url: String,

    /// Code exchange endpoint. Defaults to `{api_base}/token_endpoint`.
    pub token_url: String,

    /// Base for API resources such as `/expenses`.
    pub api_base: String,

    /// Request timeout applied to every outbound call.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,

    /// Page size requested from the expense listing.
    pub per_page: u32,
}

impl FreeAgentConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Largest page FreeAgent serves.
    pub const MAX_PER_PAGE: u32 = 100;

    /// Creates a production configuration.
    pub fn new(credentials: OAuthCredentials, redirect_uri: impl Into<String>) -> Self {
        Self {
            credentials,
            redirect_uri: redirect_uri.into(),
            authorize_url: format!("{}/approve_app", PRODUCTION_API_BASE),
            token_url: format!("{}/token_endpoint", PRODUCTION_API_BASE),
            api_base: PRODUCTION_API_BASE.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("rebillable/{}", env!("CARGO_PKG_VERSION")),
            per_page: Self::MAX_PER_PAGE,
        }
    }

    /// Points every endpoint at a different API base.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        self.authorize_url = format!("{}/approve_app", api_base);
        self.token_url = format!("{}/token_endpoint", api_base);
        self.api_base = api_base;
        self
    }

    /// Uses the FreeAgent sandbox.
    pub fn with_sandbox(self) -> Self {
        self.with_api_base(SANDBOX_API_BASE)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// URL of the expense listing resource.
    pub fn expenses_url(&self) -> String {
        format!("{}/expenses", self.api_base)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        for (name, value) in [
            ("redirect_uri", &self.redirect_uri),
            ("authorize_url", &self.authorize_url),
            ("token_url", &self.token_url),
            ("api_base", &self.api_base),
        ] {
            Url::parse(value).map_err(|e| format!("invalid {} '{}': {}", name, value, e))?;
        }

        if self.timeout.is_zero() {
            return Err("timeout must be greater than zero".to_string());
        }

        if self.per_page == 0 || self.per_page > Self::MAX_PER_PAGE {
            return Err(format!("per_page must be between 1 and {}", Self::MAX_PER_PAGE));
        }

        Ok(())
    }
}
