//! FreeAgent provider implementation.
//!
//! # Authentication Flow
//!
//! 1. The app is registered in the FreeAgent developer dashboard, which
//!    issues a client id/secret and records the redirect URI
//! 2. [`FreeAgentProvider::begin_authorization`] yields the consent URL and
//!    a CSRF state
//! 3. FreeAgent redirects back with `code` and `state`
//! 4. [`FreeAgentProvider::complete_authorization`] checks the state and
//!    exchanges the code for an access token
//!
//! # Example
//!
//! ```ignore
//! use rebillable_providers::freeagent::{FreeAgentConfig, FreeAgentProvider, OAuthCredentials};
//!
//! let credentials = OAuthCredentials::new("client-id", "client-secret");
//! let config = FreeAgentConfig::new(credentials, "http://localhost:5009/callback");
//! let provider = FreeAgentProvider::new(config)?;
//!
//! let request = provider.begin_authorization();
//! // redirect the user to request.url, keep request.state
//! ```
//!
//! [`FreeAgentProvider::begin_authorization`]: crate::AccountingProvider::begin_authorization
//! [`FreeAgentProvider::complete_authorization`]: crate::AccountingProvider::complete_authorization

mod client;
mod config;
mod oauth;
mod provider;

pub use client::FreeAgentClient;
pub use config::{FreeAgentConfig, OAuthCredentials, PRODUCTION_API_BASE, SANDBOX_API_BASE};
pub use oauth::OAuthClient;
pub use provider::FreeAgentProvider;
