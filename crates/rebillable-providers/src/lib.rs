//! AccountingProvider trait and implementations.
//!
//! - [`AccountingProvider`] - the narrow seam the web layer depends on
//! - [`AccessToken`] - the credential kept in a visitor's session
//! - [`ProviderError`] - authentication / token exchange / data fetch failures
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  FreeAgent API   │
//! └────────┬─────────┘
//!          │ OAuth2 + REST
//!          ▼
//! ┌──────────────────┐
//! │FreeAgentProvider │
//! └────────┬─────────┘
//!          │ AccountingProvider
//!          ▼
//! ┌──────────────────┐
//! │  ExpenseRecord   │──▶ rebillable_core::Report
//! └──────────────────┘
//! ```

pub mod error;
pub mod provider;
pub mod token;

#[cfg(feature = "freeagent")]
pub mod freeagent;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use provider::{AccountingProvider, AuthorizationRequest, BoxFuture};
pub use token::AccessToken;
