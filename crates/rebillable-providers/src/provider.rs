//! AccountingProvider trait definition.
//!
//! The HTTP layer only ever talks to an [`AccountingProvider`]: start the
//! authorization handshake, finish it, and list expenses with the resulting
//! token. Provider-specific OAuth and API details stay behind this seam.

use std::future::Future;
use std::pin::Pin;

use rebillable_core::{DateRange, ExpenseRecord};
use url::Url;

use crate::error::ProviderResult;
use crate::token::AccessToken;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe so the server can hold an
/// `Arc<dyn AccountingProvider>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The redirect that starts an authorization handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Provider consent page, with client id, redirect URI and state embedded.
    pub url: String,
    /// CSRF nonce the caller must keep until the callback arrives.
    pub state: String,
}

/// An accounting backend reachable through OAuth2 authorization-code flow.
pub trait AccountingProvider: Send + Sync {
    /// Returns the name of this provider (e.g. "freeagent").
    fn name(&self) -> &str;

    /// Generates a CSRF nonce and the authorization URL embedding it.
    fn begin_authorization(&self) -> AuthorizationRequest;

    /// Validates the callback against the stored nonce and exchanges the
    /// authorization code for an access token.
    ///
    /// # Errors
    ///
    /// - `AuthenticationFailed` if `expected_state` is `None`, the callback
    ///   carries no or a different `state`, no `code`, or an `error`.
    /// - `TokenExchangeFailed` if the token endpoint call fails.
    fn complete_authorization<'a>(
        &'a self,
        expected_state: Option<&'a str>,
        callback_url: &'a Url,
    ) -> BoxFuture<'a, ProviderResult<AccessToken>>;

    /// Lists expense records dated within `range`.
    ///
    /// # Errors
    ///
    /// - `AuthenticationFailed` if the provider rejects the token.
    /// - `DataFetchFailed` on network failure, timeout, non-2xx status or a
    ///   payload that does not match the expense schema.
    fn list_expenses<'a>(
        &'a self,
        token: &'a AccessToken,
        range: DateRange,
    ) -> BoxFuture<'a, ProviderResult<Vec<ExpenseRecord>>>;
}
