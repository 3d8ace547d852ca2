//! OAuth 2.0 authorization-code flow against FreeAgent.
//!
//! # Flow Overview
//!
//! 1. Generate a random state and build the consent URL
//! 2. The caller stores the state and redirects the user
//! 3. FreeAgent redirects back with `code` and `state`
//! 4. Check the echoed state against the stored one
//! 5. Exchange the code for an access token (client credentials via HTTP
//!    Basic auth)

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::AuthorizationRequest;
use crate::token::AccessToken;

use super::config::FreeAgentConfig;

/// Random bytes in a state value, before base64 encoding.
const STATE_LENGTH: usize = 16;

/// OAuth client for the FreeAgent API.
#[derive(Debug)]
pub struct OAuthClient {
    config: FreeAgentConfig,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client sharing `http_client`.
    pub fn new(config: FreeAgentConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Starts a handshake: returns the consent URL and the state to store.
    pub fn begin_authorization(&self) -> AuthorizationRequest {
        let state = generate_state();
        let url = build_auth_url(
            &self.config.authorize_url,
            &self.config.credentials.client_id,
            &self.config.redirect_uri,
            &state,
        );
        debug!("authorization URL: {}", url);
        AuthorizationRequest { url, state }
    }

    /// Finishes a handshake started by [`begin_authorization`].
    ///
    /// `expected_state` is the value stored in the visitor's session, or
    /// `None` if the session holds none.
    ///
    /// [`begin_authorization`]: Self::begin_authorization
    pub async fn complete_authorization(
        &self,
        expected_state: Option<&str>,
        callback_url: &Url,
    ) -> ProviderResult<AccessToken> {
        let callback = CallbackParams::from_url(callback_url);

        if let Some(error) = callback.error {
            warn!("authorization denied by provider: {}", error);
            return Err(ProviderError::authentication(format!(
                "authorization denied: {}",
                error
            )));
        }

        let Some(expected) = expected_state else {
            warn!("callback received without a stored state");
            return Err(ProviderError::authentication(
                "no authorization in progress (session expired?)",
            ));
        };

        let Some(received) = callback.state.as_deref() else {
            warn!("callback received without a state parameter");
            return Err(ProviderError::authentication(
                "missing OAuth state in callback",
            ));
        };

        if !states_match(expected, received) {
            warn!("callback state does not match the stored state");
            return Err(ProviderError::authentication(
                "OAuth state mismatch - possible CSRF attack",
            ));
        }

        let Some(code) = callback.code else {
            return Err(ProviderError::authentication(
                "missing authorization code in callback",
            ));
        };

        info!("received authorization code, exchanging for token");
        self.exchange_code(&code).await
    }

    /// Exchanges an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> ProviderResult<AccessToken> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.config.token_url)
            .basic_auth(
                &self.config.credentials.client_id,
                Some(&self.config.credentials.client_secret),
            )
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "token exchange request timed out".to_string()
                } else {
                    format!("token exchange request failed: {}", e)
                };
                ProviderError::token_exchange(message).with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::token_exchange(format!("failed to read token response: {}", e))
        })?;

        if !status.is_success() {
            return Err(ProviderError::token_exchange(format!(
                "token exchange failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::token_exchange(format!("invalid token response: {}", e))
        })?;

        info!("successfully obtained access token");
        Ok(AccessToken::new(
            token_response.access_token,
            token_response.token_type.unwrap_or_else(|| "bearer".to_string()),
            token_response.refresh_token,
            token_response.expires_in,
        ))
    }
}

/// Query parameters FreeAgent appends to the redirect URI.
#[derive(Debug, Default)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl CallbackParams {
    fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            let value = value.into_owned();
            match key.as_ref() {
                "code" if !value.is_empty() => params.code = Some(value),
                "state" if !value.is_empty() => params.state = Some(value),
                "error" => params.error = Some(value),
                _ => {}
            }
        }
        params
    }
}

/// Generates a random state string for CSRF protection.
fn generate_state() -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..STATE_LENGTH).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Builds the FreeAgent consent URL.
fn build_auth_url(authorize_url: &str, client_id: &str, redirect_uri: &str, state: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&state={}",
        authorize_url,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(state),
    )
}

/// Compares two states without short-circuiting on the first difference.
fn states_match(expected: &str, received: &str) -> bool {
    let (a, b) = (expected.as_bytes(), received.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Response from FreeAgent's token endpoint.
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{basic_auth, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::freeagent::config::OAuthCredentials;

    const REDIRECT: &str = "http://localhost:5009/callback";

    fn client_for(api_base: &str) -> OAuthClient {
        let config = FreeAgentConfig::new(OAuthCredentials::new("my-client", "my-secret"), REDIRECT)
            .with_api_base(api_base)
            .with_timeout(Duration::from_secs(2));
        OAuthClient::new(config, reqwest::Client::new())
    }

    fn callback(query: &str) -> Url {
        Url::parse(&format!("{}?{}", REDIRECT, query)).unwrap()
    }

    async fn token_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/token_endpoint"))
            .and(basic_auth("my-client", "my-secret"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-123",
                "token_type": "bearer",
                "expires_in": 3600,
                "refresh_token": "refresh-456"
            })))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn state_is_random() {
        assert_ne!(generate_state(), generate_state());
        // 16 bytes base64url without padding
        assert_eq!(generate_state().len(), 22);
    }

    #[test]
    fn auth_url_format() {
        let client = client_for("https://api.freeagent.com/v2");
        let request = client.begin_authorization();

        assert!(request.url.starts_with("https://api.freeagent.com/v2/approve_app?"));
        assert!(request.url.contains("client_id=my-client"));
        assert!(request.url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A5009%2Fcallback"));
        assert!(request.url.contains("response_type=code"));
        assert!(request.url.contains(&format!("state={}", request.state)));
    }

    #[test]
    fn states_match_is_exact() {
        assert!(states_match("abc", "abc"));
        assert!(!states_match("abc", "abd"));
        assert!(!states_match("abc", "abcd"));
        assert!(!states_match("abc", ""));
    }

    #[test]
    fn callback_params_parsing() {
        let params = CallbackParams::from_url(&callback("code=c%201&state=s&extra=1"));
        assert_eq!(params.code.as_deref(), Some("c 1"));
        assert_eq!(params.state.as_deref(), Some("s"));
        assert!(params.error.is_none());

        let params = CallbackParams::from_url(&callback("state="));
        assert!(params.state.is_none());
    }

    #[tokio::test]
    async fn matching_state_returns_token() {
        let server = token_server().await;
        let client = client_for(&format!("{}/v2", server.uri()));

        let token = client
            .complete_authorization(Some("nonce"), &callback("code=the-code&state=nonce"))
            .await
            .unwrap();

        assert_eq!(token.access_token, "access-123");
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-456"));
        assert!(token.expires_at.is_some());
    }

    #[tokio::test]
    async fn mismatched_state_is_rejected_without_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let client = client_for(&format!("{}/v2", server.uri()));

        for (expected, query) in [
            (Some("nonce"), "code=the-code&state=other"),
            (Some("nonce"), "code=the-code"),
            (None, "code=the-code&state=nonce"),
            (Some("nonce"), "state=nonce"),
            (Some("nonce"), "error=access_denied&state=nonce"),
        ] {
            let err = client
                .complete_authorization(expected, &callback(query))
                .await
                .unwrap_err();
            assert_eq!(
                err.code(),
                ProviderErrorCode::AuthenticationFailed,
                "query {query}"
            );
        }
    }

    #[tokio::test]
    async fn token_endpoint_rejection_is_token_exchange_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/token_endpoint"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;
        let client = client_for(&format!("{}/v2", server.uri()));

        let err = client
            .complete_authorization(Some("nonce"), &callback("code=stale&state=nonce"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ProviderErrorCode::TokenExchangeFailed);
        assert!(err.message().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn garbage_token_response_is_token_exchange_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/token_endpoint"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
        let client = client_for(&format!("{}/v2", server.uri()));

        let err = client
            .complete_authorization(Some("nonce"), &callback("code=the-code&state=nonce"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::TokenExchangeFailed);
    }

    #[tokio::test]
    async fn unreachable_token_endpoint_is_token_exchange_error() {
        // Nothing listens on port 9 (discard) in test environments.
        let client = client_for("http://127.0.0.1:9/v2");
        let err = client
            .complete_authorization(Some("nonce"), &callback("code=the-code&state=nonce"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::TokenExchangeFailed);
    }
}
