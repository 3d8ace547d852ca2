//! HTTP routes.
//!
//! | route       | outcome                                                  |
//! |-------------|----------------------------------------------------------|
//! | `/`         | 302 to the provider consent page, nonce kept in session  |
//! | `/callback` | 302 `/expenses` once the code is exchanged for a token   |
//! | `/expenses` | the current month's report, or 302 `/` when logged out   |
//! | `/health`   | liveness probe                                           |

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use chrono::NaiveDate;
use rebillable_core::{render_error_page, render_report};
use rebillable_providers::{AccountingProvider, ProviderError, ProviderErrorCode};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::ServerConfig;
use crate::report::ReportBuilder;
use crate::session::{SessionId, SessionSecret, SessionState, SessionStore};

/// Source of "today" for picking the report month.
pub type Clock = fn() -> NaiveDate;

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    provider: Arc<dyn AccountingProvider>,
    reports: ReportBuilder,
    sessions: SessionStore,
    secret: SessionSecret,
    public_url: Url,
    secure_cookies: bool,
    today: Clock,
}

impl AppState {
    /// Creates the state with a fresh cookie-signing secret.
    pub fn new(provider: Arc<dyn AccountingProvider>, config: &ServerConfig) -> Self {
        Self::with_clock(provider, config, local_today)
    }

    /// Like [`AppState::new`] but with a fixed notion of "today".
    pub fn with_clock(
        provider: Arc<dyn AccountingProvider>,
        config: &ServerConfig,
        today: Clock,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                reports: ReportBuilder::new(provider.clone()),
                provider,
                sessions: SessionStore::new(config.session_ttl, config.max_sessions),
                secret: SessionSecret::generate(),
                public_url: config.public_url.clone(),
                secure_cookies: config.secure_cookies(),
                today,
            }),
        }
    }

    /// The live session named by the request's cookie, if any.
    fn session(&self, headers: &HeaderMap) -> Option<SessionId> {
        self.inner
            .secret
            .from_headers(headers)
            .filter(|id| self.inner.sessions.has(id))
    }

    /// Rebuilds the absolute URL the provider redirected the browser to.
    fn callback_url(&self, uri: &Uri) -> Result<Url, ProviderError> {
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/callback");
        let base = self.inner.public_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path_and_query}"))
            .map_err(|e| ProviderError::internal("invalid callback URL").with_source(e))
    }
}

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/callback", get(callback))
        .route("/expenses", get(expenses))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, set_cookie) = match state.session(&headers) {
        Some(id) => (id, None),
        None => {
            let id = state.inner.sessions.create();
            debug!(sessions = state.inner.sessions.len(), "new visitor session");
            let cookie = state.inner.secret.set_cookie(&id, state.inner.secure_cookies);
            (id, Some(cookie))
        }
    };

    let request = state.inner.provider.begin_authorization();
    state
        .inner
        .sessions
        .update(&id, |session| session.put_oauth_state(request.state));

    info!(provider = state.inner.provider.name(), "starting authorization");
    debug!(url = %request.url, "redirecting to consent page");

    match set_cookie {
        Some(cookie) => (
            StatusCode::FOUND,
            [(header::LOCATION, request.url), (header::SET_COOKIE, cookie)],
        )
            .into_response(),
        None => found(request.url),
    }
}

async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, WebError> {
    let session = state.session(&headers);
    let expected = session
        .as_ref()
        .and_then(|id| state.inner.sessions.update(id, SessionState::take_oauth_state))
        .flatten();

    let callback_url = state.callback_url(&uri)?;
    let result = state
        .inner
        .provider
        .complete_authorization(expected.as_deref(), &callback_url)
        .await;

    let token = match result {
        Ok(token) => token,
        Err(e) => {
            if e.requires_reauthorization()
                && let Some(ref id) = session
            {
                state.inner.sessions.update(id, SessionState::clear_token);
            }
            return Err(e.into());
        }
    };

    let stored = session
        .as_ref()
        .and_then(|id| state.inner.sessions.update(id, |s| s.put_token(token)));
    if stored.is_none() {
        return Err(ProviderError::authentication("session ended during login").into());
    }

    info!(provider = state.inner.provider.name(), "authorization complete");
    Ok(found("/expenses"))
}

async fn expenses(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, WebError> {
    let session = state.session(&headers);
    let token = session
        .as_ref()
        .and_then(|id| state.inner.sessions.get(id))
        .and_then(|s| s.token().cloned());

    let today = (state.inner.today)();
    match state.inner.reports.build_report(token.as_ref(), today).await {
        Ok(report) => {
            info!(
                month = report.month_name(),
                year = report.year,
                lines = report.expenses.len(),
                "serving report"
            );
            Ok(Html(render_report(&report)))
        }
        Err(e) => {
            if e.requires_reauthorization()
                && let Some(ref id) = session
            {
                state.inner.sessions.update(id, SessionState::clear_token);
            }
            Err(e.into())
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn found(location: impl Into<String>) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.into())]).into_response()
}

/// A provider failure surfaced at the route boundary.
#[derive(Debug)]
pub struct WebError(ProviderError);

impl From<ProviderError> for WebError {
    fn from(err: ProviderError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let err = self.0;
        match err.code() {
            ProviderErrorCode::AuthenticationFailed => {
                warn!(error = %err, "not authenticated, restarting login");
                found("/")
            }
            ProviderErrorCode::TokenExchangeFailed => {
                warn!(error = %err, "token exchange failed");
                error_page(
                    StatusCode::BAD_GATEWAY,
                    "Login failed",
                    "The accounting service did not accept the login. Please try again.",
                )
            }
            ProviderErrorCode::DataFetchFailed => {
                warn!(error = %err, "expense fetch failed");
                error_page(
                    StatusCode::BAD_GATEWAY,
                    "Report unavailable",
                    "Expenses could not be loaded from the accounting service.",
                )
            }
            ProviderErrorCode::ConfigurationError | ProviderErrorCode::InternalError => {
                error!(error = %err, "request failed");
                error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error",
                    "Something went wrong on our side.",
                )
            }
        }
    }
}

fn error_page(status: StatusCode, title: &str, message: &str) -> Response {
    (status, Html(render_error_page(title, message))).into_response()
}
