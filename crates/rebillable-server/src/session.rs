//! Per-visitor session state.
//!
//! Each browser gets a random [`SessionId`] carried in a signed cookie. The
//! signing key ([`SessionSecret`]) is generated at process start, so a
//! restart invalidates every outstanding cookie. State itself never leaves
//! the process: the [`SessionStore`] maps ids to [`SessionState`] values in
//! memory.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, header};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use rebillable_providers::AccessToken;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Name of the session cookie.
pub const COOKIE_NAME: &str = "rebillable_session";

/// Random bytes in a session id and in the signing secret.
const KEY_LENGTH: usize = 32;

/// Length of a base64url-encoded (unpadded) 32 byte value.
const ENCODED_KEY_LENGTH: usize = 43;

/// Opaque identifier of one visitor's session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(URL_SAFE_NO_PAD.encode(random_bytes()))
    }

    /// Accepts only values shaped like ids we generate.
    pub fn parse(value: &str) -> Option<Self> {
        let well_formed = value.len() == ENCODED_KEY_LENGTH
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        well_formed.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Process-wide key used to sign session cookies.
pub struct SessionSecret([u8; KEY_LENGTH]);

impl SessionSecret {
    /// Generates a new random secret.
    pub fn generate() -> Self {
        Self(random_bytes())
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    // SHA-256 over secret || "." || id rather than an HMAC. This relies on
    // `SessionId::parse` accepting only exactly 43 base64url characters: a
    // length-extension forgery needs to append padding and data to the id,
    // which then no longer parses.
    fn sign(&self, id: &SessionId) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        hasher.update(b".");
        hasher.update(id.as_str().as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    /// Cookie value for `id`: `<id>.<signature>`.
    pub fn cookie_value(&self, id: &SessionId) -> String {
        format!("{}.{}", id.as_str(), self.sign(id))
    }

    /// Returns the id in a cookie value if its signature checks out.
    pub fn verify(&self, cookie_value: &str) -> Option<SessionId> {
        let (id, signature) = cookie_value.split_once('.')?;
        let id = SessionId::parse(id)?;
        constant_time_eq(self.sign(&id).as_bytes(), signature.as_bytes()).then_some(id)
    }

    /// Finds a validly signed session cookie among request headers.
    pub fn from_headers(&self, headers: &HeaderMap) -> Option<SessionId> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(name, _)| *name == COOKIE_NAME)
            .find_map(|(_, value)| self.verify(value))
    }

    /// Builds the `Set-Cookie` header value for `id`.
    pub fn set_cookie(&self, id: &SessionId, secure: bool) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            COOKIE_NAME,
            self.cookie_value(id)
        );
        if secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

impl std::fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionSecret(<redacted>)")
    }
}

/// What the server remembers about one visitor.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    oauth_state: Option<String>,
    token: Option<AccessToken>,
}

impl SessionState {
    /// Remembers the CSRF nonce of a handshake in progress.
    pub fn put_oauth_state(&mut self, state: impl Into<String>) {
        self.oauth_state = Some(state.into());
    }

    /// Removes and returns the pending nonce; a nonce is single-use.
    pub fn take_oauth_state(&mut self) -> Option<String> {
        self.oauth_state.take()
    }

    pub fn put_token(&mut self, token: AccessToken) {
        self.token = Some(token);
    }

    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }
}

#[derive(Debug)]
struct Entry {
    state: SessionState,
    last_seen: Instant,
}

/// In-memory map of live sessions.
///
/// Entries idle for longer than the TTL are treated as missing and purged
/// lazily. Once `max_sessions` is reached, the least recently used entry
/// is evicted to make room.
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    max_sessions: usize,
    entries: Mutex<HashMap<SessionId, Entry>>,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            ttl,
            max_sessions: max_sessions.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_live(&self, entry: &Entry, now: Instant) -> bool {
        now.duration_since(entry.last_seen) < self.ttl
    }

    /// Creates an empty session and returns its id.
    pub fn create(&self) -> SessionId {
        let id = SessionId::generate();
        self.put(&id, SessionState::default());
        id
    }

    /// Stores `state` under `id`, replacing any previous value.
    pub fn put(&self, id: &SessionId, state: SessionState) {
        let now = Instant::now();
        let mut entries = self.lock();

        if !entries.contains_key(id) && entries.len() >= self.max_sessions {
            entries.retain(|_, entry| now.duration_since(entry.last_seen) < self.ttl);
            if entries.len() >= self.max_sessions
                && let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_seen)
                    .map(|(id, _)| id.clone())
            {
                debug!("session store full, evicting least recently used session");
                entries.remove(&oldest);
            }
        }

        entries.insert(
            id.clone(),
            Entry {
                state,
                last_seen: now,
            },
        );
    }

    /// Returns a copy of the session state, if the session is live.
    pub fn get(&self, id: &SessionId) -> Option<SessionState> {
        self.update(id, |state| state.clone())
    }

    /// Returns true if `id` names a live session.
    pub fn has(&self, id: &SessionId) -> bool {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(id) {
            Some(entry) if self.is_live(entry, now) => true,
            Some(_) => {
                entries.remove(id);
                false
            }
            None => false,
        }
    }

    /// Applies `f` to a live session's state and refreshes its lifetime.
    ///
    /// Returns `None` without calling `f` if the session is missing or
    /// expired.
    pub fn update<R>(&self, id: &SessionId, f: impl FnOnce(&mut SessionState) -> R) -> Option<R> {
        let now = Instant::now();
        let mut entries = self.lock();

        let live = entries.get(id).is_some_and(|entry| self.is_live(entry, now));
        if !live {
            entries.remove(id);
            return None;
        }

        let entry = entries.get_mut(id)?;
        entry.last_seen = now;
        Some(f(&mut entry.state))
    }

    /// Number of stored sessions, including ones not yet purged.
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

fn random_bytes() -> [u8; KEY_LENGTH] {
    let mut bytes = [0u8; KEY_LENGTH];
    rand::rng().fill(&mut bytes);
    bytes
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
