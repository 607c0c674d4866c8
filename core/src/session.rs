//! Authentication state and token lifecycle.
//!
//! # Design
//! `Session` owns the credentials, the bearer token, its expiry and the
//! last login payload. It decides *what* must happen before a request
//! (`TokenAction`) but never performs I/O itself; the client executes the
//! decision through its own dispatch path and reports back via
//! `complete_login` / `complete_refresh`.
//!
//! The in-progress states double as the reentrancy guard: while the
//! session is `Authenticating` or `Refreshing`, the login or refresh
//! exchange goes through the normal dispatch path and its expiry check
//! resolves to `TokenAction::Skip`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::clock::Clock;
use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::extract::Envelope;

static JWT_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+$")
        .expect("JWT_SHAPE should compile - this is a bug")
});

/// Whether `token` has the three-segment base64url shape of a JWT.
pub fn is_jwt_shaped(token: &str) -> bool {
    JWT_SHAPE.is_match(token)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Refreshing,
}

impl SessionState {
    pub fn in_progress(self) -> bool {
        matches!(self, SessionState::Authenticating | SessionState::Refreshing)
    }
}

/// What must happen to the token before the next request goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAction {
    /// A login or refresh is already running.
    Skip,
    /// Token expired (or never obtained): log in again.
    Reauthenticate,
    /// Token is inside the refresh window.
    Refresh,
    Fresh,
}

pub struct Session {
    credentials: Credentials,
    clock: Arc<dyn Clock>,
    refresh_window: Duration,
    state: SessionState,
    token: String,
    expires_at: Option<Instant>,
    auth_payload: Map<String, Value>,
}

impl Session {
    pub fn new(credentials: Credentials, clock: Arc<dyn Clock>, refresh_window: Duration) -> Self {
        Self {
            credentials,
            clock,
            refresh_window,
            state: SessionState::Unauthenticated,
            token: String::new(),
            expires_at: None,
            auth_payload: Map::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// The `data` object of the last successful login response.
    pub fn auth_payload(&self) -> &Map<String, Value> {
        &self.auth_payload
    }

    /// `Authorization` header value, when the token is JWT-shaped.
    pub fn bearer(&self) -> Option<String> {
        is_jwt_shaped(&self.token).then(|| format!("Bearer {}", self.token))
    }

    /// Customer form identifier the API wants repeated on every request.
    pub fn form_name(&self) -> Option<&Value> {
        self.auth_payload.get("form_name")
    }

    /// Account balance cached from the login response.
    pub fn balance(&self) -> Option<String> {
        match self.auth_payload.get("credit_account_info")?.get("balance_base")? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn token_action(&self) -> TokenAction {
        if self.state.in_progress() {
            return TokenAction::Skip;
        }
        let Some(expires_at) = self.expires_at else {
            return TokenAction::Reauthenticate;
        };
        let now = self.clock.now();
        if now > expires_at {
            TokenAction::Reauthenticate
        } else if now
            .checked_add(self.refresh_window)
            .map_or(true, |horizon| horizon > expires_at)
        {
            TokenAction::Refresh
        } else {
            TokenAction::Fresh
        }
    }

    /// Enter `next` (an in-progress state) and return the state to restore
    /// if the attempt fails.
    pub fn begin(&mut self, next: SessionState) -> SessionState {
        debug_assert!(next.in_progress());
        std::mem::replace(&mut self.state, next)
    }

    /// Leave an in-progress state without touching the token.
    pub fn abort(&mut self, previous: SessionState) {
        self.state = previous;
    }

    /// Apply a login success body: `{"data": {"token", "expires_in", ...}}`.
    ///
    /// # Errors
    /// `Error::UnexpectedResponse` if the token or lifetime is missing, or
    /// the lifetime does not fit an `Instant`. The caller is expected to
    /// `abort` in that case.
    pub fn complete_login(&mut self, body: &Value) -> Result<()> {
        let data = match body.get("data") {
            Some(Value::Object(data)) => data,
            _ => {
                return Err(Error::UnexpectedResponse(
                    "login response has no `data` object".to_string(),
                ))
            }
        };
        let (token, lifetime) = token_fields(body)?;
        let expires_at = self.expiry_after(lifetime)?;
        self.token = token;
        self.expires_at = Some(expires_at);
        self.auth_payload = data.clone();
        self.state = SessionState::Authenticated;
        Ok(())
    }

    /// Apply a refresh success body: `{"token", "expires_in"}`.
    pub fn complete_refresh(&mut self, body: &Value) -> Result<()> {
        let (token, lifetime) = token_fields(body)?;
        let expires_at = self.expiry_after(lifetime)?;
        self.token = token;
        self.expires_at = Some(expires_at);
        self.state = SessionState::Authenticated;
        Ok(())
    }

    fn expiry_after(&self, lifetime: Duration) -> Result<Instant> {
        self.clock.now().checked_add(lifetime).ok_or_else(|| {
            Error::UnexpectedResponse(format!("`expires_in` of {}s is out of range", lifetime.as_secs()))
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("state", &self.state)
            .field("has_token", &!self.token.is_empty())
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Token and lifetime from either the login (`data`-wrapped) or the
/// refresh (flat) envelope.
fn token_fields(body: &Value) -> Result<(String, Duration)> {
    let fields = Envelope::detect(body).fields(body);
    let token = fields
        .get("token")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::UnexpectedResponse("response has no `token`".to_string()))?;
    let lifetime = fields
        .get("expires_in")
        .and_then(parse_seconds)
        .ok_or_else(|| Error::UnexpectedResponse("response has no usable `expires_in`".to_string()))?;
    Ok((token.to_string(), lifetime))
}

fn parse_seconds(value: &Value) -> Option<Duration> {
    let secs = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    Some(Duration::from_secs(secs.max(0).unsigned_abs()))
}
