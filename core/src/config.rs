//! Client configuration and credentials.
//!
//! ## Environment Variables
//! - `WEBGLOBE_API_URL`: base API URL (required by `from_env`)
//! - `WEBGLOBE_CONNECT_TIMEOUT`: connect timeout in seconds (default 60)
//! - `WEBGLOBE_TIMEOUT`: total exchange timeout in seconds (default 90)
//! - `WEBGLOBE_REFRESH_WINDOW`: seconds before expiry at which the token is
//!   refreshed (default 600)
//! - `WEBGLOBE_LOGIN` / `WEBGLOBE_PASSWORD`: account credentials

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::Payload;

pub const DEFAULT_API_URL: &str = "https://api.webglobe.com";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);
pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_secs(600);
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// Connection settings for `WebglobeClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base API URL; endpoint paths are appended to it verbatim.
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Upper bound for one whole exchange, connect included.
    pub timeout: Duration,
    /// A token closer than this to its expiry is refreshed before use.
    pub refresh_window: Duration,
    pub max_redirects: u32,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Load configuration from `WEBGLOBE_*` environment variables.
    ///
    /// # Errors
    /// Returns `Error::Config` if `WEBGLOBE_API_URL` is missing or a
    /// timeout value is not a whole number of seconds.
    pub fn from_env() -> Result<Self> {
        let base_url = env_var("WEBGLOBE_API_URL")?;
        let mut config = Self::new(&base_url);
        if let Some(secs) = env_secs("WEBGLOBE_CONNECT_TIMEOUT")? {
            config.connect_timeout = secs;
        }
        if let Some(secs) = env_secs("WEBGLOBE_TIMEOUT")? {
            config.timeout = secs;
        }
        if let Some(secs) = env_secs("WEBGLOBE_REFRESH_WINDOW")? {
            config.refresh_window = secs;
        }
        tracing::debug!(base_url = %config.base_url, "configuration loaded from environment");
        Ok(config)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
            refresh_window: DEFAULT_REFRESH_WINDOW,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// Login credentials. Serializes to the login request body.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    login: String,
    password: String,
}

impl Credentials {
    pub fn new(login: &str, password: &str) -> Self {
        Self {
            login: login.to_string(),
            password: password.to_string(),
        }
    }

    /// Read `WEBGLOBE_LOGIN` and `WEBGLOBE_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            login: env_var("WEBGLOBE_LOGIN")?,
            password: env_var("WEBGLOBE_PASSWORD")?,
        })
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    /// Body of the login request.
    pub fn to_payload(&self) -> Payload {
        match serde_json::to_value(self) {
            Ok(Value::Object(payload)) => payload,
            _ => Payload::new(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| Error::Config(format!("missing environment variable {name}")))
}

fn env_secs(name: &str) -> Result<Option<Duration>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|e| Error::Config(format!("invalid {name}: {e}"))),
        Err(_) => Ok(None),
    }
}
