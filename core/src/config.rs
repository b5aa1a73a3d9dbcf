//! Client configuration and credentials.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

pub const TOKEN_ENV: &str = "TRACKER_TOKEN";
pub const ORGANIZATION_ENV: &str = "TRACKER_ORGANIZATION";

pub const DEFAULT_BASE_URL: &str = "https://dev.azure.com";
pub const DEFAULT_API_VERSION: &str = "7.0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_BATCH_WORKERS: usize = 5;

/// Personal access token plus the organization it belongs to.
///
/// Immutable once built; both fields are required.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
    organization: String,
}

impl Credentials {
    pub fn new(
        token: impl Into<String>,
        organization: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let token = token.into();
        let organization = organization.into();
        if token.trim().is_empty() || organization.trim().is_empty() {
            return Err(ConfigError::MissingCredentials);
        }
        Ok(Self {
            token,
            organization,
        })
    }

    /// Read `TRACKER_TOKEN` and `TRACKER_ORGANIZATION`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var(TOKEN_ENV).map_err(|_| ConfigError::MissingEnv { name: TOKEN_ENV })?;
        let organization = std::env::var(ORGANIZATION_ENV)
            .map_err(|_| ConfigError::MissingEnv {
                name: ORGANIZATION_ENV,
            })?;
        Self::new(token, organization)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("organization", &self.organization)
            .finish()
    }
}

/// Connection settings shared by both execution modes.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service root; the organization is appended as the first path segment.
    pub base_url: String,
    pub api_version: String,
    /// Applied to every request, including each batch detail fetch.
    pub timeout: Duration,
    /// Worker threads used by the blocking transport for batch fetches.
    pub batch_workers: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            batch_workers: DEFAULT_BATCH_WORKERS,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}
