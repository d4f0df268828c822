use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::roles::Role;
use crate::state::ActingUser;

pub const API_URL_ENV: &str = "QUIRE_API_URL";
pub const API_TOKEN_ENV: &str = "QUIRE_API_TOKEN";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub identity: Option<IdentityConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Defaults to the platform data dir when unset.
    pub path: Option<PathBuf>,
}

/// Fixed-delay retry for comment fetches and other transient failures.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 2,
            delay_ms: 1000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IdentityConfig {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
}

impl IdentityConfig {
    pub fn to_acting_user(&self) -> ActingUser {
        ActingUser {
            id: self.id.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// A missing file is not an error; the defaults apply.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.api.base_url = url;
        }
        if let Some(token) = lookup(API_TOKEN_ENV).filter(|token| !token.trim().is_empty()) {
            self.api.token = Some(token);
        }
    }
}
