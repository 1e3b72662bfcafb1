// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from a JSON file and environment variables.
//!
//! Secrets may be kept out of the file: `STRAVA_CLIENT_SECRET` and
//! `KIKOUROU_PASSWORD` (from the environment or a `.env` file) override it.

use crate::services::matcher::MatcherConfig;
use crate::services::translator::TranslatorConfig;
use serde::{Deserialize, Deserializer};
use std::env;
use std::path::{Path, PathBuf};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub strava: StravaConfig,
    pub kikourou: KikourouConfig,
    /// Sport code table and intensity scale for new Kikourou entries
    #[serde(rename = "strava_to_kikourou", default)]
    pub translator: TranslatorConfig,
    #[serde(default)]
    pub matching: MatcherConfig,
}

/// Strava OAuth application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaConfig {
    /// Strava OAuth client ID (public)
    #[serde(deserialize_with = "string_or_number")]
    pub client_id: String,
    /// Strava OAuth client secret
    #[serde(default)]
    pub client_secret: String,
    /// Local port receiving the OAuth redirect
    #[serde(default = "default_callback_port")]
    pub callback_port: u16,
    /// Where access and refresh tokens are cached between runs
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
}

/// Kikourou account settings.
#[derive(Debug, Clone, Deserialize)]
pub struct KikourouConfig {
    /// Numeric "kikoureur" id used in training log URLs
    pub user_id: u64,
    /// Forum login name
    pub name: String,
    #[serde(default)]
    pub password: String,
    /// Maximum number of training entries read per run
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_callback_port() -> u16 {
    8000
}

fn default_token_file() -> PathBuf {
    PathBuf::from("strava_tokens.json")
}

fn default_limit() -> usize {
    50
}

/// Strava client ids are numbers but are often quoted in hand-written files.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

impl Config {
    /// Resolve the configuration path: explicit argument, then `SYNC_CONFIG`,
    /// then `config.json` in the working directory.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        dotenvy::dotenv().ok(); // Load .env file if present

        explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var("SYNC_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from a JSON file, applying environment overrides.
    ///
    /// Secrets are not checked here; each command calls the `require_*`
    /// check for the sites it uses.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut config = Self::from_json(&data)?;
        config.apply_env_overrides();

        tracing::debug!(
            path = %path.display(),
            mapped_sports = config.translator.sport.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parse configuration from a JSON string, without environment overrides.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(data).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = env::var("STRAVA_CLIENT_SECRET") {
            self.strava.client_secret = secret.trim().to_string();
        }
        if let Ok(password) = env::var("KIKOUROU_PASSWORD") {
            self.kikourou.password = password;
        }
    }

    /// Check that every secret needed for a sync is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.require_strava()?;
        self.require_kikourou()
    }

    /// Strava OAuth credentials.
    pub fn require_strava(&self) -> Result<(), ConfigError> {
        if self.strava.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("strava.client_id"));
        }
        if self.strava.client_secret.is_empty() {
            return Err(ConfigError::Missing("STRAVA_CLIENT_SECRET"));
        }
        Ok(())
    }

    /// Kikourou login.
    pub fn require_kikourou(&self) -> Result<(), ConfigError> {
        if self.kikourou.password.is_empty() {
            return Err(ConfigError::Missing("KIKOUROU_PASSWORD"));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Parse(String),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}
