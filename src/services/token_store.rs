// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! On-disk cache of Strava OAuth tokens.

use crate::error::{Result, SyncError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Tokens as returned by the Strava token endpoint.
///
/// The endpoint also returns athlete details; they are not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp
    pub expires_at: i64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl StoredTokens {
    /// Whether the access token is expired or about to be.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        let expires_at = DateTime::from_timestamp(self.expires_at, 0).unwrap_or_default();
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) >= expires_at
    }
}

/// JSON file holding the current tokens.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read cached tokens. A missing or unreadable file means "no tokens".
    pub fn load(&self) -> Option<StoredTokens> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Cannot read token file");
                return None;
            }
        };

        match serde_json::from_str(&data) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring corrupt token file");
                None
            }
        }
    }

    pub fn save(&self, tokens: &StoredTokens) -> Result<()> {
        let data = serde_json::to_string_pretty(tokens)
            .map_err(|e| SyncError::Internal(anyhow::anyhow!("Token serialization: {}", e)))?;
        std::fs::write(&self.path, data).map_err(|e| {
            SyncError::Internal(anyhow::anyhow!(
                "Cannot write token file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        tracing::debug!(path = %self.path.display(), "Tokens saved");
        Ok(())
    }

    /// Delete the cache file; a missing file is not an error.
    pub fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::Internal(anyhow::anyhow!(
                "Cannot remove token file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
