// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for a sync run.

use crate::config::ConfigError;
use std::fmt;

/// Which side of the reconciliation an error or record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Strava, read through its REST API.
    Strava,
    /// Kikourou, read by scraping the training log pages.
    Kikourou,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Strava => f.write_str("Strava"),
            Side::Kikourou => f.write_str("Kikourou"),
        }
    }
}

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{side} activities unavailable: {reason}")]
    SourceUnavailable { side: Side, reason: String },

    #[error(
        "Kikourou activity {logbook_id} matches both Strava activities {first_api_id} and {second_api_id}"
    )]
    DuplicateMatch {
        logbook_id: String,
        first_api_id: String,
        second_api_id: String,
    },

    #[error("Failed to create Kikourou entry for {activity}: {message}")]
    CreateFailed { activity: String, message: String },

    #[error("Invalid activity record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Strava API error: {0}")]
    StravaApi(String),

    #[error("Kikourou error: {0}")]
    Kikourou(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    /// Marker for an expired or revoked Strava token.
    pub const STRAVA_TOKEN_ERROR: &'static str = "Strava token invalid or expired";
    /// Marker for Strava rate limiting (HTTP 429).
    pub const STRAVA_RATE_LIMIT: &'static str = "Strava rate limit exceeded";

    /// Whether Strava rejected the tokens themselves (HTTP 400/401), as
    /// opposed to a network or server failure.
    pub fn is_strava_token_error(&self) -> bool {
        matches!(self, SyncError::StravaApi(msg) if msg == Self::STRAVA_TOKEN_ERROR)
    }

    /// Report `error` as `side` being unreachable for this run.
    pub fn unavailable(side: Side, error: SyncError) -> Self {
        match error {
            e @ SyncError::SourceUnavailable { .. } => e,
            e => SyncError::SourceUnavailable {
                side,
                reason: e.to_string(),
            },
        }
    }

    /// Whether this error aborts a run before anything was written.
    pub fn is_pre_write(&self) -> bool {
        matches!(
            self,
            SyncError::SourceUnavailable { .. } | SyncError::DuplicateMatch { .. }
        )
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
