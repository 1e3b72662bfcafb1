// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for listing activities.
//!
//! Handles:
//! - Activity listing (first page only)
//! - OAuth code exchange and token refresh
//! - Token caching between runs
//! - Rate limit detection

use crate::error::{Result, Side, SyncError};
use crate::models::ActivityRecord;
use crate::services::oauth_callback;
use crate::services::sync::ActivitySource;
use crate::services::token_store::{StoredTokens, TokenStore};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Activities fetched per run (a single page).
pub const ACTIVITIES_PER_PAGE: u32 = 30;

const TOKEN_URL: &str = "https://www.strava.com/oauth/token";
const AUTHORIZE_URL: &str = "https://www.strava.com/oauth/authorize";

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://www.strava.com/api/v3".to_string(),
            token_url: TOKEN_URL.to_string(),
            client_id,
            client_secret,
        }
    }

    /// Point the client at other API and token endpoints.
    pub fn with_endpoints(
        mut self,
        base_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.base_url = base_url.into();
        self.token_url = token_url.into();
        self
    }

    /// Page the user must visit to grant read access to their activities.
    pub fn authorize_url(&self, callback_port: u16) -> String {
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&approval_prompt=force&scope=activity:read_all",
            AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&format!("http://localhost:{}", callback_port)),
        )
    }

    /// List the athlete's most recent activities.
    pub async fn list_activities(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StravaActivitySummary>> {
        let url = format!("{}/athlete/activities", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("page", page.to_string()), ("per_page", per_page.to_string())])
            .send()
            .await
            .map_err(|e| SyncError::StravaApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<StoredTokens> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| SyncError::StravaApi(format!("Token exchange failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<StoredTokens> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| SyncError::StravaApi(format!("Refresh request failed: {}", e)))?;

        // Strava answers 400 for a revoked or unknown refresh token
        let status = response.status().as_u16();
        if status == 400 || status == 401 {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status, body = %body, "Strava rejected the refresh token");
            return Err(SyncError::StravaApi(
                SyncError::STRAVA_TOKEN_ERROR.to_string(),
            ));
        }

        self.check_response_json(response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            // Rate limit
            if status.as_u16() == 429 {
                tracing::warn!("Strava rate limit hit (429)");
                return Err(SyncError::StravaApi(SyncError::STRAVA_RATE_LIMIT.to_string()));
            }

            // Unauthorized - token may be expired or revoked
            if status.as_u16() == 401 {
                return Err(SyncError::StravaApi(
                    SyncError::STRAVA_TOKEN_ERROR.to_string(),
                ));
            }

            return Err(SyncError::StravaApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::StravaApi(format!("JSON parse error: {}", e)))
    }
}

/// Summary activity from the list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaActivitySummary {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    /// Local start time, formatted as UTC ("2024-05-01T07:30:00Z")
    pub start_date_local: String,
    /// Meters
    pub distance: f64,
    /// Seconds
    pub elapsed_time: u64,
    #[serde(default)]
    pub total_elevation_gain: f64,
    pub suffer_score: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub location_country: Option<String>,
}

impl StravaActivitySummary {
    pub fn permalink(&self) -> String {
        format!("https://www.strava.com/activities/{}", self.id)
    }
}

impl TryFrom<StravaActivitySummary> for ActivityRecord {
    type Error = SyncError;

    fn try_from(activity: StravaActivitySummary) -> Result<Self> {
        // start_date_local carries a 'Z' although it is local time
        let start = NaiveDateTime::parse_from_str(
            activity.start_date_local.trim_end_matches('Z'),
            "%Y-%m-%dT%H:%M:%S",
        )
        .map_err(|e| SyncError::InvalidRecord {
            id: activity.id.to_string(),
            reason: format!("start_date_local '{}': {}", activity.start_date_local, e),
        })?;

        let url = activity.permalink();
        Ok(ActivityRecord::new(
            activity.id.to_string(),
            url,
            start,
            activity.distance / 1000.0,
            Duration::from_secs(activity.elapsed_time),
        )?
        .with_name(activity.name)
        .with_activity_type(activity.activity_type)
        .with_elevation(activity.total_elevation_gain.max(0.0) as u32)
        .with_location(activity.location_country)
        .with_effort_score(activity.suffer_score)
        .with_heart_rate(activity.average_heartrate, activity.max_heartrate))
    }
}

/// Strava service with token management, usable as a sync source.
pub struct StravaService {
    client: StravaClient,
    store: TokenStore,
    callback_port: u16,
    tokens: Option<StoredTokens>,
}

impl StravaService {
    pub fn new(client: StravaClient, store: TokenStore, callback_port: u16) -> Self {
        Self {
            client,
            store,
            callback_port,
            tokens: None,
        }
    }

    /// Make sure a valid access token is available.
    ///
    /// Without cached tokens the OAuth flow runs when `interactive` is set,
    /// otherwise this fails. An expired token is refreshed; if the refresh is
    /// rejected the cache file is deleted so the next run re-authorizes.
    pub async fn connect(&mut self, interactive: bool) -> Result<()> {
        let tokens = match self.store.load() {
            Some(tokens) => tokens,
            None if interactive => self.authorize().await?,
            None => {
                return Err(SyncError::StravaApi(format!(
                    "No Strava tokens in {}; run the authorize command first",
                    self.store.path().display()
                )))
            }
        };

        let tokens = if tokens.needs_refresh(Utc::now()) {
            tracing::info!("Access token expired, refreshing");
            match self.client.refresh_token(&tokens.refresh_token).await {
                Ok(fresh) => {
                    self.store.save(&fresh)?;
                    fresh
                }
                Err(e) if e.is_strava_token_error() => {
                    tracing::warn!(error = %e, "Refresh token rejected, removing cached tokens");
                    self.store.remove()?;
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Token refresh failed, keeping cached tokens");
                    return Err(e);
                }
            }
        } else {
            tokens
        };

        self.tokens = Some(tokens);
        tracing::info!("Connected to Strava");
        Ok(())
    }

    /// Run the OAuth flow and store the resulting tokens.
    pub async fn authorize(&mut self) -> Result<StoredTokens> {
        let url = self.client.authorize_url(self.callback_port);
        eprintln!("Open this page to authorize access to your Strava activities:\n  {}", url);
        if let Err(e) = webbrowser::open(&url) {
            tracing::debug!(error = %e, "No browser available, waiting for a manual visit");
        }

        let code = oauth_callback::wait_for_code(self.callback_port).await?;
        let tokens = self.client.exchange_code(&code).await?;
        self.store.save(&tokens)?;

        tracing::info!(path = %self.store.path().display(), "Strava tokens stored");
        Ok(tokens)
    }
}

#[async_trait]
impl ActivitySource for StravaService {
    fn side(&self) -> Side {
        Side::Strava
    }

    async fn fetch_activities(&self) -> Result<Vec<ActivityRecord>> {
        let tokens = self
            .tokens
            .as_ref()
            .ok_or_else(|| SyncError::StravaApi("Not connected to Strava".to_string()))?;

        let summaries = self
            .client
            .list_activities(&tokens.access_token, 1, ACTIVITIES_PER_PAGE)
            .await?;

        summaries.into_iter().map(ActivityRecord::try_from).collect()
    }
}
