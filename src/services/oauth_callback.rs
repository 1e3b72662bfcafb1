// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local listener receiving the Strava OAuth redirect.
//!
//! Strava redirects the browser to `http://localhost:{port}/?code=..&scope=..`.
//! The listener runs only until the first complete redirect arrives.

use axum::{
    extract::{OriginalUri, Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::error::{Result, SyncError};

/// How long the listener waits for the in-flight response after the code arrived.
const SHUTDOWN_GRACE_SECS: u64 = 5;

/// Outcome of the user's visit to the Strava authorization page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationGrant {
    /// Authorization code with an activity read scope
    Granted { code: String },
    /// The user unchecked the activity scope
    Refused { scope: String },
}

impl AuthorizationGrant {
    /// Check that the granted scopes allow reading activities.
    pub fn from_redirect(code: &str, scope: &str) -> Self {
        let readable = scope
            .split(',')
            .any(|s| s == "activity:read" || s == "activity:read_all");
        if readable {
            AuthorizationGrant::Granted {
                code: code.to_string(),
            }
        } else {
            AuthorizationGrant::Refused {
                scope: scope.to_string(),
            }
        }
    }

    /// Text shown in the browser.
    fn message(&self) -> &'static str {
        match self {
            AuthorizationGrant::Granted { .. } => {
                "L'accès a vos activités a bien été donné.\nVous pouvez fermer cette page."
            }
            AuthorizationGrant::Refused { .. } => {
                "ERREUR: Vous n'avez pas donné accès à vos activités."
            }
        }
    }
}

/// Query parameters of the OAuth redirect.
#[derive(Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    scope: Option<String>,
}

type GrantSender = Arc<Mutex<Option<oneshot::Sender<AuthorizationGrant>>>>;

/// Router delivering the first grant through `sender`.
pub fn callback_router(sender: oneshot::Sender<AuthorizationGrant>) -> Router {
    let sender: GrantSender = Arc::new(Mutex::new(Some(sender)));
    Router::new().route("/", get(auth_callback)).with_state(sender)
}

async fn auth_callback(
    State(sender): State<GrantSender>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<CallbackParams>,
) -> String {
    let (Some(code), Some(scope)) = (params.code, params.scope) else {
        // Not a redirect (favicon, manual visit)
        return format!("URL={}", uri);
    };

    let grant = AuthorizationGrant::from_redirect(&code, &scope);
    let message = grant.message();

    let pending = sender.lock().ok().and_then(|mut guard| guard.take());
    match pending {
        Some(tx) => {
            tracing::info!(
                granted = matches!(grant, AuthorizationGrant::Granted { .. }),
                "OAuth redirect received"
            );
            let _ = tx.send(grant);
        }
        None => tracing::debug!("Ignoring repeated OAuth redirect"),
    }

    message.to_string()
}

/// Listen on `port` until Strava redirects back, and return the code.
pub async fn wait_for_code(port: u16) -> Result<String> {
    let (grant_tx, grant_rx) = oneshot::channel();
    let (done_tx, done_rx) = oneshot::channel::<()>();

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        SyncError::Internal(anyhow::anyhow!("Cannot listen on {}: {}", addr, e))
    })?;
    tracing::info!(address = %addr, "Waiting for Strava authorization");

    let app = callback_router(grant_tx);
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = done_rx.await;
            })
            .await
    });

    let grant = grant_rx.await.map_err(|_| {
        SyncError::Internal(anyhow::anyhow!("OAuth listener stopped before a code arrived"))
    });
    let _ = done_tx.send(());
    if tokio::time::timeout(std::time::Duration::from_secs(SHUTDOWN_GRACE_SECS), server)
        .await
        .is_err()
    {
        tracing::warn!("OAuth listener did not shut down cleanly");
    }

    match grant? {
        AuthorizationGrant::Granted { code } => Ok(code),
        AuthorizationGrant::Refused { scope } => Err(SyncError::StravaApi(format!(
            "Authorization refused: granted scope '{}' does not include activity:read",
            scope
        ))),
    }
}
