// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook routes for WhatsApp Cloud API events.

use crate::services::whatsapp::{verify_signature, WebhookPayload, WhatsAppRelay};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook/whatsapp", get(verify).post(handle_event))
}

/// WhatsApp webhook verification query params.
#[derive(Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
}

/// Verify webhook subscription (GET). The challenge is echoed as plain text.
async fn verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let token_ok = params.verify_token.as_deref() == Some(state.config.whatsapp_verify_token.as_str());

    match (params.mode.as_deref(), params.challenge) {
        (Some("subscribe"), Some(challenge)) if token_ok => {
            tracing::info!("WhatsApp webhook subscription verified");
            (StatusCode::OK, challenge).into_response()
        }
        (mode, _) => {
            tracing::warn!(
                mode = ?mode,
                "Webhook verification failed: invalid token or mode"
            );
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// Handle incoming webhook notifications (POST).
///
/// Anything that passes the signature check gets a 200, even when it
/// cannot be processed, so the provider does not keep retrying.
async fn handle_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = state.config.whatsapp_app_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|h| h.to_str().ok());
        if !verify_signature(secret, &body, signature) {
            tracing::warn!("Security Alert: WhatsApp webhook signature mismatch");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse WhatsApp webhook payload");
            return StatusCode::OK;
        }
    };

    if payload.object != "whatsapp_business_account" {
        tracing::debug!(object = %payload.object, "Ignoring non-WhatsApp webhook object");
        return StatusCode::OK;
    }

    WhatsAppRelay::new(&state.db, &state.whatsapp, state.today())
        .handle(&payload)
        .await;

    StatusCode::OK
}
