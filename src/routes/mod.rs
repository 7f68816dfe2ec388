// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP routes.
//!
//! Guests reach `/health`, `/auth/*`, `/public/*` and the WhatsApp webhook.
//! Everything under `/api` needs a session.

pub mod api;
pub mod attendance;
pub mod auth;
pub mod public;
pub mod records;
pub mod webhook;

use crate::config::StoreKind;
use crate::middleware::{auth::require_auth, security::add_security_headers};
use crate::time_utils::format_date;
use crate::AppState;
use axum::extract::State;
use axum::http::{header, request::Parts, HeaderValue, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Development servers for the portal frontend.
const DEV_ORIGINS: &[&str] = &["http://localhost", "http://127.0.0.1"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// "firestore" or "memory"
    pub store: String,
    /// Current date in the school's timezone
    pub school_date: String,
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store = match state.config.store {
        StoreKind::Firestore => "firestore",
        StoreKind::Memory => "memory",
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: store.to_string(),
        school_date: format_date(state.today()),
    })
}

/// The configured frontend, or a local dev server on any port.
fn is_allowed_origin(origin: &str, frontend_url: &str) -> bool {
    if origin == frontend_url.trim_end_matches('/') {
        return true;
    }
    DEV_ORIGINS.iter().any(|dev| {
        origin
            .strip_prefix(dev)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
    })
}

/// Credentialed CORS for the portal frontend. The session cookie rides
/// along, so origins are matched exactly rather than wildcarded.
fn cors_layer(frontend_url: String) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| is_allowed_origin(origin, &frontend_url))
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Routes open to guests and to the WhatsApp provider.
fn guest_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .merge(auth::routes())
        .merge(webhook::routes())
        .merge(public::routes())
}

/// Portal routes for signed-in staff and students.
fn portal_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .merge(api::routes())
        .merge(attendance::routes())
        .merge(records::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(guest_routes())
        .merge(portal_routes(&state))
        .layer(middleware::from_fn(add_security_headers))
        .layer(cors_layer(state.config.frontend_url.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
