// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! School Portal API Server
//!
//! Backend for school administration: accounts, attendance, records and
//! the WhatsApp parent-contact relay.

use school_portal::{
    config::{Config, StoreKind},
    db::{FirestoreDb, MemoryStore},
    services::{IdentityService, MemoryIdentity, WhatsAppClient},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, store = ?config.store, "Starting School Portal API");

    let (db, identity) = match config.store {
        StoreKind::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            let identity =
                IdentityService::new(&config.gcp_project_id, config.firebase_api_key.clone())?;
            (db, identity)
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            (
                FirestoreDb::new_memory(Arc::new(MemoryStore::new())),
                IdentityService::new_memory(Arc::new(MemoryIdentity::new())),
            )
        }
    };

    let whatsapp = WhatsAppClient::new(
        &config.whatsapp_api_version,
        &config.whatsapp_phone_number_id,
        config.whatsapp_access_token.clone(),
    )?;
    if !whatsapp.is_enabled() {
        tracing::warn!("WhatsApp access token not configured; replies will not be sent");
    }
    if config.whatsapp_app_secret.is_none() {
        tracing::warn!("WHATSAPP_APP_SECRET not set; webhook signatures are not verified");
    }

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, identity, whatsapp));

    // Build router
    let app = school_portal::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("school_portal=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
