// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Unauthenticated routes for the public website.

use crate::db::collections;
use crate::error::Result;
use crate::models::{Event, Photo};
use crate::AppState;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

const PUBLIC_CACHE_CONTROL: &str = "public, max-age=300";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/public/events", get(public_events))
        .route("/public/gallery", get(public_gallery))
}

/// Event as shown to visitors (no audit fields).
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPhoto {
    pub id: String,
    pub url: String,
    pub caption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

async fn public_events(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let mut events: Vec<PublicEvent> = state
        .db
        .list_docs::<Event>(collections::EVENTS)
        .await?
        .into_iter()
        .filter(|e| e.is_public)
        .map(|e| PublicEvent {
            id: e.id,
            title: e.title,
            description: e.description,
            date: e.date,
            location: e.location,
        })
        .collect();
    events.sort_by(|a, b| a.date.cmp(&b.date));

    Ok(([(header::CACHE_CONTROL, PUBLIC_CACHE_CONTROL)], Json(events)))
}

async fn public_gallery(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let photos: Vec<PublicPhoto> = state
        .db
        .list_docs::<Photo>(collections::PHOTOS)
        .await?
        .into_iter()
        .filter(|p| p.is_public)
        .map(|p| PublicPhoto {
            id: p.id,
            url: p.url,
            caption: p.caption,
            event_id: p.event_id,
        })
        .collect();

    Ok(([(header::CACHE_CONTROL, PUBLIC_CACHE_CONTROL)], Json(photos)))
}
