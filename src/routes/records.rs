// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! CRUD routes for the plain record collections.
//!
//! Access is decided per collection by [`Record::WRITE_ROLES`] and
//! [`Record::READ_ALL_ROLES`]. Students outside the read-all roles see
//! only records carrying their own roll number.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    AcademicReport, Event, FinancialRecord, Photo, Record, Remark, Role, User,
};
use crate::services::finance::{summarize, FinanceSummary};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/finance/summary", get(finance_summary))
        .merge(record_routes::<Event>("/api/events"))
        .merge(record_routes::<Photo>("/api/photos"))
        .merge(record_routes::<Remark>("/api/remarks"))
        .merge(record_routes::<AcademicReport>("/api/reports"))
        .merge(record_routes::<FinancialRecord>("/api/finance"))
}

fn record_routes<R: Record>(path: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route(path, get(list_records::<R>).post(create_record::<R>))
        .route(
            &format!("{}/{{id}}", path),
            get(get_record::<R>)
                .put(update_record::<R>)
                .delete(delete_record::<R>),
        )
}

/// How much of a collection the caller may read.
enum ReadScope {
    All,
    /// Only records for this roll number
    Student(String),
}

fn read_scope<R: Record>(user: &User) -> Result<ReadScope> {
    if R::READ_ALL_ROLES.contains(&user.role) {
        return Ok(ReadScope::All);
    }
    match (user.role, user.roll_number.as_deref()) {
        (Role::Student, Some(roll)) => Ok(ReadScope::Student(roll.to_string())),
        _ => Err(AppError::Forbidden(format!(
            "Cannot read {}",
            R::COLLECTION
        ))),
    }
}

async fn require_writer<R: Record>(state: &AppState, auth: &AuthUser) -> Result<User> {
    auth.require_role(&state.db, R::WRITE_ROLES).await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    /// Restrict to one student (staff only; students are always restricted)
    student_id: Option<String>,
}

async fn list_records<R: Record>(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<R>>> {
    let user = auth.load(&state.db).await?;

    let student_filter = match read_scope::<R>(&user)? {
        ReadScope::Student(roll) => Some(roll),
        ReadScope::All => params.student_id.filter(|s| !s.trim().is_empty()),
    };

    let records = match student_filter {
        Some(roll) => {
            state
                .db
                .list_where_eq(R::COLLECTION, "studentId", &roll)
                .await?
        }
        None => state.db.list_docs(R::COLLECTION).await?,
    };
    let records = records
        .into_iter()
        .map(|mut record: R| {
            record.fill_computed();
            record
        })
        .collect();
    Ok(Json(records))
}

async fn load_record<R: Record>(state: &AppState, id: &str) -> Result<R> {
    let mut record: R = state
        .db
        .get_doc(R::COLLECTION, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{}/{}", R::COLLECTION, id)))?;
    record.set_id(id.to_string());
    record.fill_computed();
    Ok(record)
}

async fn get_record<R: Record>(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<R>> {
    let user = auth.load(&state.db).await?;
    let scope = read_scope::<R>(&user)?;
    let record = load_record::<R>(&state, &id).await?;

    if let ReadScope::Student(roll) = scope {
        // Indistinguishable from a missing record
        if record.student_id() != Some(roll.as_str()) {
            return Err(AppError::NotFound(format!("{}/{}", R::COLLECTION, id)));
        }
    }
    Ok(Json(record))
}

async fn create_record<R: Record>(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(mut record): Json<R>,
) -> Result<(StatusCode, Json<R>)> {
    let user = require_writer::<R>(&state, &auth).await?;
    record.validate()?;

    let id = uuid::Uuid::new_v4().to_string();
    record.set_id(id.clone());
    record.set_created(&user.id, &now_rfc3339());
    record.fill_computed();
    state.db.set_doc(R::COLLECTION, &id, &record).await?;

    tracing::info!(
        collection = R::COLLECTION,
        id = %id,
        user_id = %user.id,
        "Record created"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_record<R: Record>(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(mut record): Json<R>,
) -> Result<Json<R>> {
    let user = require_writer::<R>(&state, &auth).await?;
    record.validate()?;

    let stored = load_record::<R>(&state, &id).await?;
    record.set_id(id.clone());
    record.keep_created_from(&stored);
    record.set_updated(&user.id, &now_rfc3339());
    record.fill_computed();
    state.db.set_doc(R::COLLECTION, &id, &record).await?;

    tracing::info!(
        collection = R::COLLECTION,
        id = %id,
        user_id = %user.id,
        "Record updated"
    );
    Ok(Json(record))
}

async fn delete_record<R: Record>(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let user = require_writer::<R>(&state, &auth).await?;
    load_record::<R>(&state, &id).await?;
    state.db.delete_doc(R::COLLECTION, &id).await?;

    tracing::info!(
        collection = R::COLLECTION,
        id = %id,
        user_id = %user.id,
        "Record deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Totals and per-student balances across all financial records.
async fn finance_summary(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<FinanceSummary>> {
    auth.require_role(&state.db, &[Role::Admin]).await?;
    let records: Vec<FinancialRecord> = state.db.list_docs(FinancialRecord::COLLECTION).await?;
    Ok(Json(summarize(&records)))
}
