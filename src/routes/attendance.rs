// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance and holiday routes.
//!
//! Teachers are bound by the date policy when marking attendance. Admins
//! may correct any past or present sheet.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{AttendanceRecord, Holiday, MarkAttendanceRequest, Role};
use crate::models::attendance::AttendanceSummary;
use crate::services::DateRejection;
use crate::time_utils::{format_date, now_rfc3339, parse_date};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/attendance",
            get(get_attendance).put(mark_attendance),
        )
        .route("/api/attendance/eligibility", get(get_eligibility))
        .route("/api/holidays", get(list_holidays).post(add_holiday))
        .route("/api/holidays/{date}", delete(remove_holiday))
}

fn parse_date_param(raw: &str) -> Result<NaiveDate> {
    parse_date(raw)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid date '{}': expected YYYY-MM-DD", raw)))
}

// ─── Eligibility ─────────────────────────────────────────────

#[derive(Deserialize)]
struct EligibilityQuery {
    date: String,
}

#[derive(Serialize)]
pub struct EligibilityResponse {
    pub date: String,
    pub allowed: bool,
    /// Machine-readable rejection reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DateRejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Whether attendance may be entered for a date, and why not.
async fn get_eligibility(
    State(state): State<Arc<AppState>>,
    Extension(_auth): Extension<AuthUser>,
    Query(params): Query<EligibilityQuery>,
) -> Result<Json<EligibilityResponse>> {
    let date = parse_date_param(&params.date)?;
    let rejection = state.holidays.eligibility(date, state.today()).await?;

    Ok(Json(EligibilityResponse {
        date: format_date(date),
        allowed: rejection.is_none(),
        message: rejection.map(|r| r.to_string()),
        reason: rejection,
    }))
}

// ─── Attendance Sheets ───────────────────────────────────────

#[derive(Deserialize)]
struct AttendanceQuery {
    date: String,
    class: String,
}

#[derive(Serialize)]
pub struct AttendanceResponse {
    /// `None` when no sheet exists yet for the class and date
    pub record: Option<AttendanceRecord>,
    pub summary: AttendanceSummary,
}

/// Fetch one class sheet. Students only see their own entry.
async fn get_attendance(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<AttendanceQuery>,
) -> Result<Json<AttendanceResponse>> {
    let user = auth.load(&state.db).await?;
    let date = format_date(parse_date_param(&params.date)?);
    let class = params.class.trim();

    let mut record = state.db.get_attendance(class, &date).await?;

    if user.role == Role::Student {
        if user.class.as_deref() != Some(class) {
            return Err(AppError::Forbidden(
                "Students may only view their own class".to_string(),
            ));
        }
        let roll = user.roll_number.unwrap_or_default();
        if let Some(record) = record.as_mut() {
            record.entries.retain(|e| e.student_id == roll);
        }
    }

    let summary = record.as_ref().map(|r| r.summary()).unwrap_or_default();
    Ok(Json(AttendanceResponse { record, summary }))
}

/// Create or replace the sheet for a class and date.
async fn mark_attendance(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<MarkAttendanceRequest>,
) -> Result<Json<AttendanceRecord>> {
    let user = auth
        .require_role(&state.db, &[Role::Admin, Role::Teacher])
        .await?;

    request.validate()?;
    if let Some(dup) = request.duplicate_student() {
        return Err(AppError::BadRequest(format!(
            "Student {} appears more than once",
            dup
        )));
    }

    let date = parse_date_param(&request.date)?;
    let today = state.today();
    if user.is_admin() {
        if let Some(rejection) = state.holidays.eligibility(date, today).await? {
            tracing::info!(
                user_id = %user.id,
                date = %date,
                reason = %rejection,
                "Admin override of attendance date policy"
            );
        }
        if date > today {
            return Err(AppError::DateNotAllowed(DateRejection::FutureDate));
        }
    } else {
        state.holidays.ensure_allowed(date, today).await?;
    }

    let class = request.class.trim().to_string();
    let date = format_date(date);
    let now = now_rfc3339();

    let record = match state.db.get_attendance(&class, &date).await? {
        Some(existing) => AttendanceRecord {
            entries: request.entries,
            updated_by: Some(user.id.clone()),
            updated_at: Some(now),
            ..existing
        },
        None => AttendanceRecord {
            id: AttendanceRecord::doc_id(&class, &date),
            date,
            class,
            entries: request.entries,
            created_by: user.id.clone(),
            created_at: now,
            updated_by: None,
            updated_at: None,
        },
    };

    state.db.set_attendance(&record).await?;

    let summary = record.summary();
    tracing::info!(
        user_id = %user.id,
        class = %record.class,
        date = %record.date,
        present = summary.present,
        absent = summary.absent,
        late = summary.late,
        "Attendance saved"
    );
    Ok(Json(record))
}

// ─── Holidays ────────────────────────────────────────────────

#[derive(Deserialize)]
struct HolidaysQuery {
    year: Option<i32>,
}

async fn list_holidays(
    State(state): State<Arc<AppState>>,
    Extension(_auth): Extension<AuthUser>,
    Query(params): Query<HolidaysQuery>,
) -> Result<Json<Vec<Holiday>>> {
    let year = params.year.unwrap_or_else(|| state.today().year());
    Ok(Json(state.holidays.list_holidays(year).await?))
}

async fn add_holiday(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(holiday): Json<Holiday>,
) -> Result<(StatusCode, Json<Holiday>)> {
    let admin = auth.require_role(&state.db, &[Role::Admin]).await?;
    holiday.validate()?;
    let saved = state.holidays.add_holiday(holiday, &admin.id).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn remove_holiday(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(date): Path<String>,
) -> Result<StatusCode> {
    auth.require_role(&state.db, &[Role::Admin]).await?;
    state.holidays.remove_holiday(&date).await?;
    Ok(StatusCode::NO_CONTENT)
}
