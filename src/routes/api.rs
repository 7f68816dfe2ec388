// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{CreateUserRequest, Role, Student, User, WhatsAppUser};
use crate::services::assessment::{score_mchat, Answer, MchatResult, MCHAT_QUESTIONS};
use crate::services::sync_check::{sync_report, SyncReport};
use crate::services::{CreatedUser, DeletedUser};
use crate::time_utils::format_display;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{id}", delete(delete_user))
        .route("/api/students", get(list_students))
        .route("/api/admin/sync-report", get(get_sync_report))
        .route(
            "/api/assessments/mchat",
            get(get_mchat_questions).post(submit_mchat),
        )
        .route("/api/whatsapp/users", get(list_whatsapp_users))
        .route(
            "/api/whatsapp/users/{phone}/student",
            put(link_whatsapp_user),
        )
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub role: Role,
    pub roll_number: Option<String>,
    pub class: Option<String>,
    /// Account creation time in the school's timezone
    pub member_since: String,
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let user = auth.load(&state.db).await?;

    Ok(Json(MeResponse {
        member_since: format_display(&user.created_at, state.offset()),
        id: user.id,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
        role: user.role,
        roll_number: user.roll_number,
        class: user.class,
    }))
}

// ─── User Administration ─────────────────────────────────────

async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<User>>> {
    state.users.require_admin(&auth.user_id).await?;
    Ok(Json(state.db.list_users().await?))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreatedUser>)> {
    let caller = state.users.require_admin(&auth.user_id).await?;
    let created = state.users.create_user(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<DeletedUser>> {
    let caller = state.users.require_admin(&auth.user_id).await?;
    Ok(Json(state.users.delete_user_completely(&caller, &id).await?))
}

#[derive(Deserialize)]
struct StudentsQuery {
    class: Option<String>,
}

/// Student roster, optionally for one class.
async fn list_students(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<StudentsQuery>,
) -> Result<Json<Vec<Student>>> {
    auth.require_role(&state.db, &[Role::Admin, Role::Teacher])
        .await?;

    let mut students = match params.class.as_deref().map(str::trim) {
        Some(class) if !class.is_empty() => state.db.list_students_in_class(class).await?,
        _ => state.db.list_students().await?,
    };
    students.sort_by(|a, b| {
        a.class
            .cmp(&b.class)
            .then_with(|| a.roll_number.cmp(&b.roll_number))
    });
    Ok(Json(students))
}

/// Drift between `users` and `students`. Read-only.
async fn get_sync_report(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SyncReport>> {
    auth.require_role(&state.db, &[Role::Admin]).await?;
    Ok(Json(sync_report(&state.db).await?))
}

// ─── Assessments ─────────────────────────────────────────────

#[derive(Serialize)]
pub struct MchatQuestions {
    pub questions: &'static [&'static str],
}

async fn get_mchat_questions() -> Json<MchatQuestions> {
    Json(MchatQuestions {
        questions: &MCHAT_QUESTIONS,
    })
}

#[derive(Deserialize)]
pub struct MchatSubmission {
    pub answers: Vec<Answer>,
}

async fn submit_mchat(
    Extension(auth): Extension<AuthUser>,
    Json(submission): Json<MchatSubmission>,
) -> Result<Json<MchatResult>> {
    let result =
        score_mchat(&submission.answers).map_err(|e| AppError::BadRequest(e.to_string()))?;
    tracing::info!(
        user_id = %auth.user_id,
        score = result.score,
        risk = ?result.risk,
        "M-CHAT screening scored"
    );
    Ok(Json(result))
}

// ─── WhatsApp Contacts ───────────────────────────────────────

async fn list_whatsapp_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<WhatsAppUser>>> {
    auth.require_role(&state.db, &[Role::Admin]).await?;
    let mut contacts: Vec<WhatsAppUser> = state
        .db
        .list_docs(crate::db::collections::WHATSAPP_USERS)
        .await?;
    contacts.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
    Ok(Json(contacts))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStudentRequest {
    /// Roll number to link, or null to unlink
    pub student_id: Option<String>,
}

/// Link a WhatsApp contact to a student so attendance replies work.
async fn link_whatsapp_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(phone): Path<String>,
    Json(request): Json<LinkStudentRequest>,
) -> Result<Json<WhatsAppUser>> {
    let admin = auth.require_role(&state.db, &[Role::Admin]).await?;

    let mut contact = state
        .db
        .get_whatsapp_user(&phone)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("WhatsApp contact {}", phone)))?;

    let student_id = request
        .student_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    if let Some(roll) = student_id.as_deref() {
        if state.db.get_student(roll).await?.is_none() {
            return Err(AppError::NotFound(format!("Student {}", roll)));
        }
    }

    contact.student_id = student_id;
    state.db.set_whatsapp_user(&contact).await?;

    tracing::info!(
        phone = %phone,
        student_id = ?contact.student_id,
        linked_by = %admin.id,
        "WhatsApp contact link updated"
    );
    Ok(Json(contact))
}
