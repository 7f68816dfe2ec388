// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password login and logout.

use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::models::Role;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Session token, also set as the session cookie
    pub token: String,
    pub user_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "\"admin\" | \"teacher\" | \"student\""))]
    pub role: Role,
    pub name: String,
}

/// Verify credentials with the auth store and start a session.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    request.validate()?;

    let uid = state.identity.sign_in(&request.email, &request.password).await?;

    // Students are keyed by roll number, everyone else by auth UID
    let user = match state.db.find_user_by_auth_uid(&uid).await? {
        Some(user) => user,
        None => state.db.get_user(&uid).await?.ok_or_else(|| {
            tracing::warn!(uid = %uid, "Auth account has no user profile");
            AppError::Forbidden("No profile exists for this account".to_string())
        })?,
    };

    if !user.is_active() {
        tracing::warn!(user_id = %user.id, "Login attempt on deactivated account");
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    let token = create_jwt(&user.id, &uid, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax);

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token,
            user_id: user.id.clone(),
            role: user.role,
            name: user.full_name(),
        }),
    ))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Clear the session cookie. Bearer tokens simply expire.
async fn logout(jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(LogoutResponse { success: true }))
}
