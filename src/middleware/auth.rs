// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{Role, User};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "school_token";

/// Session lifetime.
pub const SESSION_TTL_SECS: usize = 7 * 24 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (`users` document ID)
    pub sub: String,
    /// Identity provider UID the session was issued for
    pub uid: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub auth_uid: String,
}

impl AuthUser {
    /// Load the caller's profile. Deleted or deactivated accounts lose
    /// access even while their token is still valid.
    ///
    /// Roll numbers are reused, so the profile must still belong to the
    /// auth account the token was issued for.
    pub async fn load(&self, db: &FirestoreDb) -> Result<User> {
        let user = db.get_user(&self.user_id).await?.ok_or(AppError::Unauthorized)?;
        // Profiles without `authUid` are keyed by the UID itself
        let owner = user.auth_uid.as_deref().unwrap_or(&user.id);
        if owner != self.auth_uid {
            tracing::warn!(
                user_id = %self.user_id,
                "Session belongs to a different auth account"
            );
            return Err(AppError::Unauthorized);
        }
        if !user.is_active() {
            return Err(AppError::Forbidden("Account is deactivated".to_string()));
        }
        Ok(user)
    }

    /// Load the caller's profile and require one of `roles`.
    pub async fn require_role(&self, db: &FirestoreDb, roles: &[Role]) -> Result<User> {
        let user = self.load(db).await?;
        if !roles.contains(&user.role) {
            tracing::warn!(
                user_id = %user.id,
                role = %user.role,
                "Caller lacks required role"
            );
            return Err(AppError::Forbidden(format!(
                "Requires role: {}",
                roles.iter().map(Role::as_str).collect::<Vec<_>>().join(" or ")
            )));
        }
        Ok(user)
    }
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, StatusCode> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(t) => t.to_string(),
            None => return Err(StatusCode::UNAUTHORIZED),
        }
    };

    let key = DecodingKey::from_secret(&state.config.jwt_signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data =
        decode::<Claims>(&token, &key, &validation).map_err(|_| StatusCode::UNAUTHORIZED)?;

    let claims = token_data.claims;
    if claims.sub.is_empty() || claims.uid.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let auth_user = AuthUser {
        user_id: claims.sub,
        auth_uid: claims.uid,
    };
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Create a JWT for a user session.
pub fn create_jwt(user_id: &str, auth_uid: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        uid: auth_uid.to_string(),
        iat: now,
        exp: now + SESSION_TTL_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
