// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use school_portal::config::Config;
use school_portal::db::{FirestoreDb, MemoryStore};
use school_portal::middleware::auth::create_jwt;
use school_portal::models::{Role, Student, User};
use school_portal::routes::create_router;
use school_portal::services::{IdentityService, MemoryIdentity, WhatsAppClient};
use school_portal::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Router plus handles on the in-memory backends behind it.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub identity: Arc<MemoryIdentity>,
}

/// Create a test app backed by in-memory stores.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let identity = Arc::new(MemoryIdentity::new());

    let whatsapp = WhatsAppClient::new(
        &config.whatsapp_api_version,
        &config.whatsapp_phone_number_id,
        config.whatsapp_access_token.clone(),
    )
    .expect("Failed to build WhatsApp client");

    let state = Arc::new(AppState::new(
        config,
        FirestoreDb::new_memory(store.clone()),
        IdentityService::new_memory(identity.clone()),
        whatsapp,
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        identity,
    }
}

#[allow(dead_code)]
impl TestApp {
    /// Insert a user document directly and return a session token for it.
    pub async fn seed_user(&self, id: &str, role: Role) -> String {
        let user = User {
            id: id.to_string(),
            first_name: "Test".to_string(),
            last_name: role.as_str().to_string(),
            email: format!("{}@school.test", id),
            role,
            roll_number: (role == Role::Student).then(|| id.to_string()),
            class: (role == Role::Student).then(|| "5A".to_string()),
            is_active: None,
            auth_uid: Some(format!("uid-{}", id)),
            created_at: "2026-01-05T09:00:00Z".to_string(),
            created_by: None,
        };
        self.state.db.upsert_user(&user).await.unwrap();
        self.token_for(id)
    }

    /// Insert a student mirror document.
    pub async fn seed_student(&self, roll: &str, class: &str) {
        self.state
            .db
            .upsert_student(&Student {
                id: roll.to_string(),
                first_name: "Stu".to_string(),
                last_name: roll.to_string(),
                class: class.to_string(),
                roll_number: roll.to_string(),
                auth_uid: format!("uid-{}", roll),
                email: format!("{}@school.test", roll),
                created_at: "2026-01-05T09:00:00Z".to_string(),
            })
            .await
            .unwrap();
    }

    /// Session token for a user seeded with [`TestApp::seed_user`].
    pub fn token_for(&self, user_id: &str) -> String {
        let auth_uid = format!("uid-{}", user_id);
        create_jwt(user_id, &auth_uid, &self.state.config.jwt_signing_key).unwrap()
    }

    /// Send a request through a fresh clone of the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Build a request with an optional bearer token and JSON body.
#[allow(dead_code)]
pub fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read a response body as text.
#[allow(dead_code)]
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
