// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! On Cloud Run, secrets are injected as environment variables through
//! secret bindings, so a single loader covers both local and deployed runs.

use std::env;
use std::str::FromStr;

/// Default WhatsApp Cloud API version segment.
pub const DEFAULT_WHATSAPP_API_VERSION: &str = "v19.0";

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Cloud Firestore (or the emulator when `FIRESTORE_EMULATOR_HOST` is set).
    Firestore,
    /// Process-local in-memory store.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP / Firebase project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Persistence backend
    pub store: StoreKind,
    /// Firebase Web API key, needed for password sign-in
    pub firebase_api_key: Option<String>,
    /// WhatsApp phone number ID used for outbound messages
    pub whatsapp_phone_number_id: String,
    /// WhatsApp Graph API version, e.g. "v19.0"
    pub whatsapp_api_version: String,
    /// School timezone as a fixed offset from UTC, in minutes
    pub school_utc_offset_minutes: i32,
    /// How long a cached holiday set stays fresh
    pub holiday_cache_ttl_secs: u64,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Token echoed back during the WhatsApp webhook handshake
    pub whatsapp_verify_token: String,
    /// App secret for `X-Hub-Signature-256` verification
    pub whatsapp_app_secret: Option<String>,
    /// Bearer token for the WhatsApp Cloud API
    pub whatsapp_access_token: Option<String>,
}

impl Config {
    /// Deterministic configuration for tests.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store: StoreKind::Memory,
            firebase_api_key: None,
            whatsapp_phone_number_id: "1000000001".to_string(),
            whatsapp_api_version: DEFAULT_WHATSAPP_API_VERSION.to_string(),
            school_utc_offset_minutes: 0,
            holiday_cache_ttl_secs: 60,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            whatsapp_verify_token: "test_verify_token".to_string(),
            whatsapp_app_secret: None,
            whatsapp_access_token: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store = match env::var("STORE").as_deref() {
            Ok("memory") => StoreKind::Memory,
            Ok("firestore") | Err(_) => StoreKind::Firestore,
            Ok(_) => return Err(ConfigError::Invalid("STORE")),
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_or("PORT", 8080)?,
            store,
            firebase_api_key: optional("FIREBASE_API_KEY"),
            whatsapp_phone_number_id: env::var("WHATSAPP_PHONE_NUMBER_ID").unwrap_or_default(),
            whatsapp_api_version: env::var("WHATSAPP_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_WHATSAPP_API_VERSION.to_string()),
            school_utc_offset_minutes: parse_or("SCHOOL_UTC_OFFSET_MINUTES", 0)?,
            holiday_cache_ttl_secs: parse_or("HOLIDAY_CACHE_TTL_SECS", 60)?,

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            whatsapp_verify_token: env::var("WHATSAPP_VERIFY_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("WHATSAPP_VERIFY_TOKEN"))?,
            whatsapp_app_secret: optional("WHATSAPP_APP_SECRET"),
            whatsapp_access_token: optional("WHATSAPP_ACCESS_TOKEN"),
        })
    }
}

/// Read a trimmed, non-empty optional variable.
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
