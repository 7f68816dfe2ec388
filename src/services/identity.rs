// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth store client (Firebase Authentication).
//!
//! Talks to the Identity Toolkit REST API:
//! - `projects/{project}/accounts` to create accounts (admin)
//! - `projects/{project}/accounts:lookup` / `:delete` (admin)
//! - `accounts:signInWithPassword` for password login (API key)
//!
//! Admin calls authenticate with the service account token from the
//! metadata server; the emulator accepts the literal `owner` token.
//! Provider errors are normalized to `auth/...` codes so the error layer can
//! translate them.

use crate::error::{AppError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
/// Refresh the admin token this long before it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// An account in the auth store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthAccount {
    pub uid: String,
    pub email: String,
}

/// Map an Identity Toolkit error message to an `auth/...` code.
///
/// Messages look like `EMAIL_EXISTS` or `WEAK_PASSWORD : Password should be...`.
pub fn normalize_provider_error(message: &str) -> &'static str {
    let key = message
        .split([' ', ':'])
        .next()
        .unwrap_or_default()
        .trim();

    match key {
        "EMAIL_EXISTS" | "DUPLICATE_EMAIL" => "auth/email-already-exists",
        "INVALID_EMAIL" | "MISSING_EMAIL" => "auth/invalid-email",
        "WEAK_PASSWORD" | "MISSING_PASSWORD" => "auth/weak-password",
        "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => "auth/user-not-found",
        "INVALID_PASSWORD" => "auth/wrong-password",
        "INVALID_LOGIN_CREDENTIALS" => "auth/invalid-credential",
        "USER_DISABLED" => "auth/user-disabled",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "auth/too-many-requests",
        "PERMISSION_DENIED" | "INSUFFICIENT_PERMISSION" => "permission-denied",
        _ => "auth/internal-error",
    }
}

/// Auth store client.
#[derive(Clone)]
pub struct IdentityService {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Http(Arc<IdentityToolkitClient>),
    Memory(Arc<MemoryIdentity>),
}

impl IdentityService {
    /// Production client, or the emulator when `FIREBASE_AUTH_EMULATOR_HOST` is set.
    pub fn new(project_id: &str, api_key: Option<String>) -> anyhow::Result<Self> {
        let client = match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) => {
                tracing::info!(host = %host, "Using Firebase Auth emulator");
                IdentityToolkitClient::new(
                    format!("http://{}/identitytoolkit.googleapis.com", host),
                    project_id,
                    api_key.or_else(|| Some("emulator-key".to_string())),
                    AdminToken::Emulator,
                )?
            }
            Err(_) => IdentityToolkitClient::new(
                IDENTITY_TOOLKIT_URL.to_string(),
                project_id,
                api_key,
                AdminToken::Metadata(RwLock::new(None)),
            )?,
        };

        Ok(Self {
            backend: Backend::Http(Arc::new(client)),
        })
    }

    /// In-memory auth store for tests and local runs.
    pub fn new_memory(store: Arc<MemoryIdentity>) -> Self {
        Self {
            backend: Backend::Memory(store),
        }
    }

    /// Create an email/password account and return its UID.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<String> {
        match &self.backend {
            Backend::Http(client) => client.create_account(email, password, display_name).await,
            Backend::Memory(store) => store.create_account(email, password),
        }
    }

    pub async fn lookup_by_email(&self, email: &str) -> Result<Option<AuthAccount>> {
        match &self.backend {
            Backend::Http(client) => client.lookup_by_email(email).await,
            Backend::Memory(store) => Ok(store.lookup_by_email(email)),
        }
    }

    pub async fn delete_account(&self, uid: &str) -> Result<()> {
        match &self.backend {
            Backend::Http(client) => client.delete_account(uid).await,
            Backend::Memory(store) => store.delete_account(uid),
        }
    }

    /// Verify an email/password pair and return the account UID.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<String> {
        match &self.backend {
            Backend::Http(client) => client.sign_in(email, password).await,
            Backend::Memory(store) => store.sign_in(email, password),
        }
    }
}

// ─── Identity Toolkit REST ───────────────────────────────────────

enum AdminToken {
    Emulator,
    Metadata(RwLock<Option<(String, Instant)>>),
}

struct IdentityToolkitClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    api_key: Option<String>,
    admin_token: AdminToken,
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalIdResponse {
    local_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl IdentityToolkitClient {
    fn new(
        base_url: String,
        project_id: &str,
        api_key: Option<String>,
        admin_token: AdminToken,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url,
            project_id: project_id.to_string(),
            api_key,
            admin_token,
        })
    }

    async fn bearer(&self) -> Result<String> {
        let cache = match &self.admin_token {
            AdminToken::Emulator => return Ok("owner".to_string()),
            AdminToken::Metadata(cache) => cache,
        };

        if let Some((token, expires_at)) = cache.read().await.as_ref() {
            if Instant::now() + TOKEN_EXPIRY_MARGIN < *expires_at {
                return Ok(token.clone());
            }
        }

        let mut guard = cache.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some((token, expires_at)) = guard.as_ref() {
            if Instant::now() + TOKEN_EXPIRY_MARGIN < *expires_at {
                return Ok(token.clone());
            }
        }

        let response = self
            .http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Metadata token request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Metadata token request returned {}",
                response.status()
            )));
        }
        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid metadata token: {}", e)))?;

        let expires_at = Instant::now() + Duration::from_secs(token.expires_in);
        *guard = Some((token.access_token.clone(), expires_at));
        tracing::debug!(expires_in = token.expires_in, "Admin access token refreshed");
        Ok(token.access_token)
    }

    fn admin_url(&self, suffix: &str) -> String {
        format!(
            "{}/v1/projects/{}/accounts{}",
            self.base_url, self.project_id, suffix
        )
    }

    async fn admin_post<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let token = self.bearer().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Identity Toolkit request failed");
                AppError::identity("unavailable")
            })?;
        check_response_json(response).await
    }

    async fn create_account(&self, email: &str, password: &str, display_name: &str) -> Result<String> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "displayName": display_name,
            "emailVerified": false,
            "disabled": false,
        });
        let created: LocalIdResponse = self.admin_post(&self.admin_url(""), &body).await?;
        Ok(created.local_id)
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Option<AuthAccount>> {
        let body = serde_json::json!({ "email": [email] });
        let found: LookupResponse = self.admin_post(&self.admin_url(":lookup"), &body).await?;
        Ok(found.users.into_iter().next().map(|u| AuthAccount {
            uid: u.local_id,
            email: u.email,
        }))
    }

    async fn delete_account(&self, uid: &str) -> Result<()> {
        let body = serde_json::json!({ "localId": uid });
        let _: serde_json::Value = self.admin_post(&self.admin_url(":delete"), &body).await?;
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("FIREBASE_API_KEY is not configured"))
        })?;

        let url = format!(
            "{}/v1/accounts:signInWithPassword?key={}",
            self.base_url,
            urlencoding::encode(api_key)
        );
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": false,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Sign-in request failed");
                AppError::identity("unavailable")
            })?;
        let signed_in: LocalIdResponse = check_response_json(response).await?;
        Ok(signed_in.local_id)
    }
}

/// Check response status and parse JSON body, normalizing provider errors.
async fn check_response_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or_default();
        let code = normalize_provider_error(&message);
        tracing::warn!(status = %status, provider_message = %message, code, "Identity Toolkit error");
        return Err(AppError::identity(code));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Identity Toolkit JSON parse error: {}", e)))
}

// ─── In-memory auth store ────────────────────────────────────────

struct MemoryAccount {
    uid: String,
    email: String,
    password_sha256: String,
}

/// Process-local auth store.
#[derive(Default)]
pub struct MemoryIdentity {
    /// Keyed by lowercase email
    accounts: DashMap<String, MemoryAccount>,
    fail_deletes: AtomicBool,
}

fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make account deletion fail, to exercise best-effort cleanup paths.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn create_account(&self, email: &str, password: &str) -> Result<String> {
        if !email.contains('@') {
            return Err(AppError::identity("auth/invalid-email"));
        }
        if password.len() < 6 {
            return Err(AppError::identity("auth/weak-password"));
        }

        let key = email.to_lowercase();
        match self.accounts.entry(key) {
            Entry::Occupied(_) => Err(AppError::identity("auth/email-already-exists")),
            Entry::Vacant(slot) => {
                let uid = uuid::Uuid::new_v4().simple().to_string();
                slot.insert(MemoryAccount {
                    uid: uid.clone(),
                    email: email.to_string(),
                    password_sha256: password_digest(password),
                });
                Ok(uid)
            }
        }
    }

    fn lookup_by_email(&self, email: &str) -> Option<AuthAccount> {
        self.accounts
            .get(&email.to_lowercase())
            .map(|account| AuthAccount {
                uid: account.uid.clone(),
                email: account.email.clone(),
            })
    }

    fn delete_account(&self, uid: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::identity("unavailable"));
        }
        let before = self.accounts.len();
        self.accounts.retain(|_, account| account.uid != uid);
        if self.accounts.len() == before {
            return Err(AppError::identity("auth/user-not-found"));
        }
        Ok(())
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<String> {
        self.accounts
            .get(&email.to_lowercase())
            .filter(|account| account.password_sha256 == password_digest(password))
            .map(|account| account.uid.clone())
            .ok_or_else(|| AppError::identity("auth/invalid-credential"))
    }
}
