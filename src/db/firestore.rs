// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users and their student mirror documents
//! - Attendance sheets and holidays
//! - Plain CRUD collections (events, photos, remarks, reports, finance)
//! - WhatsApp message log and contact profiles
//!
//! The same API is served by an in-memory store for tests and local runs.

use crate::db::collections;
use crate::db::memory::MemoryStore;
use crate::error::AppError;
use crate::models::{AttendanceRecord, Holiday, Student, User, WhatsAppMessage, WhatsAppUser};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryStore>),
    Offline,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

fn db_err(e: impl std::fmt::Display) -> AppError {
    AppError::Database(e.to_string())
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // Emulator: unauthenticated connection, no local credential lookup.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a database backed by a process-local in-memory store.
    pub fn new_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            backend: Backend::Memory(store),
        }
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Offline,
        }
    }

    fn offline() -> AppError {
        AppError::Database("Database not connected (offline mode)".to_string())
    }

    // ─── Generic Document Operations ─────────────────────────────

    /// Get a document by ID.
    pub async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collection)
                .obj()
                .one(id)
                .await
                .map_err(db_err),
            Backend::Memory(store) => store.get(collection, id),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Create or overwrite a document.
    pub async fn set_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collection)
                    .document_id(id)
                    .object(doc)
                    .execute()
                    .await
                    .map_err(db_err)?;
                Ok(())
            }
            Backend::Memory(store) => store.set(collection, id, doc),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Delete a document. Missing documents are not an error.
    pub async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(id)
                    .execute()
                    .await
                    .map_err(db_err)?;
                Ok(())
            }
            Backend::Memory(store) => store.delete(collection, id),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// List every document in a collection.
    pub async fn list_docs<T>(&self, collection: &str) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .from(collection)
                .obj()
                .query()
                .await
                .map_err(db_err),
            Backend::Memory(store) => store.list(collection),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// List documents whose string `field` equals `value`.
    pub async fn list_where_eq<T>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => {
                let field = field.to_string();
                let value = value.to_string();
                client
                    .fluent()
                    .select()
                    .from(collection)
                    .filter(move |q| q.for_all([q.field(field.as_str()).eq(value.clone())]))
                    .obj()
                    .query()
                    .await
                    .map_err(db_err)
            }
            Backend::Memory(store) => store.list_where_eq(collection, field, value),
            Backend::Offline => Err(Self::offline()),
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by document ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .get_doc::<User>(collections::USERS, id)
            .await?
            .map(|mut user| {
                user.id = id.to_string();
                user
            }))
    }

    /// Create or update a user (keyed by `user.id`).
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.set_doc(collections::USERS, &user.id, user).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::USERS, id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.list_docs(collections::USERS).await
    }

    /// Find the user document linked to an auth credential.
    pub async fn find_user_by_auth_uid(&self, auth_uid: &str) -> Result<Option<User>, AppError> {
        let mut users: Vec<User> = self
            .list_where_eq(collections::USERS, "authUid", auth_uid)
            .await?;
        if users.len() > 1 {
            tracing::warn!(
                auth_uid,
                count = users.len(),
                "Multiple user documents share one auth UID"
            );
        }
        Ok(users.pop())
    }

    // ─── Student Operations ──────────────────────────────────────

    pub async fn get_student(&self, roll_number: &str) -> Result<Option<Student>, AppError> {
        self.get_doc(collections::STUDENTS, roll_number).await
    }

    /// Create or update a student (keyed by roll number).
    pub async fn upsert_student(&self, student: &Student) -> Result<(), AppError> {
        self.set_doc(collections::STUDENTS, &student.roll_number, student)
            .await
    }

    pub async fn delete_student(&self, roll_number: &str) -> Result<(), AppError> {
        self.delete_doc(collections::STUDENTS, roll_number).await
    }

    pub async fn list_students(&self) -> Result<Vec<Student>, AppError> {
        self.list_docs(collections::STUDENTS).await
    }

    pub async fn list_students_in_class(&self, class: &str) -> Result<Vec<Student>, AppError> {
        self.list_where_eq(collections::STUDENTS, "class", class)
            .await
    }

    // ─── Attendance Operations ───────────────────────────────────

    pub async fn get_attendance(
        &self,
        class: &str,
        date: &str,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        self.get_doc(
            collections::ATTENDANCE,
            &AttendanceRecord::doc_id(class, date),
        )
        .await
    }

    pub async fn set_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        self.set_doc(collections::ATTENDANCE, &record.id, record)
            .await
    }

    /// All sheets for a class, newest date first.
    pub async fn list_attendance_for_class(
        &self,
        class: &str,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let mut records: Vec<AttendanceRecord> = self
            .list_where_eq(collections::ATTENDANCE, "class", class)
            .await?;
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    // ─── Holiday Operations ──────────────────────────────────────

    pub async fn list_holidays(&self) -> Result<Vec<Holiday>, AppError> {
        self.list_docs(collections::HOLIDAYS).await
    }

    pub async fn set_holiday(&self, holiday: &Holiday) -> Result<(), AppError> {
        self.set_doc(collections::HOLIDAYS, &holiday.date, holiday)
            .await
    }

    pub async fn delete_holiday(&self, date: &str) -> Result<(), AppError> {
        self.delete_doc(collections::HOLIDAYS, date).await
    }

    // ─── WhatsApp Operations ─────────────────────────────────────

    pub async fn get_whatsapp_message(&self, id: &str) -> Result<Option<WhatsAppMessage>, AppError> {
        self.get_doc(collections::WHATSAPP_MESSAGES, id).await
    }

    pub async fn set_whatsapp_message(&self, message: &WhatsAppMessage) -> Result<(), AppError> {
        self.set_doc(collections::WHATSAPP_MESSAGES, &message.id, message)
            .await
    }

    pub async fn get_whatsapp_user(&self, phone: &str) -> Result<Option<WhatsAppUser>, AppError> {
        self.get_doc(collections::WHATSAPP_USERS, phone).await
    }

    pub async fn set_whatsapp_user(&self, user: &WhatsAppUser) -> Result<(), AppError> {
        self.set_doc(collections::WHATSAPP_USERS, &user.phone, user)
            .await
    }
}
