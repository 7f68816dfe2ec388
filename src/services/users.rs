// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User provisioning and removal across the auth store, `users` and `students`.
//!
//! Creation writes the auth credential, then `users`, then (for students
//! with a class and roll number) `students`. Deletion removes the `users`
//! document and then cleans up the student mirror and the auth credential
//! on a best-effort basis. None of this is transactional: a failure part
//! way through leaves the collections out of step, which the sync report
//! in [`crate::services::sync_check`] detects.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{CreateUserRequest, Role, Student, User};
use crate::services::identity::IdentityService;
use crate::time_utils::now_rfc3339;
use serde::Serialize;
use validator::Validate;

/// Result of a create-user call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    pub success: bool,
    /// Auth store UID
    pub uid: String,
    /// `users` document ID
    pub doc_id: String,
    pub student_created: bool,
}

/// Result of a delete-user-completely call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedUser {
    pub success: bool,
    pub student_deleted: bool,
    pub auth_deleted: bool,
}

#[derive(Clone)]
pub struct UserService {
    db: FirestoreDb,
    identity: IdentityService,
}

impl UserService {
    pub fn new(db: FirestoreDb, identity: IdentityService) -> Self {
        Self { db, identity }
    }

    /// Load the caller's own user document and require `role=admin`.
    pub async fn require_admin(&self, caller_id: &str) -> Result<User> {
        let caller = self
            .db
            .get_user(caller_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("Caller has no user record".to_string()))?;

        if !caller.is_admin() {
            tracing::warn!(caller = caller_id, role = %caller.role, "Non-admin attempted admin operation");
            return Err(AppError::Forbidden("Admin role required".to_string()));
        }
        Ok(caller)
    }

    /// Create an auth account plus its `users` (and, for students, `students`) documents.
    pub async fn create_user(&self, caller: &User, request: CreateUserRequest) -> Result<CreatedUser> {
        request.validate()?;

        let roll_number = request.roll_number().map(str::to_string);
        let class = request.class().map(str::to_string);
        let display_name = format!("{} {}", request.first_name.trim(), request.last_name.trim());

        let uid = self
            .identity
            .create_account(&request.email, &request.password, &display_name)
            .await?;

        let doc_id = match (&request.role, &roll_number) {
            (Role::Student, Some(roll)) => roll.clone(),
            _ => uid.clone(),
        };

        if self.db.get_user(&doc_id).await?.is_some() {
            tracing::warn!(doc_id = %doc_id, "Overwriting existing user document");
        }

        let now = now_rfc3339();
        let user = User {
            id: doc_id.clone(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email: request.email.clone(),
            role: request.role,
            roll_number: roll_number.clone(),
            class: class.clone(),
            is_active: Some(true),
            auth_uid: Some(uid.clone()),
            created_at: now.clone(),
            created_by: Some(caller.id.clone()),
        };

        if let Err(e) = self.db.upsert_user(&user).await {
            tracing::error!(uid = %uid, doc_id = %doc_id, error = %e, "Auth account created but user document write failed");
            return Err(e);
        }

        let student_created = match (request.role, roll_number, class) {
            (Role::Student, Some(roll_number), Some(class)) => {
                let student = Student {
                    id: roll_number.clone(),
                    first_name: user.first_name.clone(),
                    last_name: user.last_name.clone(),
                    class,
                    roll_number,
                    auth_uid: uid.clone(),
                    email: user.email.clone(),
                    created_at: now,
                };
                if let Err(e) = self.db.upsert_student(&student).await {
                    tracing::error!(doc_id = %doc_id, error = %e, "User document written but student document write failed");
                    return Err(e);
                }
                true
            }
            (Role::Student, _, _) => {
                tracing::warn!(doc_id = %doc_id, "Student created without class or roll number, no student record written");
                false
            }
            _ => false,
        };

        tracing::info!(
            uid = %uid,
            doc_id = %doc_id,
            role = %user.role,
            student_created,
            created_by = %caller.id,
            "User created"
        );

        Ok(CreatedUser {
            success: true,
            uid,
            doc_id,
            student_created,
        })
    }

    /// Delete a user document, then its student record and auth credential.
    ///
    /// Only the `users` deletion can fail the call; the follow-up cleanups are
    /// logged and reported in the result flags.
    pub async fn delete_user_completely(&self, caller: &User, user_id: &str) -> Result<DeletedUser> {
        if caller.id == user_id {
            return Err(AppError::BadRequest(
                "Admins cannot delete their own account".to_string(),
            ));
        }

        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        self.db.delete_user(user_id).await?;
        tracing::info!(user_id, deleted_by = %caller.id, "User document deleted");

        let student_deleted = match (user.role, user.roll_number.as_deref()) {
            (Role::Student, Some(roll_number)) => {
                match self.db.delete_student(roll_number).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(user_id, roll_number, error = %e, "Failed to delete student record");
                        false
                    }
                }
            }
            _ => false,
        };

        let auth_deleted = self.delete_auth_by_email(&user.email).await;

        Ok(DeletedUser {
            success: true,
            student_deleted,
            auth_deleted,
        })
    }

    /// Best-effort removal of the auth credential registered to `email`.
    async fn delete_auth_by_email(&self, email: &str) -> bool {
        let account = match self.identity.lookup_by_email(email).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                tracing::info!(email, "No auth account for deleted user");
                return false;
            }
            Err(e) => {
                tracing::warn!(email, error = %e, "Failed to look up auth account");
                return false;
            }
        };

        match self.identity.delete_account(&account.uid).await {
            Ok(()) => {
                tracing::info!(uid = %account.uid, "Auth account deleted");
                true
            }
            Err(e) => {
                tracing::warn!(uid = %account.uid, error = %e, "Failed to delete auth account");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{collections, MemoryStore};
    use crate::services::identity::MemoryIdentity;
    use std::sync::Arc;

    struct Fixture {
        service: UserService,
        db: FirestoreDb,
        store: Arc<MemoryStore>,
        auth: Arc<MemoryIdentity>,
        admin: User,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let auth = Arc::new(MemoryIdentity::new());
        let db = FirestoreDb::new_memory(store.clone());
        let service = UserService::new(db.clone(), IdentityService::new_memory(auth.clone()));

        let admin = User {
            id: "admin-1".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Admin".to_string(),
            email: "admin@example.com".to_string(),
            role: Role::Admin,
            roll_number: None,
            class: None,
            is_active: Some(true),
            auth_uid: Some("admin-uid".to_string()),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            created_by: None,
        };
        db.upsert_user(&admin).await.unwrap();

        Fixture {
            service,
            db,
            store,
            auth,
            admin,
        }
    }

    fn request(role: Role, roll: Option<&str>, class: Option<&str>) -> CreateUserRequest {
        CreateUserRequest {
            email: format!("{}@example.com", roll.unwrap_or("staff")),
            password: "secret123".to_string(),
            first_name: "Ravi".to_string(),
            last_name: "Kumar".to_string(),
            role,
            roll_number: roll.map(str::to_string),
            class: class.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_student_with_class_and_roll_gets_both_documents() {
        let f = fixture().await;
        let created = f
            .service
            .create_user(&f.admin, request(Role::Student, Some("R-17"), Some("5A")))
            .await
            .unwrap();

        assert_eq!(created.doc_id, "R-17");
        assert!(created.student_created);

        let user = f.db.get_user("R-17").await.unwrap().unwrap();
        let student = f.db.get_student("R-17").await.unwrap().unwrap();
        assert_eq!(user.auth_uid.as_deref(), Some(created.uid.as_str()));
        assert_eq!(user.created_by.as_deref(), Some("admin-1"));
        assert_eq!(student.class, "5A");
        assert_eq!(student.auth_uid, created.uid);
    }

    #[tokio::test]
    async fn test_student_missing_class_gets_only_user_document() {
        let f = fixture().await;
        let created = f
            .service
            .create_user(&f.admin, request(Role::Student, Some("R-18"), None))
            .await
            .unwrap();

        assert!(!created.student_created);
        assert!(f.db.get_user("R-18").await.unwrap().is_some());
        assert_eq!(f.store.count(collections::STUDENTS), 0);
    }

    #[tokio::test]
    async fn test_student_missing_roll_is_keyed_by_uid() {
        let f = fixture().await;
        let created = f
            .service
            .create_user(&f.admin, request(Role::Student, None, Some("5A")))
            .await
            .unwrap();

        assert_eq!(created.doc_id, created.uid);
        assert!(!created.student_created);
        assert_eq!(f.store.count(collections::STUDENTS), 0);
    }

    #[tokio::test]
    async fn test_teacher_keyed_by_uid_even_with_roll() {
        let f = fixture().await;
        let created = f
            .service
            .create_user(&f.admin, request(Role::Teacher, Some("T-1"), Some("5A")))
            .await
            .unwrap();

        assert_eq!(created.doc_id, created.uid);
        assert!(!created.student_created);
        assert_eq!(f.store.count(collections::STUDENTS), 0);
    }

    #[tokio::test]
    async fn test_duplicate_email_writes_nothing() {
        let f = fixture().await;
        f.service
            .create_user(&f.admin, request(Role::Student, Some("R-1"), Some("5A")))
            .await
            .unwrap();

        let mut again = request(Role::Student, Some("R-2"), Some("5A"));
        again.email = "R-1@example.com".to_string();
        let err = f.service.create_user(&f.admin, again).await.unwrap_err();

        assert_eq!(err.identity_code(), Some("auth/email-already-exists"));
        assert!(f.db.get_user("R-2").await.unwrap().is_none());
        assert!(f.db.get_student("R-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_student_write_leaves_user_behind() {
        let f = fixture().await;
        f.store.fail_writes_to(collections::STUDENTS);

        let err = f
            .service
            .create_user(&f.admin, request(Role::Student, Some("R-5"), Some("5A")))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        assert!(f.db.get_user("R-5").await.unwrap().is_some());
        assert!(f.db.get_student("R-5").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_user_student_and_auth() {
        let f = fixture().await;
        f.service
            .create_user(&f.admin, request(Role::Student, Some("R-17"), Some("5A")))
            .await
            .unwrap();
        assert_eq!(f.auth.len(), 1);

        let deleted = f.service.delete_user_completely(&f.admin, "R-17").await.unwrap();

        assert_eq!(
            deleted,
            DeletedUser {
                success: true,
                student_deleted: true,
                auth_deleted: true
            }
        );
        assert!(f.db.get_user("R-17").await.unwrap().is_none());
        assert!(f.db.get_student("R-17").await.unwrap().is_none());
        assert!(f.auth.is_empty());
    }

    #[tokio::test]
    async fn test_student_delete_failure_does_not_roll_back_user_delete() {
        let f = fixture().await;
        f.service
            .create_user(&f.admin, request(Role::Student, Some("R-17"), Some("5A")))
            .await
            .unwrap();
        f.store.fail_deletes_in(collections::STUDENTS);
        f.auth.set_fail_deletes(true);

        let deleted = f.service.delete_user_completely(&f.admin, "R-17").await.unwrap();

        assert!(deleted.success);
        assert!(!deleted.student_deleted);
        assert!(!deleted.auth_deleted);
        assert!(f.db.get_user("R-17").await.unwrap().is_none());
        assert!(f.db.get_student("R-17").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_missing_user_is_not_found() {
        let f = fixture().await;
        let err = f
            .service
            .delete_user_completely(&f.admin, "nobody")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let f = fixture().await;
        let err = f
            .service
            .delete_user_completely(&f.admin, "admin-1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(f.db.get_user("admin-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_require_admin() {
        let f = fixture().await;
        assert!(f.service.require_admin("admin-1").await.is_ok());

        let created = f
            .service
            .create_user(&f.admin, request(Role::Teacher, None, None))
            .await
            .unwrap();
        let err = f.service.require_admin(&created.doc_id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = f.service.require_admin("ghost").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
