// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod attendance;
pub mod event;
pub mod finance;
pub mod remark;
pub mod report;
pub mod user;
pub mod whatsapp;

pub use attendance::{
    AttendanceEntry, AttendanceRecord, AttendanceStatus, Holiday, MarkAttendanceRequest,
};
pub use event::{Event, Photo};
pub use finance::{FinanceKind, FinancialRecord};
pub use remark::Remark;
pub use report::{AcademicReport, SubjectMark};
pub use user::{CreateUserRequest, Role, Student, User};
pub use whatsapp::{MessageDirection, WhatsAppMessage, WhatsAppUser};

use serde::{de::DeserializeOwned, Serialize};
use validator::Validate;

/// A document in one of the plain CRUD collections (events, photos,
/// remarks, reports, financial records).
///
/// Every record carries audit fields; the access rules decide who may
/// list and write the collection.
pub trait Record: Serialize + DeserializeOwned + Validate + Clone + Send + Sync + 'static {
    /// Firestore collection name.
    const COLLECTION: &'static str;
    /// Roles allowed to create, update and delete.
    const WRITE_ROLES: &'static [Role];
    /// Roles allowed to read every document.
    const READ_ALL_ROLES: &'static [Role];

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);

    /// Roll number of the student this record belongs to, if any.
    ///
    /// Students may read records that carry their own roll number.
    fn student_id(&self) -> Option<&str> {
        None
    }

    /// Recompute fields derived from the rest of the record.
    fn fill_computed(&mut self) {}

    fn set_created(&mut self, by: &str, at: &str);
    fn set_updated(&mut self, by: &str, at: &str);

    /// Carry the creation audit fields over from the stored version.
    fn keep_created_from(&mut self, stored: &Self);
}

/// Implements the id and audit accessors of [`Record`] for a struct with
/// `id`, `created_by`, `created_at`, `updated_by` and `updated_at` fields.
macro_rules! record_audit_fields {
    () => {
        fn id(&self) -> &str {
            &self.id
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }

        fn set_created(&mut self, by: &str, at: &str) {
            self.created_by = by.to_string();
            self.created_at = at.to_string();
            self.updated_by = None;
            self.updated_at = None;
        }

        fn set_updated(&mut self, by: &str, at: &str) {
            self.updated_by = Some(by.to_string());
            self.updated_at = Some(at.to_string());
        }

        fn keep_created_from(&mut self, stored: &Self) {
            self.created_by = stored.created_by.clone();
            self.created_at = stored.created_at.clone();
        }
    };
}

pub(crate) use record_audit_fields;
