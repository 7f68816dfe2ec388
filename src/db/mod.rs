// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, with an in-memory stand-in).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Student mirror of student-role users (keyed by roll number)
    pub const STUDENTS: &str = "students";
    pub const ATTENDANCE: &str = "attendance";
    pub const HOLIDAYS: &str = "holidays";
    pub const EVENTS: &str = "events";
    pub const PHOTOS: &str = "photos";
    pub const REMARKS: &str = "remarks";
    pub const ACADEMIC_REPORTS: &str = "academicReports";
    pub const FINANCIAL_RECORDS: &str = "financialRecords";
    pub const WHATSAPP_MESSAGES: &str = "whatsapp_messages";
    pub const WHATSAPP_USERS: &str = "whatsapp_users";
}
