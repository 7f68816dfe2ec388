// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Drift report between `users` and `students`.
//!
//! Every student-role user with a roll number should have exactly one
//! `students` document under that roll number. This compares roll numbers
//! on both sides and reports mismatches. It never writes.

use crate::db::FirestoreDb;
use crate::error::Result;
use crate::models::{Role, Student, User};
use futures_util::future::try_join;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Student-role users with a roll number
    pub student_users: usize,
    /// Documents in `students`
    pub student_records: usize,
    /// Roll numbers present in `users` but missing from `students`
    pub users_without_student: Vec<String>,
    /// Roll numbers present in `students` with no student-role user
    pub students_without_user: Vec<String>,
}

impl SyncReport {
    pub fn in_sync(&self) -> bool {
        self.users_without_student.is_empty() && self.students_without_user.is_empty()
    }
}

/// Compare roll numbers between the two collections.
pub fn find_drift(users: &[User], students: &[Student]) -> SyncReport {
    let user_rolls: BTreeSet<&str> = users
        .iter()
        .filter(|u| u.role == Role::Student)
        .filter_map(|u| u.roll_number.as_deref())
        .collect();
    let student_rolls: BTreeSet<&str> = students.iter().map(|s| s.roll_number.as_str()).collect();

    SyncReport {
        student_users: user_rolls.len(),
        student_records: student_rolls.len(),
        users_without_student: user_rolls
            .difference(&student_rolls)
            .map(|r| r.to_string())
            .collect(),
        students_without_user: student_rolls
            .difference(&user_rolls)
            .map(|r| r.to_string())
            .collect(),
    }
}

/// Load both collections and compare them.
pub async fn sync_report(db: &FirestoreDb) -> Result<SyncReport> {
    let (users, students) = try_join(db.list_users(), db.list_students()).await?;
    let report = find_drift(&users, &students);

    if report.in_sync() {
        tracing::info!(
            student_users = report.student_users,
            student_records = report.student_records,
            "Users and students are in sync"
        );
    } else {
        tracing::warn!(
            users_without_student = ?report.users_without_student,
            students_without_user = ?report.students_without_user,
            "Users and students are out of sync"
        );
    }
    Ok(report)
}
