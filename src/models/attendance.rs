// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance and holiday models.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

/// Attendance mark for one student on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    /// Student roll number
    #[validate(length(min = 1, max = 32))]
    pub student_id: String,
    pub status: AttendanceStatus,
}

/// Attendance sheet for one class on one date, stored in `attendance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    /// `{class}_{date}`
    #[serde(default)]
    pub id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub class: String,
    pub entries: Vec<AttendanceEntry>,
    pub created_by: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Per-status counts for one sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
}

impl AttendanceRecord {
    /// Document ID for a class/date pair.
    pub fn doc_id(class: &str, date: &str) -> String {
        format!("{}_{}", urlencoding::encode(class), date)
    }

    /// Status recorded for a student, if they appear on the sheet.
    pub fn status_for(&self, student_id: &str) -> Option<AttendanceStatus> {
        self.entries
            .iter()
            .find(|e| e.student_id == student_id)
            .map(|e| e.status)
    }

    pub fn summary(&self) -> AttendanceSummary {
        let mut summary = AttendanceSummary::default();
        for entry in &self.entries {
            match entry.status {
                AttendanceStatus::Present => summary.present += 1,
                AttendanceStatus::Absent => summary.absent += 1,
                AttendanceStatus::Late => summary.late += 1,
            }
        }
        summary
    }
}

/// Body of a mark-attendance call.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    pub date: String,
    #[validate(length(min = 1, max = 32))]
    pub class: String,
    #[validate(length(min = 1), nested)]
    pub entries: Vec<AttendanceEntry>,
}

impl MarkAttendanceRequest {
    /// First roll number that appears more than once, if any.
    pub fn duplicate_student(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(|e| e.student_id.as_str())
            .find(|id| !seen.insert(*id))
    }
}

/// School holiday, stored in `holidays` keyed by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    /// `YYYY-MM-DD`
    pub date: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}
