// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Academic reports (per-term marks).

use super::{record_audit_fields, Record, Role};
use crate::db::collections;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_marks"))]
pub struct SubjectMark {
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    pub marks: f64,
    pub max_marks: f64,
}

fn validate_marks(mark: &SubjectMark) -> Result<(), ValidationError> {
    if mark.max_marks <= 0.0 || mark.marks < 0.0 || mark.marks > mark.max_marks {
        return Err(ValidationError::new("marks_out_of_range"));
    }
    Ok(())
}

/// Report card for one student and term, stored in `academicReports`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AcademicReport {
    #[serde(default)]
    pub id: String,
    #[validate(length(min = 1, max = 32))]
    pub student_id: String,
    #[validate(length(min = 1, max = 50))]
    pub term: String,
    #[validate(length(min = 1), nested)]
    pub subjects: Vec<SubjectMark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    /// Derived from `subjects` on every read and write; client values are
    /// overwritten.
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl AcademicReport {
    /// Overall percentage across all subjects, rounded to one decimal.
    pub fn overall_percentage(&self) -> f64 {
        let (marks, max) = self
            .subjects
            .iter()
            .fold((0.0, 0.0), |(m, x), s| (m + s.marks, x + s.max_marks));
        if max <= 0.0 {
            return 0.0;
        }
        (marks / max * 1000.0).round() / 10.0
    }

    /// Letter grade for the overall percentage.
    pub fn letter_grade(&self) -> &'static str {
        match self.overall_percentage() {
            p if p >= 90.0 => "A+",
            p if p >= 80.0 => "A",
            p if p >= 70.0 => "B",
            p if p >= 60.0 => "C",
            p if p >= 50.0 => "D",
            _ => "F",
        }
    }
}

impl Record for AcademicReport {
    const COLLECTION: &'static str = collections::ACADEMIC_REPORTS;
    const WRITE_ROLES: &'static [Role] = &[Role::Admin, Role::Teacher];
    const READ_ALL_ROLES: &'static [Role] = &[Role::Admin, Role::Teacher];

    fn student_id(&self) -> Option<&str> {
        Some(&self.student_id)
    }

    fn fill_computed(&mut self) {
        self.percentage = self.overall_percentage();
        self.grade = self.letter_grade().to_string();
    }

    record_audit_fields!();
}
