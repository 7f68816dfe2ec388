// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Teacher remarks about a student.

use super::{record_audit_fields, Record, Role};
use crate::db::collections;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Remark, stored in `remarks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Remark {
    #[serde(default)]
    pub id: String,
    /// Student roll number
    #[validate(length(min = 1, max = 32))]
    pub student_id: String,
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    /// e.g. "behaviour", "academic"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Record for Remark {
    const COLLECTION: &'static str = collections::REMARKS;
    const WRITE_ROLES: &'static [Role] = &[Role::Admin, Role::Teacher];
    const READ_ALL_ROLES: &'static [Role] = &[Role::Admin, Role::Teacher];

    fn student_id(&self) -> Option<&str> {
        Some(&self.student_id)
    }

    record_audit_fields!();
}
