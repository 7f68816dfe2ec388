// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Financial records (fees, payments, expenses).

use super::{record_audit_fields, Record, Role};
use crate::db::collections;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinanceKind {
    /// Amount owed by a student
    Fee,
    /// Amount paid by a student
    Payment,
    /// School expenditure
    Expense,
}

/// Financial record, stored in `financialRecords`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FinancialRecord {
    #[serde(default)]
    pub id: String,
    /// Roll number for fees and payments; absent for school expenses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub kind: FinanceKind,
    #[validate(range(min = 0.0))]
    pub amount: f64,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    /// `YYYY-MM-DD`
    #[validate(length(equal = 10))]
    pub date: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Record for FinancialRecord {
    const COLLECTION: &'static str = collections::FINANCIAL_RECORDS;
    const WRITE_ROLES: &'static [Role] = &[Role::Admin];
    const READ_ALL_ROLES: &'static [Role] = &[Role::Admin];

    fn student_id(&self) -> Option<&str> {
        self.student_id.as_deref()
    }

    record_audit_fields!();
}
