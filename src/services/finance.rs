// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Aggregates over financial records.

use crate::models::{FinanceKind, FinancialRecord};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    pub total_fees: f64,
    pub total_payments: f64,
    pub total_expenses: f64,
    /// Fees not yet paid, across all students
    pub outstanding: f64,
    /// Net income: payments received minus expenses
    pub net: f64,
    /// Per-student balance (fees minus payments), keyed by roll number
    pub balances: BTreeMap<String, f64>,
}

pub fn summarize(records: &[FinancialRecord]) -> FinanceSummary {
    let mut summary = FinanceSummary::default();

    for record in records {
        match record.kind {
            FinanceKind::Fee => summary.total_fees += record.amount,
            FinanceKind::Payment => summary.total_payments += record.amount,
            FinanceKind::Expense => summary.total_expenses += record.amount,
        }

        if let Some(student_id) = record.student_id.as_deref() {
            let balance = summary.balances.entry(student_id.to_string()).or_default();
            match record.kind {
                FinanceKind::Fee => *balance += record.amount,
                FinanceKind::Payment => *balance -= record.amount,
                FinanceKind::Expense => {}
            }
        }
    }

    summary.outstanding = summary.total_fees - summary.total_payments;
    summary.net = summary.total_payments - summary.total_expenses;
    summary
}
