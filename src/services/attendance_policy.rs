// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance date eligibility.
//!
//! Teachers may enter or edit attendance for a date only if it is:
//! - not in the future,
//! - within the last [`EDIT_WINDOW_DAYS`] days (inclusive),
//! - not a Sunday,
//! - not a registered holiday.
//!
//! Checks run in that order and the first failure wins, so callers always
//! get exactly one reason.

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Offset, Utc, Weekday};
use serde::Serialize;
use std::collections::HashSet;

/// How many days back a teacher may still edit attendance.
pub const EDIT_WINDOW_DAYS: i64 = 3;

/// Why a date was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum DateRejection {
    #[error("Cannot mark attendance for future dates")]
    FutureDate,
    #[error("Attendance can only be edited for the last 3 days")]
    OutsideEditWindow,
    #[error("Attendance cannot be marked on Sundays")]
    Sunday,
    #[error("Attendance cannot be marked on holidays")]
    Holiday,
}

/// Check whether attendance may be entered for `date`.
pub fn check_date(
    date: NaiveDate,
    today: NaiveDate,
    holidays: &HashSet<NaiveDate>,
) -> Result<(), DateRejection> {
    if date > today {
        return Err(DateRejection::FutureDate);
    }
    if date < today - Duration::days(EDIT_WINDOW_DAYS) {
        return Err(DateRejection::OutsideEditWindow);
    }
    if date.weekday() == Weekday::Sun {
        return Err(DateRejection::Sunday);
    }
    if holidays.contains(&date) {
        return Err(DateRejection::Holiday);
    }
    Ok(())
}

pub fn is_date_allowed(date: NaiveDate, today: NaiveDate, holidays: &HashSet<NaiveDate>) -> bool {
    check_date(date, today, holidays).is_ok()
}

/// Today's date at the school, given its fixed UTC offset in minutes.
pub fn school_today(offset_minutes: i32) -> NaiveDate {
    let offset = school_offset(offset_minutes);
    Utc::now().with_timezone(&offset).date_naive()
}

/// Fixed offset for the school timezone; out-of-range values fall back to UTC.
pub fn school_offset(offset_minutes: i32) -> FixedOffset {
    offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| {
            tracing::warn!(offset_minutes, "Invalid school UTC offset, using UTC");
            Utc.fix()
        })
}
