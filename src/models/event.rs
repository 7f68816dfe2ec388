// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! School events and gallery photos.

use super::{record_audit_fields, Record, Role};
use crate::db::collections;
use serde::{Deserialize, Serialize};
use validator::Validate;

fn default_public() -> bool {
    true
}

/// Calendar event, stored in `events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    /// `YYYY-MM-DD`
    #[validate(length(equal = 10))]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Shown on the guest site
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Record for Event {
    const COLLECTION: &'static str = collections::EVENTS;
    const WRITE_ROLES: &'static [Role] = &[Role::Admin];
    const READ_ALL_ROLES: &'static [Role] = &[Role::Admin, Role::Teacher, Role::Student];

    record_audit_fields!();
}

/// Gallery photo, stored in `photos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    #[serde(default)]
    pub id: String,
    #[validate(url)]
    pub url: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub caption: String,
    /// Event this photo was taken at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Record for Photo {
    const COLLECTION: &'static str = collections::PHOTOS;
    const WRITE_ROLES: &'static [Role] = &[Role::Admin, Role::Teacher];
    const READ_ALL_ROLES: &'static [Role] = &[Role::Admin, Role::Teacher, Role::Student];

    record_audit_fields!();
}
