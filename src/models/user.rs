// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User and student models for storage and API.
//!
//! `users` holds every account; `students` mirrors the student-role users,
//! keyed by roll number. Nothing in the store ties the two together, the
//! service layer keeps them in step.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User profile stored in `users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Document ID: roll number for students that have one, else the auth UID
    #[serde(default)]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// UID of the linked auth credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_uid: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Inactive accounts are rejected at login; a missing flag means active.
    pub fn is_active(&self) -> bool {
        self.is_active.unwrap_or(true)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Student record stored in `students`, keyed by roll number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Same as `roll_number`
    #[serde(default)]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub class: String,
    pub roll_number: String,
    pub auth_uid: String,
    pub email: String,
    pub created_at: String,
}

/// Body of the create-user call.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub role: Role,
    #[validate(length(min = 1, max = 32))]
    pub roll_number: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub class: Option<String>,
}

impl CreateUserRequest {
    /// Roll number, ignoring blank strings.
    pub fn roll_number(&self) -> Option<&str> {
        non_blank(self.roll_number.as_deref())
    }

    /// Class, ignoring blank strings.
    pub fn class(&self) -> Option<&str> {
        non_blank(self.class.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
