// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! School portal backend.
//!
//! Provides the API for user administration, daily attendance with its
//! date policy, school records (events, photos, remarks, reports,
//! finances) and the WhatsApp parent-contact relay.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use chrono::{FixedOffset, NaiveDate};
use config::Config;
use db::FirestoreDb;
use services::attendance_policy::{school_offset, school_today};
use services::{HolidayService, IdentityService, UserService, WhatsAppClient};
use std::time::Duration;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub identity: IdentityService,
    pub users: UserService,
    pub holidays: HolidayService,
    pub whatsapp: WhatsAppClient,
}

impl AppState {
    pub fn new(
        config: Config,
        db: FirestoreDb,
        identity: IdentityService,
        whatsapp: WhatsAppClient,
    ) -> Self {
        let users = UserService::new(db.clone(), identity.clone());
        let holidays = HolidayService::new(
            db.clone(),
            Duration::from_secs(config.holiday_cache_ttl_secs),
        );
        Self {
            config,
            db,
            identity,
            users,
            holidays,
            whatsapp,
        }
    }

    /// Today's calendar date in the school's timezone.
    pub fn today(&self) -> NaiveDate {
        school_today(self.config.school_utc_offset_minutes)
    }

    pub fn offset(&self) -> FixedOffset {
        school_offset(self.config.school_utc_offset_minutes)
    }
}
