// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod assessment;
pub mod attendance_policy;
pub mod finance;
pub mod holidays;
pub mod identity;
pub mod sync_check;
pub mod users;
pub mod whatsapp;

pub use attendance_policy::DateRejection;
pub use holidays::HolidayService;
pub use identity::{AuthAccount, IdentityService, MemoryIdentity};
pub use sync_check::SyncReport;
pub use users::{CreatedUser, DeletedUser, UserService};
pub use whatsapp::{WhatsAppClient, WhatsAppRelay};
