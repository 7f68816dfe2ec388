// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WhatsApp message log and contact profiles.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

/// Logged message, stored in `whatsapp_messages` keyed by provider message ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppMessage {
    /// Provider message ID (`wamid.*`)
    pub id: String,
    pub from: String,
    pub to: String,
    pub direction: MessageDirection,
    /// Provider message type ("text", "image", ...)
    pub kind: String,
    /// Text body; empty for non-text messages
    #[serde(default)]
    pub body: String,
    /// Delivery status ("received", "sent", "delivered", "read", "failed")
    pub status: String,
    /// RFC3339
    pub timestamp: String,
}

/// Contact profile, stored in `whatsapp_users` keyed by phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppUser {
    /// Phone number in WhatsApp ID form (digits, country code first)
    pub phone: String,
    #[serde(default)]
    pub name: String,
    /// Linked student roll number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default)]
    pub message_count: u32,
    pub first_seen_at: String,
    pub last_message_at: String,
}

impl WhatsAppUser {
    /// Fresh profile for a number seen for the first time.
    pub fn new(phone: &str, name: &str, now: &str) -> Self {
        Self {
            phone: phone.to_string(),
            name: name.to_string(),
            student_id: None,
            message_count: 0,
            first_seen_at: now.to_string(),
            last_message_at: now.to_string(),
        }
    }

    /// Record an inbound message, keeping the student link intact.
    pub fn touch(&mut self, name: &str, at: &str) {
        if !name.is_empty() {
            self.name = name.to_string();
        }
        self.message_count = self.message_count.saturating_add(1);
        self.last_message_at = at.to_string();
    }
}
