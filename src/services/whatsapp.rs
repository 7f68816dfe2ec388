// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WhatsApp Cloud API relay.
//!
//! Handles:
//! - Webhook signature verification (`X-Hub-Signature-256`)
//! - Parsing inbound message and status notifications
//! - Persisting the message log and contact profiles
//! - Answering simple commands and sending the reply

use crate::db::{collections, FirestoreDb};
use crate::error::{AppError, Result};
use crate::models::{Event, MessageDirection, WhatsAppMessage, WhatsAppUser};
use crate::time_utils::{format_date, now_rfc3339, unix_to_rfc3339};
use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const GRAPH_API_URL: &str = "https://graph.facebook.com";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
/// Upcoming events listed in an `events` reply.
const MAX_EVENTS_IN_REPLY: usize = 3;

// ─── Signature ───────────────────────────────────────────────────

/// Verify a `sha256=<hex>` signature header against the raw request body.
pub fn verify_signature(app_secret: &str, body: &[u8], header: Option<&str>) -> bool {
    let Some(hex_sig) = header.and_then(|h| h.strip_prefix("sha256=")) else {
        return false;
    };
    let Ok(provided) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();

    expected.as_slice().ct_eq(&provided).into()
}

/// Signature header value for a body (used by tests and local tooling).
pub fn sign_body(app_secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

// ─── Webhook payload ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub metadata: Option<PhoneMetadata>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub statuses: Vec<StatusUpdate>,
}

#[derive(Debug, Deserialize)]
pub struct PhoneMetadata {
    #[serde(default)]
    pub display_phone_number: String,
    #[serde(default)]
    pub phone_number_id: String,
}

#[derive(Debug, Deserialize)]
pub struct Contact {
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Deserialize)]
pub struct ContactProfile {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub from: String,
    /// Unix seconds, sent as a string
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextBody>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub id: String,
    pub status: String,
}

impl ChangeValue {
    /// Profile name the provider reported for a sender.
    fn contact_name(&self, wa_id: &str) -> &str {
        self.contacts
            .iter()
            .find(|c| c.wa_id == wa_id)
            .and_then(|c| c.profile.as_ref())
            .map(|p| p.name.as_str())
            .unwrap_or("")
    }

    /// Our business number, as reported in the notification.
    fn business_number(&self) -> &str {
        self.metadata
            .as_ref()
            .map(|m| m.display_phone_number.as_str())
            .unwrap_or("")
    }
}

// ─── Outbound client ─────────────────────────────────────────────

#[derive(Serialize)]
struct SendTextRequest<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: SendTextBody<'a>,
}

#[derive(Serialize)]
struct SendTextBody<'a> {
    preview_url: bool,
    body: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessageId>,
}

#[derive(Deserialize)]
struct SentMessageId {
    id: String,
}

/// WhatsApp Cloud API client.
#[derive(Clone)]
pub struct WhatsAppClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    phone_number_id: String,
    access_token: Option<String>,
}

impl WhatsAppClient {
    pub fn new(
        api_version: &str,
        phone_number_id: &str,
        access_token: Option<String>,
    ) -> anyhow::Result<Self> {
        Self::with_base_url(GRAPH_API_URL, api_version, phone_number_id, access_token)
    }

    pub fn with_base_url(
        base_url: &str,
        api_version: &str,
        phone_number_id: &str,
        access_token: Option<String>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
            phone_number_id: phone_number_id.to_string(),
            access_token,
        })
    }

    /// Sending is disabled when no access token or phone number ID is configured.
    pub fn is_enabled(&self) -> bool {
        self.access_token.is_some() && !self.phone_number_id.is_empty()
    }

    /// Send a text message. Returns the provider message ID, or `None` when
    /// sending is disabled.
    pub async fn send_text(&self, to: &str, body: &str) -> Result<Option<String>> {
        let Some(token) = self.access_token.as_deref().filter(|_| self.is_enabled()) else {
            tracing::debug!(to, "WhatsApp sending disabled, reply not sent");
            return Ok(None);
        };

        let url = format!(
            "{}/{}/{}/messages",
            self.base_url, self.api_version, self.phone_number_id
        );
        let request = SendTextRequest {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to,
            kind: "text",
            text: SendTextBody {
                preview_url: false,
                body,
            },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::WhatsApp(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::WhatsApp(format!("HTTP {}: {}", status, body)));
        }

        let sent: SendResponse = response
            .json()
            .await
            .map_err(|e| AppError::WhatsApp(format!("JSON parse error: {}", e)))?;
        Ok(sent.messages.into_iter().next().map(|m| m.id))
    }
}

// ─── Commands ────────────────────────────────────────────────────

/// What an inbound text asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Attendance,
    Events,
    Other,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "" | "hi" | "hello" | "help" | "menu" | "start" => Command::Help,
            "attendance" | "1" => Command::Attendance,
            "events" | "2" => Command::Events,
            _ => Command::Other,
        }
    }
}

pub const HELP_REPLY: &str = "Welcome to the school assistant. Reply with:\n\
1 or ATTENDANCE - latest attendance for your child\n\
2 or EVENTS - upcoming school events";

pub const ACK_REPLY: &str =
    "Thank you for your message. The school office will get back to you soon. Reply HELP for options.";

pub const NOT_LINKED_REPLY: &str =
    "This number is not linked to a student yet. Please contact the school office.";

/// Outcome of handling one webhook notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelaySummary {
    pub received: u32,
    pub duplicates: u32,
    pub replies_sent: u32,
    pub statuses_updated: u32,
}

/// Persists inbound traffic and answers it.
pub struct WhatsAppRelay<'a> {
    db: &'a FirestoreDb,
    client: &'a WhatsAppClient,
    today: NaiveDate,
}

impl<'a> WhatsAppRelay<'a> {
    pub fn new(db: &'a FirestoreDb, client: &'a WhatsAppClient, today: NaiveDate) -> Self {
        Self { db, client, today }
    }

    /// Process a webhook notification. Individual failures are logged and
    /// skipped so the provider always gets its 200.
    pub async fn handle(&self, payload: &WebhookPayload) -> RelaySummary {
        let mut summary = RelaySummary::default();

        for change in payload.entry.iter().flat_map(|e| e.changes.iter()) {
            if change.field != "messages" {
                tracing::debug!(field = %change.field, "Ignoring webhook change");
                continue;
            }
            let value = &change.value;

            for message in &value.messages {
                match self.handle_message(value, message).await {
                    Ok(MessageOutcome::Duplicate) => summary.duplicates += 1,
                    Ok(MessageOutcome::Received { replied }) => {
                        summary.received += 1;
                        if replied {
                            summary.replies_sent += 1;
                        }
                    }
                    Err(e) => {
                        tracing::error!(message_id = %message.id, error = %e, "Failed to handle WhatsApp message");
                    }
                }
            }

            for status in &value.statuses {
                match self.apply_status(status).await {
                    Ok(true) => summary.statuses_updated += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(message_id = %status.id, error = %e, "Failed to apply status update");
                    }
                }
            }
        }

        tracing::info!(
            received = summary.received,
            duplicates = summary.duplicates,
            replies_sent = summary.replies_sent,
            statuses_updated = summary.statuses_updated,
            "WhatsApp webhook processed"
        );
        summary
    }

    async fn handle_message(
        &self,
        value: &ChangeValue,
        message: &InboundMessage,
    ) -> Result<MessageOutcome> {
        // Provider retries deliver the same message ID again
        if self.db.get_whatsapp_message(&message.id).await?.is_some() {
            tracing::debug!(message_id = %message.id, "Duplicate WhatsApp message");
            return Ok(MessageOutcome::Duplicate);
        }

        let now = now_rfc3339();
        let timestamp = message
            .timestamp
            .parse::<i64>()
            .ok()
            .and_then(unix_to_rfc3339)
            .unwrap_or_else(|| now.clone());
        let text = message
            .text
            .as_ref()
            .map(|t| t.body.clone())
            .unwrap_or_default();

        let name = value.contact_name(&message.from);
        let mut profile = match self.db.get_whatsapp_user(&message.from).await? {
            Some(profile) => profile,
            None => {
                tracing::info!(phone = %message.from, "New WhatsApp contact");
                WhatsAppUser::new(&message.from, name, &now)
            }
        };
        profile.touch(name, &timestamp);
        self.db.set_whatsapp_user(&profile).await?;

        let reply = if message.kind == "text" {
            self.build_reply(&profile, &text).await?
        } else {
            ACK_REPLY.to_string()
        };

        let replied = self.send_and_log(&message.from, value.business_number(), &reply).await;

        // Recorded last: until this write lands, a redelivery is handled
        // again rather than skipped as a duplicate
        self.db
            .set_whatsapp_message(&WhatsAppMessage {
                id: message.id.clone(),
                from: message.from.clone(),
                to: value.business_number().to_string(),
                direction: MessageDirection::Inbound,
                kind: message.kind.clone(),
                body: text,
                status: "received".to_string(),
                timestamp,
            })
            .await?;
        Ok(MessageOutcome::Received { replied })
    }

    /// Send a reply and log it. Failures are logged, not retried.
    async fn send_and_log(&self, to: &str, from: &str, body: &str) -> bool {
        let sent_id = match self.client.send_text(to, body).await {
            Ok(Some(id)) => id,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!(to, error = %e, "Failed to send WhatsApp reply");
                return false;
            }
        };

        let outbound = WhatsAppMessage {
            id: sent_id,
            from: from.to_string(),
            to: to.to_string(),
            direction: MessageDirection::Outbound,
            kind: "text".to_string(),
            body: body.to_string(),
            status: "sent".to_string(),
            timestamp: now_rfc3339(),
        };
        if let Err(e) = self.db.set_whatsapp_message(&outbound).await {
            tracing::warn!(message_id = %outbound.id, error = %e, "Reply sent but not logged");
        }
        true
    }

    async fn apply_status(&self, status: &StatusUpdate) -> Result<bool> {
        let Some(mut message) = self.db.get_whatsapp_message(&status.id).await? else {
            return Ok(false);
        };
        message.status = status.status.clone();
        self.db.set_whatsapp_message(&message).await?;
        Ok(true)
    }

    /// Reply text for an inbound text message.
    pub async fn build_reply(&self, profile: &WhatsAppUser, text: &str) -> Result<String> {
        match Command::parse(text) {
            Command::Help => Ok(HELP_REPLY.to_string()),
            Command::Other => Ok(ACK_REPLY.to_string()),
            Command::Events => self.events_reply().await,
            Command::Attendance => match profile.student_id.as_deref() {
                Some(student_id) => self.attendance_reply(student_id).await,
                None => Ok(NOT_LINKED_REPLY.to_string()),
            },
        }
    }

    async fn attendance_reply(&self, student_id: &str) -> Result<String> {
        let Some(student) = self.db.get_student(student_id).await? else {
            tracing::warn!(student_id, "WhatsApp contact linked to missing student");
            return Ok(NOT_LINKED_REPLY.to_string());
        };

        let name = format!("{} {}", student.first_name, student.last_name);
        let latest = self
            .db
            .list_attendance_for_class(&student.class)
            .await?
            .into_iter()
            .find_map(|record| record.status_for(student_id).map(|s| (record.date, s)));

        Ok(match latest {
            Some((date, status)) => {
                format!("Attendance for {} on {}: {}", name, date, status.as_str())
            }
            None => format!("No attendance has been recorded for {} yet.", name),
        })
    }

    async fn events_reply(&self) -> Result<String> {
        let today = format_date(self.today);
        let mut events: Vec<Event> = self
            .db
            .list_docs::<Event>(collections::EVENTS)
            .await?
            .into_iter()
            .filter(|e| e.is_public && e.date >= today)
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date));

        if events.is_empty() {
            return Ok("No upcoming events.".to_string());
        }

        let lines: Vec<String> = events
            .iter()
            .take(MAX_EVENTS_IN_REPLY)
            .map(|e| format!("{} - {}", e.date, e.title))
            .collect();
        Ok(format!("Upcoming events:\n{}", lines.join("\n")))
    }
}

enum MessageOutcome {
    Duplicate,
    Received { replied: bool },
}
