//! Conversation models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversation lifecycle.
///
/// `new -> assigned -> waiting_reply <-> assigned -> closed`; closed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    New,
    Assigned,
    WaitingReply,
    Closed,
}

impl ConversationStatus {
    pub fn is_closed(&self) -> bool {
        *self == ConversationStatus::Closed
    }
}

/// Embedded property summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// Embedded unit summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSummary {
    pub id: String,
    pub label: String,
}

/// Reference to the staff member handling a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeRef {
    pub id: String,
    pub name: String,
}

/// Inbox conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub visitor_alias: String,
    pub status: ConversationStatus,
    pub property: PropertySummary,
    #[serde(default)]
    pub unit: Option<UnitSummary>,
    #[serde(default)]
    pub assigned_to: Option<AssigneeRef>,
    /// Bot is still answering (no human handoff yet)
    #[serde(default)]
    pub bot_active: bool,
    #[serde(default)]
    pub escalated: bool,
    #[serde(default)]
    pub unread_count: u32,
    pub last_activity_at: DateTime<Utc>,
    /// Linked case in the external records system
    #[serde(default)]
    pub case_ref: Option<String>,
}
