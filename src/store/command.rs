//! Inputs and typed results for store mutations
//!
//! A mutation builds a local draft, sends it, and then adopts the server's
//! record as canonical. Both are returned so callers can tell them apart.

use chrono::Utc;

use super::error::{StoreError, StoreResult};
use crate::models::{Message, SenderType, SiteVisitNote, User};

/// Result of a message send.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// Record built locally before the request.
    pub draft: Message,
    /// Record now stored: the server's message, or the draft if none came back.
    pub canonical: Message,
    /// Maintenance update created from an attached photo, if any.
    pub linked_update: Option<SiteVisitNote>,
    /// Secondary failures that did not block the send.
    pub warnings: Vec<String>,
}

impl SendOutcome {
    pub fn confirmed_by_server(&self) -> bool {
        self.draft.id != self.canonical.id
    }
}

/// A new site-visit note.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteDraft {
    pub property_id: String,
    pub unit_id: Option<String>,
    pub maintenance_request_id: Option<String>,
    pub note: String,
    pub photo_urls: Vec<String>,
    pub video_urls: Vec<String>,
}

impl NoteDraft {
    pub(crate) fn validate(&self) -> StoreResult<()> {
        if self.property_id.trim().is_empty() {
            return Err(StoreError::validation("Choose a property for this visit note"));
        }
        if !has_content(&self.note, &self.photo_urls, &self.video_urls) {
            return Err(StoreError::validation("Add a note or at least one photo"));
        }
        Ok(())
    }
}

/// A new update on an existing maintenance request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDraft {
    pub note: String,
    pub photo_urls: Vec<String>,
    pub video_urls: Vec<String>,
}

impl UpdateDraft {
    pub(crate) fn validate(&self) -> StoreResult<()> {
        if !has_content(&self.note, &self.photo_urls, &self.video_urls) {
            return Err(StoreError::validation("Add a note or at least one photo"));
        }
        Ok(())
    }
}

fn has_content(note: &str, photos: &[String], videos: &[String]) -> bool {
    !note.trim().is_empty()
        || photos.iter().any(|p| !p.trim().is_empty())
        || videos.iter().any(|v| !v.trim().is_empty())
}

fn local_id() -> String {
    format!("local-{}", uuid::Uuid::new_v4())
}

/// Message as the acting user is about to send it.
pub(crate) fn draft_message(
    conversation_id: &str,
    actor: &User,
    sender_type: SenderType,
    body: &str,
    photo_url: Option<&str>,
) -> Message {
    Message {
        id: local_id(),
        conversation_id: conversation_id.to_string(),
        sender_type,
        sender_name: actor.name.clone(),
        body: body.to_string(),
        photo_url: photo_url.map(String::from),
        created_at: Utc::now(),
    }
}

/// Synthetic timeline entry for assignment and closing.
pub(crate) fn system_message(conversation_id: &str, body: String) -> Message {
    Message {
        id: local_id(),
        conversation_id: conversation_id.to_string(),
        sender_type: SenderType::System,
        sender_name: "System".to_string(),
        body,
        photo_url: None,
        created_at: Utc::now(),
    }
}
