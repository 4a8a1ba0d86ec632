//! Read-side views over the store's lists
//!
//! Relationships are resolved by linear scan; the lists are small.

use super::StoreState;
use crate::models::{
    Conversation, ConversationStatus, MaintenanceRequest, MaintenanceStatus, Message,
    SiteVisitNote,
};

/// Inbox tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InboxFilter {
    #[default]
    All,
    /// Assigned to the signed-in user.
    Mine,
    /// Nobody assigned yet.
    Unassigned,
    /// Anything not closed.
    Open,
    Closed,
}

impl InboxFilter {
    pub const ALL: [InboxFilter; 5] = [
        InboxFilter::All,
        InboxFilter::Mine,
        InboxFilter::Unassigned,
        InboxFilter::Open,
        InboxFilter::Closed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            InboxFilter::All => "All",
            InboxFilter::Mine => "Mine",
            InboxFilter::Unassigned => "Unassigned",
            InboxFilter::Open => "Open",
            InboxFilter::Closed => "Closed",
        }
    }

    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|f| f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    fn matches(&self, conversation: &Conversation, user_id: Option<&str>) -> bool {
        match self {
            InboxFilter::All => true,
            InboxFilter::Mine => match (&conversation.assigned_to, user_id) {
                (Some(a), Some(uid)) => a.id == uid && !conversation.status.is_closed(),
                _ => false,
            },
            InboxFilter::Unassigned => {
                conversation.assigned_to.is_none() && !conversation.status.is_closed()
            }
            InboxFilter::Open => !conversation.status.is_closed(),
            InboxFilter::Closed => conversation.status == ConversationStatus::Closed,
        }
    }
}

impl std::str::FromStr for InboxFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InboxFilter::ALL
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "Unknown inbox filter '{}' (expected all, mine, unassigned, open or closed)",
                    s
                )
            })
    }
}

impl StoreState {
    /// Conversations passing `filter`, most recent activity first.
    pub fn conversations(&self, filter: InboxFilter) -> Vec<&Conversation> {
        let user_id = self.current_user.as_ref().map(|u| u.id.as_str());
        self.conversations
            .iter()
            .filter(|c| filter.matches(c, user_id))
            .collect()
    }

    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Timeline for one conversation, oldest first.
    pub fn messages_for(&self, conversation_id: &str) -> Vec<&Message> {
        let mut out: Vec<&Message> = self
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .collect();
        out.sort_by_key(|m| m.created_at);
        out
    }

    /// Maintenance requests, optionally limited to one status, most recently updated first.
    pub fn maintenance(&self, status: Option<MaintenanceStatus>) -> Vec<&MaintenanceRequest> {
        self.maintenance_requests
            .iter()
            .filter(|m| status.map_or(true, |s| m.status == s))
            .collect()
    }

    pub fn maintenance_request(&self, id: &str) -> Option<&MaintenanceRequest> {
        self.maintenance_requests.iter().find(|m| m.id == id)
    }

    pub fn maintenance_for_conversation(&self, conversation_id: &str) -> Vec<&MaintenanceRequest> {
        self.maintenance_requests
            .iter()
            .filter(|m| m.conversation_id.as_deref() == Some(conversation_id))
            .collect()
    }

    /// Updates and visit notes attached to a request, newest first.
    pub fn notes_for_maintenance(&self, maintenance_id: &str) -> Vec<&SiteVisitNote> {
        self.visit_notes
            .iter()
            .filter(|n| n.maintenance_request_id.as_deref() == Some(maintenance_id))
            .collect()
    }

    pub fn notes_for_property(&self, property_id: &str) -> Vec<&SiteVisitNote> {
        self.visit_notes
            .iter()
            .filter(|n| n.property_id == property_id)
            .collect()
    }

    pub fn total_unread(&self) -> u32 {
        self.conversations.iter().map(|c| c.unread_count).sum()
    }

    pub(crate) fn conversation_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    pub(crate) fn maintenance_mut(&mut self, id: &str) -> Option<&mut MaintenanceRequest> {
        self.maintenance_requests.iter_mut().find(|m| m.id == id)
    }

    pub(crate) fn has_message(&self, id: &str) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    pub(crate) fn sort_conversations(&mut self) {
        self.conversations
            .sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
    }

    pub(crate) fn sort_messages(&mut self) {
        self.messages.sort_by_key(|m| m.created_at);
    }

    pub(crate) fn sort_maintenance(&mut self) {
        self.maintenance_requests
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }

    pub(crate) fn sort_notes(&mut self) {
        self.visit_notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
}
