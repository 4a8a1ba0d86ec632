//! Request and response bodies exchanged with the backend

use serde::{Deserialize, Serialize};

use crate::models::{
    Conversation, MaintenanceRequest, MaintenanceStatus, Message, NoteSource, NotificationPrefs,
    SiteVisitNote, User,
};

#[derive(Debug, Serialize)]
pub struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSignInRequest<'a> {
    pub access_token: &'a str,
}

/// Authenticated session issued by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: User,
}

/// Full working set for the signed-in user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootstrap {
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub maintenance_requests: Vec<MaintenanceRequest>,
    #[serde(default)]
    pub visit_notes: Vec<SiteVisitNote>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SendMessageResponse {
    #[serde(default)]
    pub message: Option<Message>,
}

/// One conversation with its full message history (polling fallback).
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationThread {
    pub conversation: Conversation,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub(super) struct StatusPatch {
    pub status: MaintenanceStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MaintenanceEnvelope {
    pub maintenance_request: MaintenanceRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceUpdateRequest {
    pub note: String,
    pub photo_urls: Vec<String>,
    pub video_urls: Vec<String>,
    pub source: NoteSource,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateEnvelope {
    pub update: SiteVisitNote,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitNoteRequest {
    pub property_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_request_id: Option<String>,
    pub note: String,
    pub photo_urls: Vec<String>,
    pub video_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VisitNoteEnvelope {
    pub visit_note: SiteVisitNote,
}

/// Short-lived credential for one conversation socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAccess {
    pub token: String,
    #[serde(default)]
    pub socket_url: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PushRegistration<'a> {
    pub push_token: &'a str,
    pub platform: &'a str,
}

/// Partial profile change; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_prefs: Option<NotificationPrefs>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserEnvelope {
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_missing_lists_default_empty() {
        let b: Bootstrap = serde_json::from_str(r#"{"conversations":[]}"#).unwrap();
        assert!(b.messages.is_empty());
        assert!(b.maintenance_requests.is_empty());
        assert!(b.visit_notes.is_empty());
    }

    #[test]
    fn test_send_request_omits_missing_photo() {
        let req = SendMessageRequest {
            body: "hi".into(),
            photo_url: None,
        };
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"body":"hi"}"#);
    }

    #[test]
    fn test_profile_update_only_sends_changed_fields() {
        let update = ProfileUpdate {
            phone: Some("555-0100".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"phone": "555-0100"})
        );
    }

    #[test]
    fn test_maintenance_update_wire_shape() {
        let req = MaintenanceUpdateRequest {
            note: "Photo shared in chat".into(),
            photo_urls: vec!["https://cdn/p.jpg".into()],
            video_urls: vec![],
            source: NoteSource::Chat,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["source"], "chat");
        assert_eq!(v["photoUrls"][0], "https://cdn/p.jpg");
    }
}
