//! In-memory backend used by store tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use super::error::{ApiError, ApiResult};
use super::remote::RemoteApi;
use super::wire::*;
use crate::models::*;

/// Shared, inspectable state behind a [`FakeRemote`].
#[derive(Default)]
pub struct FakeState {
    /// Endpoint names in call order, e.g. `"assign:c1"`.
    pub calls: Vec<String>,
    pub email: String,
    pub password: String,
    pub user: Option<User>,
    pub bootstrap: Bootstrap,
    pub threads: HashMap<String, ConversationThread>,
    /// Endpoint names that answer HTTP 500.
    pub failing: HashSet<&'static str>,
    /// Whether message sends return a server-side message.
    pub echo_messages: bool,
    /// Whether unlinked visit notes spawn a new maintenance request.
    pub auto_create_maintenance: bool,
    pub socket_url: Option<String>,
    next_id: u32,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

pub struct FakeRemote {
    pub state: Arc<Mutex<FakeState>>,
    token: Option<String>,
}

impl FakeRemote {
    /// A backend accepting `email`/`password` for `user`.
    pub fn new(email: &str, password: &str, user: User, bootstrap: Bootstrap) -> Self {
        let state = FakeState {
            email: email.to_string(),
            password: password.to_string(),
            user: Some(user),
            bootstrap,
            echo_messages: true,
            auto_create_maintenance: true,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            token: None,
        }
    }

    fn enter(&self, endpoint: &'static str, detail: &str) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        if detail.is_empty() {
            state.calls.push(endpoint.to_string());
        } else {
            state.calls.push(format!("{}:{}", endpoint, detail));
        }
        if state.failing.contains(endpoint) {
            return Err(ApiError::Http {
                status: 500,
                method: "POST".into(),
                path: format!("/{}", endpoint),
                body: "simulated failure".into(),
            });
        }
        Ok(())
    }

    fn require_token(&self) -> ApiResult<()> {
        if self.token.is_none() {
            return Err(unauthorized("/bootstrap"));
        }
        Ok(())
    }

    fn session(&self) -> ApiResult<Session> {
        let state = self.state.lock().unwrap();
        let user = state.user.clone().ok_or_else(|| unauthorized("/auth"))?;
        Ok(Session {
            token: format!("bearer-for-{}", user.id),
            expires_in: Some(3600),
            user,
        })
    }
}

fn unauthorized(path: &str) -> ApiError {
    ApiError::Http {
        status: 401,
        method: "POST".into(),
        path: path.to_string(),
        body: "invalid credentials".into(),
    }
}

/// Timestamp the fake backend stamps on server-side writes.
pub fn server_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 9, 30, 0).unwrap()
}

#[async_trait]
impl RemoteApi for FakeRemote {
    fn set_bearer_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn base_url(&self) -> &str {
        "http://fake.local"
    }

    async fn sign_in(&self, email: &str, password: &str) -> ApiResult<Session> {
        self.enter("sign_in", email)?;
        {
            let state = self.state.lock().unwrap();
            if state.email != email || state.password != password {
                return Err(unauthorized("/auth/sign-in"));
            }
        }
        self.session()
    }

    async fn sign_in_with_microsoft(&self, access_token: &str) -> ApiResult<Session> {
        self.enter("sign_in_microsoft", "")?;
        if access_token.is_empty() {
            return Err(unauthorized("/auth/microsoft"));
        }
        self.session()
    }

    async fn bootstrap(&self) -> ApiResult<Bootstrap> {
        self.enter("bootstrap", "")?;
        self.require_token()?;
        Ok(self.state.lock().unwrap().bootstrap.clone())
    }

    async fn assign_conversation(&self, conversation_id: &str) -> ApiResult<()> {
        self.enter("assign", conversation_id)
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        request: &SendMessageRequest,
    ) -> ApiResult<Option<Message>> {
        self.enter("send_message", conversation_id)?;
        let mut state = self.state.lock().unwrap();
        if !state.echo_messages {
            return Ok(None);
        }
        let user = state.user.clone().ok_or_else(|| unauthorized("/messages"))?;
        let id = state.next_id("srv-msg");
        Ok(Some(Message {
            id,
            conversation_id: conversation_id.to_string(),
            sender_type: if user.can(Capability::ManageConversations) {
                SenderType::Manager
            } else {
                SenderType::Visitor
            },
            sender_name: user.name,
            body: request.body.clone(),
            photo_url: request.photo_url.clone(),
            created_at: server_time(),
        }))
    }

    async fn fetch_conversation(&self, conversation_id: &str) -> ApiResult<ConversationThread> {
        self.enter("fetch_conversation", conversation_id)?;
        self.state
            .lock()
            .unwrap()
            .threads
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| ApiError::Http {
                status: 404,
                method: "GET".into(),
                path: format!("/conversations/{}/messages", conversation_id),
                body: "not found".into(),
            })
    }

    async fn close_conversation(&self, conversation_id: &str) -> ApiResult<()> {
        self.enter("close", conversation_id)
    }

    async fn chat_access(&self, conversation_id: &str) -> ApiResult<ChatAccess> {
        self.enter("chat_access", conversation_id)?;
        Ok(ChatAccess {
            token: "rt-token".into(),
            socket_url: self.state.lock().unwrap().socket_url.clone(),
            expires_in: Some(60),
        })
    }

    async fn update_maintenance_status(
        &self,
        maintenance_id: &str,
        status: MaintenanceStatus,
    ) -> ApiResult<MaintenanceRequest> {
        self.enter("update_maintenance_status", maintenance_id)?;
        let mut state = self.state.lock().unwrap();
        let request = state
            .bootstrap
            .maintenance_requests
            .iter_mut()
            .find(|m| m.id == maintenance_id)
            .ok_or_else(|| ApiError::Http {
                status: 404,
                method: "PATCH".into(),
                path: format!("/maintenance/{}", maintenance_id),
                body: "not found".into(),
            })?;
        request.status = status;
        request.updated_at = server_time();
        Ok(request.clone())
    }

    async fn add_maintenance_update(
        &self,
        maintenance_id: &str,
        request: &MaintenanceUpdateRequest,
    ) -> ApiResult<SiteVisitNote> {
        self.enter("add_maintenance_update", maintenance_id)?;
        let mut state = self.state.lock().unwrap();
        let property_id = state
            .bootstrap
            .maintenance_requests
            .iter()
            .find(|m| m.id == maintenance_id)
            .map(|m| m.property_id.clone())
            .unwrap_or_default();
        let note = SiteVisitNote {
            id: state.next_id("upd"),
            property_id,
            unit_id: None,
            maintenance_request_id: Some(maintenance_id.to_string()),
            note: request.note.clone(),
            photo_urls: request.photo_urls.clone(),
            video_urls: request.video_urls.clone(),
            source: request.source,
            author_name: state.user.as_ref().map(|u| u.name.clone()),
            created_at: server_time(),
        };
        state.bootstrap.visit_notes.insert(0, note.clone());
        Ok(note)
    }

    async fn create_visit_note(&self, request: &VisitNoteRequest) -> ApiResult<SiteVisitNote> {
        self.enter("create_visit_note", &request.property_id)?;
        let mut state = self.state.lock().unwrap();
        let mut linked = request.maintenance_request_id.clone();
        if linked.is_none() && state.auto_create_maintenance {
            let id = state.next_id("mr-auto");
            state.bootstrap.maintenance_requests.push(MaintenanceRequest {
                id: id.clone(),
                conversation_id: None,
                property_id: request.property_id.clone(),
                unit_id: request.unit_id.clone(),
                title: request.note.clone(),
                summary: request.note.clone(),
                status: MaintenanceStatus::New,
                priority: Priority::Medium,
                external_url: None,
                updated_at: server_time(),
            });
            linked = Some(id);
        }
        let note = SiteVisitNote {
            id: state.next_id("note"),
            property_id: request.property_id.clone(),
            unit_id: request.unit_id.clone(),
            maintenance_request_id: linked,
            note: request.note.clone(),
            photo_urls: request.photo_urls.clone(),
            video_urls: request.video_urls.clone(),
            source: NoteSource::Visit,
            author_name: state.user.as_ref().map(|u| u.name.clone()),
            created_at: server_time(),
        };
        state.bootstrap.visit_notes.insert(0, note.clone());
        Ok(note)
    }

    async fn register_push_token(&self, push_token: &str, platform: &str) -> ApiResult<()> {
        self.enter("register_push", &format!("{}/{}", platform, push_token))
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User> {
        self.enter("update_profile", "")?;
        let mut state = self.state.lock().unwrap();
        let user = state.user.as_mut().ok_or_else(|| unauthorized("/me"))?;
        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(phone) = &update.phone {
            user.phone = Some(phone.clone());
        }
        if let Some(prefs) = &update.notification_prefs {
            user.notification_prefs = prefs.clone();
        }
        Ok(user.clone())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Fixed reference instant; fixtures are placed relative to it.
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub fn user(id: &str, name: &str, role: Role) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", id),
        role,
        phone: None,
        company: None,
        notification_prefs: NotificationPrefs::default(),
    }
}

pub fn conversation(id: &str, status: ConversationStatus, minutes: i64) -> Conversation {
    Conversation {
        id: id.to_string(),
        visitor_alias: format!("Visitor {}", id),
        status,
        property: PropertySummary {
            id: "prop-1".into(),
            name: "Maple Court".into(),
            address: Some("12 Maple St".into()),
        },
        unit: Some(UnitSummary {
            id: "unit-4b".into(),
            label: "4B".into(),
        }),
        assigned_to: None,
        bot_active: status == ConversationStatus::New,
        escalated: false,
        unread_count: 2,
        last_activity_at: at(minutes),
        case_ref: None,
    }
}

pub fn message(id: &str, conversation_id: &str, minutes: i64) -> Message {
    Message {
        id: id.to_string(),
        conversation_id: conversation_id.to_string(),
        sender_type: SenderType::Visitor,
        sender_name: "Visitor".into(),
        body: format!("message {}", id),
        photo_url: None,
        created_at: at(minutes),
    }
}

pub fn maintenance(id: &str, conversation_id: Option<&str>, minutes: i64) -> MaintenanceRequest {
    MaintenanceRequest {
        id: id.to_string(),
        conversation_id: conversation_id.map(String::from),
        property_id: "prop-1".into(),
        unit_id: Some("unit-4b".into()),
        title: format!("Request {}", id),
        summary: "Tenant reported an issue".into(),
        status: MaintenanceStatus::New,
        priority: Priority::Medium,
        external_url: Some(format!("https://records.example.com/cases/{}", id)),
        updated_at: at(minutes),
    }
}
