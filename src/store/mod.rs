//! Session state container
//!
//! [`AppStore`] holds the signed-in user and the four entity lists for the
//! session. Every mutation goes through it: it calls the backend, then
//! merges the answer into the local lists and re-sorts them. It is owned by
//! a single task; screens read snapshots and send it commands.

mod command;
mod error;
mod query;

pub use command::{NoteDraft, SendOutcome, UpdateDraft};
pub use error::{StoreError, StoreResult};
pub use query::InboxFilter;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::api::wire::{MaintenanceUpdateRequest, ProfileUpdate, SendMessageRequest, Session, VisitNoteRequest};
use crate::api::RemoteApi;
use crate::models::*;
use crate::realtime::{self, ChatSocket, Handlers, RealtimeEvent, RealtimePayload};

/// Note body used when a chat photo is filed without text.
const CHAT_PHOTO_NOTE: &str = "Photo shared in chat";

/// Non-blocking message for the user (secondary failures, socket errors).
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub at: DateTime<Utc>,
    pub text: String,
}

/// Everything the session knows. Cloned as a snapshot for rendering.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub current_user: Option<User>,
    pub conversations: Vec<Conversation>,
    pub messages: Vec<Message>,
    pub maintenance_requests: Vec<MaintenanceRequest>,
    pub visit_notes: Vec<SiteVisitNote>,
    pub notices: Vec<Notice>,
}

/// Live socket for one conversation plus the events it produces.
pub struct RealtimeSubscription {
    pub conversation_id: String,
    pub socket: ChatSocket,
    pub events: mpsc::UnboundedReceiver<RealtimeEvent>,
}

/// Single writer for session state.
pub struct AppStore<R: RemoteApi> {
    remote: R,
    state: StoreState,
    chat_socket_override: Option<String>,
}

impl<R: RemoteApi> AppStore<R> {
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            state: StoreState::default(),
            chat_socket_override: None,
        }
    }

    /// Use this socket base instead of the one the backend hands out.
    pub fn with_chat_socket_override(mut self, url: Option<String>) -> Self {
        self.chat_socket_override = url;
        self
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.clone()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.state.current_user.as_ref()
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    // -- Session ------------------------------------------------------------

    /// Password sign-in followed by a full bootstrap.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> StoreResult<Session> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(StoreError::validation("Email and password are required"));
        }
        let session = self.remote.sign_in(email, password).await?;
        self.establish(session.clone()).await?;
        Ok(session)
    }

    /// Sign in with an identity-provider access token.
    pub async fn sign_in_with_provider(&mut self, access_token: &str) -> StoreResult<Session> {
        if access_token.is_empty() {
            return Err(StoreError::validation("Identity provider returned no token"));
        }
        let session = self.remote.sign_in_with_microsoft(access_token).await?;
        self.establish(session.clone()).await?;
        Ok(session)
    }

    /// Re-apply a cached session (app restart) and bootstrap.
    pub async fn restore_session(&mut self, session: Session) -> StoreResult<()> {
        self.establish(session).await
    }

    async fn establish(&mut self, session: Session) -> StoreResult<()> {
        tracing::info!(
            "Signed in as {} ({})",
            session.user.email,
            session.user.role.as_str()
        );
        self.remote.set_bearer_token(Some(session.token));
        self.state.current_user = Some(session.user);

        if let Err(e) = self.refresh().await {
            // A session without its working set is not presented as signed in.
            self.sign_out();
            return Err(e);
        }
        Ok(())
    }

    /// Fetch the full working set and replace all four lists.
    pub async fn refresh(&mut self) -> StoreResult<()> {
        self.require_user()?;
        let bootstrap = self.remote.bootstrap().await?;
        tracing::debug!(
            "Bootstrap: {} conversations, {} messages, {} maintenance, {} notes",
            bootstrap.conversations.len(),
            bootstrap.messages.len(),
            bootstrap.maintenance_requests.len(),
            bootstrap.visit_notes.len()
        );

        self.state.conversations = bootstrap.conversations;
        self.state.messages = bootstrap.messages;
        self.state.maintenance_requests = bootstrap.maintenance_requests;
        self.state.visit_notes = bootstrap.visit_notes;
        self.state.sort_conversations();
        self.state.sort_messages();
        self.state.sort_maintenance();
        self.state.sort_notes();
        Ok(())
    }

    /// Drop the token and everything fetched with it. Local only.
    pub fn sign_out(&mut self) {
        self.remote.set_bearer_token(None);
        self.state = StoreState::default();
        tracing::info!("Signed out");
    }

    // -- Conversations ------------------------------------------------------

    /// Zero the unread counter. Unknown ids are ignored.
    pub fn mark_conversation_read(&mut self, conversation_id: &str) {
        if let Some(c) = self.state.conversation_mut(conversation_id) {
            c.unread_count = 0;
        }
    }

    /// Take over a conversation from the bot or the queue.
    pub async fn assign_conversation(&mut self, conversation_id: &str) -> StoreResult<()> {
        let actor = self.require(Capability::ManageConversations)?.clone();
        self.open_conversation(conversation_id)?;

        self.remote.assign_conversation(conversation_id).await?;

        let now = Utc::now();
        if let Some(c) = self.state.conversation_mut(conversation_id) {
            c.status = ConversationStatus::Assigned;
            c.assigned_to = Some(AssigneeRef {
                id: actor.id.clone(),
                name: actor.name.clone(),
            });
            c.bot_active = false;
            c.unread_count = 0;
            c.last_activity_at = now;
        }
        self.push_message(command::system_message(
            conversation_id,
            format!("Conversation assigned to {}.", actor.name),
        ));
        self.state.sort_conversations();
        Ok(())
    }

    /// Send a reply. Returns `Ok(None)` without any request when there is
    /// neither text nor photo.
    pub async fn send_message(
        &mut self,
        conversation_id: &str,
        text: &str,
        photo_url: Option<&str>,
    ) -> StoreResult<Option<SendOutcome>> {
        let text = text.trim();
        let photo_url = photo_url.map(str::trim).filter(|p| !p.is_empty());
        if text.is_empty() && photo_url.is_none() {
            return Ok(None);
        }

        let actor = self.require_user()?.clone();
        self.open_conversation(conversation_id)?;

        let staff = actor.can(Capability::ManageConversations);
        let sender_type = if staff {
            SenderType::Manager
        } else {
            SenderType::Visitor
        };
        let draft = command::draft_message(conversation_id, &actor, sender_type, text, photo_url);

        let request = SendMessageRequest {
            body: text.to_string(),
            photo_url: photo_url.map(String::from),
        };
        let confirmed = self.remote.send_message(conversation_id, &request).await?;
        let canonical = confirmed.unwrap_or_else(|| draft.clone());

        self.push_message(canonical.clone());
        if let Some(c) = self.state.conversation_mut(conversation_id) {
            if staff {
                c.status = ConversationStatus::Assigned;
                if c.assigned_to.is_none() {
                    c.assigned_to = Some(AssigneeRef {
                        id: actor.id.clone(),
                        name: actor.name.clone(),
                    });
                }
                c.bot_active = false;
                c.unread_count = 0;
            } else if c.status == ConversationStatus::Assigned {
                c.status = ConversationStatus::WaitingReply;
            }
            c.last_activity_at = canonical.created_at;
        }
        self.state.sort_conversations();

        let mut outcome = SendOutcome {
            draft,
            canonical,
            linked_update: None,
            warnings: Vec::new(),
        };

        if let Some(photo) = photo_url {
            match self.link_chat_photo(conversation_id, text, photo).await {
                Ok(update) => outcome.linked_update = update,
                Err(e) => {
                    let text = format!("Photo sent, but it was not added to the maintenance request: {}", e);
                    tracing::warn!("{}", text);
                    self.notify(text.clone());
                    outcome.warnings.push(text);
                }
            }
        }

        Ok(Some(outcome))
    }

    /// File a chat photo as an update on the conversation's latest maintenance request.
    async fn link_chat_photo(
        &mut self,
        conversation_id: &str,
        text: &str,
        photo_url: &str,
    ) -> StoreResult<Option<SiteVisitNote>> {
        let target = self
            .state
            .maintenance_for_conversation(conversation_id)
            .into_iter()
            .max_by_key(|m| m.updated_at)
            .map(|m| m.id.clone());
        let Some(maintenance_id) = target else {
            return Ok(None);
        };

        let request = MaintenanceUpdateRequest {
            note: if text.is_empty() {
                CHAT_PHOTO_NOTE.to_string()
            } else {
                text.to_string()
            },
            photo_urls: vec![photo_url.to_string()],
            video_urls: Vec::new(),
            source: NoteSource::Chat,
        };
        let update = self
            .remote
            .add_maintenance_update(&maintenance_id, &request)
            .await?;
        self.attach_update(&maintenance_id, update.clone());
        Ok(Some(update))
    }

    /// Close a conversation for good.
    pub async fn close_conversation(&mut self, conversation_id: &str) -> StoreResult<()> {
        let actor = self.require(Capability::ManageConversations)?.clone();
        self.open_conversation(conversation_id)?;

        self.remote.close_conversation(conversation_id).await?;

        if let Some(c) = self.state.conversation_mut(conversation_id) {
            c.status = ConversationStatus::Closed;
            c.unread_count = 0;
            c.last_activity_at = Utc::now();
        }
        self.push_message(command::system_message(
            conversation_id,
            format!("Conversation closed by {}.", actor.name),
        ));
        self.state.sort_conversations();
        Ok(())
    }

    /// Re-fetch one conversation and its messages (polling fallback).
    pub async fn sync_conversation(&mut self, conversation_id: &str) -> StoreResult<usize> {
        self.require_user()?;
        let thread = self.remote.fetch_conversation(conversation_id).await?;

        match self.state.conversation_mut(conversation_id) {
            Some(existing) => *existing = thread.conversation,
            None => self.state.conversations.push(thread.conversation),
        }
        let mut added = 0;
        for message in thread.messages {
            if !self.state.has_message(&message.id) {
                self.state.messages.push(message);
                added += 1;
            }
        }
        self.state.sort_messages();
        self.state.sort_conversations();
        Ok(added)
    }

    // -- Realtime -----------------------------------------------------------

    /// Open a live socket for one conversation.
    pub async fn connect_conversation_realtime(
        &mut self,
        conversation_id: &str,
    ) -> StoreResult<RealtimeSubscription> {
        self.require(Capability::UseRealtimeChat)?;
        self.find_conversation(conversation_id)?;

        let access = self.remote.chat_access(conversation_id).await?;
        let base = access
            .socket_url
            .clone()
            .or_else(|| self.chat_socket_override.clone())
            .unwrap_or_else(|| realtime::default_socket_base(self.remote.base_url()));
        let url = realtime::socket_url(&base, conversation_id, &access.token)?;

        let (handlers, events) = Handlers::channel();
        let socket = ChatSocket::connect(&url, handlers).await?;
        Ok(RealtimeSubscription {
            conversation_id: conversation_id.to_string(),
            socket,
            events,
        })
    }

    /// Fold one socket event into state. Returns the message it added, if any.
    pub fn apply_realtime_event(
        &mut self,
        conversation_id: &str,
        event: RealtimeEvent,
    ) -> Option<Message> {
        match event {
            RealtimeEvent::Message(payload) => self.apply_incoming_message(conversation_id, payload),
            RealtimeEvent::Error(text) => {
                tracing::warn!("Live chat for {}: {}", conversation_id, text);
                self.notify(text);
                None
            }
        }
    }

    /// Append an inbound message unless its id is already stored.
    ///
    /// Returns a copy of the stored message. It is not necessarily the newest
    /// one in the thread, since the server clock decides the order.
    pub fn apply_incoming_message(
        &mut self,
        conversation_id: &str,
        payload: RealtimePayload,
    ) -> Option<Message> {
        let message = payload.into_message(conversation_id);
        if self.state.has_message(&message.id) {
            return None;
        }

        if let Some(c) = self.state.conversation_mut(conversation_id) {
            if !c.status.is_closed() {
                match message.sender_type {
                    SenderType::Manager => c.status = ConversationStatus::Assigned,
                    SenderType::Visitor if c.status == ConversationStatus::Assigned => {
                        c.status = ConversationStatus::WaitingReply
                    }
                    _ => {}
                }
            }
            if message.sender_type == SenderType::Visitor {
                c.unread_count += 1;
            }
            if message.created_at > c.last_activity_at {
                c.last_activity_at = message.created_at;
            }
        }
        self.push_message(message.clone());
        self.state.sort_conversations();
        Some(message)
    }

    // -- Maintenance & visit notes -----------------------------------------

    /// Move a request to `status`; the server's record replaces ours verbatim.
    pub async fn update_maintenance_status(
        &mut self,
        maintenance_id: &str,
        status: MaintenanceStatus,
    ) -> StoreResult<MaintenanceRequest> {
        self.require(Capability::UpdateMaintenance)?;
        self.find_maintenance(maintenance_id)?;

        let updated = self
            .remote
            .update_maintenance_status(maintenance_id, status)
            .await?;
        if let Some(existing) = self.state.maintenance_mut(maintenance_id) {
            *existing = updated.clone();
        }
        self.state.sort_maintenance();
        Ok(updated)
    }

    /// Record a site visit, then re-bootstrap so any request the backend
    /// created from it shows up.
    pub async fn add_visit_note(&mut self, draft: NoteDraft) -> StoreResult<SiteVisitNote> {
        self.require_user()?;
        draft.validate()?;

        let request = VisitNoteRequest {
            property_id: draft.property_id.trim().to_string(),
            unit_id: non_empty(draft.unit_id),
            maintenance_request_id: non_empty(draft.maintenance_request_id),
            note: draft.note.trim().to_string(),
            photo_urls: media_urls(draft.photo_urls),
            video_urls: media_urls(draft.video_urls),
        };
        let note = self.remote.create_visit_note(&request).await?;
        match note.maintenance_request_id.clone() {
            Some(mid) => self.attach_update(&mid, note.clone()),
            None => self.state.visit_notes.insert(0, note.clone()),
        }

        if let Err(e) = self.refresh().await {
            // The note exists server-side; failing here would invite a duplicate.
            tracing::warn!("Refresh after visit note failed: {}", e);
            self.notify(format!("Visit note saved, but refreshing failed: {}", e));
        }
        Ok(note)
    }

    /// Attach a note/photo update to an existing request.
    pub async fn add_maintenance_update(
        &mut self,
        maintenance_id: &str,
        draft: UpdateDraft,
    ) -> StoreResult<SiteVisitNote> {
        self.require_user()?;
        draft.validate()?;
        self.find_maintenance(maintenance_id)?;

        let request = MaintenanceUpdateRequest {
            note: draft.note.trim().to_string(),
            photo_urls: media_urls(draft.photo_urls),
            video_urls: media_urls(draft.video_urls),
            source: NoteSource::MaintenanceUpdate,
        };
        let update = self
            .remote
            .add_maintenance_update(maintenance_id, &request)
            .await?;
        self.attach_update(maintenance_id, update.clone());
        Ok(update)
    }

    // -- Profile ------------------------------------------------------------

    pub async fn register_push_token(&mut self, push_token: &str, platform: &str) -> StoreResult<()> {
        self.require_user()?;
        if push_token.trim().is_empty() {
            return Err(StoreError::validation("Push token is empty"));
        }
        self.remote
            .register_push_token(push_token.trim(), platform)
            .await?;
        Ok(())
    }

    pub async fn update_profile(&mut self, update: ProfileUpdate) -> StoreResult<User> {
        self.require_user()?;
        if update == ProfileUpdate::default() {
            return Err(StoreError::validation("Nothing to update"));
        }
        let user = self.remote.update_profile(&update).await?;
        self.state.current_user = Some(user.clone());
        Ok(user)
    }

    pub fn dismiss_notices(&mut self) {
        self.state.notices.clear();
    }

    // -- Helpers ------------------------------------------------------------

    fn require_user(&self) -> StoreResult<&User> {
        self.state.current_user.as_ref().ok_or(StoreError::NotSignedIn)
    }

    fn require(&self, capability: Capability) -> StoreResult<&User> {
        let user = self.require_user()?;
        if !user.can(capability) {
            return Err(StoreError::PermissionDenied {
                role: user.role.as_str(),
                action: capability.action(),
            });
        }
        Ok(user)
    }

    fn find_conversation(&self, id: &str) -> StoreResult<&Conversation> {
        self.state.conversation(id).ok_or_else(|| StoreError::NotFound {
            kind: "Conversation",
            id: id.to_string(),
        })
    }

    /// Existing conversation that still accepts activity.
    fn open_conversation(&self, id: &str) -> StoreResult<&Conversation> {
        let c = self.find_conversation(id)?;
        if c.status.is_closed() {
            return Err(StoreError::ConversationClosed(id.to_string()));
        }
        Ok(c)
    }

    fn find_maintenance(&self, id: &str) -> StoreResult<&MaintenanceRequest> {
        self.state
            .maintenance_request(id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "Maintenance request",
                id: id.to_string(),
            })
    }

    fn push_message(&mut self, message: Message) {
        if !self.state.has_message(&message.id) {
            self.state.messages.push(message);
            self.state.sort_messages();
        }
    }

    /// Prepend a note and bump its request's last-updated time.
    fn attach_update(&mut self, maintenance_id: &str, note: SiteVisitNote) {
        let created_at = note.created_at;
        self.state.visit_notes.insert(0, note);
        if let Some(m) = self.state.maintenance_mut(maintenance_id) {
            m.updated_at = created_at;
        }
        self.state.sort_maintenance();
    }

    fn notify(&mut self, text: String) {
        self.state.notices.push(Notice {
            at: Utc::now(),
            text,
        });
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn media_urls(urls: Vec<String>) -> Vec<String> {
    urls.into_iter().filter_map(|u| non_empty(Some(u))).collect()
}
