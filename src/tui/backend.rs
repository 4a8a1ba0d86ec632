//! Store task: owns the `AppStore` for the TUI session.
//!
//! The UI sends `BackendCommand`s over an mpsc channel. One task applies them
//! to the store in order, alongside any live chat events, and answers with
//! `BackendResponse`s carrying fresh snapshots. The store has exactly one
//! writer this way.

use tokio::sync::mpsc;

use crate::api::wire::ProfileUpdate;
use crate::api::BffClient;
use crate::auth::{self, AuthConfig};
use crate::config::{SessionCache, Settings};
use crate::models::{Capability, MaintenanceStatus, NotificationPrefs};
use crate::realtime::RealtimeEvent;
use crate::store::{AppStore, NoteDraft, RealtimeSubscription, StoreResult, StoreState, UpdateDraft};

/// Commands sent from the UI to the store task.
#[derive(Debug, Clone)]
pub enum BackendCommand {
    SignIn { email: String, password: String },
    SignInMicrosoft,
    SignOut,
    Refresh,
    /// Mark read, start polling fallback and live chat for one conversation.
    OpenConversation(String),
    CloseConversationView,
    SendMessage {
        conversation_id: String,
        text: String,
        photo_url: Option<String>,
    },
    Assign(String),
    CloseConversation(String),
    SetMaintenanceStatus {
        maintenance_id: String,
        status: MaintenanceStatus,
    },
    AddVisitNote(NoteDraft),
    AddMaintenanceUpdate {
        maintenance_id: String,
        draft: UpdateDraft,
    },
    SetPushNotifications(bool),
    DismissNotices,
}

impl BackendCommand {
    /// Whether the UI should show a busy marker until `Done`/`Failed` arrives.
    pub fn awaits_result(&self) -> bool {
        !matches!(
            self,
            BackendCommand::OpenConversation(_)
                | BackendCommand::CloseConversationView
                | BackendCommand::DismissNotices
        )
    }
}

/// Responses from the store task.
#[derive(Debug)]
pub enum BackendResponse {
    /// State after a command or live event.
    Snapshot(Box<StoreState>),
    /// No usable cached session; show the sign-in screen.
    SignedOut,
    /// Microsoft device code to show while polling.
    DeviceCode { url: String, code: String },
    /// A command finished; `message` goes to the status bar.
    Done { message: String },
    /// A command failed; shown as a blocking alert.
    Failed { action: &'static str, error: String },
    /// Live chat state for the open conversation.
    Live(bool),
}

/// UI-side handle.
pub struct Backend {
    cmd_tx: mpsc::UnboundedSender<BackendCommand>,
    resp_rx: mpsc::UnboundedReceiver<BackendResponse>,
}

impl Backend {
    /// Spawn the store task. It restores the cached session on its own.
    pub fn start(settings: Settings) -> anyhow::Result<Self> {
        let client = BffClient::new(&settings.api_url)?;
        let store = AppStore::new(client).with_chat_socket_override(settings.chat_ws_url.clone());

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();
        let worker = Worker {
            store,
            settings,
            live: None,
            resp_tx,
        };
        tokio::spawn(worker.run(cmd_rx));

        Ok(Self { cmd_tx, resp_rx })
    }

    pub fn send(&self, cmd: BackendCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::error!("Store task is gone; command dropped");
        }
    }

    /// Next response; `None` once the store task has exited.
    pub async fn recv(&mut self) -> Option<BackendResponse> {
        self.resp_rx.recv().await
    }
}

struct Worker {
    store: AppStore<BffClient>,
    settings: Settings,
    live: Option<RealtimeSubscription>,
    resp_tx: mpsc::UnboundedSender<BackendResponse>,
}

/// Next live event, or never when no conversation is live.
async fn next_live_event(live: &mut Option<RealtimeSubscription>) -> Option<RealtimeEvent> {
    match live {
        Some(sub) => sub.events.recv().await,
        None => std::future::pending().await,
    }
}

impl Worker {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<BackendCommand>) {
        self.restore().await;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    self.handle(cmd).await;
                }
                event = next_live_event(&mut self.live) => {
                    self.on_live_event(event);
                }
            }
        }
        tracing::debug!("Store task stopped");
    }

    fn respond(&self, resp: BackendResponse) {
        let _ = self.resp_tx.send(resp);
    }

    fn snapshot(&self) {
        self.respond(BackendResponse::Snapshot(Box::new(self.store.snapshot())));
    }

    fn done(&self, message: impl Into<String>) {
        self.snapshot();
        self.respond(BackendResponse::Done {
            message: message.into(),
        });
    }

    fn report<T>(&self, action: &'static str, result: StoreResult<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("{} failed: {}", action, e);
                self.snapshot();
                self.respond(BackendResponse::Failed {
                    action,
                    error: e.to_string(),
                });
                None
            }
        }
    }

    async fn restore(&mut self) {
        let session = SessionCache::load().ok().and_then(|c| c.session());
        let Some(session) = session else {
            self.respond(BackendResponse::SignedOut);
            return;
        };
        match self.store.restore_session(session).await {
            Ok(()) => self.done("Session restored"),
            Err(e) => {
                tracing::warn!("Cached session rejected: {}", e);
                self.respond(BackendResponse::SignedOut);
            }
        }
    }

    fn remember_session(&self, session: &crate::api::wire::Session) {
        let mut cache = SessionCache::load().unwrap_or_default();
        cache.remember(session);
        if let Err(e) = cache.save() {
            tracing::warn!("Could not cache session: {:#}", e);
        }
    }

    async fn handle(&mut self, cmd: BackendCommand) {
        match cmd {
            BackendCommand::SignIn { email, password } => {
                let result = self.store.sign_in(&email, &password).await;
                if let Some(session) = self.report("Sign in", result) {
                    self.remember_session(&session);
                    self.done(format!("Signed in as {}", session.user.name));
                }
            }
            BackendCommand::SignInMicrosoft => self.sign_in_microsoft().await,
            BackendCommand::SignOut => {
                self.drop_live();
                self.store.sign_out();
                let mut cache = SessionCache::load().unwrap_or_default();
                cache.clear();
                if let Err(e) = cache.save() {
                    tracing::warn!("Could not clear cached session: {:#}", e);
                }
                self.snapshot();
                self.respond(BackendResponse::SignedOut);
            }
            BackendCommand::Refresh => {
                let result = self.store.refresh().await;
                if self.report("Refresh", result).is_some() {
                    self.done("Refreshed");
                }
            }
            BackendCommand::OpenConversation(id) => self.open_conversation(id).await,
            BackendCommand::CloseConversationView => {
                self.drop_live();
                self.snapshot();
            }
            BackendCommand::SendMessage {
                conversation_id,
                text,
                photo_url,
            } => {
                let result = self
                    .store
                    .send_message(&conversation_id, &text, photo_url.as_deref())
                    .await;
                match self.report("Send message", result) {
                    Some(Some(outcome)) if outcome.linked_update.is_some() => {
                        self.done("Sent; photo added to the maintenance request")
                    }
                    Some(Some(_)) => self.done("Sent"),
                    Some(None) | None => {}
                }
            }
            BackendCommand::Assign(id) => {
                let result = self.store.assign_conversation(&id).await;
                if self.report("Assign conversation", result).is_some() {
                    self.done("Conversation assigned to you");
                }
            }
            BackendCommand::CloseConversation(id) => {
                let result = self.store.close_conversation(&id).await;
                if self.report("Close conversation", result).is_some() {
                    self.done("Conversation closed");
                }
            }
            BackendCommand::SetMaintenanceStatus {
                maintenance_id,
                status,
            } => {
                let result = self
                    .store
                    .update_maintenance_status(&maintenance_id, status)
                    .await;
                if let Some(updated) = self.report("Update maintenance status", result) {
                    self.done(format!(
                        "{} is now {}",
                        updated.title,
                        crate::format::maintenance_status_label(updated.status)
                    ));
                }
            }
            BackendCommand::AddVisitNote(draft) => {
                let result = self.store.add_visit_note(draft).await;
                if self.report("Save visit note", result).is_some() {
                    self.done("Visit note saved");
                }
            }
            BackendCommand::AddMaintenanceUpdate {
                maintenance_id,
                draft,
            } => {
                let result = self.store.add_maintenance_update(&maintenance_id, draft).await;
                if self.report("Add maintenance update", result).is_some() {
                    self.done("Update added");
                }
            }
            BackendCommand::SetPushNotifications(enabled) => {
                let prefs = self
                    .store
                    .current_user()
                    .map(|u| u.notification_prefs.clone())
                    .unwrap_or_default();
                let update = ProfileUpdate {
                    notification_prefs: Some(NotificationPrefs {
                        push: enabled,
                        ..prefs
                    }),
                    ..Default::default()
                };
                let result = self.store.update_profile(update).await;
                if self.report("Update notifications", result).is_some() {
                    self.done(if enabled {
                        "Push notifications on"
                    } else {
                        "Push notifications off"
                    });
                }
            }
            BackendCommand::DismissNotices => {
                self.store.dismiss_notices();
                self.snapshot();
            }
        }
    }

    async fn sign_in_microsoft(&mut self) {
        let Some(auth_config) = AuthConfig::from_settings(&self.settings) else {
            self.respond(BackendResponse::Failed {
                action: "Microsoft sign-in",
                error: "Not configured (set PROPDESK_MS_CLIENT_ID)".into(),
            });
            return;
        };

        let resp_tx = self.resp_tx.clone();
        let token = auth::microsoft_access_token(&auth_config, |url, code| {
            let _ = resp_tx.send(BackendResponse::DeviceCode {
                url: url.to_string(),
                code: code.to_string(),
            });
        })
        .await;
        let token = match token {
            Ok(t) => t,
            Err(e) => {
                self.respond(BackendResponse::Failed {
                    action: "Microsoft sign-in",
                    error: format!("{:#}", e),
                });
                return;
            }
        };

        let result = self.store.sign_in_with_provider(&token).await;
        if let Some(session) = self.report("Microsoft sign-in", result) {
            self.remember_session(&session);
            self.done(format!("Signed in as {}", session.user.name));
        }
    }

    async fn open_conversation(&mut self, id: String) {
        self.drop_live();
        self.store.mark_conversation_read(&id);
        self.snapshot();

        if let Err(e) = self.store.sync_conversation(&id).await {
            tracing::warn!("Could not sync conversation {}: {}", id, e);
        }
        self.store.mark_conversation_read(&id);

        let can_live = self
            .store
            .current_user()
            .is_some_and(|u| u.can(Capability::UseRealtimeChat));
        if can_live {
            match self.store.connect_conversation_realtime(&id).await {
                Ok(sub) => {
                    self.live = Some(sub);
                    self.respond(BackendResponse::Live(true));
                }
                Err(e) => {
                    tracing::warn!("Live chat unavailable for {}: {}", id, e);
                    self.respond(BackendResponse::Live(false));
                }
            }
        }
        self.snapshot();
    }

    fn on_live_event(&mut self, event: Option<RealtimeEvent>) {
        let Some(sub) = &self.live else { return };
        let conversation_id = sub.conversation_id.clone();
        match event {
            Some(event) => {
                if self.store.apply_realtime_event(&conversation_id, event).is_some() {
                    // The screen is showing this conversation.
                    self.store.mark_conversation_read(&conversation_id);
                }
                self.snapshot();
            }
            None => {
                tracing::info!("Live chat for {} ended", conversation_id);
                self.live = None;
                self.respond(BackendResponse::Live(false));
            }
        }
    }

    fn drop_live(&mut self) {
        if let Some(sub) = self.live.take() {
            sub.socket.close();
            self.respond(BackendResponse::Live(false));
        }
    }
}
