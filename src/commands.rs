//! One-shot CLI commands
//!
//! Each command opens a store from the cached session, runs one operation
//! and prints the result.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::io::{self, BufRead, Write};

use crate::api::BffClient;
use crate::auth::{self, AuthConfig};
use crate::config::{SessionCache, Settings};
use crate::format;
use crate::models::{Conversation, MaintenanceRequest, MaintenanceStatus, Message};
use crate::realtime::RealtimeEvent;
use crate::store::{AppStore, InboxFilter, NoteDraft};

pub type Store = AppStore<BffClient>;

fn new_store(settings: &Settings) -> Result<Store> {
    let client = BffClient::new(&settings.api_url).context("Invalid PROPDESK_API_URL")?;
    Ok(AppStore::new(client).with_chat_socket_override(settings.chat_ws_url.clone()))
}

/// Store restored from the cached session and freshly bootstrapped.
pub async fn open_store(settings: &Settings) -> Result<Store> {
    let cache = SessionCache::load()?;
    let session = match cache.session() {
        Some(s) => s,
        None => bail!("Not signed in (or the session expired). Run 'propdesk login'."),
    };
    let mut store = new_store(settings)?;
    store
        .restore_session(session)
        .await
        .context("Failed to restore the cached session")?;
    Ok(store)
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Sign in and cache the session.
pub async fn login(
    settings: &Settings,
    microsoft: bool,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let mut store = new_store(settings)?;

    let session = if microsoft {
        let auth_config = match AuthConfig::from_settings(settings) {
            Some(c) => c,
            None => bail!("Microsoft sign-in is not configured (set PROPDESK_MS_CLIENT_ID)."),
        };
        let access_token = auth::microsoft_access_token(&auth_config, |url, code| {
            println!();
            println!("To sign in, visit: {}", url);
            println!("Enter code:        {}", code);
            println!();
        })
        .await?;
        store.sign_in_with_provider(&access_token).await?
    } else {
        if !settings.password_sign_in {
            bail!(
                "Password sign-in is disabled in this build. Use --microsoft, \
                 or set PROPDESK_ENABLE_PASSWORD_SIGN_IN=1."
            );
        }
        let email = match email {
            Some(e) => e,
            None => prompt_line("Email")?,
        };
        let password = match password {
            Some(p) => p,
            None => prompt_line("Password")?,
        };
        store.sign_in(&email, &password).await?
    };

    let mut cache = SessionCache::load().unwrap_or_default();
    cache.remember(&session);
    cache.save()?;

    let state = store.state();
    println!(
        "Signed in as {} ({}).",
        session.user.name,
        format::role_label(session.user.role)
    );
    println!(
        "{} conversations, {} unread, {} maintenance requests.",
        state.conversations.len(),
        state.total_unread(),
        state.maintenance_requests.len()
    );
    Ok(())
}

/// Forget the cached session. Local only.
pub async fn logout() -> Result<()> {
    let mut cache = SessionCache::load()?;
    cache.clear();
    cache.save()?;
    println!("Signed out.");
    Ok(())
}

pub async fn status(settings: &Settings) -> Result<()> {
    let cache = SessionCache::load()?;

    println!("Backend:     {}", settings.api_url);
    match (&cache.token, &cache.user) {
        (Some(token), Some(user)) if !token.is_expired() => {
            println!("Signed in:   {} <{}>", user.name, user.email);
            println!("Role:        {}", format::role_label(user.role));
            if let Some(secs) = token.remaining_secs() {
                println!("  expires in: {} min", secs / 60);
            }
        }
        (Some(_), _) => println!("Signed in:   session expired"),
        _ => println!("Signed in:   no"),
    }
    match &cache.push_token {
        Some(_) => println!("Push token:  registered"),
        None => println!("Push token:  none"),
    }
    println!(
        "Microsoft:   {}",
        if settings.microsoft_sign_in_enabled() {
            "enabled"
        } else {
            "not configured"
        }
    );

    if cache.session().is_none() {
        println!("\nRun 'propdesk login' to sign in.");
    }
    Ok(())
}

fn print_conversation(c: &Conversation) {
    let now = Utc::now();
    let unit = c.unit.as_ref().map(|u| format!(" / {}", u.label)).unwrap_or_default();
    println!("{}", c.visitor_alias);
    println!("  ID:       {}", c.id);
    println!("  Property: {}{}", c.property.name, unit);
    println!(
        "  Status:   {}{}",
        format::conversation_status_label(c.status),
        c.assigned_to
            .as_ref()
            .map(|a| format!(" ({})", a.name))
            .unwrap_or_default()
    );
    println!("  Last:     {}", format::relative_time(c.last_activity_at, now));
    if c.unread_count > 0 {
        println!("  Unread:   {}", c.unread_count);
    }
}

pub async fn inbox(settings: &Settings, filter: InboxFilter) -> Result<()> {
    let store = open_store(settings).await?;
    let conversations = store.state().conversations(filter);

    println!("\nInbox ({}):", filter.label());
    println!("{:-<60}", "");

    if conversations.is_empty() {
        println!("  (no conversations)");
        return Ok(());
    }
    for c in conversations {
        print_conversation(c);
        println!();
    }
    Ok(())
}

fn print_message(m: &Message) {
    let photo = m
        .photo_url
        .as_deref()
        .map(|p| format!(" [photo] {}", p))
        .unwrap_or_default();
    println!(
        "[{}] {} ({}): {}{}",
        format::short_datetime(m.created_at),
        m.sender_name,
        format::sender_label(m.sender_type),
        m.body,
        photo
    );
}

pub async fn read(settings: &Settings, conversation_id: &str) -> Result<()> {
    let mut store = open_store(settings).await?;
    if let Err(e) = store.sync_conversation(conversation_id).await {
        tracing::warn!("Showing bootstrap copy of {}: {}", conversation_id, e);
    }
    store.mark_conversation_read(conversation_id);
    let state = store.state();
    let conversation = state
        .conversation(conversation_id)
        .with_context(|| format!("No conversation with id {}", conversation_id))?;

    print_conversation(conversation);
    println!("{:-<60}", "");
    let messages = state.messages_for(conversation_id);
    if messages.is_empty() {
        println!("(no messages)");
    }
    for m in messages {
        print_message(m);
    }
    Ok(())
}

pub async fn send(
    settings: &Settings,
    conversation_id: &str,
    text: &str,
    photo_url: Option<&str>,
) -> Result<()> {
    let mut store = open_store(settings).await?;
    match store.send_message(conversation_id, text, photo_url).await? {
        None => println!("Nothing to send."),
        Some(outcome) => {
            println!("Message sent.");
            if let Some(update) = outcome.linked_update {
                println!(
                    "Photo added to maintenance request {}.",
                    update.maintenance_request_id.unwrap_or_default()
                );
            }
            for warning in outcome.warnings {
                eprintln!("Warning: {}", warning);
            }
        }
    }
    Ok(())
}

pub async fn assign(settings: &Settings, conversation_id: &str) -> Result<()> {
    let mut store = open_store(settings).await?;
    store.assign_conversation(conversation_id).await?;
    println!("Conversation {} assigned to you.", conversation_id);
    Ok(())
}

pub async fn close(settings: &Settings, conversation_id: &str) -> Result<()> {
    let mut store = open_store(settings).await?;
    store.close_conversation(conversation_id).await?;
    println!("Conversation {} closed.", conversation_id);
    Ok(())
}

fn print_maintenance(m: &MaintenanceRequest) {
    println!("{}", m.title);
    println!("  ID:       {}", m.id);
    println!(
        "  Status:   {} / {} priority",
        format::maintenance_status_label(m.status),
        format::priority_label(m.priority)
    );
    println!("  Updated:  {}", format::short_datetime(m.updated_at));
    if let Some(url) = &m.external_url {
        println!("  Record:   {}", url);
    }
}

pub async fn maintenance(settings: &Settings, status: Option<MaintenanceStatus>) -> Result<()> {
    let store = open_store(settings).await?;
    let state = store.state();
    let requests = state.maintenance(status);

    println!("\nMaintenance requests:");
    println!("{:-<60}", "");
    if requests.is_empty() {
        println!("  (none)");
        return Ok(());
    }
    for m in requests {
        print_maintenance(m);
        let notes = state.notes_for_maintenance(&m.id);
        if !notes.is_empty() {
            println!("  Notes:    {}", notes.len());
        }
        println!();
    }
    Ok(())
}

pub async fn set_status(
    settings: &Settings,
    maintenance_id: &str,
    status: MaintenanceStatus,
) -> Result<()> {
    let mut store = open_store(settings).await?;
    let updated = store.update_maintenance_status(maintenance_id, status).await?;
    println!(
        "{} is now {}.",
        updated.title,
        format::maintenance_status_label(updated.status)
    );
    Ok(())
}

pub async fn note(settings: &Settings, draft: NoteDraft) -> Result<()> {
    let mut store = open_store(settings).await?;
    let note = store.add_visit_note(draft).await?;
    println!("Visit note saved ({}).", note.id);
    if let Some(mid) = &note.maintenance_request_id {
        if let Some(m) = store.state().maintenance_request(mid) {
            println!(
                "Linked to maintenance request: {} [{}]",
                m.title,
                format::maintenance_status_label(m.status)
            );
        }
    }
    for notice in &store.state().notices {
        eprintln!("Warning: {}", notice.text);
    }
    Ok(())
}

/// Tail one conversation's live chat until Ctrl-C or the socket closes.
pub async fn watch(settings: &Settings, conversation_id: &str) -> Result<()> {
    let mut store = open_store(settings).await?;
    for m in store.state().messages_for(conversation_id) {
        print_message(m);
    }

    let mut sub = store.connect_conversation_realtime(conversation_id).await?;
    println!("-- live (Ctrl-C to stop) --");

    loop {
        tokio::select! {
            event = sub.events.recv() => {
                let Some(event) = event else {
                    println!("-- connection closed --");
                    break;
                };
                if let RealtimeEvent::Error(ref text) = event {
                    eprintln!("Warning: {}", text);
                }
                if let Some(m) = store.apply_realtime_event(conversation_id, event) {
                    print_message(&m);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    sub.socket.close();
    Ok(())
}

pub async fn push_register(settings: &Settings, push_token: &str, platform: &str) -> Result<()> {
    let mut store = open_store(settings).await?;
    store.register_push_token(push_token, platform).await?;

    let mut cache = SessionCache::load()?;
    cache.push_token = Some(push_token.trim().to_string());
    cache.save()?;
    println!("Push notifications registered for {}.", platform);
    Ok(())
}
