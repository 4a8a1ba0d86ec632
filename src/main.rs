//! propdesk - terminal client for property-management teams
//!
//! Resident chat inbox, maintenance tracking and site-visit notes against the
//! propdesk backend.

mod api;
mod auth;
mod commands;
mod config;
mod format;
mod models;
mod realtime;
mod store;
mod tui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Settings;
use crate::models::MaintenanceStatus;
use crate::store::{InboxFilter, NoteDraft};

#[derive(Parser)]
#[command(name = "propdesk")]
#[command(about = "Property-management inbox, maintenance and site visits", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and cache the session
    Login {
        /// Use Microsoft (Entra ID) device code sign-in
        #[arg(long)]
        microsoft: bool,

        #[arg(short, long)]
        email: Option<String>,

        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Forget the cached session
    Logout,

    /// Show the cached session and configuration
    Status,

    /// List conversations
    Inbox {
        /// all, mine, unassigned, open or closed
        #[arg(short, long, default_value = "all")]
        filter: InboxFilter,
    },

    /// Show one conversation with its messages
    Read {
        /// Conversation ID (from `inbox` output)
        conversation_id: String,
    },

    /// Reply in a conversation
    Send {
        /// Conversation ID
        #[arg(short, long)]
        to: String,

        /// Photo URL to attach
        #[arg(long)]
        photo: Option<String>,

        /// Message text
        #[arg(default_value = "")]
        message: String,
    },

    /// Take over a conversation
    Assign { conversation_id: String },

    /// Close a conversation
    Close { conversation_id: String },

    /// List maintenance requests
    Maintenance {
        /// new, in_progress or done
        #[arg(short, long)]
        status: Option<MaintenanceStatus>,
    },

    /// Move a maintenance request to a new status
    SetStatus {
        maintenance_id: String,
        /// new, in_progress or done
        status: MaintenanceStatus,
    },

    /// Record a site-visit note
    Note {
        #[arg(long)]
        property: String,

        #[arg(long)]
        unit: Option<String>,

        /// Attach to this maintenance request instead of letting the backend pick
        #[arg(long)]
        maintenance: Option<String>,

        /// Photo URL (repeatable)
        #[arg(long = "photo")]
        photos: Vec<String>,

        /// Video URL (repeatable)
        #[arg(long = "video")]
        videos: Vec<String>,

        #[arg(default_value = "")]
        text: String,
    },

    /// Follow a conversation's live chat
    Watch { conversation_id: String },

    /// Register a push notification token
    PushRegister {
        token: String,

        #[arg(long, default_value = std::env::consts::OS)]
        platform: String,
    },

    /// Launch the terminal user interface
    Tui,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Commands::Tui = cli.command {
        // Logs would corrupt the alternate screen; capture them for the activity strip.
        let log_buffer = tui::LogBuffer::new();
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(log_buffer.clone()),
            )
            .init();
        settings.warn_if_default_api_url();
        return tui::run(settings, log_buffer).await;
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
    settings.warn_if_default_api_url();

    match cli.command {
        Commands::Login {
            microsoft,
            email,
            password,
        } => {
            tracing::info!("Signing in to {}...", settings.api_url);
            commands::login(&settings, microsoft, email, password).await?;
        }
        Commands::Logout => {
            commands::logout().await?;
        }
        Commands::Status => {
            commands::status(&settings).await?;
        }
        Commands::Inbox { filter } => {
            commands::inbox(&settings, filter).await?;
        }
        Commands::Read { conversation_id } => {
            commands::read(&settings, &conversation_id).await?;
        }
        Commands::Send { to, photo, message } => {
            commands::send(&settings, &to, &message, photo.as_deref()).await?;
        }
        Commands::Assign { conversation_id } => {
            commands::assign(&settings, &conversation_id).await?;
        }
        Commands::Close { conversation_id } => {
            commands::close(&settings, &conversation_id).await?;
        }
        Commands::Maintenance { status } => {
            commands::maintenance(&settings, status).await?;
        }
        Commands::SetStatus {
            maintenance_id,
            status,
        } => {
            commands::set_status(&settings, &maintenance_id, status).await?;
        }
        Commands::Note {
            property,
            unit,
            maintenance,
            photos,
            videos,
            text,
        } => {
            let draft = NoteDraft {
                property_id: property,
                unit_id: unit,
                maintenance_request_id: maintenance,
                note: text,
                photo_urls: photos,
                video_urls: videos,
            };
            commands::note(&settings, draft).await?;
        }
        Commands::Watch { conversation_id } => {
            commands::watch(&settings, &conversation_id).await?;
        }
        Commands::PushRegister { token, platform } => {
            commands::push_register(&settings, &token, &platform).await?;
        }
        Commands::Tui => {}
    }

    Ok(())
}
