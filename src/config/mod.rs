//! Environment settings and the cached session file

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::wire::Session;
use crate::auth::StoredToken;
use crate::models::User;

pub const DEFAULT_API_URL: &str = "http://localhost:8787";
const DEFAULT_TENANT: &str = "common";
const DEFAULT_REDIRECT_SCHEME: &str = "propdesk";

/// Deployment settings read from `PROPDESK_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Backend-for-frontend base URL
    pub api_url: String,
    /// Overrides the socket base handed out by chat-access when it has none
    pub chat_ws_url: Option<String>,
    /// Entra tenant for Microsoft sign-in
    pub ms_tenant_id: String,
    /// Entra public client id; Microsoft sign-in is off without it
    pub ms_client_id: Option<String>,
    pub redirect_scheme: String,
    pub password_sign_in: bool,
    pub support_url: Option<String>,
    pub privacy_url: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            api_url: get("PROPDESK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            chat_ws_url: get("PROPDESK_CHAT_WS_URL"),
            ms_tenant_id: get("PROPDESK_MS_TENANT_ID").unwrap_or_else(|| DEFAULT_TENANT.to_string()),
            ms_client_id: get("PROPDESK_MS_CLIENT_ID"),
            redirect_scheme: get("PROPDESK_REDIRECT_SCHEME")
                .unwrap_or_else(|| DEFAULT_REDIRECT_SCHEME.to_string()),
            password_sign_in: get("PROPDESK_ENABLE_PASSWORD_SIGN_IN")
                .map(|v| parse_flag(&v))
                .unwrap_or(cfg!(debug_assertions)),
            support_url: get("PROPDESK_SUPPORT_URL"),
            privacy_url: get("PROPDESK_PRIVACY_URL"),
        }
    }

    pub fn microsoft_sign_in_enabled(&self) -> bool {
        self.ms_client_id.is_some()
    }

    /// Release builds should be pointed at a real backend.
    pub fn warn_if_default_api_url(&self) {
        if !cfg!(debug_assertions) && self.api_url == DEFAULT_API_URL {
            tracing::warn!(
                "PROPDESK_API_URL is not set; using the development default {}",
                DEFAULT_API_URL
            );
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Session persisted between runs
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SessionCache {
    /// Bearer token issued by the backend
    pub token: Option<StoredToken>,
    /// User the token belongs to
    pub user: Option<User>,
    /// Last push token registered with the backend
    pub push_token: Option<String>,
}

impl SessionCache {
    fn cache_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "propdesk", "propdesk")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    fn cache_path() -> Result<PathBuf> {
        Ok(Self::cache_dir()?.join("session.toml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::cache_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::cache_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).context("Failed to read session file")?;
        toml::from_str(&content).context("Failed to parse session file")
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize session")?;
        fs::write(path, content).context("Failed to write session file")?;

        // Holds a bearer token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms).context("Failed to set session file permissions")?;
        }

        Ok(())
    }

    pub fn remember(&mut self, session: &Session) {
        self.token = Some(StoredToken::new(session.token.clone(), session.expires_in));
        self.user = Some(session.user.clone());
    }

    /// The cached session, if there is one and its token is still good.
    pub fn session(&self) -> Option<Session> {
        let token = self.token.as_ref().filter(|t| !t.is_expired())?;
        Some(Session {
            token: token.token.clone(),
            expires_in: token.remaining_secs(),
            user: self.user.clone()?,
        })
    }

    pub fn clear(&mut self) {
        self.token = None;
        self.user = None;
        self.push_token = None;
    }
}
