//! Sign-in helpers
//!
//! Password sign-in goes straight to the backend. Microsoft sign-in runs the
//! OAuth2 device code flow against Entra ID and hands the resulting access
//! token to the backend, which answers with its own session.

pub mod oauth;
pub mod tokens;

pub use oauth::microsoft_access_token;
pub use tokens::StoredToken;

use crate::config::Settings;

/// Entra ID client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    /// OAuth2 client ID (public client)
    pub client_id: String,
    /// Entra tenant (`common` for multi-tenant)
    pub tenant: String,
    pub scopes: Vec<String>,
    /// Registered redirect URI, built from the app's URL scheme
    pub redirect_uri: String,
}

impl AuthConfig {
    /// `None` when no client id is configured.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let client_id = settings.ms_client_id.clone()?;
        Some(Self {
            client_id,
            tenant: settings.ms_tenant_id.clone(),
            scopes: ["openid", "profile", "email", "offline_access"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            redirect_uri: format!("{}://auth", settings.redirect_scheme),
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/{}",
            self.tenant, name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_without_client_id() {
        let settings = Settings::from_lookup(|_| None);
        assert!(AuthConfig::from_settings(&settings).is_none());
    }

    #[test]
    fn test_endpoints_use_tenant() {
        let settings = Settings::from_lookup(|k| match k {
            "PROPDESK_MS_CLIENT_ID" => Some("cid".into()),
            "PROPDESK_MS_TENANT_ID" => Some("contoso.onmicrosoft.com".into()),
            _ => None,
        });
        let config = AuthConfig::from_settings(&settings).unwrap();
        assert_eq!(config.client_id, "cid");
        assert_eq!(
            config.endpoint("token"),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );
        assert!(config.scopes.iter().any(|s| s == "offline_access"));
        assert_eq!(config.redirect_uri, "propdesk://auth");
    }

    #[test]
    fn test_redirect_uri_follows_scheme() {
        let settings = Settings::from_lookup(|k| match k {
            "PROPDESK_MS_CLIENT_ID" => Some("cid".into()),
            "PROPDESK_REDIRECT_SCHEME" => Some("acme-desk".into()),
            _ => None,
        });
        let config = AuthConfig::from_settings(&settings).unwrap();
        assert_eq!(config.redirect_uri, "acme-desk://auth");
        assert!(oauth::build_client(&config).is_ok());
    }
}
