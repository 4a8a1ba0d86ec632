//! OAuth2 device code flow for Entra ID

use anyhow::{Context, Result};
use oauth2::{
    basic::BasicClient, AuthUrl, ClientId, DeviceAuthorizationUrl, RedirectUrl, Scope,
    StandardDeviceAuthorizationResponse, TokenResponse, TokenUrl,
};

use super::AuthConfig;

pub(super) fn build_client(auth_config: &AuthConfig) -> Result<BasicClient> {
    let auth_url = AuthUrl::new(auth_config.endpoint("authorize"))?;
    let token_url = TokenUrl::new(auth_config.endpoint("token"))?;
    let device_url = DeviceAuthorizationUrl::new(auth_config.endpoint("devicecode"))?;
    let redirect_url = RedirectUrl::new(auth_config.redirect_uri.clone())?;

    Ok(BasicClient::new(
        ClientId::new(auth_config.client_id.clone()),
        None,
        auth_url,
        Some(token_url),
    )
    .set_device_authorization_url(device_url)
    .set_redirect_uri(redirect_url))
}

/// Run the device code flow and return the Entra access token.
///
/// `prompt` receives the verification URL and the user code; polling starts
/// right after it returns.
pub async fn microsoft_access_token<F>(auth_config: &AuthConfig, prompt: F) -> Result<String>
where
    F: FnOnce(&str, &str),
{
    let client = build_client(auth_config)?;

    tracing::info!("Initiating device code flow (tenant {})", auth_config.tenant);
    let mut request = client.exchange_device_code()?;
    for scope in &auth_config.scopes {
        request = request.add_scope(Scope::new(scope.clone()));
    }
    let device_auth_response: StandardDeviceAuthorizationResponse = request
        .request_async(oauth2::reqwest::async_http_client)
        .await
        .context("Failed to request device code")?;

    prompt(
        device_auth_response.verification_uri().as_str(),
        device_auth_response.user_code().secret(),
    );

    tracing::info!("Waiting for Microsoft sign-in...");
    let token_response = client
        .exchange_device_access_token(&device_auth_response)
        .request_async(oauth2::reqwest::async_http_client, tokio::time::sleep, None)
        .await
        .context("Failed to exchange device code for token")?;

    Ok(token_response.access_token().secret().to_string())
}
