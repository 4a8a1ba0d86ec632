//! Backend endpoints behind the [`RemoteApi`] seam

use async_trait::async_trait;
use serde_json::json;

use super::client::BffClient;
use super::error::ApiResult;
use super::wire::*;
use crate::models::{MaintenanceRequest, MaintenanceStatus, Message, SiteVisitNote, User};

/// Everything the store needs from the backend.
///
/// Implemented by [`BffClient`] for real traffic and by an in-memory fake in tests.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    fn set_bearer_token(&mut self, token: Option<String>);
    fn bearer_token(&self) -> Option<&str>;

    /// Base URL used to derive the chat socket address when the backend omits one.
    fn base_url(&self) -> &str;

    async fn sign_in(&self, email: &str, password: &str) -> ApiResult<Session>;
    async fn sign_in_with_microsoft(&self, access_token: &str) -> ApiResult<Session>;
    async fn bootstrap(&self) -> ApiResult<Bootstrap>;

    async fn assign_conversation(&self, conversation_id: &str) -> ApiResult<()>;
    async fn send_message(
        &self,
        conversation_id: &str,
        request: &SendMessageRequest,
    ) -> ApiResult<Option<Message>>;
    async fn fetch_conversation(&self, conversation_id: &str) -> ApiResult<ConversationThread>;
    async fn close_conversation(&self, conversation_id: &str) -> ApiResult<()>;
    async fn chat_access(&self, conversation_id: &str) -> ApiResult<ChatAccess>;

    async fn update_maintenance_status(
        &self,
        maintenance_id: &str,
        status: MaintenanceStatus,
    ) -> ApiResult<MaintenanceRequest>;
    async fn add_maintenance_update(
        &self,
        maintenance_id: &str,
        request: &MaintenanceUpdateRequest,
    ) -> ApiResult<SiteVisitNote>;
    async fn create_visit_note(&self, request: &VisitNoteRequest) -> ApiResult<SiteVisitNote>;

    async fn register_push_token(&self, push_token: &str, platform: &str) -> ApiResult<()>;
    async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User>;
}

#[async_trait]
impl RemoteApi for BffClient {
    fn set_bearer_token(&mut self, token: Option<String>) {
        BffClient::set_bearer_token(self, token)
    }

    fn bearer_token(&self) -> Option<&str> {
        BffClient::bearer_token(self)
    }

    fn base_url(&self) -> &str {
        BffClient::base_url(self)
    }

    async fn sign_in(&self, email: &str, password: &str) -> ApiResult<Session> {
        self.post(&["auth", "sign-in"], &SignInRequest { email, password })
            .await
    }

    async fn sign_in_with_microsoft(&self, access_token: &str) -> ApiResult<Session> {
        self.post(&["auth", "microsoft"], &ProviderSignInRequest { access_token })
            .await
    }

    async fn bootstrap(&self) -> ApiResult<Bootstrap> {
        self.get(&["bootstrap"]).await
    }

    async fn assign_conversation(&self, conversation_id: &str) -> ApiResult<()> {
        self.post_ignore(&["conversations", conversation_id, "assign"], &json!({}))
            .await
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        request: &SendMessageRequest,
    ) -> ApiResult<Option<Message>> {
        let resp: SendMessageResponse = self
            .post(&["conversations", conversation_id, "messages"], request)
            .await?;
        Ok(resp.message)
    }

    async fn fetch_conversation(&self, conversation_id: &str) -> ApiResult<ConversationThread> {
        self.get(&["conversations", conversation_id, "messages"])
            .await
    }

    async fn close_conversation(&self, conversation_id: &str) -> ApiResult<()> {
        self.post_ignore(&["conversations", conversation_id, "close"], &json!({}))
            .await
    }

    async fn chat_access(&self, conversation_id: &str) -> ApiResult<ChatAccess> {
        self.post(&["conversations", conversation_id, "chat-access"], &json!({}))
            .await
    }

    async fn update_maintenance_status(
        &self,
        maintenance_id: &str,
        status: MaintenanceStatus,
    ) -> ApiResult<MaintenanceRequest> {
        let resp: MaintenanceEnvelope = self
            .patch(&["maintenance", maintenance_id], &StatusPatch { status })
            .await?;
        Ok(resp.maintenance_request)
    }

    async fn add_maintenance_update(
        &self,
        maintenance_id: &str,
        request: &MaintenanceUpdateRequest,
    ) -> ApiResult<SiteVisitNote> {
        let resp: UpdateEnvelope = self
            .post(&["maintenance", maintenance_id, "updates"], request)
            .await?;
        Ok(resp.update)
    }

    async fn create_visit_note(&self, request: &VisitNoteRequest) -> ApiResult<SiteVisitNote> {
        let resp: VisitNoteEnvelope = self.post(&["visit-notes"], request).await?;
        Ok(resp.visit_note)
    }

    async fn register_push_token(&self, push_token: &str, platform: &str) -> ApiResult<()> {
        self.post_ignore(
            &["push", "register"],
            &PushRegistration {
                push_token,
                platform,
            },
        )
        .await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User> {
        let resp: UserEnvelope = self.patch(&["me"], update).await?;
        Ok(resp.user)
    }
}
