//! Typed access to the gateway surface.
//!
//! Controllers depend on the [`SalesApi`] / [`AuthApi`] traits, not on
//! HTTP, so they can be driven by [`HttpSalesClient`] in production and
//! by in-memory mocks in tests.

pub mod error;
pub mod http;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;

use crate::models::{
    AudioClip, ChatReply, ChatRequest, HistoryResponse, LeadRecord, LoginRequest, LoginResponse,
    NewLead, Organization, RegisterRequest, UsageStats, User, UserUpdate,
};

pub use error::ClientError;
pub use http::HttpSalesClient;

/// Multipart body of one voice turn.
#[derive(Debug, Clone)]
pub struct VoiceUpload {
    pub audio: AudioClip,
    pub lead_id: Option<String>,
    pub conversation_stage: String,
    pub provider: String,
    /// Language code (`en`, `ja`).
    pub language: String,
}

/// Conversation and lead endpoints.
#[async_trait]
pub trait SalesApi: Send + Sync {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError>;
    async fn chat_history(&self, lead_id: &str) -> Result<HistoryResponse, ClientError>;
    async fn list_leads(&self) -> Result<Vec<LeadRecord>, ClientError>;
    async fn create_lead(&self, lead: &NewLead) -> Result<LeadRecord, ClientError>;
    async fn send_voice(&self, upload: VoiceUpload) -> Result<ChatReply, ClientError>;
}

/// Account endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ClientError>;
    async fn register(&self, request: &RegisterRequest) -> Result<User, ClientError>;
    async fn logout(&self) -> Result<(), ClientError>;
    async fn current_user(&self) -> Result<User, ClientError>;
    async fn update_current_user(&self, update: &UserUpdate) -> Result<User, ClientError>;
    async fn usage_stats(&self) -> Result<UsageStats, ClientError>;
    async fn public_organizations(&self) -> Result<Vec<Organization>, ClientError>;
}
