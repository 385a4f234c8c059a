//! reqwest implementation of the API traits, talking to the gateway.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use super::{AuthApi, ClientError, SalesApi, VoiceUpload};
use crate::auth::AuthSession;
use crate::models::{
    ChatReply, ChatRequest, CreatedLead, HistoryResponse, LeadList, LeadRecord, LoginRequest,
    LoginResponse, NewLead, Organization, RegisterRequest, UsageStats, User, UserUpdate,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Gateway client. Every request carries the session's bearer token, and
/// any 401 clears the session.
pub struct HttpSalesClient {
    base_url: Url,
    http: reqwest::Client,
    session: Arc<AuthSession>,
}

impl HttpSalesClient {
    pub fn new(gateway_url: &str, session: Arc<AuthSession>) -> Result<Self, ClientError> {
        let base_url = Url::parse(gateway_url)
            .map_err(|e| ClientError::Transport(format!("invalid gateway URL '{gateway_url}': {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ClientError::from)?;
        Ok(Self {
            base_url,
            http,
            session,
        })
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Transport("gateway URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        let builder = self.http.request(method, self.url(segments)?);
        Ok(match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Send and classify the status. `credential_call` marks login and
    /// register, where 401 means bad credentials rather than a dead session.
    async fn execute(
        &self,
        builder: RequestBuilder,
        credential_call: bool,
    ) -> Result<Response, ClientError> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Gateway request failed");
            ClientError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        let body = response.bytes().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), path = %url, "Gateway returned error status");

        if status == reqwest::StatusCode::UNAUTHORIZED && !credential_call {
            self.session.handle_unauthorized();
            return Err(ClientError::Unauthorized);
        }
        Err(ClientError::from_body(status.as_u16(), &body))
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = self.execute(builder, false).await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl SalesApi for HttpSalesClient {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError> {
        self.json(self.request(Method::POST, &["api", "chat"])?.json(request))
            .await
    }

    async fn chat_history(&self, lead_id: &str) -> Result<HistoryResponse, ClientError> {
        self.json(self.request(Method::GET, &["api", "chat", "history", lead_id])?)
            .await
    }

    async fn list_leads(&self) -> Result<Vec<LeadRecord>, ClientError> {
        let list: LeadList = self.json(self.request(Method::GET, &["api", "leads"])?).await?;
        Ok(list.into_records())
    }

    async fn create_lead(&self, lead: &NewLead) -> Result<LeadRecord, ClientError> {
        let created: CreatedLead = self
            .json(self.request(Method::POST, &["api", "leads"])?.json(lead))
            .await?;
        Ok(created.into_record())
    }

    async fn send_voice(&self, upload: VoiceUpload) -> Result<ChatReply, ClientError> {
        let file_name = upload.audio.file_name();
        let audio = reqwest::multipart::Part::bytes(upload.audio.bytes)
            .file_name(file_name)
            .mime_str(&upload.audio.mime)?;

        let mut form = reqwest::multipart::Form::new().part("audio", audio);
        if let Some(lead_id) = upload.lead_id {
            form = form.text("lead_id", lead_id);
        }
        let form = form
            .text("conversation_stage", upload.conversation_stage)
            .text("provider", upload.provider)
            .text("language", upload.language);

        self.json(
            self.request(Method::POST, &["api", "speech", "chat", "voice"])?
                .multipart(form),
        )
        .await
    }
}

#[async_trait]
impl AuthApi for HttpSalesClient {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ClientError> {
        let builder = self.request(Method::POST, &["api", "auth", "login"])?.json(request);
        decode(self.execute(builder, true).await?).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User, ClientError> {
        let builder = self.request(Method::POST, &["api", "auth", "register"])?.json(request);
        decode(self.execute(builder, true).await?).await
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.execute(self.request(Method::POST, &["api", "auth", "logout"])?, false)
            .await
            .map(|_| ())
    }

    async fn current_user(&self) -> Result<User, ClientError> {
        self.json(self.request(Method::GET, &["api", "auth", "me"])?)
            .await
    }

    async fn update_current_user(&self, update: &UserUpdate) -> Result<User, ClientError> {
        self.json(self.request(Method::PUT, &["api", "auth", "me"])?.json(update))
            .await
    }

    async fn usage_stats(&self) -> Result<UsageStats, ClientError> {
        self.json(self.request(Method::GET, &["api", "auth", "usage"])?)
            .await
    }

    async fn public_organizations(&self) -> Result<Vec<Organization>, ClientError> {
        self.json(self.request(Method::GET, &["api", "organizations", "public"])?)
            .await
    }
}
