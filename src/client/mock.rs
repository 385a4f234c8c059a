//! In-memory API doubles for controller tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{AuthApi, ClientError, SalesApi, VoiceUpload};
use crate::models::{
    ChatReply, ChatRequest, HistoryMessage, HistoryResponse, LeadRecord, LoginRequest,
    LoginResponse, NewLead, Organization, RegisterRequest, UsageStats, User, UserUpdate,
};

/// Reply with `response` text and an optional assigned lead id.
pub fn reply(text: &str, lead_id: Option<&str>) -> ChatReply {
    ChatReply {
        response: Some(text.to_string()),
        lead_id: lead_id.map(str::to_string),
        ..ChatReply::default()
    }
}

/// Voice reply with a transcription and base64 speech audio.
pub fn voice_reply(transcription: &str, text: &str, lead_id: Option<&str>) -> ChatReply {
    ChatReply {
        message: Some(text.to_string()),
        lead_id: lead_id.map(str::to_string),
        transcription: Some(transcription.to_string()),
        metadata: Some(serde_json::json!({
            "speech_data": {"audio_data": "AQIDBA==", "format": "mp3"}
        })),
        ..ChatReply::default()
    }
}

pub fn history(entries: &[(&str, &str)]) -> HistoryResponse {
    HistoryResponse {
        history: Some(
            entries
                .iter()
                .enumerate()
                .map(|(i, (role, content))| HistoryMessage {
                    id: Some(format!("h{i}")),
                    content: Some(content.to_string()),
                    role: Some(role.to_string()),
                    timestamp: Some(format!("2025-01-01T00:00:{i:02}Z")),
                    metadata: None::<Value>,
                })
                .collect(),
        ),
    }
}

#[derive(Default)]
pub struct MockSalesApi {
    chat_replies: Mutex<VecDeque<Result<ChatReply, ClientError>>>,
    voice_replies: Mutex<VecDeque<Result<ChatReply, ClientError>>>,
    histories: Mutex<HashMap<String, Result<HistoryResponse, ClientError>>>,
    leads: Mutex<Option<Result<Vec<LeadRecord>, ClientError>>>,
    create_results: Mutex<VecDeque<Result<LeadRecord, ClientError>>>,
    created: Mutex<Vec<NewLead>>,
    chat_requests: Mutex<Vec<ChatRequest>>,
    voice_uploads: Mutex<Vec<VoiceUpload>>,
    history_calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockSalesApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send and voice call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_chat(&self, reply: Result<ChatReply, ClientError>) -> &Self {
        self.chat_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn push_voice(&self, reply: Result<ChatReply, ClientError>) -> &Self {
        self.voice_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn set_history(&self, lead_id: &str, history: Result<HistoryResponse, ClientError>) {
        self.histories
            .lock()
            .unwrap()
            .insert(lead_id.to_string(), history);
    }

    pub fn set_leads(&self, leads: Result<Vec<LeadRecord>, ClientError>) {
        *self.leads.lock().unwrap() = Some(leads);
    }

    /// Queue the answer to the next create. Unqueued creates succeed with
    /// an echo of the request.
    pub fn push_create(&self, result: Result<LeadRecord, ClientError>) -> &Self {
        self.create_results.lock().unwrap().push_back(result);
        self
    }

    pub fn created_leads(&self) -> Vec<NewLead> {
        self.created.lock().unwrap().clone()
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.lock().unwrap().clone()
    }

    pub fn voice_uploads(&self) -> Vec<VoiceUpload> {
        self.voice_uploads.lock().unwrap().clone()
    }

    pub fn history_calls(&self) -> Vec<String> {
        self.history_calls.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SalesApi for MockSalesApi {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError> {
        self.chat_requests.lock().unwrap().push(request.clone());
        self.pause().await;
        self.chat_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Transport("no reply queued".into())))
    }

    async fn chat_history(&self, lead_id: &str) -> Result<HistoryResponse, ClientError> {
        self.history_calls.lock().unwrap().push(lead_id.to_string());
        self.histories
            .lock()
            .unwrap()
            .get(lead_id)
            .cloned()
            .unwrap_or(Err(ClientError::Status {
                status: 404,
                detail: Some("Lead not found".into()),
            }))
    }

    async fn list_leads(&self) -> Result<Vec<LeadRecord>, ClientError> {
        self.leads.lock().unwrap().clone().unwrap_or(Ok(Vec::new()))
    }

    async fn create_lead(&self, lead: &NewLead) -> Result<LeadRecord, ClientError> {
        self.created.lock().unwrap().push(lead.clone());
        self.create_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(LeadRecord {
                    id: Some("new-lead".into()),
                    company_name: Some(lead.company_name.clone()),
                    contact_name: lead.contact_name.clone(),
                    ..LeadRecord::default()
                })
            })
    }

    async fn send_voice(&self, upload: VoiceUpload) -> Result<ChatReply, ClientError> {
        self.voice_uploads.lock().unwrap().push(upload);
        self.pause().await;
        self.voice_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Transport("no reply queued".into())))
    }
}

/// Account API double. Unset calls succeed with empty values.
#[derive(Default)]
pub struct MockAuthApi {
    login: Mutex<Option<Result<LoginResponse, ClientError>>>,
    logout: Mutex<Option<Result<(), ClientError>>>,
    current_user: Mutex<Option<Result<User, ClientError>>>,
    update: Mutex<Option<Result<User, ClientError>>>,
    calls: Mutex<Vec<&'static str>>,
}

impl MockAuthApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_login(self, result: Result<LoginResponse, ClientError>) -> Self {
        *self.login.lock().unwrap() = Some(result);
        self
    }

    pub fn with_logout(self, result: Result<(), ClientError>) -> Self {
        *self.logout.lock().unwrap() = Some(result);
        self
    }

    pub fn with_current_user(self, result: Result<User, ClientError>) -> Self {
        *self.current_user.lock().unwrap() = Some(result);
        self
    }

    pub fn with_update(self, result: Result<User, ClientError>) -> Self {
        *self.update.lock().unwrap() = Some(result);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn login(&self, _request: &LoginRequest) -> Result<LoginResponse, ClientError> {
        self.record("login");
        self.login
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ClientError::Transport("no login queued".into())))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User, ClientError> {
        self.record("register");
        Ok(User {
            email: request.email.clone(),
            role: request.role.clone(),
            ..User::default()
        })
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.record("logout");
        self.logout.lock().unwrap().clone().unwrap_or(Ok(()))
    }

    async fn current_user(&self) -> Result<User, ClientError> {
        self.record("current_user");
        self.current_user
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(User::default()))
    }

    async fn update_current_user(&self, _update: &UserUpdate) -> Result<User, ClientError> {
        self.record("update_current_user");
        self.update
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(User::default()))
    }

    async fn usage_stats(&self) -> Result<UsageStats, ClientError> {
        self.record("usage_stats");
        Ok(UsageStats::default())
    }

    async fn public_organizations(&self) -> Result<Vec<Organization>, ClientError> {
        self.record("public_organizations");
        Ok(Vec::new())
    }
}
