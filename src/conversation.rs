//! Conversation controller: one chat transcript bound (or not yet bound)
//! to a lead.
//!
//! Lifecycle:
//! - `reset(Some(id))` → hydrate history from the backend; anything other
//!   than a non-empty history falls back to the welcome message.
//! - `reset(None)` → welcome message, unbound.
//! - `send_message` → optimistic user message, then exactly one assistant
//!   reply or error message. The first reply carrying a `lead_id` binds an
//!   unbound conversation; binding is one-way.
//!
//! Only one send (text or voice) is in flight at a time, enforced by an
//! RAII guard. State sits behind a std `Mutex` that is never held across
//! an `.await`. A `reset` bumps an epoch so replies and history that
//! arrive for a previous transcript are discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::client::{ClientError, SalesApi};
use crate::config::ClientConfig;
use crate::directory::RefreshSignal;
use crate::i18n::{starter_prompts, Language, PromptSuggestion};
use crate::models::{ChatReply, ChatRequest, HistoryResponse, Message};

// ═══════════════════════════════════════════════════════════
// In-flight guard
// ═══════════════════════════════════════════════════════════

/// What is holding the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Text,
    Voice,
}

#[derive(Debug, Default)]
struct InFlight {
    busy: AtomicBool,
    kind: Mutex<Option<TurnKind>>,
}

impl InFlight {
    fn try_acquire(&self, kind: TurnKind) -> Option<InFlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        if let Ok(mut current) = self.kind.lock() {
            *current = Some(kind);
        }
        Some(InFlightGuard { flag: self })
    }
}

/// RAII token for the single in-flight send.
///
/// Dropping the guard clears the flag, on every exit path.
pub struct InFlightGuard<'a> {
    flag: &'a InFlight,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut current) = self.flag.kind.lock() {
            *current = None;
        }
        self.flag.busy.store(false, Ordering::Release);
    }
}

// ═══════════════════════════════════════════════════════════
// Controller
// ═══════════════════════════════════════════════════════════

/// What became of a `send_message` call.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Blank input; nothing happened.
    Blank,
    /// Another send is in flight; nothing happened.
    Busy,
    /// The assistant replied.
    Replied,
    /// An error message was appended instead of a reply.
    Failed(ClientError),
    /// The transcript was reset while the request was in flight; the
    /// reply was dropped.
    Superseded,
}

#[derive(Debug, Default)]
struct ConversationState {
    messages: Vec<Message>,
    current_session_id: Option<String>,
    history_loaded: bool,
    epoch: u64,
}

pub struct ConversationController<A: SalesApi> {
    api: Arc<A>,
    config: Mutex<ClientConfig>,
    state: Mutex<ConversationState>,
    in_flight: InFlight,
    refresh: Arc<RefreshSignal>,
}

impl<A: SalesApi> ConversationController<A> {
    pub fn new(api: Arc<A>, config: ClientConfig, refresh: Arc<RefreshSignal>) -> Self {
        Self {
            api,
            config: Mutex::new(config),
            state: Mutex::new(ConversationState::default()),
            in_flight: InFlight::default(),
            refresh,
        }
    }

    // The locks only guard plain data, so a poisoned guard is still usable.
    fn state(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn config(&self) -> ClientConfig {
        self.config.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn language(&self) -> Language {
        self.config().language
    }

    /// Applies to messages created from now on.
    pub fn set_language(&self, language: Language) {
        self.config.lock().unwrap_or_else(|e| e.into_inner()).language = language;
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    // ── Snapshots ────────────────────────────────────────

    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    pub fn message(&self, id: &str) -> Option<Message> {
        self.state().messages.iter().find(|m| m.id == id).cloned()
    }

    pub fn last_message(&self) -> Option<Message> {
        self.state().messages.last().cloned()
    }

    pub fn current_session_id(&self) -> Option<String> {
        self.state().current_session_id.clone()
    }

    /// Epoch and bound lead id, read together.
    pub(crate) fn turn_context(&self) -> (u64, Option<String>) {
        let state = self.state();
        (state.epoch, state.current_session_id.clone())
    }

    pub fn history_loaded(&self) -> bool {
        self.state().history_loaded
    }

    pub fn is_sending(&self) -> bool {
        self.in_flight.busy.load(Ordering::Acquire)
    }

    pub fn current_turn(&self) -> Option<TurnKind> {
        *self.in_flight.kind.lock().ok()?
    }

    /// Suggestions for the empty state, in the current language.
    pub fn starter_prompts(&self) -> Vec<PromptSuggestion> {
        starter_prompts(self.language())
    }

    /// Marker for the current transcript. Changes on every reset.
    pub fn epoch(&self) -> u64 {
        self.state().epoch
    }

    // ── Lifecycle ────────────────────────────────────────

    /// Initial load for an optional session id.
    pub async fn init(&self, session_id: Option<&str>) {
        self.reset(session_id).await;
    }

    /// Start a new transcript: clear everything and re-run init.
    pub async fn reset(&self, lead_id: Option<&str>) {
        let lead_id = lead_id.map(str::trim).filter(|id| !id.is_empty());
        let epoch = {
            let mut state = self.state();
            state.epoch += 1;
            state.messages.clear();
            state.current_session_id = lead_id.map(str::to_string);
            state.history_loaded = false;
            state.epoch
        };

        match lead_id {
            Some(lead_id) => self.hydrate(epoch, lead_id).await,
            None => self.welcome(epoch),
        }
    }

    async fn hydrate(&self, epoch: u64, lead_id: &str) {
        tracing::debug!(lead_id, "Loading chat history");
        let result = self.api.chat_history(lead_id).await;
        let language = self.language();

        let mut state = self.state();
        if state.epoch != epoch {
            tracing::debug!(lead_id, "Discarding history for a superseded transcript");
            return;
        }

        let messages = match result {
            Ok(HistoryResponse {
                history: Some(history),
            }) if !history.is_empty() => history
                .into_iter()
                .enumerate()
                .map(|(index, raw)| raw.into_message(index))
                .collect(),
            Ok(_) => {
                tracing::debug!(lead_id, "No history, showing welcome");
                vec![Message::welcome(language)]
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(lead_id, "History not found, showing welcome");
                vec![Message::welcome(language)]
            }
            Err(e) => {
                tracing::warn!(lead_id, error = %e, "Failed to load chat history");
                vec![Message::welcome(language)]
            }
        };
        state.messages = messages;
        state.history_loaded = true;
    }

    fn welcome(&self, epoch: u64) {
        let language = self.language();
        let mut state = self.state();
        if state.epoch == epoch {
            state.messages = vec![Message::welcome(language)];
            state.history_loaded = true;
        }
    }

    // ── Sending ──────────────────────────────────────────

    /// Claim the conversation for one turn. `None` while another turn is
    /// in flight.
    pub(crate) fn try_begin(&self, kind: TurnKind) -> Option<InFlightGuard<'_>> {
        self.in_flight.try_acquire(kind)
    }

    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Blank;
        }
        let Some(_guard) = self.try_begin(TurnKind::Text) else {
            tracing::debug!("Send ignored, another turn is in flight");
            return SendOutcome::Busy;
        };

        let config = self.config();
        let (epoch, lead_id) = {
            let mut state = self.state();
            state.messages.push(Message::user(text));
            (state.epoch, state.current_session_id.clone())
        };

        let request = ChatRequest {
            message: text.to_string(),
            lead_id,
            conversation_stage: config.conversation_stage,
            provider: config.provider,
        };
        let result = self.api.send_chat(&request).await;
        self.finish_turn(epoch, result, None)
    }

    /// Append the outcome of one round trip. `transcription` is set for
    /// voice turns and becomes the user message.
    pub(crate) fn finish_turn(
        &self,
        epoch: u64,
        result: Result<ChatReply, ClientError>,
        transcription: Option<&str>,
    ) -> SendOutcome {
        let language = self.language();
        let mut state = self.state();
        if state.epoch != epoch {
            tracing::info!("Reply arrived for a superseded transcript, dropping it");
            return SendOutcome::Superseded;
        }

        match result {
            Ok(reply) => {
                if state.current_session_id.is_none() {
                    if let Some(lead_id) = reply.lead_id.as_deref().filter(|id| !id.is_empty()) {
                        tracing::info!(lead_id, "Conversation bound to lead");
                        state.current_session_id = Some(lead_id.to_string());
                    }
                }
                if let Some(heard) = transcription {
                    state.messages.push(Message::user(heard));
                }
                state
                    .messages
                    .push(Message::assistant(reply.text(), reply.metadata()));
                drop(state);
                self.refresh.request();
                SendOutcome::Replied
            }
            Err(e) => {
                tracing::warn!(error = %e, "Chat turn failed");
                state.messages.push(Message::error(&e.user_message(language)));
                SendOutcome::Failed(e)
            }
        }
    }
}
