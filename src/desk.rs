//! One signed-in user's desk: the session directory, the open
//! conversation and its voice controller, kept in step.

use std::sync::Arc;

use crate::client::{ClientError, SalesApi};
use crate::config::ClientConfig;
use crate::conversation::ConversationController;
use crate::directory::{DeleteOutcome, SessionDirectory};
use crate::models::SessionSummary;
use crate::voice::{AudioPlayer, Microphone, VoiceSettings, VoiceTurnController};

pub struct SalesDesk<A: SalesApi> {
    directory: Arc<SessionDirectory<A>>,
    conversation: Arc<ConversationController<A>>,
    voice: Arc<VoiceTurnController<A>>,
}

impl<A: SalesApi> SalesDesk<A> {
    pub fn new(
        api: Arc<A>,
        config: ClientConfig,
        microphone: Arc<dyn Microphone>,
        player: Arc<dyn AudioPlayer>,
        settings: VoiceSettings,
    ) -> Self {
        let directory = Arc::new(SessionDirectory::new(api.clone()));
        let conversation = Arc::new(ConversationController::new(
            api,
            config,
            directory.refresh_signal(),
        ));
        let voice = Arc::new(VoiceTurnController::new(
            conversation.clone(),
            microphone,
            player,
            settings,
        ));
        Self {
            directory,
            conversation,
            voice,
        }
    }

    pub fn directory(&self) -> &Arc<SessionDirectory<A>> {
        &self.directory
    }

    pub fn conversation(&self) -> &Arc<ConversationController<A>> {
        &self.conversation
    }

    pub fn voice(&self) -> &Arc<VoiceTurnController<A>> {
        &self.voice
    }

    /// Load the sidebar and open `session_id` (or a new chat). A failed
    /// lead list leaves the sidebar empty; the conversation still opens.
    pub async fn open(&self, session_id: Option<&str>) {
        let selection = match session_id {
            Some(id) => self.directory.select_chat(id),
            None => self.directory.start_new_chat(),
        };
        let (sessions, ()) = tokio::join!(
            self.directory.load_sessions(),
            self.conversation.init(selection.lead_id.as_deref()),
        );
        if let Err(e) = sessions {
            tracing::warn!(error = %e, "Opened without a session list");
        }
    }

    pub async fn select_chat(&self, lead_id: &str) {
        self.release_voice().await;
        let selection = self.directory.select_chat(lead_id);
        tracing::info!(lead_id, generation = selection.generation, "Chat selected");
        self.conversation.reset(selection.lead_id.as_deref()).await;
    }

    pub async fn start_new_chat(&self) {
        self.release_voice().await;
        let selection = self.directory.start_new_chat();
        tracing::info!(generation = selection.generation, "New chat");
        self.conversation.reset(None).await;
    }

    /// Drop a chat from the sidebar. Deleting the open chat starts a new one.
    pub async fn delete_chat(&self, lead_id: &str) -> DeleteOutcome {
        let outcome = self.directory.delete_chat(lead_id);
        if outcome.unbound_active {
            self.release_voice().await;
            self.conversation.reset(None).await;
        }
        outcome
    }

    /// Wait for the next refresh request, then record a fresh binding and
    /// reload the list.
    pub async fn refresh_sessions_on_signal(&self) -> Result<Vec<SessionSummary>, ClientError> {
        self.directory.refresh_signal().notified().await;
        if let Some(lead_id) = self.conversation.current_session_id() {
            self.directory.note_bound(&lead_id);
        }
        self.directory.load_sessions().await
    }

    /// Keep the sidebar current for as long as the desk lives.
    pub async fn run_refresh_loop(&self) {
        loop {
            // Failures are logged by the directory; the next signal retries.
            let _ = self.refresh_sessions_on_signal().await;
        }
    }

    // A chat switch abandons local capture and playback.
    async fn release_voice(&self) {
        if self.voice.is_voice_mode() || self.voice.state().is_busy() {
            self.voice.exit_voice_mode().await;
        }
    }
}
