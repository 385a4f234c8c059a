//! Voice turn controller.
//!
//! A turn is `listening → processing → speaking | idle`. Processing holds
//! the conversation's in-flight guard, so a text send never overlaps a
//! voice round trip. The recording and playback handles live in the
//! controller and are released on every transition away from the state
//! that owns them.
//!
//! Voice mode chains turns hands-free: [`VoiceTurnController::run_voice_mode`]
//! is the single driver loop. Exiting voice mode bumps a generation counter
//! so work that started before the exit never moves the state again. The
//! one exception is a round trip already in flight: it owns `processing`
//! until the backend answers, then returns to idle without speaking.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;

use super::media::{same_playback, AudioPlayer, Microphone, Playback, Recording};
use super::state::{VoiceEvent, VoiceTurnState};
use super::VoiceError;
use crate::client::{SalesApi, VoiceUpload};
use crate::conversation::{ConversationController, SendOutcome, TurnKind};
use crate::models::{AudioClip, ChatReply, Message};

/// Timing of the hands-free loop.
#[derive(Debug, Clone, Copy)]
pub struct VoiceSettings {
    /// Longest a voice-mode listen lasts without a speech-end signal.
    pub listen_ceiling: Duration,
    /// Pause between the end of playback and the next listen.
    pub restart_delay: Duration,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            listen_ceiling: Duration::from_secs(15),
            restart_delay: Duration::from_millis(800),
        }
    }
}

/// Result of one completed voice round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceTurn {
    pub outcome: SendOutcome,
    /// Reply audio started playing.
    pub speaking: bool,
}

#[derive(Default)]
struct VoiceInner {
    state: VoiceTurnState,
    recording: Option<Arc<dyn Recording>>,
    playback: Option<Arc<dyn Playback>>,
    generation: u64,
}

pub struct VoiceTurnController<A: SalesApi> {
    conversation: Arc<ConversationController<A>>,
    microphone: Arc<dyn Microphone>,
    player: Arc<dyn AudioPlayer>,
    settings: VoiceSettings,
    inner: Mutex<VoiceInner>,
    state_tx: watch::Sender<VoiceTurnState>,
    voice_mode: watch::Sender<bool>,
    /// Bumped each time a recording handle is attached.
    attached: watch::Sender<u64>,
}

impl<A: SalesApi> VoiceTurnController<A> {
    pub fn new(
        conversation: Arc<ConversationController<A>>,
        microphone: Arc<dyn Microphone>,
        player: Arc<dyn AudioPlayer>,
        settings: VoiceSettings,
    ) -> Self {
        Self {
            conversation,
            microphone,
            player,
            settings,
            inner: Mutex::new(VoiceInner::default()),
            state_tx: watch::channel(VoiceTurnState::Idle).0,
            voice_mode: watch::channel(false).0,
            attached: watch::channel(0).0,
        }
    }

    fn inner(&self) -> MutexGuard<'_, VoiceInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn conversation(&self) -> &Arc<ConversationController<A>> {
        &self.conversation
    }

    pub fn state(&self) -> VoiceTurnState {
        self.inner().state
    }

    /// State changes, for an overlay to render.
    pub fn subscribe_state(&self) -> watch::Receiver<VoiceTurnState> {
        self.state_tx.subscribe()
    }

    pub fn is_voice_mode(&self) -> bool {
        *self.voice_mode.borrow()
    }

    fn transition(
        &self,
        inner: &mut VoiceInner,
        event: VoiceEvent,
    ) -> Result<VoiceTurnState, VoiceError> {
        let next = inner.state.apply(event)?;
        if next != inner.state {
            tracing::debug!(from = ?inner.state, to = ?next, "Voice state");
        }
        inner.state = next;
        self.state_tx.send_replace(next);
        Ok(next)
    }

    /// Apply `event` unless voice mode was exited since `generation`.
    fn settle(&self, generation: u64, event: VoiceEvent) {
        let mut inner = self.inner();
        if inner.generation != generation {
            return;
        }
        if let Err(e) = self.transition(&mut inner, event) {
            tracing::debug!(error = %e, "Ignoring stale voice event");
        }
    }

    /// End a round trip. Only the turn that entered `processing` can be
    /// there, so a stale generation still leaves it, just never to speak.
    fn leave_processing(&self, generation: u64, event: VoiceEvent) {
        let mut inner = self.inner();
        if inner.state != VoiceTurnState::Processing {
            return;
        }
        let event = match event {
            VoiceEvent::ResponseReady { .. } if inner.generation != generation => {
                VoiceEvent::ResponseReady { speak: false }
            }
            event => event,
        };
        if let Err(e) = self.transition(&mut inner, event) {
            tracing::debug!(error = %e, "Ignoring stale voice event");
        }
    }

    // ── Recording ────────────────────────────────────────

    pub async fn start_recording(&self) -> Result<(), VoiceError> {
        if self.conversation.is_sending() {
            return Err(VoiceError::Busy);
        }
        let generation = {
            let mut inner = self.inner();
            self.transition(&mut inner, VoiceEvent::StartListening)?;
            inner.generation
        };

        let recording = match self.microphone.open().await {
            Ok(recording) => recording,
            Err(e) => {
                tracing::warn!(error = %e, "Microphone unavailable");
                self.settle(generation, VoiceEvent::CancelListening);
                return Err(e.into());
            }
        };

        let attached = {
            let mut inner = self.inner();
            let current =
                inner.generation == generation && inner.state == VoiceTurnState::Listening;
            if current {
                inner.recording = Some(recording.clone());
            }
            current
        };
        if !attached {
            recording.cancel().await;
            return Err(VoiceError::Cancelled);
        }
        self.attached.send_modify(|n| *n += 1);
        tracing::debug!("Listening");
        Ok(())
    }

    /// Finish the recording and run one voice round trip.
    pub async fn stop_recording(&self) -> Result<VoiceTurn, VoiceError> {
        let (recording, generation) = {
            let mut inner = self.inner();
            let Some(recording) = inner.recording.take() else {
                return Err(match inner.state {
                    VoiceTurnState::Listening => VoiceError::NotReady,
                    from => VoiceError::InvalidTransition {
                        from,
                        event: VoiceEvent::StopListening,
                    },
                });
            };
            self.transition(&mut inner, VoiceEvent::StopListening)?;
            (recording, inner.generation)
        };

        let Some(guard) = self.conversation.try_begin(TurnKind::Voice) else {
            recording.cancel().await;
            self.leave_processing(generation, VoiceEvent::ProcessingFailed);
            return Err(VoiceError::Busy);
        };

        let clip = match recording.finish().await {
            Ok(clip) if !clip.bytes.is_empty() => clip,
            Ok(_) => {
                self.leave_processing(generation, VoiceEvent::ProcessingFailed);
                return Err(VoiceError::EmptyRecording);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Recording failed");
                self.leave_processing(generation, VoiceEvent::ProcessingFailed);
                return Err(e.into());
            }
        };

        let config = self.conversation.config();
        let (epoch, lead_id) = self.conversation.turn_context();
        let upload = VoiceUpload {
            audio: clip,
            lead_id,
            conversation_stage: config.conversation_stage,
            provider: config.provider,
            language: config.language.code().to_string(),
        };
        tracing::debug!(bytes = upload.audio.bytes.len(), "Submitting voice turn");

        let result = self.conversation.api().send_voice(upload).await;
        let heard = result.as_ref().ok().and_then(ChatReply::transcription);
        let outcome = self.conversation.finish_turn(epoch, result, heard.as_deref());
        drop(guard);

        let reply_audio = match outcome {
            SendOutcome::Replied if self.is_voice_mode() => self
                .conversation
                .last_message()
                .and_then(|m| speech_clip(&m).ok()),
            _ => None,
        };
        let speaking = match reply_audio {
            Some(clip) => self.speak(generation, clip).await,
            None => false,
        };
        if !speaking {
            let event = match outcome {
                SendOutcome::Failed(_) => VoiceEvent::ProcessingFailed,
                _ => VoiceEvent::ResponseReady { speak: false },
            };
            self.leave_processing(generation, event);
        }
        Ok(VoiceTurn { outcome, speaking })
    }

    async fn speak(&self, generation: u64, clip: AudioClip) -> bool {
        {
            let mut inner = self.inner();
            if inner.generation != generation {
                return false;
            }
            if self
                .transition(&mut inner, VoiceEvent::ResponseReady { speak: true })
                .is_err()
            {
                return false;
            }
        }

        match self.player.play(clip).await {
            Ok(playback) => {
                let mut inner = self.inner();
                let current = inner.generation == generation
                    && inner.state == VoiceTurnState::Speaking
                    && inner.playback.is_none();
                if current {
                    inner.playback = Some(playback);
                } else {
                    drop(inner);
                    playback.stop();
                }
                current
            }
            Err(e) => {
                tracing::warn!(error = %e, "Reply playback failed");
                self.abandon_playback(generation);
                false
            }
        }
    }

    // ── Playback ─────────────────────────────────────────

    /// Play a stored reply's speech audio, stopping whatever plays now.
    /// Refused while a voice round trip is in flight. Returns when this
    /// playback ends or is replaced.
    pub async fn play_message(&self, message_id: &str) -> Result<(), VoiceError> {
        let message = self
            .conversation
            .message(message_id)
            .ok_or(VoiceError::NoSpeechAudio)?;
        let clip = speech_clip(&message)?;

        let (previous, generation) = {
            let mut inner = self.inner();
            if inner.state == VoiceTurnState::Processing
                || self.conversation.current_turn() == Some(TurnKind::Voice)
            {
                return Err(VoiceError::Busy);
            }
            self.transition(&mut inner, VoiceEvent::StartPlayback)?;
            (inner.playback.take(), inner.generation)
        };
        if let Some(previous) = previous {
            previous.stop();
        }

        let playback = match self.player.play(clip).await {
            Ok(playback) => playback,
            Err(e) => {
                self.abandon_playback(generation);
                return Err(e.into());
            }
        };
        {
            let mut inner = self.inner();
            if inner.generation != generation || inner.state != VoiceTurnState::Speaking {
                drop(inner);
                playback.stop();
                return Ok(());
            }
            if let Some(other) = inner.playback.replace(playback.clone()) {
                other.stop();
            }
        }

        playback.ended().await;
        self.finish_playback(&playback);
        Ok(())
    }

    /// Stop whatever is playing.
    pub fn stop_playback(&self) {
        let playback = {
            let mut inner = self.inner();
            let playback = inner.playback.take();
            if playback.is_some() {
                let _ = self.transition(&mut inner, VoiceEvent::PlaybackFinished);
            }
            playback
        };
        if let Some(playback) = playback {
            playback.stop();
        }
    }

    fn finish_playback(&self, playback: &Arc<dyn Playback>) {
        let mut inner = self.inner();
        let current = inner
            .playback
            .as_ref()
            .is_some_and(|p| same_playback(p, playback));
        if current {
            inner.playback = None;
            let _ = self.transition(&mut inner, VoiceEvent::PlaybackFinished);
        }
    }

    // Speaking was entered but nothing started playing.
    fn abandon_playback(&self, generation: u64) {
        let mut inner = self.inner();
        if inner.generation == generation
            && inner.state == VoiceTurnState::Speaking
            && inner.playback.is_none()
        {
            let _ = self.transition(&mut inner, VoiceEvent::PlaybackFinished);
        }
    }

    // ── Voice mode ───────────────────────────────────────

    /// Enter or exit voice mode. Entering starts listening right away;
    /// returns whether voice mode is now on.
    pub async fn toggle_voice_mode(&self) -> Result<bool, VoiceError> {
        if self.is_voice_mode() {
            self.exit_voice_mode().await;
            return Ok(false);
        }

        self.voice_mode.send_replace(true);
        tracing::info!("Voice mode on");
        match self.start_recording().await {
            Ok(()) => Ok(true),
            Err(e) => {
                self.exit_voice_mode().await;
                Err(e)
            }
        }
    }

    /// Cancel local capture and playback and return to idle. A round trip
    /// already in flight keeps the state at processing until it completes
    /// and appends its messages; its reply is not spoken.
    pub async fn exit_voice_mode(&self) {
        self.voice_mode.send_replace(false);
        let (recording, playback) = {
            let mut inner = self.inner();
            inner.generation += 1;
            let handles = (inner.recording.take(), inner.playback.take());
            if inner.state != VoiceTurnState::Processing {
                let _ = self.transition(&mut inner, VoiceEvent::Reset);
            }
            handles
        };
        if let Some(playback) = playback {
            playback.stop();
        }
        if let Some(recording) = recording {
            recording.cancel().await;
        }
        tracing::info!("Voice mode off");
    }

    /// Drive hands-free turns until voice mode is exited.
    ///
    /// A listen ends on the recording's speech-end signal or after the
    /// listen ceiling. A failed round trip or an unusable microphone ends
    /// voice mode.
    pub async fn run_voice_mode(&self) -> Result<(), VoiceError> {
        let mut mode = self.voice_mode.subscribe();
        let mut states = self.state_tx.subscribe();

        while self.is_voice_mode() {
            match self.state() {
                VoiceTurnState::Idle => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.settings.restart_delay) => {}
                        _ = voice_mode_exited(&mut mode) => break,
                    }
                    match self.start_recording().await {
                        Ok(()) => {}
                        // Something else holds the conversation; try again later.
                        Err(VoiceError::Busy | VoiceError::Cancelled | VoiceError::InvalidTransition { .. }) => {}
                        Err(e) => {
                            self.exit_voice_mode().await;
                            return Err(e);
                        }
                    }
                }
                VoiceTurnState::Listening => {
                    let mut attached = self.attached.subscribe();
                    let recording = self.inner().recording.clone();
                    let Some(recording) = recording else {
                        // Microphone still opening.
                        tokio::select! {
                            _ = attached.changed() => {}
                            _ = states.changed() => {}
                            _ = voice_mode_exited(&mut mode) => break,
                        }
                        continue;
                    };
                    tokio::select! {
                        _ = recording.speech_ended() => tracing::debug!("Speech ended"),
                        _ = tokio::time::sleep(self.settings.listen_ceiling) => {
                            tracing::debug!("Listen ceiling reached")
                        }
                        _ = voice_mode_exited(&mut mode) => break,
                    }
                    match self.stop_recording().await {
                        Ok(VoiceTurn {
                            outcome: SendOutcome::Failed(e),
                            ..
                        }) => {
                            tracing::warn!(error = %e, "Voice turn failed, leaving voice mode");
                            self.exit_voice_mode().await;
                            return Ok(());
                        }
                        Ok(_) => {}
                        Err(e) => tracing::debug!(error = %e, "Voice turn skipped"),
                    }
                }
                VoiceTurnState::Speaking => {
                    let playback = self.inner().playback.clone();
                    match playback {
                        Some(playback) => {
                            tokio::select! {
                                _ = playback.ended() => self.finish_playback(&playback),
                                _ = voice_mode_exited(&mut mode) => break,
                            }
                        }
                        None => {
                            tokio::select! {
                                _ = states.changed() => {}
                                _ = voice_mode_exited(&mut mode) => break,
                            }
                        }
                    }
                }
                VoiceTurnState::Processing => {
                    tokio::select! {
                        _ = states.changed() => {}
                        _ = voice_mode_exited(&mut mode) => break,
                    }
                }
            }
        }
        Ok(())
    }
}

async fn voice_mode_exited(mode: &mut watch::Receiver<bool>) {
    let _ = mode.wait_for(|on| !on).await;
}

/// Decode a message's reply audio.
fn speech_clip(message: &Message) -> Result<AudioClip, VoiceError> {
    let speech = message.speech_audio().ok_or(VoiceError::NoSpeechAudio)?;
    let payload = speech.audio_data.as_deref().unwrap_or_default();
    Ok(AudioClip::from_base64(payload, speech.format.as_deref())?)
}
