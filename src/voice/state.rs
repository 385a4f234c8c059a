use serde::Serialize;

use super::VoiceError;

/// Where the voice turn is. Exactly one at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceTurnState {
    #[default]
    Idle,
    /// Microphone open, capturing.
    Listening,
    /// Clip uploaded, waiting for transcription + reply.
    Processing,
    /// Reply audio playing.
    Speaking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEvent {
    StartListening,
    StopListening,
    CancelListening,
    /// The round trip finished. `speak` is true when reply audio will play.
    ResponseReady { speak: bool },
    ProcessingFailed,
    /// Replay of a stored reply, outside a voice turn.
    StartPlayback,
    PlaybackFinished,
    /// Voice mode exited or the turn was abandoned.
    Reset,
}

impl VoiceTurnState {
    pub fn apply(self, event: VoiceEvent) -> Result<Self, VoiceError> {
        use VoiceEvent::*;
        use VoiceTurnState::*;

        match (self, event) {
            (_, Reset) => Ok(Idle),
            (Idle, StartListening) => Ok(Listening),
            (Listening, StopListening) => Ok(Processing),
            (Listening, CancelListening) => Ok(Idle),
            (Processing, ResponseReady { speak: true }) => Ok(Speaking),
            (Processing, ResponseReady { speak: false }) => Ok(Idle),
            (Processing, ProcessingFailed) => Ok(Idle),
            // Replaying while something plays replaces the current playback.
            (Idle | Speaking, StartPlayback) => Ok(Speaking),
            (Speaking, PlaybackFinished) => Ok(Idle),
            (from, event) => Err(VoiceError::InvalidTransition { from, event }),
        }
    }

    pub fn is_busy(&self) -> bool {
        *self != Self::Idle
    }
}
