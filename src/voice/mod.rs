//! Spoken turns on top of the conversation controller.
//!
//! One [`VoiceTurnState`] value is the single source of truth for what the
//! voice side is doing; every change goes through [`VoiceTurnState::apply`].
//! Capture and playback sit behind the [`Microphone`] and [`AudioPlayer`]
//! traits so a UI shell can plug in its own devices.

pub mod controller;
pub mod media;
#[cfg(test)]
pub mod mock;
pub mod state;

pub use controller::{VoiceSettings, VoiceTurn, VoiceTurnController};
pub use media::{AudioPlayer, MediaError, Microphone, Playback, Recording};
pub use state::{VoiceEvent, VoiceTurnState};

use crate::models::AudioDecodeError;

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("Cannot apply {event:?} while {from:?}")]
    InvalidTransition {
        from: VoiceTurnState,
        event: VoiceEvent,
    },
    #[error("Another turn is in flight")]
    Busy,
    #[error("Microphone is still opening")]
    NotReady,
    #[error("Recording was empty")]
    EmptyRecording,
    #[error("Voice mode was exited")]
    Cancelled,
    #[error("Message has no speech audio")]
    NoSpeechAudio,
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Audio(#[from] AudioDecodeError),
}
