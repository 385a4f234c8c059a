//! Media seams. A UI shell supplies the microphone and speaker; the voice
//! controller only sees these traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::AudioClip;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("Microphone permission denied")]
    PermissionDenied,
    #[error("No audio device available: {0}")]
    Unavailable(String),
    #[error("Recording failed: {0}")]
    Capture(String),
    #[error("Playback failed: {0}")]
    Playback(String),
}

#[async_trait]
pub trait Microphone: Send + Sync {
    /// Acquire the device and start capturing.
    async fn open(&self) -> Result<Arc<dyn Recording>, MediaError>;
}

/// One capture in progress. Either `finish` or `cancel` is called exactly
/// once; both release the device.
#[async_trait]
pub trait Recording: Send + Sync {
    /// Stop and return everything captured as one clip.
    async fn finish(&self) -> Result<AudioClip, MediaError>;

    /// Stop and discard.
    async fn cancel(&self);

    /// Resolves when the speaker stops talking. Devices without voice
    /// activity detection never resolve; the listen ceiling applies.
    async fn speech_ended(&self) {
        std::future::pending::<()>().await
    }
}

#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Start playing. Returns once playback has begun.
    async fn play(&self, clip: AudioClip) -> Result<Arc<dyn Playback>, MediaError>;
}

/// A playback in progress.
#[async_trait]
pub trait Playback: Send + Sync {
    /// Stop early. `ended` resolves afterwards.
    fn stop(&self);

    /// Resolves when playback finishes or is stopped.
    async fn ended(&self);
}

/// Identity of a playback handle, for "is this still the current one".
pub(crate) fn same_playback(a: &Arc<dyn Playback>, b: &Arc<dyn Playback>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
