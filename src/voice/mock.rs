//! Scripted media devices for voice tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use super::media::{AudioPlayer, MediaError, Microphone, Playback, Recording};
use crate::models::AudioClip;

/// Microphone that yields a fixed clip. Each opened recording pops one
/// speech-end delay; once the queue is empty speech never ends.
#[derive(Default)]
pub struct MockMicrophone {
    deny: bool,
    clip_bytes: Vec<u8>,
    speech_after: Mutex<VecDeque<Duration>>,
    open_delay: Option<Duration>,
    opened: AtomicUsize,
    cancelled: Arc<AtomicUsize>,
}

impl MockMicrophone {
    pub fn new() -> Self {
        Self {
            clip_bytes: vec![9, 9, 9],
            ..Self::default()
        }
    }

    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::default()
        }
    }

    /// Recordings produce an empty clip.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn with_speech_end(self, after: Duration) -> Self {
        self.speech_after.lock().unwrap().push_back(after);
        self
    }

    /// Opening takes this long, like a permission prompt.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Microphone for MockMicrophone {
    async fn open(&self) -> Result<Arc<dyn Recording>, MediaError> {
        if self.deny {
            return Err(MediaError::PermissionDenied);
        }
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockRecording {
            clip: AudioClip::new(self.clip_bytes.clone(), "audio/webm"),
            speech_after: self.speech_after.lock().unwrap().pop_front(),
            cancelled: self.cancelled.clone(),
        }))
    }
}

struct MockRecording {
    clip: AudioClip,
    speech_after: Option<Duration>,
    cancelled: Arc<AtomicUsize>,
}

#[async_trait]
impl Recording for MockRecording {
    async fn finish(&self) -> Result<AudioClip, MediaError> {
        Ok(self.clip.clone())
    }

    async fn cancel(&self) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }

    async fn speech_ended(&self) {
        match self.speech_after {
            Some(after) => tokio::time::sleep(after).await,
            None => std::future::pending().await,
        }
    }
}

/// Player whose playbacks last a fixed time unless stopped.
pub struct MockPlayer {
    duration: Duration,
    fail: bool,
    played: Mutex<Vec<AudioClip>>,
    handles: Mutex<Vec<Arc<MockPlayback>>>,
}

impl MockPlayer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            fail: false,
            played: Mutex::new(Vec::new()),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Duration::ZERO)
        }
    }

    pub fn played(&self) -> Vec<AudioClip> {
        self.played.lock().unwrap().clone()
    }

    pub fn handles(&self) -> Vec<Arc<MockPlayback>> {
        self.handles.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioPlayer for MockPlayer {
    async fn play(&self, clip: AudioClip) -> Result<Arc<dyn Playback>, MediaError> {
        if self.fail {
            return Err(MediaError::Playback("decoder missing".into()));
        }
        self.played.lock().unwrap().push(clip);
        let (stopped, _) = watch::channel(false);
        let handle = Arc::new(MockPlayback {
            duration: self.duration,
            stopped,
            was_stopped: AtomicBool::new(false),
        });
        self.handles.lock().unwrap().push(handle.clone());
        Ok(handle)
    }
}

pub struct MockPlayback {
    duration: Duration,
    stopped: watch::Sender<bool>,
    was_stopped: AtomicBool,
}

impl MockPlayback {
    pub fn is_stopped(&self) -> bool {
        self.was_stopped.load(Ordering::SeqCst)
    }
}

async fn stop_requested(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopped| *stopped).await;
}

#[async_trait]
impl Playback for MockPlayback {
    fn stop(&self) {
        self.was_stopped.store(true, Ordering::SeqCst);
        self.stopped.send_replace(true);
    }

    async fn ended(&self) {
        let rx = self.stopped.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(self.duration) => {}
            _ = stop_requested(rx) => {}
        }
    }
}
