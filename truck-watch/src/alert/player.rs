//! Alert playback
//!
//! Playback is fire-and-forget: failures are logged and never reach the
//! order stream.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::tone::AlertTone;

#[derive(Debug, Error)]
pub enum SoundError {
    /// Playback refused, typically autoplay before any user interaction
    #[error("Playback blocked: {0}")]
    Blocked(String),

    #[error("Audio output unavailable: {0}")]
    Unavailable(String),
}

pub type SoundResult<T> = Result<T, SoundError>;

/// Audio output
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, tone: &AlertTone) -> SoundResult<()>;
}

/// Plays the new-order alert
#[derive(Clone)]
pub struct AlertPlayer {
    sink: Arc<dyn AudioSink>,
    tone: Arc<AlertTone>,
}

impl AlertPlayer {
    pub fn new(sink: Arc<dyn AudioSink>, tone: AlertTone) -> Self {
        Self {
            sink,
            tone: Arc::new(tone),
        }
    }

    pub fn tone(&self) -> &AlertTone {
        &self.tone
    }

    /// Start playback on a separate task
    pub fn play_detached(&self) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        let tone = Arc::clone(&self.tone);
        tokio::spawn(async move {
            match sink.play(&tone).await {
                Ok(()) => debug!("Alert sound played"),
                Err(e) => warn!(error = %e, "Could not play alert sound"),
            }
        })
    }
}

impl std::fmt::Debug for AlertPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertPlayer")
            .field("volume", &self.tone.volume())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        plays: AtomicUsize,
        blocked: bool,
    }

    #[async_trait]
    impl AudioSink for CountingSink {
        async fn play(&self, _tone: &AlertTone) -> SoundResult<()> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            if self.blocked {
                return Err(SoundError::Blocked("no user gesture yet".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_play_detached_plays_once() {
        let sink = Arc::new(CountingSink::default());
        let player = AlertPlayer::new(sink.clone(), AlertTone::default());

        player.play_detached().await.unwrap();

        assert_eq!(sink.plays.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_playback_failure_is_contained() {
        let sink = Arc::new(CountingSink {
            blocked: true,
            ..Default::default()
        });
        let player = AlertPlayer::new(sink.clone(), AlertTone::default());

        // Task completes normally even though the sink failed
        player.play_detached().await.unwrap();
        assert_eq!(sink.plays.load(Ordering::SeqCst), 1);
    }
}
