use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::AudioError;

/// A loadable, replayable alert sound owned by the host.
#[async_trait]
pub trait AlertSound: Send + Sync {
    async fn play(&self) -> Result<(), AudioError>;
    fn pause(&self);
    /// Seek back to the start.
    fn rewind(&self);

    /// Proves playback is allowed without being heard.
    async fn prime(&self) -> Result<(), AudioError> {
        self.play().await?;
        self.pause();
        self.rewind();
        Ok(())
    }
}

/// Creates fresh sound instances for the retry path.
pub trait SoundFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn AlertSound>, AudioError>;
}

/// The audio channel of the dispatcher.
///
/// Holds one shared sound plus the "audio enabled" state. Hosts that refuse
/// autonomous playback are unlocked with [`AudioChannel::unlock`] from a user
/// interaction.
pub struct AudioChannel {
    factory: Arc<dyn SoundFactory>,
    shared: Option<Arc<dyn AlertSound>>,
    enabled: AtomicBool,
}

impl AudioChannel {
    pub fn new(factory: Arc<dyn SoundFactory>) -> Self {
        let shared = match factory.create() {
            Ok(sound) => Some(sound),
            Err(e) => {
                warn!("alert sound could not be loaded: {}", e);
                None
            }
        };
        Self {
            factory,
            shared,
            enabled: AtomicBool::new(false),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Primes the shared sound. Succeeds once; later calls are no-ops.
    pub async fn unlock(&self) -> bool {
        if self.is_enabled() {
            return true;
        }
        let Some(sound) = &self.shared else {
            debug!("no alert sound to unlock");
            return false;
        };

        match sound.prime().await {
            Ok(()) => {
                self.enabled.store(true, Ordering::SeqCst);
                info!("audio enabled for future notifications");
                true
            }
            Err(e) => {
                debug!("could not enable audio: {}", e);
                false
            }
        }
    }

    /// Plays the alert from the start. A policy refusal is retried once on a
    /// freshly created sound.
    pub async fn play_alert(&self) -> Result<(), AudioError> {
        let Some(sound) = &self.shared else {
            return Err(AudioError::Playback("no alert sound available".to_string()));
        };

        sound.rewind();
        match sound.play().await {
            Ok(()) => Ok(()),
            Err(e) if e.is_policy() => {
                debug!("alert sound blocked ({}), retrying with a fresh sound", e);
                let fresh = self.factory.create()?;
                fresh.play().await
            }
            Err(e) => Err(e),
        }
    }
}
