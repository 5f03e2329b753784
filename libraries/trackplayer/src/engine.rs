//! Engine collaborator interface
//!
//! Abstracts the native decode/render pipeline (ExoPlayer, AVPlayer, a
//! desktop decoder). The controller only issues intents through [`Engine`];
//! results come back asynchronously through the [`EngineNotifier`] handed
//! over in [`Engine::start`].

use crate::buffer::BufferPolicy;
use crate::track::Track;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

/// Synchronous engine failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Engine refused the command
    #[error("Engine rejected command: {0}")]
    Rejected(String),

    /// Engine could not start
    #[error("Engine failed to start: {0}")]
    StartFailed(String),
}

/// Stamp identifying one load request
///
/// Every [`Engine::load`] gets a fresh generation. Notifications carry the
/// generation of the load they belong to, so reports about an item that has
/// since been replaced can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct LoadGeneration(u64);

impl LoadGeneration {
    pub fn value(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Position and buffering report
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Telemetry {
    pub position: Duration,
    pub buffered: Duration,
    pub duration: Option<Duration>,
    pub rate: f32,
}

/// Notification from the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Current item loaded and ready to play
    Ready,

    /// Periodic position report
    Telemetry(Telemetry),

    /// Buffer became insufficient (`true`) or sufficient again (`false`)
    BufferingChanged(bool),

    /// Current item played to its end
    ItemEnded,

    /// Unrecoverable decode or network error
    FatalError(String),
}

/// Engine notification tagged with its load generation
#[derive(Debug, Clone, PartialEq)]
pub struct EngineMessage {
    pub generation: LoadGeneration,
    pub event: EngineEvent,
}

/// Thread-safe channel from the engine to the controller
///
/// Sending never blocks, so it is safe to call from native callbacks.
#[derive(Debug, Clone)]
pub struct EngineNotifier {
    tx: mpsc::UnboundedSender<EngineMessage>,
}

impl EngineNotifier {
    pub(crate) fn new(tx: mpsc::UnboundedSender<EngineMessage>) -> Self {
        Self { tx }
    }

    pub fn on_ready(&self, generation: LoadGeneration) {
        self.send(generation, EngineEvent::Ready);
    }

    pub fn on_telemetry(&self, generation: LoadGeneration, telemetry: Telemetry) {
        self.send(generation, EngineEvent::Telemetry(telemetry));
    }

    pub fn on_buffering_changed(&self, generation: LoadGeneration, buffering: bool) {
        self.send(generation, EngineEvent::BufferingChanged(buffering));
    }

    pub fn on_item_ended(&self, generation: LoadGeneration) {
        self.send(generation, EngineEvent::ItemEnded);
    }

    pub fn on_fatal_error(&self, generation: LoadGeneration, reason: impl Into<String>) {
        self.send(generation, EngineEvent::FatalError(reason.into()));
    }

    fn send(&self, generation: LoadGeneration, event: EngineEvent) {
        if self.tx.send(EngineMessage { generation, event }).is_err() {
            trace!("Player torn down, dropping engine notification");
        }
    }
}

/// Native playback pipeline
///
/// Implementors decode and render audio. Calls are dispatches: they return
/// once the intent is accepted, and outcomes are reported through the
/// notifier. All calls come from the controller's owner task, one at a time.
pub trait Engine: Send + 'static {
    /// Start the engine with the validated buffer policy
    fn start(&mut self, policy: &BufferPolicy, notifier: EngineNotifier) -> Result<(), EngineError>;

    /// Replace the loaded item
    ///
    /// Must eventually answer with `on_ready` or `on_fatal_error` for
    /// `generation`.
    fn load(&mut self, track: &Track, generation: LoadGeneration) -> Result<(), EngineError>;

    /// Start or resume rendering
    fn play(&mut self) -> Result<(), EngineError>;

    /// Pause rendering
    fn pause(&mut self) -> Result<(), EngineError>;

    /// Halt and rewind; the loaded item stays loaded
    fn stop(&mut self) -> Result<(), EngineError>;

    /// Seek in the loaded item
    fn seek(&mut self, position: Duration) -> Result<(), EngineError>;

    fn set_rate(&mut self, rate: f32) -> Result<(), EngineError>;

    fn set_volume(&mut self, volume: f32) -> Result<(), EngineError>;

    /// Free native resources
    ///
    /// Called once on teardown.
    fn release(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_increase() {
        let first = LoadGeneration::default();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.value(), first.value() + 1);
    }

    #[test]
    fn notifier_tags_events_with_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = EngineNotifier::new(tx);
        let generation = LoadGeneration::default().next();

        notifier.on_buffering_changed(generation, true);
        notifier.on_fatal_error(generation, "decoder crashed");

        assert_eq!(
            rx.try_recv().unwrap(),
            EngineMessage {
                generation,
                event: EngineEvent::BufferingChanged(true),
            }
        );
        assert_eq!(
            rx.try_recv().unwrap().event,
            EngineEvent::FatalError("decoder crashed".to_string())
        );
    }

    #[test]
    fn notifier_survives_closed_controller() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        // Must not panic
        EngineNotifier::new(tx).on_item_ended(LoadGeneration::default());
    }
}
