//! Track Player - Playback Coordination
//!
//! Platform-agnostic queue and playback-state coordination for native track
//! players.
//!
//! This crate provides:
//! - Ordered queue with an active cursor and atomic edits
//! - Playback state machine (Idle, Loading, Ready, Playing, Paused, Buffering,
//!   Stopped, Ended, Error)
//! - Buffer policy validation
//! - Repeat modes (Off, Track, Queue)
//! - Stale engine event suppression through load generations
//! - Now-playing projection for the OS media session
//!
//! # Architecture
//!
//! Each [`TrackPlayer`] owns one tokio task that is the only writer of the
//! queue and the state machine:
//! - Commands from any number of handle clones are queued onto that task
//! - Engine reports arrive through an [`EngineNotifier`], tagged with the
//!   generation of the load they belong to
//! - Getters read the last committed [`PlayerSnapshot`] and never block
//!
//! Decoding and rendering live behind the [`Engine`] trait.
//!
//! # Example: Basic Playback
//!
//! ```rust,no_run
//! use trackplayer::{
//!     BufferPolicy, Engine, EngineError, EngineNotifier, LoadGeneration, PlayerOptions, Track,
//!     TrackPlayer,
//! };
//! use std::time::Duration;
//!
//! struct SilentEngine {
//!     notifier: Option<EngineNotifier>,
//! }
//!
//! impl Engine for SilentEngine {
//!     fn start(&mut self, _policy: &BufferPolicy, notifier: EngineNotifier) -> Result<(), EngineError> {
//!         self.notifier = Some(notifier);
//!         Ok(())
//!     }
//!
//!     fn load(&mut self, _track: &Track, generation: LoadGeneration) -> Result<(), EngineError> {
//!         if let Some(notifier) = &self.notifier {
//!             notifier.on_ready(generation);
//!         }
//!         Ok(())
//!     }
//!
//!     fn play(&mut self) -> Result<(), EngineError> { Ok(()) }
//!     fn pause(&mut self) -> Result<(), EngineError> { Ok(()) }
//!     fn stop(&mut self) -> Result<(), EngineError> { Ok(()) }
//!     fn seek(&mut self, _position: Duration) -> Result<(), EngineError> { Ok(()) }
//!     fn set_rate(&mut self, _rate: f32) -> Result<(), EngineError> { Ok(()) }
//!     fn set_volume(&mut self, _volume: f32) -> Result<(), EngineError> { Ok(()) }
//! }
//!
//! # async fn run() -> trackplayer::Result<()> {
//! let player = TrackPlayer::init(SilentEngine { notifier: None }, PlayerOptions::default())?;
//! player.setup_with_defaults().await?;
//!
//! let tracks = player.tracks_from_values(&[
//!     serde_json::json!({ "url": "https://example.com/a.mp3", "title": "A" }),
//!     serde_json::json!({ "url": "https://example.com/b.mp3", "title": "B" }),
//! ])?;
//! player.add(tracks, None).await?;
//!
//! player.play().await?;
//! player.skip_to_next(None).await?;
//! assert_eq!(player.active_track_index()?, Some(1));
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Observing Changes
//!
//! ```rust,no_run
//! use trackplayer::{PlayerEvent, TrackPlayer};
//!
//! # async fn observe(player: TrackPlayer) {
//! let mut events = player.subscribe();
//! while let Ok(event) = events.recv().await {
//!     if let PlayerEvent::NowPlayingChanged { now_playing } = event {
//!         // Hand to the media session
//!         let _ = now_playing;
//!     }
//! }
//! # }
//! ```

mod buffer;
mod command;
mod config;
mod controller;
mod engine;
mod error;
mod events;
mod owner;
mod queue;
mod state;
mod track;
pub mod types;
mod volume;

// Public exports
pub use buffer::{
    BufferConfig, BufferPolicy, DEFAULT_BACK_BUFFER_MS, DEFAULT_MAX_BUFFER_MS,
    DEFAULT_MIN_BUFFER_MS, DEFAULT_PLAY_BUFFER_MS,
};
pub use config::{OptionsUpdate, PlayerOptions};
pub use controller::TrackPlayer;
pub use engine::{
    Engine, EngineError, EngineEvent, EngineMessage, EngineNotifier, LoadGeneration, Telemetry,
};
pub use error::{BufferConfigError, PlayerError, Result};
pub use events::{NowPlaying, PlayerEvent};
pub use queue::{ActiveChange, Queue};
pub use state::{PlaybackState, PlaybackStateInfo, StateMachine, Transition, Trigger};
pub use track::{MediaUrl, MetadataPatch, Rating, RatingType, Track};
pub use types::{PlayerSnapshot, Progress, RepeatMode};
pub use volume::{parse_rate, Volume};
