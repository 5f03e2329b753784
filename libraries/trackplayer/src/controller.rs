//! Player handle
//!
//! [`TrackPlayer`] is the entry point for the host. It spawns the owner task
//! on [`TrackPlayer::init`] and turns every command into a message for it.
//! Getters read the last committed snapshot and never wait on the engine.

use crate::buffer::{BufferConfig, BufferPolicy};
use crate::command::{Ack, Command, Reply};
use crate::config::{OptionsUpdate, PlayerOptions};
use crate::engine::Engine;
use crate::error::{PlayerError, Result};
use crate::events::{NowPlaying, PlayerEvent};
use crate::owner::PlayerOwner;
use crate::state::{PlaybackState, PlaybackStateInfo};
use crate::track::{MetadataPatch, RatingType, Track};
use crate::types::{seconds, PlayerSnapshot, Progress, RepeatMode};
use crate::volume::{parse_rate, Volume};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, warn};

/// Handle to one player session
///
/// Cheap to clone; all clones drive the same owner task. The session ends
/// on [`TrackPlayer::teardown`] or when the last handle is dropped.
#[derive(Debug, Clone)]
pub struct TrackPlayer {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<PlayerSnapshot>,
    events: broadcast::Sender<PlayerEvent>,
    default_buffer: BufferConfig,
}

impl TrackPlayer {
    /// Spawn the owner task for `engine`
    ///
    /// Must be called from within a tokio runtime. The player starts
    /// uninitialized; call [`setup`](Self::setup) next.
    pub fn init<E: Engine>(engine: E, options: PlayerOptions) -> Result<Self> {
        options.validate()?;

        let (command_tx, command_rx) = mpsc::channel(options.command_capacity);
        let (snapshot_tx, snapshot_rx) = watch::channel(PlayerSnapshot::with_options(&options));
        let (event_tx, _) = broadcast::channel(options.event_capacity);

        let owner = PlayerOwner::new(engine, &options, command_rx, snapshot_tx, event_tx.clone());
        tokio::spawn(owner.run());

        debug!(
            command_capacity = options.command_capacity,
            event_capacity = options.event_capacity,
            "Player session created"
        );

        Ok(Self {
            commands: command_tx,
            snapshot: snapshot_rx,
            events: event_tx,
            default_buffer: options.buffer,
        })
    }

    // ===== Lifecycle =====

    /// Validate the buffer configuration and start the engine
    ///
    /// Fails with `AlreadyInitialized` after a successful setup. A rejected
    /// configuration leaves the session uninitialized so setup can be retried.
    pub async fn setup(&self, buffer: BufferConfig) -> Result<()> {
        self.request(|reply| Command::Setup { buffer, reply }).await
    }

    /// Setup with the buffer durations from [`PlayerOptions`]
    pub async fn setup_with_defaults(&self) -> Result<()> {
        self.setup(self.default_buffer).await
    }

    /// Stop and release the engine and end the session
    pub async fn teardown(&self) -> Result<()> {
        self.request(|reply| Command::Teardown { reply }).await
    }

    // ===== Track input =====

    /// Build a track from untyped host input
    pub fn track_from_value(&self, value: &Value) -> Result<Track> {
        Track::from_value(value, self.rating_type())
    }

    /// Build tracks from untyped host input; one bad descriptor rejects all
    pub fn tracks_from_values(&self, values: &[Value]) -> Result<Vec<Track>> {
        values.iter().map(|v| self.track_from_value(v)).collect()
    }

    /// Build a metadata patch from untyped host input
    pub fn patch_from_value(&self, value: &Value) -> Result<MetadataPatch> {
        MetadataPatch::from_value(value, self.rating_type())
    }

    /// Rating type for track input; follows [`update_options`](Self::update_options)
    pub fn rating_type(&self) -> RatingType {
        self.snapshot.borrow().rating_type
    }

    // ===== Queue =====

    /// Insert tracks before `insert_before`, or append with `None`
    pub async fn add(&self, tracks: Vec<Track>, insert_before: Option<usize>) -> Result<()> {
        self.request(|reply| Command::Add {
            tracks,
            insert_before,
            reply,
        })
        .await
    }

    /// Remove tracks; one bad index rejects the whole call
    ///
    /// Removing the loaded track loads the next surviving one, or stops
    /// playback when none is left after it.
    pub async fn remove(&self, indexes: Vec<usize>) -> Result<()> {
        self.request(|reply| Command::Remove { indexes, reply }).await
    }

    pub async fn move_track(&self, from: usize, to: usize) -> Result<()> {
        self.request(|reply| Command::Move { from, to, reply }).await
    }

    /// Drop every track after the active one
    pub async fn remove_upcoming_tracks(&self) -> Result<()> {
        self.request(|reply| Command::RemoveUpcoming { reply }).await
    }

    /// Replace the whole queue
    pub async fn set_queue(&self, tracks: Vec<Track>) -> Result<()> {
        self.request(|reply| Command::SetQueue { tracks, reply }).await
    }

    /// Merge `patch` into the track at `index`
    ///
    /// Updating the loaded track republishes the now-playing projection
    /// without interrupting playback.
    pub async fn update_metadata_for_track(&self, index: usize, patch: MetadataPatch) -> Result<()> {
        self.request(|reply| Command::UpdateMetadata {
            index,
            patch,
            reply,
        })
        .await
    }

    // ===== Playback =====

    /// Load a track outside the queue
    pub async fn load(&self, track: Track) -> Result<()> {
        let ack = self.request(|reply| Command::Load { track, reply }).await?;
        self.wait_for_engine(Some(ack)).await;
        Ok(())
    }

    /// Load the queue track at `index`
    ///
    /// `initial_position` is in seconds; `None` or a negative value means
    /// start from the beginning.
    pub async fn skip(&self, index: usize, initial_position: Option<f64>) -> Result<()> {
        let initial_position = start_position(initial_position)?;
        let ack = self
            .request(|reply| Command::Skip {
                index,
                initial_position,
                reply,
            })
            .await?;
        self.wait_for_engine(ack).await;
        Ok(())
    }

    /// Load the next queue track
    ///
    /// Past the last track this wraps under [`RepeatMode::Queue`] and ends
    /// playback otherwise.
    pub async fn skip_to_next(&self, initial_position: Option<f64>) -> Result<()> {
        let initial_position = start_position(initial_position)?;
        let ack = self
            .request(|reply| Command::SkipToNext {
                initial_position,
                reply,
            })
            .await?;
        self.wait_for_engine(ack).await;
        Ok(())
    }

    /// Load the previous queue track; a no-op at the first one
    pub async fn skip_to_previous(&self, initial_position: Option<f64>) -> Result<()> {
        let initial_position = start_position(initial_position)?;
        let ack = self
            .request(|reply| Command::SkipToPrevious {
                initial_position,
                reply,
            })
            .await?;
        self.wait_for_engine(ack).await;
        Ok(())
    }

    /// Start or resume playback
    ///
    /// With nothing loaded, the active queue track (or the first one) is
    /// loaded and played once ready.
    pub async fn play(&self) -> Result<()> {
        let ack = self.request(|reply| Command::Play { reply }).await?;
        self.wait_for_engine(ack).await;
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| Command::Pause { reply }).await
    }

    /// Halt and rewind; the item stays loaded
    pub async fn stop(&self) -> Result<()> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Stop playback and clear the queue
    pub async fn reset(&self) -> Result<()> {
        self.request(|reply| Command::Reset { reply }).await
    }

    /// Reload the current item after an error, resuming where it failed
    pub async fn retry(&self) -> Result<()> {
        let ack = self.request(|reply| Command::Retry { reply }).await?;
        self.wait_for_engine(ack).await;
        Ok(())
    }

    /// Seek to an absolute position in seconds
    pub async fn seek_to(&self, position: f64) -> Result<()> {
        if !position.is_finite() || position < 0.0 {
            return Err(PlayerError::InvalidValue {
                name: "position",
                value: position,
            });
        }

        let position = seconds(position, "position")?;
        self.request(|reply| Command::SeekTo { position, reply }).await
    }

    /// Seek relative to the current position, in seconds
    pub async fn seek_by(&self, offset: f64) -> Result<()> {
        if !offset.is_finite() {
            return Err(PlayerError::InvalidValue {
                name: "offset",
                value: offset,
            });
        }

        self.request(|reply| Command::SeekBy { offset, reply }).await
    }

    // ===== Settings =====

    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        let volume = Volume::parse(volume)?;
        self.request(|reply| Command::SetVolume { volume, reply }).await
    }

    pub async fn set_rate(&self, rate: f32) -> Result<()> {
        let rate = parse_rate(rate)?;
        self.request(|reply| Command::SetRate { rate, reply }).await
    }

    pub async fn set_play_when_ready(&self, play_when_ready: bool) -> Result<()> {
        self.request(|reply| Command::SetPlayWhenReady {
            play_when_ready,
            reply,
        })
        .await
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        self.request(|reply| Command::SetRepeatMode { mode, reply })
            .await
    }

    /// Change session options after setup
    pub async fn update_options(&self, update: OptionsUpdate) -> Result<()> {
        self.request(|reply| Command::UpdateOptions { update, reply })
            .await
    }

    // ===== Now playing =====

    /// Override the now-playing projection for the loaded item
    ///
    /// The queue track is left untouched and the override is dropped when
    /// another item loads.
    pub async fn update_now_playing_metadata(&self, patch: MetadataPatch) -> Result<()> {
        self.request(|reply| Command::UpdateNowPlaying { patch, reply })
            .await
    }

    /// Withdraw the now-playing projection until the next load
    pub async fn clear_now_playing_metadata(&self) -> Result<()> {
        self.request(|reply| Command::ClearNowPlaying { reply }).await
    }

    // ===== Getters =====

    pub fn queue(&self) -> Result<Arc<[Track]>> {
        self.read(|s| Arc::clone(&s.queue))
    }

    /// Track at `index`, or `None` outside the queue
    pub fn track(&self, index: usize) -> Result<Option<Track>> {
        self.read(|s| s.queue.get(index).cloned())
    }

    /// Loaded track (a queue entry or a preview load)
    pub fn active_track(&self) -> Result<Option<Track>> {
        self.read(|s| s.active_track.clone())
    }

    pub fn active_track_index(&self) -> Result<Option<usize>> {
        self.read(|s| s.active_index)
    }

    /// Last known progress, in seconds
    pub fn progress(&self) -> Result<Progress> {
        self.read(|s| s.progress)
    }

    pub fn state(&self) -> Result<PlaybackState> {
        self.read(|s| s.state.clone())
    }

    /// State name plus error reason, as reported to the bridge
    pub fn playback_state(&self) -> Result<PlaybackStateInfo> {
        self.read(|s| PlaybackStateInfo::from(&s.state))
    }

    pub fn volume(&self) -> Result<f32> {
        self.read(|s| s.volume)
    }

    pub fn rate(&self) -> Result<f32> {
        self.read(|s| s.rate)
    }

    pub fn play_when_ready(&self) -> Result<bool> {
        self.read(|s| s.play_when_ready)
    }

    pub fn repeat_mode(&self) -> Result<RepeatMode> {
        self.read(|s| s.repeat_mode)
    }

    pub fn buffer_policy(&self) -> Result<Option<BufferPolicy>> {
        self.read(|s| s.buffer_policy)
    }

    pub fn now_playing(&self) -> Result<Option<NowPlaying>> {
        self.read(|s| s.now_playing.clone())
    }

    /// Whole committed snapshot
    pub fn snapshot(&self) -> Result<PlayerSnapshot> {
        self.read(PlayerSnapshot::clone)
    }

    // ===== Observers =====

    /// Outward change events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// Committed snapshots, including the current one
    pub fn watch(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshot.clone()
    }

    // ===== Internal =====

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        // A closed channel means the owner is gone (teardown).
        self.commands
            .send(build(reply_tx))
            .await
            .map_err(|_| PlayerError::NotInitialized)?;

        reply_rx.await.map_err(|_| PlayerError::NotInitialized)?
    }

    fn read<T>(&self, f: impl FnOnce(&PlayerSnapshot) -> T) -> Result<T> {
        let snapshot = self.snapshot.borrow();
        if snapshot.initialized {
            Ok(f(&snapshot))
        } else {
            Err(PlayerError::NotInitialized)
        }
    }

    /// Wait until the engine answers a load
    ///
    /// Timeouts and superseded loads resolve quietly; the outcome is visible
    /// in the playback state either way.
    async fn wait_for_engine(&self, ack: Option<Ack>) {
        let Some(ack) = ack else {
            return;
        };

        let ack_timeout = self.snapshot.borrow().engine_ack_timeout();
        match tokio::time::timeout(ack_timeout, ack).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => debug!("Load superseded before the engine answered"),
            Err(_) => warn!(
                timeout_ms = ack_timeout.as_millis() as u64,
                "Engine did not acknowledge load in time"
            ),
        }
    }
}

/// Convert an optional start position in seconds; negative means none
fn start_position(seconds: Option<f64>) -> Result<Option<Duration>> {
    match seconds {
        None => Ok(None),
        Some(secs) if !secs.is_finite() => Err(PlayerError::InvalidValue {
            name: "initial_position",
            value: secs,
        }),
        Some(secs) if secs < 0.0 => Ok(None),
        Some(secs) => crate::types::seconds(secs, "initial_position").map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_start_position_means_no_seek() {
        assert_eq!(start_position(None).unwrap(), None);
        assert_eq!(start_position(Some(-1.0)).unwrap(), None);
        assert_eq!(
            start_position(Some(12.5)).unwrap(),
            Some(Duration::from_millis(12_500))
        );
        assert!(start_position(Some(f64::NAN)).is_err());
    }

    #[test]
    fn positions_beyond_duration_range_are_invalid() {
        assert_eq!(
            start_position(Some(1e20)),
            Err(PlayerError::InvalidValue {
                name: "initial_position",
                value: 1e20,
            })
        );
        assert_eq!(seconds(1.5, "position"), Ok(Duration::from_millis(1_500)));
        assert!(seconds(1e300, "position").is_err());
    }
}
