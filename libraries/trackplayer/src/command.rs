//! Commands submitted to the owner task
//!
//! Each command carries a `oneshot` sender for its reply. Validation that
//! needs no player state (numeric ranges, descriptor parsing) happens in the
//! handle before a command is built.

use crate::buffer::BufferConfig;
use crate::config::OptionsUpdate;
use crate::error::{PlayerError, Result};
use crate::track::{MetadataPatch, Track};
use crate::types::RepeatMode;
use crate::volume::Volume;
use std::time::Duration;
use tokio::sync::oneshot;

/// Reply channel for a command
pub(crate) type Reply<T> = oneshot::Sender<Result<T>>;

/// Resolves when the engine answers a load
///
/// A dropped sender means a newer load (or a reset) superseded this one.
pub(crate) type Ack = oneshot::Receiver<()>;

#[derive(Debug)]
pub(crate) enum Command {
    // ===== Lifecycle =====
    Setup {
        buffer: BufferConfig,
        reply: Reply<()>,
    },
    Teardown {
        reply: Reply<()>,
    },

    // ===== Queue =====
    Add {
        tracks: Vec<Track>,
        insert_before: Option<usize>,
        reply: Reply<()>,
    },
    Remove {
        indexes: Vec<usize>,
        reply: Reply<()>,
    },
    Move {
        from: usize,
        to: usize,
        reply: Reply<()>,
    },
    RemoveUpcoming {
        reply: Reply<()>,
    },
    SetQueue {
        tracks: Vec<Track>,
        reply: Reply<()>,
    },
    UpdateMetadata {
        index: usize,
        patch: MetadataPatch,
        reply: Reply<()>,
    },

    // ===== Playback =====
    Load {
        track: Track,
        reply: Reply<Ack>,
    },
    Skip {
        index: usize,
        initial_position: Option<Duration>,
        reply: Reply<Option<Ack>>,
    },
    SkipToNext {
        initial_position: Option<Duration>,
        reply: Reply<Option<Ack>>,
    },
    SkipToPrevious {
        initial_position: Option<Duration>,
        reply: Reply<Option<Ack>>,
    },
    Play {
        reply: Reply<Option<Ack>>,
    },
    Pause {
        reply: Reply<()>,
    },
    Stop {
        reply: Reply<()>,
    },
    Reset {
        reply: Reply<()>,
    },
    Retry {
        reply: Reply<Option<Ack>>,
    },
    SeekTo {
        position: Duration,
        reply: Reply<()>,
    },
    SeekBy {
        offset: f64,
        reply: Reply<()>,
    },

    // ===== Settings =====
    SetVolume {
        volume: Volume,
        reply: Reply<()>,
    },
    SetRate {
        rate: f32,
        reply: Reply<()>,
    },
    SetPlayWhenReady {
        play_when_ready: bool,
        reply: Reply<()>,
    },
    SetRepeatMode {
        mode: RepeatMode,
        reply: Reply<()>,
    },
    UpdateOptions {
        update: OptionsUpdate,
        reply: Reply<()>,
    },

    // ===== Now playing =====
    UpdateNowPlaying {
        patch: MetadataPatch,
        reply: Reply<()>,
    },
    ClearNowPlaying {
        reply: Reply<()>,
    },
}

impl Command {
    /// Short name for logs
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::Setup { .. } => "setup",
            Command::Teardown { .. } => "teardown",
            Command::Add { .. } => "add",
            Command::Remove { .. } => "remove",
            Command::Move { .. } => "move",
            Command::RemoveUpcoming { .. } => "remove_upcoming_tracks",
            Command::SetQueue { .. } => "set_queue",
            Command::UpdateMetadata { .. } => "update_metadata_for_track",
            Command::Load { .. } => "load",
            Command::Skip { .. } => "skip",
            Command::SkipToNext { .. } => "skip_to_next",
            Command::SkipToPrevious { .. } => "skip_to_previous",
            Command::Play { .. } => "play",
            Command::Pause { .. } => "pause",
            Command::Stop { .. } => "stop",
            Command::Reset { .. } => "reset",
            Command::Retry { .. } => "retry",
            Command::SeekTo { .. } => "seek_to",
            Command::SeekBy { .. } => "seek_by",
            Command::SetVolume { .. } => "set_volume",
            Command::SetRate { .. } => "set_rate",
            Command::SetPlayWhenReady { .. } => "set_play_when_ready",
            Command::SetRepeatMode { .. } => "set_repeat_mode",
            Command::UpdateOptions { .. } => "update_options",
            Command::UpdateNowPlaying { .. } => "update_now_playing_metadata",
            Command::ClearNowPlaying { .. } => "clear_now_playing_metadata",
        }
    }

    /// Answer the command with an error without applying it
    pub(crate) fn reject(self, error: PlayerError) {
        fn send<T>(reply: Reply<T>, error: PlayerError) {
            reply.send(Err(error)).ok();
        }

        match self {
            Command::Setup { reply, .. } => send(reply, error),
            Command::Teardown { reply, .. } => send(reply, error),
            Command::Add { reply, .. } => send(reply, error),
            Command::Remove { reply, .. } => send(reply, error),
            Command::Move { reply, .. } => send(reply, error),
            Command::RemoveUpcoming { reply, .. } => send(reply, error),
            Command::SetQueue { reply, .. } => send(reply, error),
            Command::UpdateMetadata { reply, .. } => send(reply, error),
            Command::Load { reply, .. } => send(reply, error),
            Command::Skip { reply, .. } => send(reply, error),
            Command::SkipToNext { reply, .. } => send(reply, error),
            Command::SkipToPrevious { reply, .. } => send(reply, error),
            Command::Play { reply, .. } => send(reply, error),
            Command::Pause { reply, .. } => send(reply, error),
            Command::Stop { reply, .. } => send(reply, error),
            Command::Reset { reply, .. } => send(reply, error),
            Command::Retry { reply, .. } => send(reply, error),
            Command::SeekTo { reply, .. } => send(reply, error),
            Command::SeekBy { reply, .. } => send(reply, error),
            Command::SetVolume { reply, .. } => send(reply, error),
            Command::SetRate { reply, .. } => send(reply, error),
            Command::SetPlayWhenReady { reply, .. } => send(reply, error),
            Command::SetRepeatMode { reply, .. } => send(reply, error),
            Command::UpdateOptions { reply, .. } => send(reply, error),
            Command::UpdateNowPlaying { reply, .. } => send(reply, error),
            Command::ClearNowPlaying { reply, .. } => send(reply, error),
        }
    }
}
