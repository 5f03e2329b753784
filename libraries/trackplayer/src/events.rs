//! Player events
//!
//! Outward change notifications for the bridge and the now-playing surface.
//! Events are emitted at key points:
//! - State changes (only real transitions, never repeats)
//! - Active track changes (skip, load, auto-advance)
//! - Queue edits
//! - Queue end and engine failures
//! - Now-playing projection changes

use crate::state::PlaybackState;
use crate::track::{MetadataPatch, Rating, Track};
use serde::{Deserialize, Serialize};

/// Events emitted by the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PlayerEvent {
    /// Playback state changed
    PlaybackState { state: PlaybackState },

    /// The loaded item changed
    ActiveTrackChanged {
        /// Queue index of the new item (`None` for preview loads or unload)
        index: Option<usize>,
        track: Option<Track>,
        last_index: Option<usize>,
        last_track: Option<Track>,
        /// Position reached in the previous item, in seconds
        last_position: f64,
    },

    /// Tracks added, removed or reordered
    QueueChanged { length: usize },

    /// Playback ran past the last item
    QueueEnded {
        index: Option<usize>,
        track: Option<Track>,
        position: f64,
    },

    /// Engine failure surfaced to observers
    PlaybackError { code: String, message: String },

    /// Now-playing projection changed (`None` withdraws it)
    NowPlayingChanged { now_playing: Option<NowPlaying> },
}

/// Canonical "now playing" projection
///
/// What the OS media session should display. Built from the loaded track,
/// any host override, and the latest state and telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork_uri: Option<String>,
    /// Seconds
    pub duration: Option<f64>,
    /// Seconds
    pub position: f64,
    pub state: PlaybackState,
    pub rating: Option<Rating>,
    pub is_live: bool,
}

impl NowPlaying {
    /// Project a track, with an optional host override on top
    pub fn project(
        track: &Track,
        override_patch: Option<&MetadataPatch>,
        state: &PlaybackState,
        position: f64,
        duration: Option<f64>,
    ) -> Self {
        let merged;
        let track = match override_patch {
            Some(patch) => {
                merged = track.merged(patch);
                &merged
            }
            None => track,
        };

        Self {
            title: track.title().map(str::to_string),
            artist: track.artist().map(str::to_string),
            album: track.album().map(str::to_string),
            artwork_uri: track.artwork().map(|a| a.as_str().to_string()),
            duration: duration.or_else(|| track.duration().map(|d| d.as_secs_f64())),
            position,
            state: state.clone(),
            rating: track.rating(),
            is_live: track.is_live(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::MediaUrl;
    use std::time::Duration;

    fn track() -> Track {
        Track::new(MediaUrl::remote("https://example.com/a.mp3").unwrap())
            .with_title("Song")
            .with_artist("Artist")
            .with_artwork(MediaUrl::remote("https://example.com/a.jpg").unwrap())
            .with_duration(Duration::from_secs(200))
    }

    #[test]
    fn projection_uses_track_metadata() {
        let now = NowPlaying::project(&track(), None, &PlaybackState::Playing, 12.0, None);

        assert_eq!(now.title.as_deref(), Some("Song"));
        assert_eq!(now.artwork_uri.as_deref(), Some("https://example.com/a.jpg"));
        assert_eq!(now.duration, Some(200.0));
        assert_eq!(now.position, 12.0);
        assert_eq!(now.state, PlaybackState::Playing);
    }

    #[test]
    fn engine_duration_beats_hint() {
        let now = NowPlaying::project(&track(), None, &PlaybackState::Ready, 0.0, Some(201.5));
        assert_eq!(now.duration, Some(201.5));
    }

    #[test]
    fn override_wins_over_track() {
        let patch = MetadataPatch {
            title: Some("Live at the BBC".to_string()),
            ..Default::default()
        };
        let now = NowPlaying::project(&track(), Some(&patch), &PlaybackState::Paused, 0.0, None);

        assert_eq!(now.title.as_deref(), Some("Live at the BBC"));
        assert_eq!(now.artist.as_deref(), Some("Artist"));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(PlayerEvent::QueueChanged { length: 3 }).unwrap();
        assert_eq!(json["type"], "queue-changed");
        assert_eq!(json["length"], 3);
    }
}
