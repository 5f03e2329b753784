//! Track value object
//!
//! A [`Track`] is built once from host input and never mutated in place.
//! Metadata updates produce a replacement value through [`Track::merged`].

use crate::error::{PlayerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

const KNOWN_KEYS: [&str; 8] = [
    "url",
    "title",
    "artist",
    "album",
    "artwork",
    "duration",
    "rating",
    "isLiveStream",
];

/// Playable resource location
///
/// Remote resources are absolute URLs. Local resources are bundled assets or
/// `file:` URLs handed over as `{ "uri": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaUrl {
    value: String,
    is_local: bool,
}

impl MediaUrl {
    /// Remote URL; must parse as an absolute URL
    ///
    /// `file:` URLs are accepted and classified as local.
    pub fn remote(value: &str) -> Result<Self> {
        let parsed = url::Url::parse(value)
            .map_err(|e| PlayerError::invalid_track(format!("invalid url {:?}: {}", value, e)))?;

        Ok(Self {
            is_local: parsed.scheme() == "file",
            value: value.to_string(),
        })
    }

    /// Local resource reference (asset id, path or `file:` URI)
    pub fn local(uri: &str) -> Result<Self> {
        if uri.trim().is_empty() {
            return Err(PlayerError::invalid_track("local uri is empty"));
        }

        Ok(Self {
            value: uri.to_string(),
            is_local: true,
        })
    }

    fn from_value(value: &Value, field: &str) -> Result<Self> {
        match value {
            Value::String(s) => Self::remote(s),
            Value::Object(map) => match map.get("uri") {
                Some(Value::String(uri)) => Self::local(uri),
                _ => Err(PlayerError::invalid_track(format!(
                    "{} object must carry a string \"uri\"",
                    field
                ))),
            },
            _ => Err(PlayerError::invalid_track(format!(
                "{} must be a string or an object with \"uri\"",
                field
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_local(&self) -> bool {
        self.is_local
    }
}

/// How `rating` values in track input are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingType {
    #[default]
    Heart,
    ThumbsUpDown,
    ThreeStars,
    FourStars,
    FiveStars,
    Percentage,
}

/// Track rating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Rating {
    Heart(bool),
    ThumbsUp(bool),
    Stars { value: f32, max: u8 },
    Percentage(f32),
}

impl Rating {
    fn from_value(value: &Value, rating_type: RatingType) -> Result<Self> {
        match rating_type {
            RatingType::Heart => value
                .as_bool()
                .map(Rating::Heart)
                .ok_or_else(|| PlayerError::invalid_track("heart rating must be a boolean")),
            RatingType::ThumbsUpDown => value
                .as_bool()
                .map(Rating::ThumbsUp)
                .ok_or_else(|| PlayerError::invalid_track("thumbs rating must be a boolean")),
            RatingType::ThreeStars | RatingType::FourStars | RatingType::FiveStars => {
                let max = match rating_type {
                    RatingType::ThreeStars => 3,
                    RatingType::FourStars => 4,
                    _ => 5,
                };
                let stars = value
                    .as_f64()
                    .ok_or_else(|| PlayerError::invalid_track("star rating must be a number"))?;
                if !(0.0..=f64::from(max)).contains(&stars) {
                    return Err(PlayerError::invalid_track(format!(
                        "star rating {} outside 0..={}",
                        stars, max
                    )));
                }
                Ok(Rating::Stars {
                    value: stars as f32,
                    max,
                })
            }
            RatingType::Percentage => {
                let percent = value
                    .as_f64()
                    .ok_or_else(|| PlayerError::invalid_track("percentage rating must be a number"))?;
                if !(0.0..=100.0).contains(&percent) {
                    return Err(PlayerError::invalid_track(format!(
                        "percentage rating {} outside 0..=100",
                        percent
                    )));
                }
                Ok(Rating::Percentage(percent as f32))
            }
        }
    }
}

/// Playable item plus display metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    url: MediaUrl,
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    artwork: Option<MediaUrl>,
    duration: Option<Duration>,
    rating: Option<Rating>,
    is_live: bool,
    custom: Map<String, Value>,
}

impl Track {
    /// Create a track with no metadata
    pub fn new(url: MediaUrl) -> Self {
        Self {
            url,
            title: None,
            artist: None,
            album: None,
            artwork: None,
            duration: None,
            rating: None,
            is_live: false,
            custom: Map::new(),
        }
    }

    /// Build a track from untyped host input
    ///
    /// `url` is required. Known keys with the wrong type are rejected;
    /// unknown keys are kept in [`Track::custom`].
    pub fn from_value(value: &Value, rating_type: RatingType) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| PlayerError::invalid_track("track was not a dictionary type"))?;

        let url = map
            .get("url")
            .filter(|v| !v.is_null())
            .ok_or_else(|| PlayerError::invalid_track("track is missing \"url\""))?;

        let patch = MetadataPatch::from_map(map, rating_type)?;
        Ok(Track::new(MediaUrl::from_value(url, "url")?).merged(&patch))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_artwork(mut self, artwork: MediaUrl) -> Self {
        self.artwork = Some(artwork);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_rating(mut self, rating: Rating) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_live(mut self, is_live: bool) -> Self {
        self.is_live = is_live;
        self
    }

    /// Copy of this track with the patch applied
    pub fn merged(&self, patch: &MetadataPatch) -> Track {
        let mut track = self.clone();
        if let Some(ref title) = patch.title {
            track.title = Some(title.clone());
        }
        if let Some(ref artist) = patch.artist {
            track.artist = Some(artist.clone());
        }
        if let Some(ref album) = patch.album {
            track.album = Some(album.clone());
        }
        if let Some(ref artwork) = patch.artwork {
            track.artwork = Some(artwork.clone());
        }
        if let Some(duration) = patch.duration {
            track.duration = Some(duration);
        }
        if let Some(rating) = patch.rating {
            track.rating = Some(rating);
        }
        if let Some(is_live) = patch.is_live {
            track.is_live = is_live;
        }
        for (key, value) in &patch.custom {
            track.custom.insert(key.clone(), value.clone());
        }
        track
    }

    pub fn url(&self) -> &MediaUrl {
        &self.url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    pub fn artwork(&self) -> Option<&MediaUrl> {
        self.artwork.as_ref()
    }

    /// Duration hint supplied with the track
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn rating(&self) -> Option<Rating> {
        self.rating
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    /// Host-defined keys carried along untouched
    pub fn custom(&self) -> &Map<String, Value> {
        &self.custom
    }
}

/// Partial metadata update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataPatch {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Option<MediaUrl>,
    pub duration: Option<Duration>,
    pub rating: Option<Rating>,
    pub is_live: Option<bool>,
    pub custom: Map<String, Value>,
}

impl MetadataPatch {
    /// Build a patch from untyped host input
    pub fn from_value(value: &Value, rating_type: RatingType) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| PlayerError::invalid_track("metadata was not a dictionary type"))?;
        Self::from_map(map, rating_type)
    }

    fn from_map(map: &Map<String, Value>, rating_type: RatingType) -> Result<Self> {
        let duration = match non_null(map, "duration") {
            None => None,
            Some(value) => {
                let secs = value
                    .as_f64()
                    .ok_or_else(|| PlayerError::invalid_track("duration must be a number"))?;
                let duration = Duration::try_from_secs_f64(secs).map_err(|_| {
                    PlayerError::invalid_track(format!(
                        "duration {} must be a finite, non-negative number of seconds",
                        secs
                    ))
                })?;
                Some(duration)
            }
        };

        let is_live = match non_null(map, "isLiveStream") {
            None => None,
            Some(value) => Some(
                value
                    .as_bool()
                    .ok_or_else(|| PlayerError::invalid_track("isLiveStream must be a boolean"))?,
            ),
        };

        let custom = map
            .iter()
            .filter(|(key, _)| !KNOWN_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            title: string_field(map, "title")?,
            artist: string_field(map, "artist")?,
            album: string_field(map, "album")?,
            artwork: non_null(map, "artwork")
                .map(|v| MediaUrl::from_value(v, "artwork"))
                .transpose()?,
            duration,
            rating: non_null(map, "rating")
                .map(|v| Rating::from_value(v, rating_type))
                .transpose()?,
            is_live,
            custom,
        })
    }

    /// True when the patch changes nothing
    pub fn is_empty(&self) -> bool {
        *self == MetadataPatch::default()
    }
}

fn non_null<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn string_field(map: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match non_null(map, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(PlayerError::invalid_track(format!("{} must be a string", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_remote_track_from_value() {
        let track = Track::from_value(
            &json!({
                "url": "https://example.com/song.mp3",
                "title": "Song",
                "artist": "Artist",
                "duration": 180.5,
                "rating": true,
                "genre": "Jazz",
            }),
            RatingType::Heart,
        )
        .unwrap();

        assert_eq!(track.url().as_str(), "https://example.com/song.mp3");
        assert!(!track.url().is_local());
        assert_eq!(track.title(), Some("Song"));
        assert_eq!(track.artist(), Some("Artist"));
        assert_eq!(track.album(), None);
        assert_eq!(track.duration(), Some(Duration::from_secs_f64(180.5)));
        assert_eq!(track.rating(), Some(Rating::Heart(true)));
        assert_eq!(track.custom().get("genre"), Some(&json!("Jazz")));
        assert!(track.custom().get("title").is_none());
    }

    #[test]
    fn object_url_is_local() {
        let track = Track::from_value(
            &json!({ "url": { "uri": "asset:/intro.mp3" }, "isLiveStream": false }),
            RatingType::Heart,
        )
        .unwrap();

        assert!(track.url().is_local());
        assert_eq!(track.url().as_str(), "asset:/intro.mp3");
    }

    #[test]
    fn file_url_is_local() {
        let url = MediaUrl::remote("file:///music/a.flac").unwrap();
        assert!(url.is_local());
    }

    #[test]
    fn rejects_missing_or_malformed_url() {
        for input in [
            json!({ "title": "No url" }),
            json!({ "url": null }),
            json!({ "url": 42 }),
            json!({ "url": "not a url" }),
            json!({ "url": { "path": "x" } }),
            json!("just a string"),
        ] {
            let err = Track::from_value(&input, RatingType::Heart).unwrap_err();
            assert_eq!(err.code(), "invalid_track_object", "input: {}", input);
        }
    }

    #[test]
    fn rejects_wrongly_typed_known_fields() {
        let base = "https://example.com/a.mp3";
        for input in [
            json!({ "url": base, "title": 7 }),
            json!({ "url": base, "duration": "long" }),
            json!({ "url": base, "duration": -1.0 }),
            json!({ "url": base, "isLiveStream": "yes" }),
            json!({ "url": base, "rating": 3 }),
        ] {
            assert!(Track::from_value(&input, RatingType::Heart).is_err(), "input: {}", input);
        }
    }

    #[test]
    fn rejects_duration_too_large_for_a_duration() {
        let input = json!({ "url": "https://example.com/a.mp3", "duration": 1e300 });
        let err = Track::from_value(&input, RatingType::Heart).unwrap_err();
        assert_eq!(err.code(), "invalid_track_object");

        let patch = MetadataPatch::from_value(&json!({ "duration": 1e20 }), RatingType::Heart);
        assert!(patch.is_err());
    }

    #[test]
    fn star_ratings_respect_their_scale() {
        let ok = json!({ "url": "https://example.com/a.mp3", "rating": 3.5 });
        let too_high = json!({ "url": "https://example.com/a.mp3", "rating": 4.5 });

        let track = Track::from_value(&ok, RatingType::FourStars).unwrap();
        assert_eq!(
            track.rating(),
            Some(Rating::Stars {
                value: 3.5,
                max: 4
            })
        );
        assert!(Track::from_value(&too_high, RatingType::FourStars).is_err());
    }

    #[test]
    fn merged_replaces_only_patched_fields() {
        let track = Track::new(MediaUrl::remote("https://example.com/a.mp3").unwrap())
            .with_title("Old")
            .with_artist("Artist");

        let patch = MetadataPatch::from_value(
            &json!({ "title": "New", "mood": "calm" }),
            RatingType::Heart,
        )
        .unwrap();
        let updated = track.merged(&patch);

        assert_eq!(updated.title(), Some("New"));
        assert_eq!(updated.artist(), Some("Artist"));
        assert_eq!(updated.url(), track.url());
        assert_eq!(updated.custom().get("mood"), Some(&json!("calm")));
        // Original value untouched
        assert_eq!(track.title(), Some("Old"));
    }

    #[test]
    fn empty_patch_is_detected() {
        let patch = MetadataPatch::from_value(&json!({}), RatingType::Heart).unwrap();
        assert!(patch.is_empty());
    }
}
