use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::classify::{DEFAULT_DURATION, DEFAULT_STREAM_COUNT, UNKNOWN_NAME};
use super::error::ExtractError;
use super::normalize::total_streams;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const NOT_AVAILABLE: &str = "N/A";

const ARTIST_ID_LEN: usize = 22;

/// Base-62 artist identifier as used in artist page URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ArtistId(String);

impl FromStr for ArtistId {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == ARTIST_ID_LEN && s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(Self(s.to_string()))
        } else {
            Err(ExtractError::InvalidArtistId(s.to_string()))
        }
    }
}

impl fmt::Display for ArtistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A track row as read from the page. Unresolved fields hold sentinels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackRecord {
    pub name: String,
    pub image: Option<String>,
    pub stream_count: String,
    pub duration: String,
    pub track_id: Option<String>,
}

impl TrackRecord {
    /// Stand-in for a row that could not be read. `index` is 0-based.
    pub fn placeholder(index: usize) -> Self {
        Self {
            name: format!("{} (Row {})", UNKNOWN_NAME, index + 1),
            image: None,
            stream_count: DEFAULT_STREAM_COUNT.to_string(),
            duration: DEFAULT_DURATION.to_string(),
            track_id: None,
        }
    }

    /// Minimal record built from a bare track link.
    pub fn from_link(name: Option<String>, track_id: Option<String>) -> Self {
        Self {
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            image: None,
            stream_count: NOT_AVAILABLE.to_string(),
            duration: NOT_AVAILABLE.to_string(),
            track_id,
        }
    }
}

/// A track record with its play count parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedTrack {
    #[serde(flatten)]
    pub record: TrackRecord,
    pub stream_count_numeric: u64,
}

/// Everything extracted from one artist page.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    artist_name: String,
    monthly_listeners: String,
    tracks: Vec<NormalizedTrack>,
    total_streams: u64,
    total_tracks: usize,
}

impl ExtractionResult {
    pub fn new(
        artist_name: impl Into<String>,
        monthly_listeners: impl Into<String>,
        tracks: Vec<NormalizedTrack>,
    ) -> Self {
        Self {
            artist_name: artist_name.into(),
            monthly_listeners: monthly_listeners.into(),
            total_streams: total_streams(&tracks),
            total_tracks: tracks.len(),
            tracks,
        }
    }

    pub fn artist_name(&self) -> &str {
        &self.artist_name
    }

    pub fn monthly_listeners(&self) -> &str {
        &self.monthly_listeners
    }

    /// Tracks in on-page order.
    pub fn tracks(&self) -> &[NormalizedTrack] {
        &self.tracks
    }

    pub fn total_streams(&self) -> u64 {
        self.total_streams
    }

    pub fn total_tracks(&self) -> usize {
        self.total_tracks
    }
}
