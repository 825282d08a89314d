//! The tag set and playback sample a [`crate::detector::PlayDetector`]
//! consumes (spec.md §4.3). Deliberately MPD-agnostic: the caller maps
//! whatever player client it drives into these types.

use std::time::Duration;

/// Coarse playback state reported by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Play,
    Pause,
    Stop,
    Unknown,
}

/// Tag set for the currently selected song. `id` identifies a *playlist
/// slot*, not a track identity — the same song can have different ids
/// across plays (spec.md §4.3's repeat-detection relies on this).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub id: u64,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub track_number: Option<String>,
    pub musicbrainz_id: Option<String>,
    pub uri: String,
    pub duration: Duration,
}

impl Song {
    /// Missing-tags rule (spec.md §4.3): both of {artist, album-artist}
    /// absent, or title absent.
    pub fn has_missing_tags(&self) -> bool {
        (self.artist.is_none() && self.album_artist.is_none()) || self.title.is_none()
    }

    /// Artist tag, falling back to album-artist (`artist()` in `Main.cxx`).
    pub fn effective_artist(&self) -> Option<&str> {
        self.artist.as_deref().or(self.album_artist.as_deref())
    }
}

/// One poll/subscription sample from the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub state: PlayerState,
    pub song: Option<Song>,
    pub elapsed: Duration,
}
