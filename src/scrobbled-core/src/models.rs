//! The scrobble data model: `Record`, ignore-list matching, and per-service
//! configuration.

use serde::{Deserialize, Serialize};

/// Where a play came from. Mirrors the AudioScrobbler 1.2 `source` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    /// `"P"` — a user playlist / local file.
    Playlist,
    /// `"R"` — a non-seekable stream (the originating URI contains `"://"`).
    Radio,
}

impl Source {
    /// Classify a play by the file URI it came from, per spec.md §4.5.
    pub fn from_uri(uri: &str) -> Self {
        if uri.contains("://") {
            Source::Radio
        } else {
            Source::Playlist
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Source::Playlist => "P",
            Source::Radio => "R",
        }
    }
}

impl Default for Source {
    fn default() -> Self {
        Source::Playlist
    }
}

/// The unit of scrobble.
///
/// `artist` and `track` are required and non-empty; a `Record` with either
/// empty is never constructed by [`Record::new`] and must never be enqueued
/// or journaled (spec.md §3 invariant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub artist: String,
    pub track: String,
    pub album: Option<String>,
    pub track_number: Option<String>,
    pub musicbrainz_id: Option<String>,
    /// Duration in whole seconds.
    pub length_seconds: u64,
    /// Wall-clock submission timestamp, seconds since the Unix epoch, kept
    /// as the decimal string the wire protocol expects.
    pub time: String,
    pub love: bool,
    pub source: Source,
}

impl Record {
    /// Build a `Record`, returning `None` if `artist` or `track` is empty —
    /// such a record must never exist (spec.md §3).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        artist: impl Into<String>,
        track: impl Into<String>,
        album: Option<String>,
        track_number: Option<String>,
        musicbrainz_id: Option<String>,
        length_seconds: u64,
        time: String,
        love: bool,
        source: Source,
    ) -> Option<Self> {
        let artist = artist.into();
        let track = track.into();
        if artist.is_empty() || track.is_empty() {
            return None;
        }

        Some(Self {
            artist,
            track,
            album,
            track_number,
            musicbrainz_id,
            length_seconds,
            time,
            love,
            source,
        })
    }

    pub fn is_defined(&self) -> bool {
        !self.artist.is_empty() && !self.track.is_empty()
    }
}

/// One entry of a scrobbler's ignore list. An empty field is a wildcard;
/// matching requires every *non-empty* field to equal the corresponding
/// `Record` field (spec.md §3).
///
/// Note the field-name mismatch with `Record` is intentional and matches
/// the original protocol naming: `title` matches `Record::track`, and
/// `track_number` matches `Record::track_number`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreListEntry {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub track_number: String,
}

impl IgnoreListEntry {
    pub fn matches(&self, record: &Record) -> bool {
        Self::field_matches(&self.artist, &record.artist)
            && Self::field_matches(&self.album, record.album.as_deref().unwrap_or(""))
            && Self::field_matches(&self.title, &record.track)
            && Self::field_matches(
                &self.track_number,
                record.track_number.as_deref().unwrap_or(""),
            )
    }

    fn field_matches(ignore: &str, value: &str) -> bool {
        ignore.is_empty() || ignore == value
    }
}

/// A scrobbler's ignore list: a play is dropped if *any* entry matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreList {
    pub entries: Vec<IgnoreListEntry>,
}

impl IgnoreList {
    pub fn matches(&self, record: &Record) -> bool {
        self.entries.iter().any(|entry| entry.matches(record))
    }
}

/// Per-service configuration, corresponding to one `[section]` of the INI
/// config file (spec.md §3, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrobblerConfig {
    /// Log label, also used as the INI section name.
    pub name: String,
    pub endpoint: ScrobblerEndpoint,
    pub journal: Option<String>,
    pub ignore_list: IgnoreList,
}

/// A scrobbler is either a network service (handshake/submit over HTTP) or
/// a local file sink; the two are mutually exclusive (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrobblerEndpoint {
    Network {
        url: String,
        username: String,
        password: String,
    },
    File {
        path: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        Record::new(
            "X",
            "Some Title",
            Some("Album".into()),
            None,
            None,
            120,
            "1000".into(),
            false,
            Source::Playlist,
        )
        .unwrap()
    }

    #[test]
    fn record_new_rejects_empty_artist_or_track() {
        assert!(Record::new("", "t", None, None, None, 1, "1".into(), false, Source::Playlist)
            .is_none());
        assert!(Record::new("a", "", None, None, None, 1, "1".into(), false, Source::Playlist)
            .is_none());
    }

    #[test]
    fn ignore_entry_wildcards_empty_fields() {
        let entry = IgnoreListEntry {
            artist: "X".into(),
            title: String::new(),
            ..Default::default()
        };

        assert!(entry.matches(&sample_record()));

        let mut other = sample_record();
        other.artist = "Y".into();
        assert!(!entry.matches(&other));
    }

    #[test]
    fn source_classifies_by_scheme_separator() {
        assert_eq!(Source::from_uri("http://stream.example/x"), Source::Radio);
        assert_eq!(Source::from_uri("/music/song.flac"), Source::Playlist);
    }
}
