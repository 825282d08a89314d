//! Durable FIFO persistence for a scrobbler's pending queue (spec.md §4.2).
//!
//! One record is a group of `key = value` lines separated by a blank line.
//! Lines starting with `#`, or consisting solely of whitespace, are ignored.
//! Keys and values are trimmed. Write order is fixed: `a,t,b,n,m,r,i,l,o`.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;

use crate::models::{Record, Source};

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("failed to read journal {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write journal {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, JournalError>;

/// Tracks whether the on-disk file is known to be empty, so that `write`
/// can skip a no-op rewrite (spec.md §4.2).
#[derive(Debug, Default)]
pub struct Journal {
    known_empty: bool,
}

impl Journal {
    pub fn new() -> Self {
        Self { known_empty: false }
    }

    /// Read every record in `path`. A missing file is not an error: it
    /// yields an empty queue. Any other I/O error is logged at `warn` and
    /// also yields an empty queue, matching the original's "never block
    /// startup on a broken journal" policy.
    pub fn read(&mut self, path: impl AsRef<Path>) -> Vec<Record> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.known_empty = true;
                return Vec::new();
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read journal");
                return Vec::new();
            }
        };

        let records = parse(&text);
        self.known_empty = records.is_empty();
        records
    }

    /// Write `queue` to `path`, truncating and replacing the file. Skipped
    /// entirely when the queue is empty and the file is already known to be
    /// empty, per spec.md §4.2.
    pub fn write(&mut self, path: impl AsRef<Path>, queue: &[Record]) -> Result<()> {
        let path = path.as_ref();
        if queue.is_empty() && self.known_empty {
            return Ok(());
        }

        let mut buf = String::new();
        for (i, record) in queue.iter().enumerate() {
            if i > 0 {
                buf.push('\n');
            }
            write_record(&mut buf, record);
        }

        let mut file = fs::File::create(path).map_err(|source| JournalError::Write {
            path: path.display().to_string(),
            source,
        })?;
        file.write_all(buf.as_bytes())
            .map_err(|source| JournalError::Write {
                path: path.display().to_string(),
                source,
            })?;

        self.known_empty = queue.is_empty();
        Ok(())
    }
}

fn write_record(buf: &mut String, record: &Record) {
    use std::fmt::Write as _;

    let _ = writeln!(buf, "a = {}", record.artist);
    let _ = writeln!(buf, "t = {}", record.track);
    if let Some(album) = &record.album {
        let _ = writeln!(buf, "b = {album}");
    }
    if let Some(track_number) = &record.track_number {
        let _ = writeln!(buf, "n = {track_number}");
    }
    if let Some(mbid) = &record.musicbrainz_id {
        let _ = writeln!(buf, "m = {mbid}");
    }
    if record.love {
        let _ = writeln!(buf, "r = L");
    }
    let _ = writeln!(buf, "i = {}", record.time);
    let _ = writeln!(buf, "l = {}", record.length_seconds);
    let _ = writeln!(buf, "o = {}", record.source.as_code());
}

#[derive(Default)]
struct PendingRecord {
    artist: Option<String>,
    track: Option<String>,
    album: Option<String>,
    track_number: Option<String>,
    musicbrainz_id: Option<String>,
    time: Option<String>,
    length_seconds: u64,
    source: Source,
    love: bool,
}

impl PendingRecord {
    fn commit(self) -> Option<Record> {
        let artist = self.artist?;
        let track = self.track?;
        if artist.is_empty() || track.is_empty() {
            return None;
        }

        Record::new(
            artist,
            track,
            self.album,
            self.track_number,
            self.musicbrainz_id,
            self.length_seconds,
            self.time.unwrap_or_default(),
            self.love,
            self.source,
        )
    }
}

fn parse(text: &str) -> Vec<Record> {
    let mut records = Vec::new();
    let mut current: Option<PendingRecord> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        if key == "a" {
            if let Some(prev) = current.take() {
                if let Some(record) = prev.commit() {
                    records.push(record);
                }
            }
            current = Some(PendingRecord {
                artist: Some(value.to_string()),
                ..Default::default()
            });
            continue;
        }

        let Some(pending) = current.as_mut() else {
            continue;
        };

        match key {
            "t" => pending.track = Some(value.to_string()),
            "b" => pending.album = Some(value.to_string()),
            "n" => pending.track_number = Some(value.to_string()),
            "m" => pending.musicbrainz_id = Some(value.to_string()),
            "i" => pending.time = Some(value.to_string()),
            "l" => pending.length_seconds = value.parse().unwrap_or(0),
            "o" => {
                pending.source = if value == "R" {
                    Source::Radio
                } else {
                    Source::Playlist
                }
            }
            "r" => pending.love = value == "L",
            _ => {}
        }
    }

    if let Some(prev) = current {
        if let Some(record) = prev.commit() {
            records.push(record);
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(artist: &str, track: &str) -> Record {
        Record::new(
            artist,
            track,
            Some("Album".into()),
            Some("3".into()),
            None,
            200,
            "1700000000".into(),
            true,
            Source::Radio,
        )
        .unwrap()
    }

    #[test]
    fn round_trips_through_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal");

        let queue = vec![record("A", "One"), record("B", "Two")];
        let mut journal = Journal::new();
        journal.write(&path, &queue).unwrap();

        let mut reader = Journal::new();
        let read_back = reader.read(&path);
        assert_eq!(read_back, queue);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist");

        let mut journal = Journal::new();
        assert_eq!(journal.read(&path), Vec::new());
        assert!(journal.known_empty);
    }

    #[test]
    fn record_with_empty_artist_or_track_is_discarded() {
        let text = "a = \nt = Track\n\na = Artist\n";
        let records = parse(text);
        assert!(records.is_empty());
    }

    #[test]
    fn write_skips_when_queue_and_file_both_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal");

        let mut journal = Journal::new();
        journal.known_empty = true;
        journal.write(&path, &[]).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn blank_and_comment_lines_are_ignored() {
        let text = "# comment\n\na = A\nt = T\n  \n";
        let records = parse(text);
        assert_eq!(records, vec![record("A", "T")]);
    }

    fn record_minimal(artist: &str, track: &str) -> Record {
        Record::new(artist, track, None, None, None, 0, String::new(), false, Source::Playlist)
            .unwrap()
    }

    #[test]
    fn parse_is_tolerant_of_missing_optional_fields() {
        let text = "a = A\nt = T\n";
        assert_eq!(parse(text), vec![record_minimal("A", "T")]);
    }
}
