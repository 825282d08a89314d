//! Fans play-events out to every configured scrobbler and owns the
//! periodic journal flush (spec.md §4.5). Grounded in `MultiScrobbler.cxx`.

use std::time::{Duration, Instant};

use scrobbled_core::clock;
use scrobbled_core::journal::Journal;
use scrobbled_core::models::{Record, Source};
use scrobbled_player::Song;
use scrobbled_protocol::ScrobblerHandle;

/// A scrobbler paired with the journal state needed to flush it.
struct Entry {
    handle: ScrobblerHandle,
    journal_path: Option<String>,
    journal: Journal,
    due: Instant,
}

pub struct MultiScrobbler {
    entries: Vec<Entry>,
    journal_interval: Duration,
}

impl MultiScrobbler {
    pub fn new(scrobblers: Vec<(ScrobblerHandle, Option<String>)>, journal_interval: Duration) -> Self {
        let entries = scrobblers
            .into_iter()
            .map(|(handle, journal_path)| {
                let mut journal = Journal::new();
                let mut handle = handle;
                if let (Some(path), ScrobblerHandle::Network(_)) = (&journal_path, &handle) {
                    let records = journal.read(path);
                    if !records.is_empty() {
                        tracing::info!(
                            scrobbler = handle.name(),
                            count = records.len(),
                            "loaded records from journal"
                        );
                        for record in records {
                            handle.push(record);
                        }
                    }
                }
                Entry {
                    handle,
                    journal_path,
                    journal,
                    due: Instant::now(),
                }
            })
            .collect();

        Self {
            entries,
            journal_interval,
        }
    }

    pub fn journal_interval(&self) -> Duration {
        self.journal_interval
    }

    pub fn handles_mut(&mut self) -> impl Iterator<Item = &mut ScrobblerHandle> {
        self.entries.iter_mut().map(|e| &mut e.handle)
    }

    /// `NowPlaying(...)`: build a Record (length only, no time/love/source
    /// are meaningful for now-playing) and dispatch to every scrobbler
    /// (spec.md §4.5).
    pub fn now_playing(
        &mut self,
        artist: &str,
        track: &str,
        album: Option<&str>,
        number: Option<&str>,
        mbid: Option<&str>,
        length_seconds: u64,
    ) {
        let Some(record) = Record::new(
            artist,
            track,
            album.map(String::from),
            number.map(String::from),
            mbid.map(String::from),
            length_seconds,
            String::new(),
            false,
            Source::Playlist,
        ) else {
            return;
        };

        for entry in &mut self.entries {
            entry.handle.schedule_now_playing(record.clone());
        }
    }

    /// `SongChange(...)`: validate, classify source, timestamp, and
    /// dispatch `Push` to every scrobbler (spec.md §4.5).
    pub fn song_change(
        &mut self,
        file_uri: &str,
        artist: &str,
        track: &str,
        album: Option<&str>,
        number: Option<&str>,
        mbid: Option<&str>,
        length_seconds: u64,
        love: bool,
        time: Option<String>,
    ) {
        if artist.is_empty() {
            tracing::warn!(uri = file_uri, "empty artist, not submitting");
            return;
        }
        if track.is_empty() {
            tracing::warn!(uri = file_uri, "empty title, not submitting");
            return;
        }

        let time = time.unwrap_or_else(|| clock::now().to_string());
        let source = Source::from_uri(file_uri);

        let Some(record) = Record::new(
            artist,
            track,
            album.map(String::from),
            number.map(String::from),
            mbid.map(String::from),
            length_seconds,
            time,
            love,
            source,
        ) else {
            return;
        };

        tracing::info!(
            artist = %record.artist,
            track = %record.track,
            length = record.length_seconds,
            "songchange"
        );

        for entry in &mut self.entries {
            entry.handle.push(record.clone());
        }
    }

    /// `WriteJournal()`: flush every scrobbler that has a journal path
    /// (spec.md §4.5).
    pub fn write_journal(&mut self) {
        for entry in &mut self.entries {
            let Some(path) = &entry.journal_path else {
                continue;
            };
            let Some(queue) = entry.handle.journal_queue() else {
                continue;
            };
            let records: Vec<Record> = queue.iter().cloned().collect();
            if let Err(err) = entry.journal.write(path, &records) {
                tracing::warn!(scrobbler = entry.handle.name(), error = %err, "journal write failed");
            }
        }
    }

    /// `SubmitNow` admin override dispatched to every scrobbler.
    pub fn submit_now(&mut self) {
        for entry in &mut self.entries {
            entry.handle.submit_now();
        }
    }

    /// Advance each scrobbler's handshake/submit state machine whose
    /// backoff interval has elapsed (spec.md §4.4).
    pub async fn drive_due(&mut self) {
        let now = Instant::now();
        for entry in &mut self.entries {
            if entry.due <= now {
                let wait = entry.handle.step().await;
                entry.due = Instant::now() + wait;
            }
        }
    }
}

/// Convenience for the Play Detector integration: pull `(uri, artist,
/// title, length_seconds)` out of a finished [`Song`] for
/// [`MultiScrobbler::song_change`].
pub fn song_change_args(song: &Song) -> (String, String, String, u64) {
    let artist = song.effective_artist().unwrap_or("").to_string();
    let title = song.title.clone().unwrap_or_default();
    (song.uri.clone(), artist, title, song.duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrobbled_core::models::IgnoreList;
    use std::collections::VecDeque;

    fn file_scrobbler_entry(dir: &std::path::Path) -> (ScrobblerHandle, Option<String>) {
        let path = dir.join("scrobbles.log").to_string_lossy().into_owned();
        let handle = ScrobblerHandle::from_config(
            scrobbled_core::models::ScrobblerConfig {
                name: "local".into(),
                endpoint: scrobbled_core::models::ScrobblerEndpoint::File { path },
                journal: None,
                ignore_list: IgnoreList::default(),
            },
            VecDeque::new(),
            None,
        );
        (handle, None)
    }

    #[test]
    fn song_change_drops_when_artist_or_track_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut multi = MultiScrobbler::new(vec![file_scrobbler_entry(dir.path())], Duration::from_secs(600));
        multi.song_change("/x", "", "T", None, None, None, 100, false, None);
        multi.song_change("/x", "A", "", None, None, None, 100, false, None);
        // Neither call should have written to the file scrobbler.
        assert!(!dir.path().join("scrobbles.log").exists());
    }

    #[test]
    fn song_change_classifies_source_from_uri() {
        let dir = tempfile::tempdir().unwrap();
        let mut multi = MultiScrobbler::new(vec![file_scrobbler_entry(dir.path())], Duration::from_secs(600));
        multi.song_change("http://stream/x", "A", "T", None, None, None, 100, false, None);
        let contents = std::fs::read_to_string(dir.path().join("scrobbles.log")).unwrap();
        assert!(contents.contains("A - T"));
    }
}
