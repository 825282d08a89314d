//! The Play Detector (spec.md §4.3): turns raw player samples into
//! Started/Playing/Paused/Resumed/Ended events, applying the qualification
//! and repeat-detection rules. Grounded in `Main.cxx`'s
//! `played_long_enough`/`song_repeated`/`OnMpd*` handlers and
//! `MpdObserver.cxx`'s state tracking.

use std::collections::HashSet;
use std::time::Duration;

use crate::song::{PlayerState, Sample, Song};

/// `elapsed >= 240s` or (`duration >= 30s` and `elapsed >= duration/2`)
/// (spec.md §4.3).
pub fn played_long_enough(elapsed: Duration, duration: Duration) -> bool {
    elapsed >= Duration::from_secs(240)
        || (duration >= Duration::from_secs(30) && elapsed >= duration / 2)
}

/// `elapsed < 60s` and the previous elapsed was greater and itself
/// qualified against `duration` (spec.md §4.3).
fn song_repeated(elapsed: Duration, prev_elapsed: Duration, duration: Duration) -> bool {
    elapsed < Duration::from_secs(60)
        && prev_elapsed > elapsed
        && played_long_enough(prev_elapsed - elapsed, duration)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorEvent {
    Started(Song),
    Playing(Song),
    Paused,
    Resumed,
    Ended { song: Song, qualified: bool, love: bool },
}

/// Consumes a stream of [`Sample`]s (caller-driven, e.g. from an MPD idle
/// loop) and produces the events in the table at spec.md §4.3.
#[derive(Debug, Default)]
pub struct PlayDetector {
    tracked: TrackedState,
    current_song: Option<Song>,
    prev_elapsed: Duration,
    love_pending: bool,
    logged_missing_tags: HashSet<u64>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum TrackedState {
    #[default]
    None,
    Playing,
    Paused,
}

impl PlayDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `"love"` client-to-client message sets a one-shot flag consumed by
    /// the next `Ended` event (spec.md §4.3).
    pub fn on_message(&mut self, text: &str) {
        if text == "love" {
            self.love_pending = true;
        }
    }

    pub fn poll(&mut self, sample: Sample) -> Vec<DetectorEvent> {
        let mut events = Vec::new();

        match (self.tracked, sample.state) {
            (TrackedState::None, PlayerState::Play) => {
                self.start(sample.song, &mut events);
            }
            (TrackedState::Playing, PlayerState::Play) => {
                self.continue_playing(sample.song, sample.elapsed, &mut events);
            }
            (TrackedState::Paused, PlayerState::Play) => {
                if self.same_song(&sample.song) {
                    self.tracked = TrackedState::Playing;
                    events.push(DetectorEvent::Resumed);
                    self.prev_elapsed = sample.elapsed;
                } else {
                    self.end_current(&mut events);
                    self.start(sample.song, &mut events);
                }
            }
            (TrackedState::Playing, PlayerState::Pause) => {
                self.tracked = TrackedState::Paused;
                events.push(DetectorEvent::Paused);
            }
            (TrackedState::Paused, PlayerState::Pause) => {}
            (_, PlayerState::Stop) | (_, PlayerState::Unknown) => {
                self.end_current(&mut events);
            }
            (TrackedState::None, PlayerState::Pause) => {}
        }

        events
    }

    fn same_song(&self, song: &Option<Song>) -> bool {
        match (&self.current_song, song) {
            (Some(a), Some(b)) => a.id == b.id,
            _ => false,
        }
    }

    fn start(&mut self, song: Option<Song>, events: &mut Vec<DetectorEvent>) {
        let Some(song) = song else { return };

        if song.has_missing_tags() {
            if self.logged_missing_tags.insert(song.id) {
                tracing::debug!(id = song.id, "song has missing tags, skipping Started");
            }
            self.tracked = TrackedState::None;
            self.current_song = None;
            return;
        }

        self.tracked = TrackedState::Playing;
        self.prev_elapsed = Duration::ZERO;
        self.current_song = Some(song.clone());
        events.push(DetectorEvent::Started(song));
    }

    fn continue_playing(
        &mut self,
        song: Option<Song>,
        elapsed: Duration,
        events: &mut Vec<DetectorEvent>,
    ) {
        let Some(song) = song else {
            self.end_current(events);
            return;
        };

        if !self.same_song(&Some(song.clone())) {
            self.end_current(events);
            self.start(Some(song), events);
            return;
        }

        if song_repeated(elapsed, self.prev_elapsed, song.duration) {
            tracing::debug!(id = song.id, "repeated song detected");
            self.end_current(events);
            self.start(Some(song.clone()), events);
        }

        self.prev_elapsed = elapsed;
        events.push(DetectorEvent::Playing(song));
    }

    fn end_current(&mut self, events: &mut Vec<DetectorEvent>) {
        let Some(song) = self.current_song.take() else {
            self.tracked = TrackedState::None;
            return;
        };

        if song.has_missing_tags() {
            self.tracked = TrackedState::None;
            return;
        }

        let qualified = played_long_enough(self.prev_elapsed, song.duration);
        let love = std::mem::take(&mut self.love_pending);
        self.tracked = TrackedState::None;
        events.push(DetectorEvent::Ended {
            song,
            qualified,
            love,
        });
    }
}

/// Reconnect policy (spec.md §4.3): on transport error, close and schedule
/// a 15s reconnect; on (re)connect, require at least this player version.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(15);
pub const MIN_PLAYER_VERSION: (u32, u32, u32) = (0, 16, 0);

pub fn version_supported(version: (u32, u32, u32)) -> bool {
    version >= MIN_PLAYER_VERSION
}
