//! The Play Detector: turns raw player samples into scrobble-worthy events.

pub mod connection;
pub mod detector;
pub mod song;

pub use connection::{ConnectionError, PlayerEvent, PlayerSource};
pub use detector::{
    played_long_enough, version_supported, DetectorEvent, PlayDetector, MIN_PLAYER_VERSION,
    RECONNECT_DELAY,
};
pub use song::{PlayerState, Sample, Song};
