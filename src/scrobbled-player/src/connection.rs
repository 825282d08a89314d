//! The player connection seam (spec.md §4.3 "Connection"). The concrete
//! player client (e.g. an MPD idle-loop client) is an external collaborator
//! and out of scope here; this trait is what it would implement to feed a
//! [`crate::detector::PlayDetector`].

use async_trait::async_trait;
use thiserror::Error;

use crate::song::Sample;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("player version {found:?} is below the minimum supported {minimum:?}")]
    UnsupportedVersion {
        found: (u32, u32, u32),
        minimum: (u32, u32, u32),
    },
}

/// One message delivered on the player's idle channels: either a playback
/// sample, or a client-to-client text message (spec.md §4.3 "Love flag").
pub enum PlayerEvent {
    Sample(Sample),
    Message(String),
}

/// A connected source of player events. Implementations own the actual
/// transport (e.g. libmpdclient's idle protocol) and are responsible for
/// the version check and the 15s reconnect-on-error policy described in
/// spec.md §4.3; this crate only defines the seam and the policy constants
/// (see [`crate::detector::RECONNECT_DELAY`], [`crate::detector::MIN_PLAYER_VERSION`]).
#[async_trait]
pub trait PlayerSource: Send {
    /// Establish (or re-establish) the connection, returning the reported
    /// player version.
    async fn connect(&mut self) -> Result<(u32, u32, u32), ConnectionError>;

    /// Wait for the next sample or message. Returns `Err` on transport
    /// failure; the caller closes and reconnects after the 15s delay.
    async fn next_event(&mut self) -> Result<PlayerEvent, ConnectionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubSource {
        version: (u32, u32, u32),
    }

    #[async_trait]
    impl PlayerSource for StubSource {
        async fn connect(&mut self) -> Result<(u32, u32, u32), ConnectionError> {
            Ok(self.version)
        }

        async fn next_event(&mut self) -> Result<PlayerEvent, ConnectionError> {
            Err(ConnectionError::Transport("stub has no events".into()))
        }
    }

    #[tokio::test]
    async fn connect_reports_version_through_the_trait_object() {
        let mut source: Box<dyn PlayerSource> = Box::new(StubSource { version: (0, 23, 5) });
        assert_eq!(source.connect().await.unwrap(), (0, 23, 5));
        assert!(source.next_event().await.is_err());
    }
}
