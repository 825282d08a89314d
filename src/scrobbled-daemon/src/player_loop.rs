//! Drives a [`PlayerSource`] through the [`PlayDetector`] and dispatches the
//! resulting events into a [`MultiScrobbler`] (spec.md §4.3, §4.5). The
//! concrete MPD client is out of scope; this module is the integration
//! point a caller wires one into.

use scrobbled_player::{
    version_supported, ConnectionError, DetectorEvent, PlayDetector, PlayerEvent, PlayerSource,
    MIN_PLAYER_VERSION, RECONNECT_DELAY,
};

use crate::multi_scrobbler::{song_change_args, MultiScrobbler};

pub async fn run_player_loop(mut source: Box<dyn PlayerSource>, multi: &mut MultiScrobbler) {
    let mut detector = PlayDetector::new();

    loop {
        match source.connect().await {
            Ok(version) if version_supported(version) => {
                tracing::info!(?version, "player connected");
            }
            Ok(version) => {
                tracing::error!(?version, minimum = ?MIN_PLAYER_VERSION, "player version too old, reconnecting");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
            Err(err) => {
                tracing::error!(error = %err, "player connection failed, retrying");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        }

        loop {
            match source.next_event().await {
                Ok(PlayerEvent::Sample(sample)) => {
                    let events = detector.poll(sample);
                    for event in events {
                        dispatch(multi, event);
                    }
                }
                Ok(PlayerEvent::Message(text)) => {
                    detector.on_message(&text);
                }
                Err(ConnectionError::Transport(message)) => {
                    tracing::warn!(error = message, "player transport error, reconnecting");
                    break;
                }
                Err(err) => {
                    tracing::error!(error = %err, "player connection rejected");
                    break;
                }
            }
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

fn dispatch(multi: &mut MultiScrobbler, event: DetectorEvent) {
    match event {
        DetectorEvent::Started(song) => {
            let (_, artist, title, length) = song_change_args(&song);
            multi.now_playing(
                &artist,
                &title,
                song.album.as_deref(),
                song.track_number.as_deref(),
                song.musicbrainz_id.as_deref(),
                length,
            );
        }
        DetectorEvent::Playing(_) | DetectorEvent::Paused | DetectorEvent::Resumed => {}
        DetectorEvent::Ended { song, qualified, love } => {
            if !qualified {
                return;
            }
            let (uri, artist, title, length) = song_change_args(&song);
            multi.song_change(
                &uri,
                &artist,
                &title,
                song.album.as_deref(),
                song.track_number.as_deref(),
                song.musicbrainz_id.as_deref(),
                length,
                love,
                None,
            );
        }
    }
}
