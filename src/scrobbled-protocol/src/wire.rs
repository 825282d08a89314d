//! AudioScrobbler Submissions Protocol 1.2 request builders and response
//! parsing (spec.md §4.4). Grounded in `Scrobbler.cxx`'s handshake/submit
//! construction and response interpretation.

use scrobbled_core::models::Record;

use crate::form::FormDataBuilder;

pub const CLIENT_ID: &str = "scb";
pub const CLIENT_VERSION: &str = "0.1";

/// Maximum records per submit batch (spec.md §4.4: "up to 10 records").
pub const MAX_BATCH: usize = 10;

pub fn handshake_url(
    base_url: &str,
    username: &str,
    timestamp: &str,
    session_token: &str,
) -> String {
    let mut form = FormDataBuilder::with_base(base_url);
    form.append("hs", "true")
        .append("p", "1.2")
        .append("c", CLIENT_ID)
        .append("v", CLIENT_VERSION)
        .append("u", username)
        .append("t", timestamp)
        .append("a", session_token);
    form.into_string()
}

/// The four-line handshake response, parsed strictly in order (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub session: String,
    pub nowplay_url: String,
    pub submit_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Ok(HandshakeResponse),
    Banned,
    BadAuth,
    BadTime,
    Failed(String),
    Malformed,
}

pub fn parse_handshake_response(body: &str) -> HandshakeOutcome {
    let mut lines = body.split('\n');
    let status = match lines.next() {
        Some(s) => s.trim(),
        None => return HandshakeOutcome::Malformed,
    };

    if status == "BANNED" {
        return HandshakeOutcome::Banned;
    }
    if status == "BADAUTH" {
        return HandshakeOutcome::BadAuth;
    }
    if status == "BADTIME" {
        return HandshakeOutcome::BadTime;
    }
    if let Some(rest) = status.strip_prefix("FAILED") {
        return HandshakeOutcome::Failed(rest.trim().to_string());
    }
    if status != "OK" {
        return HandshakeOutcome::Malformed;
    }

    let session = lines.next().unwrap_or("").trim();
    let nowplay_url = lines.next().unwrap_or("").trim();
    let submit_url = lines.next().unwrap_or("").trim();

    if session.is_empty() || nowplay_url.is_empty() || submit_url.is_empty() {
        return HandshakeOutcome::Malformed;
    }

    HandshakeOutcome::Ok(HandshakeResponse {
        session: session.to_string(),
        nowplay_url: nowplay_url.to_string(),
        submit_url: submit_url.to_string(),
    })
}

/// Now-playing request body (spec.md §4.4).
pub fn now_playing_body(session: &str, record: &Record) -> String {
    let mut form = FormDataBuilder::new();
    form.append("s", session)
        .append("a", &record.artist)
        .append("t", &record.track)
        .append("b", record.album.as_deref().unwrap_or(""))
        .append("l", &record.length_seconds.to_string())
        .append("n", record.track_number.as_deref().unwrap_or(""))
        .append("m", record.musicbrainz_id.as_deref().unwrap_or(""));
    form.into_string()
}

/// Submit request body for up to [`MAX_BATCH`] records (spec.md §4.4).
/// `r[i]` appears twice when `love` is true; the protocol tolerates
/// repetition.
pub fn submit_body(session: &str, records: &[Record]) -> String {
    let mut form = FormDataBuilder::new();
    form.append("s", session);

    for (i, record) in records.iter().take(MAX_BATCH).enumerate() {
        form.append_indexed("a", i, &record.artist);
        form.append_indexed("t", i, &record.track);
        form.append_indexed("l", i, &record.length_seconds.to_string());
        form.append_indexed("i", i, &record.time);
        form.append_indexed("o", i, record.source.as_code());
        form.append_indexed("r", i, "");
        form.append_indexed("b", i, record.album.as_deref().unwrap_or(""));
        form.append_indexed("n", i, record.track_number.as_deref().unwrap_or(""));
        form.append_indexed("m", i, record.musicbrainz_id.as_deref().unwrap_or(""));
        if record.love {
            form.append_indexed("r", i, "L");
        }
    }

    form.into_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ok,
    BadSession,
    Failed,
}

pub fn parse_submit_response(body: &str) -> SubmitOutcome {
    match body.split('\n').next().unwrap_or("").trim() {
        "OK" => SubmitOutcome::Ok,
        "BADSESSION" => SubmitOutcome::BadSession,
        _ => SubmitOutcome::Failed,
    }
}
