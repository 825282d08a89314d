//! The per-service AudioScrobbler state machine (spec.md §4.4), grounded in
//! `Scrobbler.cxx` for the transition table and `tunez-core::scrobbler` /
//! `melodee-scrobbler` for the idiomatic async/reqwest Rust shape.

use std::collections::VecDeque;
use std::time::Duration;

use scrobbled_core::clock;
use scrobbled_core::models::{IgnoreList, Record, ScrobblerConfig, ScrobblerEndpoint};
use thiserror::Error;

use crate::wire::{
    self, HandshakeOutcome, SubmitOutcome,
};

const MIN_INTERVAL: Duration = Duration::from_secs(60);
const MAX_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);
const MAX_PENDING: u32 = 10;

#[derive(Debug, Error)]
pub enum ScrobblerError {
    #[error("network error talking to {name}: {message}")]
    Network { name: String, message: String },
    #[error("failed to open file scrobbler log {path}: {source}")]
    FileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file scrobbler log {path}: {source}")]
    FileWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ScrobblerError>;

/// Builds the HTTP client a [`NetworkScrobbler`] submits through, honoring
/// the resolved `--proxy`/`proxy`/`http_proxy` setting (spec.md §6). Falls
/// back to an unproxied client if the proxy URL doesn't parse.
fn build_http_client(name: &str, proxy: Option<&str>) -> reqwest::Client {
    let Some(proxy_url) = proxy else {
        return reqwest::Client::new();
    };

    let builder = reqwest::Client::builder();
    let proxy = match reqwest::Proxy::all(proxy_url) {
        Ok(proxy) => proxy,
        Err(err) => {
            tracing::warn!(scrobbler = name, proxy = proxy_url, error = %err, "invalid proxy url, ignoring");
            return reqwest::Client::new();
        }
    };

    match builder.proxy(proxy).build() {
        Ok(client) => client,
        Err(err) => {
            tracing::warn!(scrobbler = name, proxy = proxy_url, error = %err, "failed to build proxied client, falling back");
            reqwest::Client::new()
        }
    }
}

/// Runtime state of the handshake/submit state machine (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Nothing,
    Handshake,
    Ready,
    Submitting,
}

/// A network-mode scrobbler: handshake, now-playing, and submit over HTTP
/// against an AudioScrobbler 1.2 endpoint.
pub struct NetworkScrobbler {
    pub name: String,
    url: String,
    username: String,
    password: String,
    client: reqwest::Client,
    ignore_list: IgnoreList,

    state: RunState,
    interval: Duration,
    session: String,
    nowplay_url: String,
    submit_url: String,
    now_playing: Option<Record>,
    queue: VecDeque<Record>,
    pending: u32,
}

impl NetworkScrobbler {
    pub fn new(
        name: String,
        url: String,
        username: String,
        password: String,
        ignore_list: IgnoreList,
        queue: VecDeque<Record>,
        proxy: Option<&str>,
    ) -> Self {
        Self {
            name: name.clone(),
            url,
            username,
            password,
            client: build_http_client(&name, proxy),
            ignore_list,
            state: RunState::Nothing,
            interval: Duration::from_secs(1),
            session: String::new(),
            nowplay_url: String::new(),
            submit_url: String::new(),
            now_playing: None,
            queue,
            pending: 0,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn queue(&self) -> &VecDeque<Record> {
        &self.queue
    }

    /// Queue a completed, qualified play. Dropped silently if the ignore
    /// list matches.
    pub fn push(&mut self, record: Record) {
        if self.ignore_list.matches(&record) {
            tracing::debug!(scrobbler = %self.name, artist = %record.artist, track = %record.track, "ignored");
            return;
        }
        self.queue.push_back(record);
    }

    /// Replace the single-slot now-playing register. Dropped silently if
    /// the ignore list matches.
    pub fn schedule_now_playing(&mut self, record: Record) {
        if self.ignore_list.matches(&record) {
            return;
        }
        self.now_playing = Some(record);
    }

    pub fn has_work(&self) -> bool {
        !self.queue.is_empty() || self.now_playing.is_some()
    }

    /// `SubmitNow` admin override (spec.md §4.4): reset backoff to 1s. The
    /// caller is responsible for re-arming its timers at the new interval.
    pub fn submit_now(&mut self) {
        self.interval = Duration::from_secs(1);
    }

    fn increase_interval(&mut self) {
        self.interval = std::cmp::max(MIN_INTERVAL, self.interval * 2);
        if self.interval > MAX_INTERVAL {
            self.interval = MAX_INTERVAL;
        }
        tracing::warn!(scrobbler = %self.name, seconds = self.interval.as_secs(), "backing off");
    }

    /// `NOTHING -> HANDSHAKE -> {READY, NOTHING}` (spec.md §4.4).
    pub async fn run_handshake(&mut self) {
        self.state = RunState::Handshake;

        let timestamp = clock::now().to_string();
        let token = clock::session_token(&self.password, &timestamp);
        let url = wire::handshake_url(&self.url, &self.username, &timestamp, &token);

        let outcome = match self.client.get(&url).send().await {
            Ok(response) => match response.text().await {
                Ok(body) => wire::parse_handshake_response(&body),
                Err(err) => {
                    tracing::error!(scrobbler = %self.name, error = %err, "handshake body read failed");
                    HandshakeOutcome::Malformed
                }
            },
            Err(err) => {
                tracing::error!(scrobbler = %self.name, error = %err, "handshake request failed");
                HandshakeOutcome::Malformed
            }
        };

        match outcome {
            HandshakeOutcome::Ok(resp) => {
                self.session = resp.session;
                self.nowplay_url = resp.nowplay_url;
                self.submit_url = resp.submit_url;
                self.state = RunState::Ready;
                self.interval = Duration::from_secs(1);
                tracing::info!(scrobbler = %self.name, "handshake successful");
            }
            other => {
                tracing::error!(scrobbler = %self.name, outcome = ?other, "handshake failed");
                self.session.clear();
                self.nowplay_url.clear();
                self.submit_url.clear();
                self.state = RunState::Nothing;
                self.increase_interval();
            }
        }
    }

    /// `READY -> SUBMITTING -> {READY, NOTHING}` (spec.md §4.4). Submits the
    /// queue if non-empty; otherwise sends the pending now-playing update,
    /// which is sent after song submissions, not alongside them.
    pub async fn run_submit(&mut self) {
        if self.queue.is_empty() {
            if let Some(record) = self.now_playing.clone() {
                self.submit_now_playing(&record).await;
            }
            return;
        }

        self.state = RunState::Submitting;
        self.pending = self.queue.len().min(MAX_PENDING as usize) as u32;
        let batch: Vec<Record> = self.queue.iter().take(self.pending as usize).cloned().collect();

        let body = wire::submit_body(&self.session, &batch);
        let outcome = self.post_and_parse(&self.submit_url.clone(), body).await;

        self.state = RunState::Ready;

        match outcome {
            SubmitOutcome::Ok => {
                self.interval = Duration::from_secs(1);
                let drop_count = self.pending as usize;
                self.pending = 0;
                for _ in 0..drop_count {
                    self.queue.pop_front();
                }
                tracing::info!(scrobbler = %self.name, "submit accepted");
            }
            SubmitOutcome::BadSession => {
                tracing::warn!(scrobbler = %self.name, "invalid session, re-handshaking");
                self.pending = 0;
                self.state = RunState::Nothing;
            }
            SubmitOutcome::Failed => {
                self.pending = 0;
                self.increase_interval();
            }
        }
    }

    /// Sends the now-playing update through the same submit response
    /// handling as a batch, clearing `now_playing` only on an accepted ACK.
    async fn submit_now_playing(&mut self, record: &Record) {
        self.state = RunState::Submitting;
        let body = wire::now_playing_body(&self.session, record);
        let outcome = self.post_and_parse(&self.nowplay_url.clone(), body).await;

        self.state = RunState::Ready;

        match outcome {
            SubmitOutcome::Ok => {
                self.interval = Duration::from_secs(1);
                self.now_playing = None;
                tracing::info!(scrobbler = %self.name, "now-playing accepted");
            }
            SubmitOutcome::BadSession => {
                tracing::warn!(scrobbler = %self.name, "invalid session, re-handshaking");
                self.state = RunState::Nothing;
            }
            SubmitOutcome::Failed => {
                self.increase_interval();
            }
        }
    }

    async fn post_and_parse(&self, url: &str, body: String) -> SubmitOutcome {
        match self.client.post(url).body(body).send().await {
            Ok(response) => match response.text().await {
                Ok(text) => wire::parse_submit_response(&text),
                Err(_) => SubmitOutcome::Failed,
            },
            Err(err) => {
                tracing::error!(scrobbler = %self.name, error = %err, "submit request failed");
                SubmitOutcome::Failed
            }
        }
    }
}

/// A file-mode scrobbler: the handshake/submit state machine is bypassed
/// entirely (spec.md §4.4 "File mode").
pub struct FileScrobbler {
    pub name: String,
    path: String,
    ignore_list: IgnoreList,
}

impl FileScrobbler {
    pub fn new(name: String, path: String, ignore_list: IgnoreList) -> Self {
        Self {
            name,
            path,
            ignore_list,
        }
    }

    /// Appends `<log-date> <artist> - <track>\n`, flushing immediately.
    pub fn push(&mut self, record: Record) -> Result<()> {
        if self.ignore_list.matches(&record) {
            return Ok(());
        }

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| ScrobblerError::FileOpen {
                path: self.path.clone(),
                source,
            })?;

        let line = format!("{} {} - {}\n", clock::now(), record.artist, record.track);
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|source| ScrobblerError::FileWrite {
                path: self.path.clone(),
                source,
            })
    }
}

/// Unifies network- and file-mode scrobblers behind one handle so the
/// Multi-Scrobbler can dispatch without matching on config shape everywhere.
pub enum ScrobblerHandle {
    Network(NetworkScrobbler),
    File(FileScrobbler),
}

impl ScrobblerHandle {
    pub fn from_config(config: ScrobblerConfig, queue: VecDeque<Record>, proxy: Option<&str>) -> Self {
        match config.endpoint {
            ScrobblerEndpoint::Network {
                url,
                username,
                password,
            } => ScrobblerHandle::Network(NetworkScrobbler::new(
                config.name,
                url,
                username,
                password,
                config.ignore_list,
                queue,
                proxy,
            )),
            ScrobblerEndpoint::File { path } => {
                ScrobblerHandle::File(FileScrobbler::new(config.name, path, config.ignore_list))
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ScrobblerHandle::Network(s) => &s.name,
            ScrobblerHandle::File(s) => &s.name,
        }
    }

    pub fn push(&mut self, record: Record) {
        match self {
            ScrobblerHandle::Network(s) => s.push(record),
            ScrobblerHandle::File(s) => {
                if let Err(err) = s.push(record) {
                    tracing::error!(scrobbler = %s.name, error = %err, "file scrobbler write failed");
                }
            }
        }
    }

    pub fn schedule_now_playing(&mut self, record: Record) {
        if let ScrobblerHandle::Network(s) = self {
            s.schedule_now_playing(record);
        }
    }

    pub fn journal_queue(&self) -> Option<&VecDeque<Record>> {
        match self {
            ScrobblerHandle::Network(s) => Some(&s.queue),
            ScrobblerHandle::File(_) => None,
        }
    }

    /// `SubmitNow` admin override (spec.md §4.4); file-mode scrobblers have
    /// no backoff to reset.
    pub fn submit_now(&mut self) {
        if let ScrobblerHandle::Network(s) = self {
            s.submit_now();
        }
    }

    /// Advance the state machine one step if there's anything to do, and
    /// report how long to wait before checking again. File-mode scrobblers
    /// have no state machine and are polled rarely.
    pub async fn step(&mut self) -> Duration {
        match self {
            ScrobblerHandle::Network(s) => {
                match s.state() {
                    RunState::Nothing => s.run_handshake().await,
                    RunState::Ready if s.has_work() => s.run_submit().await,
                    _ => {}
                }
                s.interval()
            }
            ScrobblerHandle::File(_) => Duration::from_secs(3600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrobbled_core::models::Source;

    fn record(artist: &str, track: &str) -> Record {
        Record::new(artist, track, None, None, None, 100, "1000".into(), false, Source::Playlist)
            .unwrap()
    }

    fn scrobbler() -> NetworkScrobbler {
        NetworkScrobbler::new(
            "test".into(),
            "http://example.invalid/".into(),
            "user".into(),
            "pass".into(),
            IgnoreList::default(),
            VecDeque::new(),
            None,
        )
    }

    #[test]
    fn increase_interval_doubles_with_floor_and_ceiling() {
        let mut s = scrobbler();
        s.interval = Duration::from_secs(1);
        s.increase_interval();
        assert_eq!(s.interval, MIN_INTERVAL);

        s.interval = Duration::from_secs(3600);
        s.increase_interval();
        assert_eq!(s.interval, Duration::from_secs(7200));

        s.interval = MAX_INTERVAL;
        s.increase_interval();
        assert_eq!(s.interval, MAX_INTERVAL);
    }

    #[test]
    fn submit_now_resets_interval_to_one_second() {
        let mut s = scrobbler();
        s.interval = Duration::from_secs(120);
        s.submit_now();
        assert_eq!(s.interval, Duration::from_secs(1));
    }

    #[test]
    fn push_drops_records_matching_ignore_list() {
        let mut s = scrobbler();
        s.ignore_list.entries.push(scrobbled_core::models::IgnoreListEntry {
            artist: "A".into(),
            ..Default::default()
        });
        s.push(record("A", "T"));
        assert!(s.queue.is_empty());

        s.push(record("B", "T"));
        assert_eq!(s.queue.len(), 1);
    }

    #[test]
    fn has_work_reflects_queue_and_now_playing() {
        let mut s = scrobbler();
        assert!(!s.has_work());
        s.schedule_now_playing(record("A", "T"));
        assert!(s.has_work());
    }

    #[tokio::test]
    async fn successful_handshake_transitions_to_ready() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK\nsess\nhttp://np\nhttp://sub"))
            .mount(&server)
            .await;

        let mut s = NetworkScrobbler::new(
            "test".into(),
            server.uri(),
            "user".into(),
            "pass".into(),
            IgnoreList::default(),
            VecDeque::new(),
            None,
        );

        s.run_handshake().await;
        assert_eq!(s.state(), RunState::Ready);
        assert_eq!(s.interval(), Duration::from_secs(1));
        assert_eq!(s.session, "sess");
    }

    #[tokio::test]
    async fn failed_handshake_goes_back_to_nothing_and_backs_off() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("BADAUTH\n"))
            .mount(&server)
            .await;

        let mut s = NetworkScrobbler::new(
            "test".into(),
            server.uri(),
            "user".into(),
            "pass".into(),
            IgnoreList::default(),
            VecDeque::new(),
            None,
        );

        s.run_handshake().await;
        assert_eq!(s.state(), RunState::Nothing);
        assert_eq!(s.interval(), MIN_INTERVAL);
    }

    #[tokio::test]
    async fn successful_submit_drops_pending_records() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK\n"))
            .mount(&server)
            .await;

        let mut queue = VecDeque::new();
        queue.push_back(record("A", "One"));
        queue.push_back(record("B", "Two"));

        let mut s = scrobbler();
        s.queue = queue;
        s.state = RunState::Ready;
        s.session = "sess".into();
        s.submit_url = server.uri();
        s.nowplay_url = server.uri();

        s.run_submit().await;

        assert!(s.queue.is_empty());
        assert_eq!(s.pending, 0);
        assert_eq!(s.interval(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn step_handshakes_then_submits_in_successive_calls() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "OK\nsess\n{0}\n{0}",
                server.uri()
            )))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK\n"))
            .mount(&server)
            .await;

        let mut handle = ScrobblerHandle::Network(NetworkScrobbler::new(
            "test".into(),
            server.uri(),
            "user".into(),
            "pass".into(),
            IgnoreList::default(),
            VecDeque::new(),
            None,
        ));
        if let ScrobblerHandle::Network(s) = &mut handle {
            s.push(record("A", "One"));
        }

        handle.step().await;
        if let ScrobblerHandle::Network(s) = &handle {
            assert_eq!(s.state(), RunState::Ready);
        }

        handle.step().await;
        if let ScrobblerHandle::Network(s) = &handle {
            assert!(s.queue().is_empty());
        }
    }

    #[tokio::test]
    async fn bad_session_on_submit_forces_rehandshake() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("BADSESSION\n"))
            .mount(&server)
            .await;

        let mut s = scrobbler();
        s.queue.push_back(record("A", "One"));
        s.state = RunState::Ready;
        s.session = "sess".into();
        s.submit_url = server.uri();
        s.nowplay_url = server.uri();

        s.run_submit().await;

        assert_eq!(s.state(), RunState::Nothing);
        assert_eq!(s.queue.len(), 1);
    }
}
