//! POSIX signal handling (spec.md §6, §4.4): `SIGTERM`/`SIGINT` for graceful
//! shutdown, `SIGUSR1` for `SubmitNow`, `SIGHUP` as an acknowledged no-op
//! reload hook, `SIGPIPE` drained and discarded.

use tokio::signal::unix::{signal, SignalKind};

pub enum SignalEvent {
    Shutdown,
    SubmitNow,
}

/// Waits for the next actionable signal, transparently draining `SIGHUP`
/// and `SIGPIPE` without producing an event.
pub async fn next_signal() -> SignalEvent {
    let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut int = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut usr1 = signal(SignalKind::user_defined1()).expect("failed to install SIGUSR1 handler");
    let mut hup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");
    let mut pipe = signal(SignalKind::pipe()).expect("failed to install SIGPIPE handler");

    loop {
        tokio::select! {
            _ = term.recv() => return SignalEvent::Shutdown,
            _ = int.recv() => return SignalEvent::Shutdown,
            _ = usr1.recv() => return SignalEvent::SubmitNow,
            _ = hup.recv() => {
                tracing::info!("SIGHUP received; config reload is not implemented, continuing");
            }
            _ = pipe.recv() => {
                tracing::debug!("SIGPIPE ignored");
            }
        }
    }
}
