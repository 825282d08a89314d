mod cli;
mod multi_scrobbler;
mod player_loop;
mod signals;

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use scrobbled_core::config::Config;
use scrobbled_core::logging::{self, LogDestination, LogLevel};
use scrobbled_core::models::ScrobblerConfig;
use scrobbled_core::paths;
use scrobbled_protocol::ScrobblerHandle;

use cli::Cli;
use multi_scrobbler::MultiScrobbler;
use signals::SignalEvent;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let conf_path = cli.conf.clone().unwrap_or_else(paths::default_config_path);
    let mut config = Config::load(&conf_path)
        .with_context(|| format!("failed to load config from {}", conf_path.display()))?;

    if cli.proxy.is_some() {
        config.proxy = cli.proxy.clone();
    }

    let verbose = cli.verbose.unwrap_or(config.verbose);
    let level = LogLevel::from_verbosity(verbose);
    let destination = LogDestination::parse(
        cli.log
            .as_deref()
            .or(config.log.as_deref())
            .unwrap_or("-"),
    );
    let _logging_guard =
        logging::init_logging(level, &destination).context("failed to initialize logging")?;

    if config.scrobblers.is_empty() {
        anyhow::bail!("no scrobblers configured; nothing to do");
    }

    if let Some(pidfile) = cli.pidfile.as_deref().or(config.pidfile.as_deref().map(std::path::Path::new)) {
        write_pidfile(pidfile).context("failed to write pidfile")?;
    }

    tracing::info!(scrobblers = config.scrobblers.len(), "starting scrobbled");

    let journal_interval = Duration::from_secs(config.journal_interval);
    let mut multi = MultiScrobbler::new(
        build_handles(config.scrobblers, config.proxy.as_deref()),
        journal_interval,
    );

    run_event_loop(&mut multi).await;

    multi.write_journal();
    tracing::info!("shutdown complete");
    Ok(())
}

fn build_handles(
    configs: Vec<ScrobblerConfig>,
    proxy: Option<&str>,
) -> Vec<(ScrobblerHandle, Option<String>)> {
    configs
        .into_iter()
        .map(|config| {
            let journal_path = config.journal.clone();
            (
                ScrobblerHandle::from_config(config, VecDeque::new(), proxy),
                journal_path,
            )
        })
        .collect()
}

/// The top-level async loop (spec.md §5): a single task drives journal
/// flush timing, the per-scrobbler handshake/submit state machines, and
/// signal delivery.
async fn run_event_loop(multi: &mut MultiScrobbler) {
    let mut journal_timer = tokio::time::interval(multi.journal_interval());
    journal_timer.tick().await; // first tick fires immediately; consume it
    let mut scrobbler_timer = tokio::time::interval(Duration::from_secs(1));
    scrobbler_timer.tick().await;

    loop {
        tokio::select! {
            _ = journal_timer.tick() => {
                multi.write_journal();
            }
            _ = scrobbler_timer.tick() => {
                multi.drive_due().await;
            }
            event = signals::next_signal() => {
                match event {
                    SignalEvent::Shutdown => {
                        tracing::info!("shutdown signal received");
                        return;
                    }
                    SignalEvent::SubmitNow => {
                        tracing::info!("SubmitNow signal received");
                        multi.submit_now();
                    }
                }
            }
        }
    }
}

fn write_pidfile(path: &std::path::Path) -> std::io::Result<()> {
    paths::ensure_parent_exists(path)?;
    std::fs::write(path, format!("{}\n", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_pidfile_creates_parent_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scrobbled.pid");
        write_pidfile(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), std::process::id().to_string());
    }
}
