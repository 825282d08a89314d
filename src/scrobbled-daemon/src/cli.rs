//! Command-line flags (spec.md §6). Precedence is CLI > config file > env >
//! default, enforced by `main` merging `Cli` onto a loaded [`Config`].

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "scrobbled", version, about = "AudioScrobbler 1.2 submission daemon")]
pub struct Cli {
    /// Stay in the foreground instead of daemonizing.
    #[arg(long)]
    pub no_daemon: bool,

    /// 0=error, 1=warning, 2=info, >=3=debug.
    #[arg(long)]
    pub verbose: Option<u8>,

    /// Path to the INI config file.
    #[arg(long, value_name = "PATH")]
    pub conf: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    pub pidfile: Option<PathBuf>,

    #[arg(long, value_name = "NAME")]
    pub daemon_user: Option<String>,

    /// Log destination: a file path, `"syslog"`, or `"-"` for stderr.
    #[arg(long)]
    pub log: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub proxy: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_invocation() {
        let cli = Cli::parse_from(["scrobbled"]);
        assert!(!cli.no_daemon);
        assert!(cli.verbose.is_none());
    }

    #[test]
    fn parses_all_flags() {
        let cli = Cli::parse_from([
            "scrobbled",
            "--no-daemon",
            "--verbose",
            "3",
            "--conf",
            "/tmp/scrobbled.conf",
            "--pidfile",
            "/tmp/scrobbled.pid",
            "--daemon-user",
            "nobody",
            "--log",
            "-",
            "--host",
            "localhost",
            "--port",
            "6600",
            "--proxy",
            "http://proxy.example/",
        ]);

        assert!(cli.no_daemon);
        assert_eq!(cli.verbose, Some(3));
        assert_eq!(cli.conf, Some(PathBuf::from("/tmp/scrobbled.conf")));
        assert_eq!(cli.log.as_deref(), Some("-"));
        assert_eq!(cli.port, Some(6600));
    }
}
