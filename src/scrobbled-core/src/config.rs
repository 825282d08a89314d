//! INI-backed daemon configuration (spec.md §6).
//!
//! The file has a default top-level section for daemon-wide keys, and every
//! other `[section]` names a scrobbler. A default section containing
//! `username` is special-cased into the historic Last.fm service.

use std::fs;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::ignore_list::load_ignore_list;
use crate::models::{IgnoreList, ScrobblerConfig, ScrobblerEndpoint};

const LAST_FM_URL: &str = "https://post.audioscrobbler.com/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path} does not exist")]
    Missing { path: String },
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ini::ParseError,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Daemon-wide settings plus the list of configured scrobblers.
#[derive(Debug, Clone)]
pub struct Config {
    pub pidfile: Option<String>,
    pub daemon_user: Option<String>,
    pub log: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub proxy: Option<String>,
    pub journal_interval: u64,
    pub verbose: u8,
    pub no_daemon: bool,
    pub scrobblers: Vec<ScrobblerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pidfile: None,
            daemon_user: None,
            log: None,
            host: None,
            port: None,
            proxy: None,
            journal_interval: 600,
            verbose: 1,
            no_daemon: false,
            scrobblers: Vec::new(),
        }
    }
}

impl Config {
    /// Load and validate a config file. A missing config file is fatal
    /// (spec.md §7: "missing conf file, no scrobblers" aborts startup).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::Missing {
                    path: path.display().to_string(),
                });
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        let ini = Ini::load_from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::default();

        if let Some(section) = ini.general_section_opt() {
            config.pidfile = get(section, "pidfile");
            config.daemon_user = get(section, "daemon_user");
            config.log = get(section, "log");
            config.host = get(section, "host");
            config.proxy = get(section, "proxy").or_else(|| std::env::var("http_proxy").ok());
            config.port = get(section, "port").and_then(|v| v.parse().ok());
            config.journal_interval = get(section, "journal_interval")
                .or_else(|| get(section, "cache_interval"))
                .and_then(|v| v.parse().ok())
                .unwrap_or(600);
            config.verbose = get(section, "verbose")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);

            if let Some(username) = get(section, "username") {
                config.scrobblers.push(last_fm_scrobbler(
                    section,
                    username,
                    path.parent(),
                )?);
            }
        }

        for (section_name, section) in ini.iter() {
            let Some(name) = section_name else { continue };
            if name.is_empty() {
                continue;
            }

            config
                .scrobblers
                .push(scrobbler_from_section(name, section, path.parent())?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for scrobbler in &self.scrobblers {
            if let ScrobblerEndpoint::Network { url, .. } = &scrobbler.endpoint {
                if url.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "scrobbler '{}' has an empty url",
                        scrobbler.name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn get(section: &ini::Properties, key: &str) -> Option<String> {
    section.get(key).map(|s| s.to_string())
}

fn last_fm_scrobbler(
    section: &ini::Properties,
    username: String,
    base_dir: Option<&Path>,
) -> Result<ScrobblerConfig> {
    let password = get(section, "password").unwrap_or_default();
    let url = get(section, "url").unwrap_or_else(|| LAST_FM_URL.to_string());
    let journal = get(section, "journal").or_else(|| get(section, "cache"));
    let ignore_list = load_ignore_list_opt(get(section, "ignore_list"), base_dir)?;

    Ok(ScrobblerConfig {
        name: "last.fm".to_string(),
        endpoint: ScrobblerEndpoint::Network {
            url,
            username,
            password,
        },
        journal,
        ignore_list,
    })
}

fn scrobbler_from_section(
    name: &str,
    section: &ini::Properties,
    base_dir: Option<&Path>,
) -> Result<ScrobblerConfig> {
    let journal = get(section, "journal").or_else(|| get(section, "cache"));
    let ignore_list = load_ignore_list_opt(get(section, "ignore_list"), base_dir)?;

    let endpoint = if let Some(file) = get(section, "file") {
        ScrobblerEndpoint::File { path: file }
    } else {
        let url = get(section, "url").ok_or_else(|| {
            ConfigError::Validation(format!("scrobbler '{name}' is missing 'url' or 'file'"))
        })?;
        let username = get(section, "username").unwrap_or_default();
        let password = get(section, "password").unwrap_or_default();
        ScrobblerEndpoint::Network {
            url,
            username,
            password,
        }
    };

    Ok(ScrobblerConfig {
        name: name.to_string(),
        endpoint,
        journal,
        ignore_list,
    })
}

fn load_ignore_list_opt(path: Option<String>, base_dir: Option<&Path>) -> Result<IgnoreList> {
    let Some(path) = path else {
        return Ok(IgnoreList::default());
    };

    let resolved: PathBuf = if Path::new(&path).is_absolute() {
        PathBuf::from(path)
    } else {
        base_dir.map(|d| d.join(&path)).unwrap_or_else(|| PathBuf::from(&path))
    };

    match fs::read_to_string(&resolved) {
        Ok(text) => Ok(load_ignore_list(&text)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(IgnoreList::default()),
        Err(source) => Err(ConfigError::Io {
            path: resolved.display().to_string(),
            source,
        }),
    }
}
