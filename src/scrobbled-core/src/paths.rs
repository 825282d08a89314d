//! Default filesystem locations (spec.md §6).
//!
//! `scrobbled` is a headless POSIX daemon, not a desktop app, so unlike
//! `tunez-core::paths` we don't rely solely on `directories::ProjectDirs` —
//! it gets the XDG case right but has no notion of the `$HOME/.<pkg>` and
//! `/etc`/`/var/cache` legacy fallbacks the original daemon supports.

use std::env;
use std::path::PathBuf;

use directories::ProjectDirs;
use thiserror::Error;

const PKG: &str = "scrobbled";

#[derive(Debug, Error)]
pub enum PathsError {
    #[error("could not determine the user's home directory")]
    NoHome,
}

pub type Result<T> = std::result::Result<T, PathsError>;

/// `$XDG_CONFIG_HOME/<pkg>/<pkg>.conf`, else `$HOME/.<pkg>/<pkg>.conf`, else
/// `/etc/<pkg>.conf`.
pub fn default_config_path() -> PathBuf {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(dir).join(PKG).join(format!("{PKG}.conf"));
    }

    if let Some(proj_dirs) = project_dirs() {
        return proj_dirs.config_dir().join(format!("{PKG}.conf"));
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home)
            .join(format!(".{PKG}"))
            .join(format!("{PKG}.conf"));
    }

    PathBuf::from("/etc").join(format!("{PKG}.conf"))
}

/// `$XDG_CACHE_HOME/<pkg>/<pkg>.cache`, else `$HOME/.<pkg>/<pkg>.cache`,
/// else `/var/cache/<pkg>/<pkg>.cache`.
pub fn default_cache_path() -> PathBuf {
    if let Some(dir) = env::var_os("XDG_CACHE_HOME") {
        return PathBuf::from(dir).join(PKG).join(format!("{PKG}.cache"));
    }

    if let Some(proj_dirs) = project_dirs() {
        return proj_dirs.cache_dir().join(format!("{PKG}.cache"));
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home)
            .join(format!(".{PKG}"))
            .join(format!("{PKG}.cache"));
    }

    PathBuf::from("/var/cache")
        .join(PKG)
        .join(format!("{PKG}.cache"))
}

/// Create the parent directory of `path` if it doesn't already exist.
pub fn ensure_parent_exists(path: &std::path::Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", PKG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn config_path_prefers_xdg_config_home() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("XDG_CONFIG_HOME", "/tmp/xdgcfg");
        let path = default_config_path();
        env::remove_var("XDG_CONFIG_HOME");
        assert_eq!(path, PathBuf::from("/tmp/xdgcfg/scrobbled/scrobbled.conf"));
    }

    #[test]
    fn cache_path_prefers_xdg_cache_home() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("XDG_CACHE_HOME", "/tmp/xdgcache");
        let path = default_cache_path();
        env::remove_var("XDG_CACHE_HOME");
        assert_eq!(
            path,
            PathBuf::from("/tmp/xdgcache/scrobbled/scrobbled.cache")
        );
    }
}
