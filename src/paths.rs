//! Path resolution for the manifest and state file
//!
//! # Environment Variables
//!
//! - `SRHT_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/srht`)
//! - `SRHT_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `SRHT_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/srht` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\srht`
//!    - macOS/Linux: `~/.config/srht`
//!
//! For state_dir():
//! 1. `SRHT_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/srht` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\srht`
//!    - macOS/Linux: `~/.local/state/srht`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "SRHT_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "SRHT_STATE_DIR";

/// Manifest file name inside the config directory
pub const MANIFEST_FILE: &str = "srht.toml";

/// State file name inside the state directory
pub const STATE_FILE: &str = "state.json";

const APP_DIR: &str = "srht";

/// Read an environment variable, treating empty values as unset
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    config_dir_with(env_var)
}

/// Get the state directory path
pub fn state_dir() -> Result<PathBuf> {
    state_dir_with(env_var)
}

/// Manifest path: explicit override, or `<config_dir>/srht.toml`
pub fn manifest_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(expand(&path.to_string_lossy())),
        None => Ok(config_dir()?.join(MANIFEST_FILE)),
    }
}

/// State path: explicit override, or `<state_dir>/state.json`
pub fn state_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(expand(&path.to_string_lossy())),
        None => Ok(state_dir()?.join(STATE_FILE)),
    }
}

fn config_dir_with(lookup: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Some(dir) = lookup(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {}: {}", ENV_CONFIG_DIR, path.display());
        return Ok(path);
    }

    // 2. Check XDG_CONFIG_HOME
    if let Some(xdg_config) = lookup("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    // 3. Platform default
    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join(APP_DIR);
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

fn state_dir_with(lookup: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Some(dir) = lookup(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    // 2. Check XDG_STATE_HOME
    if let Some(xdg_state) = lookup("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    // 3. Platform default
    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            let path = local_app_data.join(APP_DIR);
            log::debug!("Using Windows state dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP_DIR);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Expand `~` and environment variables in a path
///
/// Unknown variables are left as-is.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or_else(|_| shellexpand::tilde(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
