//! Ambient CLI configuration: optional defaults loaded from a TOML file in
//! the user's home or platform config directory, the way `storm-cli` lays
//! out its own config.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Codec name(s) used when `--compression` is not given explicitly.
    pub default_compression: Option<String>,
    /// Game profile used when `--game` is not given explicitly.
    pub default_game: Option<String>,
    /// `sector_bytes = 512 << shift` used when `--sector-size-shift` is absent.
    pub default_sector_size_shift: Option<u16>,
}

fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".mopaq-cli").join("config.toml"));
    }
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("mopaq-cli").join("config.toml"));
    }
    paths
}

/// Loads the first config file found on the search path, or defaults if
/// none exist or the file found doesn't parse.
pub fn load_config() -> Config {
    for path in config_paths() {
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        match toml::from_str(&text) {
            Ok(cfg) => return cfg,
            Err(e) => log::warn!("ignoring malformed config at {}: {e}", path.display()),
        }
    }
    Config::default()
}
