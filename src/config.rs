//! # Configuration Module
//!
//! Solver settings and platform-appropriate file locations.
//!
//! ## Files
//!
//! - Track database: `<data dir>/dynplay/tracks.db`
//! - Solver settings: `<config dir>/dynplay/config.json`
//!
//! where the data and config directories are the platform standard ones
//! (`~/.local/share` and `~/.config` on Linux).
//!
//! A missing settings file is not an error: [`SolverConfig::default`] is used.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Tuning knobs for one playlist-generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Tracks requested when the caller does not say otherwise.
    pub playlist_length: usize,
    /// How many biases may be widened or dropped before giving up with a short playlist.
    pub max_backtracks: usize,
    /// Fixed RNG seed for reproducible playlists.
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            playlist_length: 20,
            max_backtracks: 16,
            seed: None,
        }
    }
}

impl SolverConfig {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Read a JSON settings file. Fields left out take their default values.
///
/// # Examples
///
/// ```no_run
/// use dynplay::config::load_config;
/// use std::path::Path;
///
/// let config = load_config(Path::new("dynplay.json"))?;
/// println!("{} tracks per playlist", config.playlist_length);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config(path: &Path) -> Result<SolverConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid solver config in {}", path.display()))
}

/// Load `path` if given, else the platform config file if it exists, else defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<SolverConfig> {
    if let Some(path) = path {
        return load_config(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => load_config(&path),
        _ => {
            debug!("No solver config file found, using defaults");
            Ok(SolverConfig::default())
        }
    }
}

/// `<config dir>/dynplay/config.json`, if the platform has a config directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dynplay").join("config.json"))
}

/// Returns the platform-appropriate track database path, creating its directory.
///
/// # Errors
///
/// Fails if the data directory cannot be determined or created.
pub fn get_db_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Pass --db to choose a database file."
        )
    })?;

    let app_dir = data_dir.join("dynplay");
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir.join("tracks.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config_uses_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "playlist_length": 5 }"#)?;

        let config = load_config(&path)?;
        assert_eq!(config.playlist_length, 5);
        assert_eq!(config.max_backtracks, SolverConfig::default().max_backtracks);
        assert_eq!(config.seed, None);
        Ok(())
    }

    #[test]
    fn test_config_round_trips_through_json() -> Result<()> {
        let config = SolverConfig::default().with_seed(42);
        let json = serde_json::to_string(&config)?;
        let back: SolverConfig = serde_json::from_str(&json)?;
        assert_eq!(back, config);
        Ok(())
    }

    #[test]
    fn test_invalid_config_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_or_default(Some(&dir.path().join("missing.json"))).is_err());
    }

    #[test]
    fn test_db_path_structure() {
        let path = get_db_path().expect("Should get valid path");
        assert!(path.ends_with("dynplay/tracks.db"));
        assert!(path.is_absolute(), "Database path should be absolute");
    }
}
