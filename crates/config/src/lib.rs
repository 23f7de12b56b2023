//! Configuration loading for Almanac
//!
//! Provides utilities for loading configuration files from the shared
//! Almanac config directory (~/.config/almanac/) and for reading
//! environment overrides on top of them.
//!
//! Call [`init`] at process startup to bootstrap the config directory.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Initialize the Almanac config directory.
///
/// Creates ~/.config/almanac/ if it doesn't exist.
pub fn init() -> Result<PathBuf> {
    ensure_config_dir()
}

/// Get the Almanac config directory (~/.config/almanac/)
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("almanac"))
}

/// Get the path to a config file within the Almanac config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Get the path to a data file (databases) in the platform data directory,
/// falling back to the config directory when no data directory exists.
pub fn data_path(filename: &str) -> Option<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join("almanac"))
        .or_else(config_dir)
        .map(|p| p.join(filename))
}

/// Load and parse a JSON config file from the Almanac config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

/// Load a JSON config file if present, otherwise return the type's default
pub fn load_json_or_default<T: DeserializeOwned + Default>(filename: &str) -> Result<T> {
    if config_exists(filename) {
        load_json(filename)
    } else {
        Ok(T::default())
    }
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Check if a config file exists in the Almanac config directory
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|p| p.exists())
}

/// Ensure the Almanac config directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

/// Read a non-empty environment variable
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse an environment variable, failing loudly on a bad value
/// rather than silently keeping the file setting.
pub fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", name, e)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        let dir = config_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().ends_with("almanac"));
    }

    #[test]
    fn test_config_path() {
        let path = config_path("almanac.json");
        assert!(path.is_some());
        assert!(path.unwrap().ends_with("almanac/almanac.json"));
    }

    #[test]
    fn test_load_json_file() {
        let dir = std::env::temp_dir().join(format!("almanac-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        std::fs::write(&path, r#"{"port": 8080}"#).unwrap();

        let value: serde_json::Value = load_json_file(&path).unwrap();
        assert_eq!(value["port"], 8080);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_env_parse_missing() {
        let value: Option<u16> = env_parse("ALMANAC_TEST_UNSET_VARIABLE").unwrap();
        assert!(value.is_none());
    }
}
