//! Settings and configuration utilities.
//!
//! Reads `$HOME/.commitsmith/settings.json` and uses it as a fallback for
//! environment variables.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Settings loaded from `$HOME/.commitsmith/settings.json`.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    /// Environment variable overrides.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Settings {
    /// Loads settings from the default location.
    pub fn load() -> Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Self::load_from_path(&settings_path)
    }

    /// Loads settings from a specific path; a missing file yields empty settings.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        serde_json::from_str::<Settings>(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    /// Returns the default settings path.
    pub fn get_settings_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;

        Ok(home_dir.join(".commitsmith").join("settings.json"))
    }

    /// Returns an environment variable with fallback to settings.
    pub fn get_env_var(&self, key: &str) -> Option<String> {
        env::var(key).ok().or_else(|| self.env.get(key).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_settings(dir: &TempDir) -> PathBuf {
        let settings_path = dir.path().join("settings.json");
        fs::write(
            &settings_path,
            r#"{
                "env": {
                    "COMMITSMITH_TEST_VAR": "from_settings",
                    "GEMINI_API_KEY": "test_api_key"
                }
            }"#,
        )
        .unwrap();
        settings_path
    }

    #[test]
    fn settings_load_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from_path(write_settings(&temp_dir)).unwrap();

        assert_eq!(
            settings.env.get("COMMITSMITH_TEST_VAR").unwrap(),
            "from_settings"
        );
        assert_eq!(settings.env.get("GEMINI_API_KEY").unwrap(), "test_api_key");
    }

    #[test]
    fn missing_file_yields_empty_settings() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from_path(temp_dir.path().join("absent.json")).unwrap();
        assert!(settings.env.is_empty());
    }

    #[test]
    fn invalid_json_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Settings::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings file"));
    }

    #[test]
    fn environment_takes_precedence() {
        let temp_dir = TempDir::new().unwrap();
        let mut settings = Settings::load_from_path(write_settings(&temp_dir)).unwrap();

        env::set_var("COMMITSMITH_TEST_PRECEDENCE", "env_value");
        settings.env.insert(
            "COMMITSMITH_TEST_PRECEDENCE".to_string(),
            "settings_value".to_string(),
        );
        assert_eq!(
            settings.get_env_var("COMMITSMITH_TEST_PRECEDENCE").unwrap(),
            "env_value"
        );
        env::remove_var("COMMITSMITH_TEST_PRECEDENCE");

        assert_eq!(
            settings.get_env_var("COMMITSMITH_TEST_VAR").unwrap(),
            "from_settings"
        );
        assert!(settings.get_env_var("COMMITSMITH_TEST_ABSENT").is_none());
    }
}
