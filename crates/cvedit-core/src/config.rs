//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/cvedit/config.toml)
//! 3. Environment variables (CVEDIT_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_HISTORY_DEPTH;
use crate::persistence::{DEFAULT_AUTOSAVE_DELAY, DEFAULT_STORAGE_KEY};

/// Environment variable prefix
const ENV_PREFIX: &str = "CVEDIT";

/// Keys accepted by [`Config::set`]
pub const CONFIG_KEYS: [&str; 5] = [
    "data_dir",
    "autosave_delay_ms",
    "history_depth",
    "storage_key",
    "log_file",
];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the saved résumé
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Debounce delay before an automatic save
    #[serde(default = "default_autosave_delay_ms")]
    pub autosave_delay_ms: u64,

    /// Number of undo levels kept
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// Name of the saved record
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Debug log destination, `{data_dir}/debug.log` when unset
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            autosave_delay_ms: default_autosave_delay_ms(),
            history_depth: default_history_depth(),
            storage_key: default_storage_key(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (CVEDIT_DATA_DIR, CVEDIT_AUTOSAVE_DELAY_MS, ...)
    /// 2. Config file (~/.config/cvedit/config.toml or CVEDIT_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from `--config` if given, otherwise from the default location
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Unparseable numeric values are ignored.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_AUTOSAVE_DELAY_MS", ENV_PREFIX)) {
            if let Ok(ms) = val.trim().parse() {
                self.autosave_delay_ms = ms;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_HISTORY_DEPTH", ENV_PREFIX)) {
            if let Ok(depth) = val.trim().parse() {
                self.history_depth = depth;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Set one key from its string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "autosave_delay_ms" => {
                self.autosave_delay_ms = value
                    .parse()
                    .context("Invalid value for autosave_delay_ms. Use a number of milliseconds.")?;
            }
            "history_depth" => {
                let depth: usize = value
                    .parse()
                    .context("Invalid value for history_depth. Use a positive number.")?;
                if depth == 0 {
                    bail!("history_depth must be at least 1");
                }
                self.history_depth = depth;
            }
            "storage_key" => {
                if value.is_empty() {
                    bail!("storage_key cannot be empty");
                }
                self.storage_key = value.to_string();
            }
            "log_file" => {
                self.log_file = if value.is_empty() || value == "none" {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            _ => bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with CVEDIT_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cvedit")
            .join("config.toml")
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Where the debug log goes
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cvedit")
}

fn default_autosave_delay_ms() -> u64 {
    DEFAULT_AUTOSAVE_DELAY.as_millis() as u64
}

fn default_history_depth() -> usize {
    DEFAULT_HISTORY_DEPTH
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "CVEDIT_CONFIG",
        "CVEDIT_DATA_DIR",
        "CVEDIT_AUTOSAVE_DELAY_MS",
        "CVEDIT_HISTORY_DEPTH",
        "CVEDIT_LOG_FILE",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.autosave_delay_ms, 2000);
        assert_eq!(config.history_depth, 20);
        assert_eq!(config.storage_key, "cvData");
        assert!(config.log_file.is_none());
        assert!(config.data_dir.ends_with("cvedit"));
        assert_eq!(config.autosave_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_log_path_defaults_to_data_dir() {
        let mut config = Config::default();
        assert_eq!(config.log_path(), config.data_dir.join("debug.log"));

        config.log_file = Some(PathBuf::from("/tmp/cvedit.log"));
        assert_eq!(config.log_path(), PathBuf::from("/tmp/cvedit.log"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("CVEDIT_DATA_DIR", "/tmp/cvedit-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/cvedit-test"));
    }

    #[test]
    fn test_env_override_numbers() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("CVEDIT_AUTOSAVE_DELAY_MS", "500");
        env::set_var("CVEDIT_HISTORY_DEPTH", "5");
        config.apply_env_overrides();
        assert_eq!(config.autosave_delay_ms, 500);
        assert_eq!(config.history_depth, 5);

        // Garbage is ignored
        env::set_var("CVEDIT_AUTOSAVE_DELAY_MS", "soon");
        config.apply_env_overrides();
        assert_eq!(config.autosave_delay_ms, 500);
    }

    #[test]
    fn test_env_override_log_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("CVEDIT_LOG_FILE", "/tmp/x.log");
        config.apply_env_overrides();
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/x.log")));

        // Empty string clears it
        env::set_var("CVEDIT_LOG_FILE", "");
        config.apply_env_overrides();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_set_keys() {
        let mut config = Config::default();

        config.set("autosave_delay_ms", "750").unwrap();
        config.set("history_depth", "3").unwrap();
        config.set("storage_key", "resume").unwrap();
        config.set("log_file", "/tmp/a.log").unwrap();
        assert_eq!(config.autosave_delay_ms, 750);
        assert_eq!(config.history_depth, 3);
        assert_eq!(config.storage_key, "resume");
        assert!(config.log_file.is_some());

        config.set("log_file", "none").unwrap();
        assert!(config.log_file.is_none());

        assert!(config.set("history_depth", "0").is_err());
        assert!(config.set("history_depth", "many").is_err());
        assert!(config.set("storage_key", "").is_err());
        assert!(config.set("color", "red").is_err());
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            autosave_delay_ms = 100
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.autosave_delay_ms, 100);
        assert_eq!(config.history_depth, 20);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            autosave_delay_ms: 1234,
            history_depth: 7,
            storage_key: "resume".to_string(),
            log_file: None,
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.data_dir.exists());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("CVEDIT_DATA_DIR", temp_dir.path().join("data"));

        let path = temp_dir.path().join("missing.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.autosave_delay_ms, 2000);
        assert_eq!(config.data_dir, temp_dir.path().join("data"));
    }
}
