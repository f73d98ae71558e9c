//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/eduverse/config.toml)
//! 3. Environment variables (EDUVERSE_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
const ENV_PREFIX: &str = "EDUVERSE";

/// Default backend base URL (includes the API version path)
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default namespace for locally stored drafts
pub const DEFAULT_DRAFTS_PREFIX: &str = "@eduverse_drafts";

/// Default model for AI requests
pub const DEFAULT_MODEL: &str = "mistralai/mistral-7b-instruct";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for local data (key-value database)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Backend base URL, e.g. `http://localhost:8000/api/v1`
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Key prefix under which drafts are stored
    #[serde(default = "default_drafts_prefix")]
    pub drafts_prefix: String,

    /// Model used for AI requests when none is given
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Log file path (logs go to stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            drafts_prefix: default_drafts_prefix(),
            default_model: default_model(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (EDUVERSE_DATA_DIR, EDUVERSE_API_URL, ...)
    /// 2. Config file (~/.config/eduverse/config.toml or EDUVERSE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
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
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
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
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_API_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.api_url = val;
            }
        }

        // Unparseable values are ignored rather than failing startup
        if let Ok(val) = std::env::var(format!("{}_TIMEOUT_SECS", ENV_PREFIX)) {
            if let Ok(secs) = val.parse() {
                self.timeout_secs = secs;
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

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with EDUVERSE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eduverse")
            .join("config.toml")
    }

    /// Get the path to the local key-value database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("eduverse.db")
    }

    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("eduverse")
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_drafts_prefix() -> String {
    DEFAULT_DRAFTS_PREFIX.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
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
        "EDUVERSE_DATA_DIR",
        "EDUVERSE_API_URL",
        "EDUVERSE_TIMEOUT_SECS",
        "EDUVERSE_LOG_FILE",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.drafts_prefix, "@eduverse_drafts");
        assert!(config.log_file.is_none());
        assert!(config.data_dir.ends_with("eduverse"));
    }

    #[test]
    fn test_database_path() {
        let config = Config::default();
        assert!(config.database_path().ends_with("eduverse.db"));
    }

    #[test]
    fn test_env_override_api_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("EDUVERSE_API_URL", "https://api.example.com/api/v1");
        config.apply_env_overrides();
        assert_eq!(config.api_url, "https://api.example.com/api/v1");

        // Empty string keeps the current value
        env::set_var("EDUVERSE_API_URL", "");
        config.apply_env_overrides();
        assert_eq!(config.api_url, "https://api.example.com/api/v1");
    }

    #[test]
    fn test_env_override_timeout() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("EDUVERSE_TIMEOUT_SECS", "5");
        config.apply_env_overrides();
        assert_eq!(config.timeout_secs, 5);

        env::set_var("EDUVERSE_TIMEOUT_SECS", "soon");
        config.apply_env_overrides();
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_env_override_log_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("EDUVERSE_LOG_FILE", "/tmp/eduverse.log");
        config.apply_env_overrides();
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/eduverse.log")));

        env::set_var("EDUVERSE_LOG_FILE", "");
        config.apply_env_overrides();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            api_url = "http://10.0.0.2:8000/api/v1"
            timeout_secs = 10
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.api_url, "http://10.0.0.2:8000/api/v1");
        assert_eq!(config.timeout_secs, 10);
        // Unset fields fall back to defaults
        assert_eq!(config.drafts_prefix, DEFAULT_DRAFTS_PREFIX);
        assert_eq!(config.default_model, DEFAULT_MODEL);
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            api_url: "http://example.com/api/v1".to_string(),
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.api_url, "http://example.com/api/v1");
        assert!(loaded.data_dir.exists());
    }
}
