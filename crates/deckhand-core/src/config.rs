//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/deckhand/config.toml)
//! 3. Environment variables (DECKHAND_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix
const ENV_PREFIX: &str = "DECKHAND";

/// Default persistence service endpoint
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Keys accepted by `set`
pub const KEYS: &[&str] = &[
    "api_url",
    "api_token",
    "request_timeout_secs",
    "export_dir",
    "log_file",
];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the persistence service
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token sent with every request (optional)
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Where exports land when no output path is given
    #[serde(default)]
    pub export_dir: Option<PathBuf>,

    /// Write logs here instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            export_dir: None,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (DECKHAND_API_URL, DECKHAND_API_TOKEN, DECKHAND_TIMEOUT_SECS)
    /// 2. Config file (~/.config/deckhand/config.toml or DECKHAND_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from `--config` if given, otherwise from the default location
    pub fn load_with_override(path: Option<&Path>) -> Result<Self> {
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
        // DECKHAND_API_URL
        if let Ok(val) = std::env::var(format!("{}_API_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.api_url = val;
            }
        }

        // DECKHAND_API_TOKEN
        if let Ok(val) = std::env::var(format!("{}_API_TOKEN", ENV_PREFIX)) {
            self.api_token = if val.is_empty() { None } else { Some(val) };
        }

        // DECKHAND_TIMEOUT_SECS
        if let Ok(val) = std::env::var(format!("{}_TIMEOUT_SECS", ENV_PREFIX)) {
            match val.parse() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring invalid {}_TIMEOUT_SECS: {}", ENV_PREFIX, val),
            }
        }
    }

    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Set a single value by key, as `config set` does
    ///
    /// An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());
        match key {
            "api_url" => {
                if value.is_empty() {
                    bail!("api_url cannot be empty");
                }
                self.api_url = value.trim_end_matches('/').to_string();
            }
            "api_token" => self.api_token = optional(value),
            "request_timeout_secs" => {
                self.request_timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout: {}", value))?;
            }
            "export_dir" => self.export_dir = optional(value).map(PathBuf::from),
            "log_file" => self.log_file = optional(value).map(PathBuf::from),
            _ => bail!("Unknown config key: {} (expected one of {})", key, KEYS.join(", ")),
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
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
    /// Can be overridden with DECKHAND_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("deckhand")
            .join("config.toml")
    }

    /// Directory exports are written to by default
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
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
        "DECKHAND_API_URL",
        "DECKHAND_API_TOKEN",
        "DECKHAND_TIMEOUT_SECS",
        "DECKHAND_CONFIG",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_url, "http://127.0.0.1:5000/api");
        assert!(config.api_token.is_none());
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.export_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_env_overrides() {
        let _guard = EnvGuard::new(ENV_VARS);
        let mut config = Config::default();

        env::set_var("DECKHAND_API_URL", "https://slides.example.com/api");
        env::set_var("DECKHAND_API_TOKEN", "secret");
        env::set_var("DECKHAND_TIMEOUT_SECS", "30");
        config.apply_env_overrides();

        assert_eq!(config.api_url, "https://slides.example.com/api");
        assert_eq!(config.api_token, Some("secret".to_string()));
        assert_eq!(config.request_timeout_secs, 30);

        // Empty token clears it, garbage timeout is ignored
        env::set_var("DECKHAND_API_TOKEN", "");
        env::set_var("DECKHAND_TIMEOUT_SECS", "soon");
        config.apply_env_overrides();
        assert!(config.api_token.is_none());
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_config_path_override() {
        let _guard = EnvGuard::new(ENV_VARS);
        env::set_var("DECKHAND_CONFIG", "/tmp/deckhand-test.toml");
        assert_eq!(
            Config::config_file_path(),
            PathBuf::from("/tmp/deckhand-test.toml")
        );
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            api_url = "http://localhost:8080/api"
            request_timeout_secs = 3
            export_dir = "/tmp/exports"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.api_url, "http://localhost:8080/api");
        assert_eq!(config.request_timeout_secs, 3);
        assert_eq!(config.export_dir(), PathBuf::from("/tmp/exports"));
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::load_from_path(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("api_token", "abc").unwrap();
        config.set("log_file", "/tmp/deckhand.log").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_with_override(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_set() {
        let mut config = Config::default();

        config.set("api_url", "http://example.com/api/").unwrap();
        assert_eq!(config.api_url, "http://example.com/api");

        config.set("request_timeout_secs", "5").unwrap();
        assert_eq!(config.request_timeout_secs, 5);

        config.set("export_dir", "/out").unwrap();
        config.set("export_dir", "").unwrap();
        assert!(config.export_dir.is_none());

        assert!(config.set("request_timeout_secs", "five").is_err());
        assert!(config.set("api_url", "").is_err());
        assert!(config.set("colour", "blue").is_err());
    }
}
