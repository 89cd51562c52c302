//! Configuration for the metadata providers
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables. The file is either given explicitly or looked up
//! as `config.toml` in the platform's configuration directory.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const ENV_OMDB_API_KEY: &str = "MEDIA_DETECTIVE_OMDB_API_KEY";
const ENV_USER_AGENT: &str = "MEDIA_DETECTIVE_OPENSUBTITLES_USER_AGENT";
const ENV_TIMEOUT: &str = "MEDIA_DETECTIVE_TIMEOUT_SECS";

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has unknown keys
    #[error("Invalid config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// An environment variable holds an unusable value
    #[error("Invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },
}

/// Provider endpoints and credentials
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// OMDb API key; title searches are unavailable without one
    pub omdb_api_key: Option<String>,
    pub omdb_url: String,
    pub tvmaze_url: String,
    pub opensubtitles_url: String,
    /// User agent registered with OpenSubtitles
    pub opensubtitles_user_agent: String,
    /// Timeout applied to every HTTP request
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            omdb_api_key: None,
            omdb_url: "https://www.omdbapi.com/".to_string(),
            tvmaze_url: "https://api.tvmaze.com".to_string(),
            opensubtitles_url: "https://api.opensubtitles.org/xml-rpc".to_string(),
            opensubtitles_user_agent: concat!("media_detective v", env!("CARGO_PKG_VERSION"))
                .to_string(),
            request_timeout_secs: 15,
        }
    }
}

impl Config {
    /// Loads the configuration from file and environment.
    ///
    /// An explicitly given file must exist; the default file is optional.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(explicit_path, Self::default_path(), |name| {
            std::env::var(name).ok()
        })
    }

    fn load_with<F>(
        explicit_path: Option<&Path>,
        default_path: Option<PathBuf>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = match (explicit_path, default_path) {
            (Some(path), _) => Self::from_file(path)?,
            (None, Some(path)) if path.is_file() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        config.with_env(env)
    }

    /// Reads a TOML configuration file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// `config.toml` in the platform configuration directory
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "mediadetective", "media_detective")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn with_env<F>(mut self, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = env(ENV_OMDB_API_KEY) {
            self.omdb_api_key = Some(key);
        }
        if let Some(user_agent) = env(ENV_USER_AGENT) {
            self.opensubtitles_user_agent = user_agent;
        }
        if let Some(timeout) = env(ENV_TIMEOUT) {
            self.request_timeout_secs =
                timeout.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    name: ENV_TIMEOUT,
                    value: timeout.clone(),
                })?;
        }
        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::load_with(None, None, no_env).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert!(config.omdb_api_key.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = config_file("omdb_api_key = \"filekey\"\nrequest_timeout_secs = 30\n");
        let config = Config::load_with(Some(file.path()), None, no_env).unwrap();

        assert_eq!(config.omdb_api_key.as_deref(), Some("filekey"));
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.tvmaze_url, "https://api.tvmaze.com");
    }

    #[test]
    fn test_env_overrides_file() {
        let file = config_file("omdb_api_key = \"filekey\"\n");
        let env: HashMap<&str, &str> = [
            (ENV_OMDB_API_KEY, "envkey"),
            (ENV_USER_AGENT, "MyAgent v1"),
            (ENV_TIMEOUT, "5"),
        ]
        .into_iter()
        .collect();

        let config = Config::load_with(Some(file.path()), None, |name| {
            env.get(name).map(|value| value.to_string())
        })
        .unwrap();

        assert_eq!(config.omdb_api_key.as_deref(), Some("envkey"));
        assert_eq!(config.opensubtitles_user_agent, "MyAgent v1");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_default_path_is_optional() {
        let missing = PathBuf::from("/nonexistent/path/that/does/not/exist/config.toml");
        let config = Config::load_with(None, Some(missing.clone()), no_env).unwrap();
        assert_eq!(config, Config::default());

        assert!(matches!(
            Config::load_with(Some(&missing), None, no_env),
            Err(ConfigError::ReadFailed { .. })
        ));
    }

    #[test]
    fn test_invalid_file_and_env() {
        let file = config_file("unknown_key = 1\n");
        assert!(matches!(
            Config::load_with(Some(file.path()), None, no_env),
            Err(ConfigError::ParseFailed { .. })
        ));

        let result = Config::load_with(None, None, |name| {
            (name == ENV_TIMEOUT).then(|| "soon".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { name: ENV_TIMEOUT, .. })
        ));
    }
}
