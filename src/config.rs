//! CLI configuration.
//!
//! Three layers, later wins:
//! 1. Built-in defaults
//! 2. Profile file (`~/.config/skyline/config.toml`)
//! 3. `SKYLINE_*` environment variables
//!
//! Command flags (org/project ids) are applied on top by the commands
//! themselves. The resolved [`CliConfig`] is built once at startup and
//! passed down the call chain; nothing reads ambient globals later.

use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://app.skyline.io/api";

/// Default log-service endpoint.
pub const DEFAULT_LOG_SERVICE_URL: &str = "https://app.skyline.io/log-service";

/// Errors for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("no API key configured; set api_key in the profile or SKYLINE_API_KEY")]
    MissingApiKey,
}

impl ConfigError {
    /// Map to a process exit code.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Profile file shape. All fields optional; absent values fall through
/// to the next layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    pub base_url: Option<String>,
    pub log_service_url: Option<String>,
    pub api_key: Option<String>,
    pub org_id: Option<String>,
    pub project_id: Option<String>,
}

/// Environment variable overrides.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub base_url: Option<String>,
    pub log_service_url: Option<String>,
    pub api_key: Option<String>,
    pub org_id: Option<String>,
    pub project_id: Option<String>,
}

impl EnvOverrides {
    /// Read the `SKYLINE_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self {
            base_url: env_non_empty("SKYLINE_API_URL"),
            log_service_url: env_non_empty("SKYLINE_LOG_SERVICE_URL"),
            api_key: env_non_empty("SKYLINE_API_KEY"),
            org_id: env_non_empty("SKYLINE_ORG_ID"),
            project_id: env_non_empty("SKYLINE_PROJECT_ID"),
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// Effective configuration for one invocation.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// API endpoint.
    pub base_url: String,
    /// Log-service endpoint.
    pub log_service_url: String,
    /// Bearer token for both services.
    pub api_key: String,
    /// Default organization id, overridable per command.
    pub org_id: Option<String>,
    /// Default project id, overridable per command.
    pub project_id: Option<String>,
}

impl CliConfig {
    /// Load the configuration from the default profile location and the
    /// process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = default_profile_path();
        let profile = match path.as_deref() {
            Some(p) if p.exists() => read_profile(p)?,
            _ => Profile::default(),
        };
        resolve(profile, EnvOverrides::from_env())
    }

    /// Load from an explicit profile path (missing file is an error here,
    /// unlike the default location).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let profile = read_profile(path)?;
        resolve(profile, EnvOverrides::from_env())
    }
}

/// Merge the layers into an effective configuration.
pub fn resolve(profile: Profile, env: EnvOverrides) -> Result<CliConfig, ConfigError> {
    let api_key = env
        .api_key
        .or(profile.api_key)
        .ok_or(ConfigError::MissingApiKey)?;

    Ok(CliConfig {
        base_url: env
            .base_url
            .or(profile.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        log_service_url: env
            .log_service_url
            .or(profile.log_service_url)
            .unwrap_or_else(|| DEFAULT_LOG_SERVICE_URL.to_string()),
        api_key,
        org_id: env.org_id.or(profile.org_id),
        project_id: env.project_id.or(profile.project_id),
    })
}

fn read_profile(path: &Path) -> Result<Profile, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn default_profile_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("skyline").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_applied_when_layers_empty() {
        let config = resolve(
            Profile {
                api_key: Some("k".to_string()),
                ..Profile::default()
            },
            EnvOverrides::default(),
        )
        .unwrap();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.log_service_url, DEFAULT_LOG_SERVICE_URL);
        assert!(config.org_id.is_none());
    }

    #[test]
    fn test_env_wins_over_profile() {
        let profile = Profile {
            base_url: Some("https://file.example".to_string()),
            api_key: Some("file-key".to_string()),
            org_id: Some("file-org".to_string()),
            ..Profile::default()
        };
        let env = EnvOverrides {
            base_url: Some("https://env.example".to_string()),
            api_key: Some("env-key".to_string()),
            ..EnvOverrides::default()
        };

        let config = resolve(profile, env).unwrap();
        assert_eq!(config.base_url, "https://env.example");
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.org_id.as_deref(), Some("file-org"));
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let err = resolve(Profile::default(), EnvOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_profile_file_parsing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api_key = \"abc\"\norg_id = \"acme\"\nbase_url = \"https://self-hosted.example/api\""
        )
        .unwrap();

        let profile = read_profile(file.path()).unwrap();
        assert_eq!(profile.api_key.as_deref(), Some("abc"));
        assert_eq!(profile.org_id.as_deref(), Some("acme"));

        let config = resolve(profile, EnvOverrides::default()).unwrap();
        assert_eq!(config.base_url, "https://self-hosted.example/api");
    }

    #[test]
    fn test_malformed_profile_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_key = [not toml").unwrap();

        let err = read_profile(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
