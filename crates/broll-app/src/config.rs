//! Runtime configuration: optional `broll.toml`, then `BROLL_*` environment
//! variables, with `.env` loaded first.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppError;

/// Config file stem searched in the working directory.
pub const CONFIG_FILE_STEM: &str = "broll";

/// Environment variable prefix (`BROLL_API_BASE_URL`, ...).
pub const ENV_PREFIX: &str = "BROLL";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Base URL of the planner API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// File backing the persisted session.
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,

    /// Connection timeout in seconds; transfers themselves are unbounded.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Default log filter; `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            session_file: default_session_file(),
            timeout_secs: default_timeout_secs(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Loads `.env`, `broll.toml` (optional), and `BROLL_*` overrides.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when a source cannot be parsed and
    /// [`AppError::InvalidConfig`] when values fail validation.
    pub fn load() -> Result<Self, AppError> {
        if let Err(error) = dotenvy::dotenv()
            && !error.not_found()
        {
            tracing::warn!(%error, "ignoring unreadable .env file");
        }
        Self::load_with_file(CONFIG_FILE_STEM)
    }

    /// Same as [`AppConfig::load`] without `.env`, reading `file` as the
    /// optional config file.
    ///
    /// # Errors
    /// See [`AppConfig::load`].
    pub fn load_with_file(file: &str) -> Result<Self, AppError> {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Checks the base URL scheme and timeout.
    ///
    /// # Errors
    /// Returns [`AppError::InvalidConfig`] naming the offending value.
    pub fn validate(&self) -> Result<(), AppError> {
        let url = Url::parse(&self.api_base_url).map_err(|error| {
            AppError::InvalidConfig(format!("api_base_url `{}`: {error}", self.api_base_url))
        })?;
        match url.scheme() {
            "https" => {}
            "http" => tracing::warn!(
                api_base_url = %self.api_base_url,
                "api base url is not https; credentials travel in clear text"
            ),
            other => {
                return Err(AppError::InvalidConfig(format!(
                    "api_base_url scheme `{other}` is not http or https"
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(AppError::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Connection timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_api_base_url() -> String {
    "https://ambika-roller.onrender.com".to_string()
}

fn default_session_file() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("broll-planner").join("session.json"))
        .unwrap_or_else(|| PathBuf::from(".broll-session.json"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}
