//! Device configuration loaded from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use fairway_engine::TieBreak;

/// Default wait for a role lookup before assuming [`fairway_engine::Role::User`].
pub const DEFAULT_ROLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Remote Store base URL; `None` disables cloud sync
    pub server_url: Option<String>,
    /// Directory holding the local collection files
    pub data_dir: PathBuf,
    /// Bearer token overriding the stored session
    pub token: Option<String>,
    pub role_timeout: Duration,
    pub tie_break: TieBreak,
}

impl ClientConfig {
    /// Load configuration from `FAIRWAY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_url = non_empty(env::var("FAIRWAY_SERVER_URL").ok())
            .map(|url| url.trim_end_matches('/').to_string());

        let data_dir = match non_empty(env::var("FAIRWAY_DATA_DIR").ok()) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        let token = non_empty(env::var("FAIRWAY_TOKEN").ok());

        let role_timeout = match env::var("FAIRWAY_ROLE_TIMEOUT_SECS") {
            Ok(secs) => Duration::from_secs(
                secs.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber("FAIRWAY_ROLE_TIMEOUT_SECS", secs))?,
            ),
            Err(_) => DEFAULT_ROLE_TIMEOUT,
        };

        let tie_break = match env::var("FAIRWAY_TIE_BREAK") {
            Ok(v) => parse_tie_break(&v).ok_or(ConfigError::InvalidTieBreak(v))?,
            Err(_) => TieBreak::default(),
        };

        Ok(Self {
            server_url,
            data_dir,
            token,
            role_timeout,
            tie_break,
        })
    }

    /// Local-only configuration rooted at `data_dir`.
    pub fn local(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            server_url: None,
            data_dir: data_dir.into(),
            token: None,
            role_timeout: DEFAULT_ROLE_TIMEOUT,
            tie_break: TieBreak::default(),
        }
    }

    pub fn sync_enabled(&self) -> bool {
        self.server_url.is_some()
    }
}

/// `dirs::data_local_dir()/fairway`
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_local_dir()
        .map(|dir| dir.join("fairway"))
        .ok_or(ConfigError::NoDataDir)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_tie_break(value: &str) -> Option<TieBreak> {
    match value.trim().to_ascii_lowercase().as_str() {
        "local" | "prefer_local" => Some(TieBreak::PreferLocal),
        "remote" | "prefer_remote" => Some(TieBreak::PreferRemote),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no local data directory; set FAIRWAY_DATA_DIR")]
    NoDataDir,

    #[error("invalid {0} value: {1}")]
    InvalidNumber(&'static str, String),

    #[error("invalid FAIRWAY_TIE_BREAK value: {0} (expected local or remote)")]
    InvalidTieBreak(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tie_break_values() {
        assert_eq!(parse_tie_break("Remote"), Some(TieBreak::PreferRemote));
        assert_eq!(parse_tie_break("prefer_local"), Some(TieBreak::PreferLocal));
        assert_eq!(parse_tie_break("newest"), None);
    }

    #[test]
    fn local_config_disables_sync() {
        let config = ClientConfig::local("/tmp/fairway");
        assert!(!config.sync_enabled());
        assert_eq!(config.role_timeout, DEFAULT_ROLE_TIMEOUT);
    }

    #[test]
    fn blank_values_are_unset() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some("x".into())).as_deref(), Some("x"));
    }
}
