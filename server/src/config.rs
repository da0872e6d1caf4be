//! Configuration management for the server.

use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Maximum pooled database connections
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
    /// Reject requests without a valid session token
    pub require_auth: bool,
    /// Admin account ensured at startup
    pub admin: Option<AdminBootstrap>,
}

/// Credentials of the admin account created (or reset) at startup, from
/// `ADMIN_LOGIN` and `ADMIN_SECRET`.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub login_name: String,
    pub secret: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("login_name", &self.login_name)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?;

        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidNumber("DATABASE_MAX_CONNECTIONS"))?;

        let acquire_timeout_secs = lookup("DATABASE_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidNumber("DATABASE_ACQUIRE_TIMEOUT_SECS"))?;

        let require_auth = match lookup("REQUIRE_AUTH") {
            Some(v) => parse_flag(&v).ok_or(ConfigError::InvalidRequireAuth(v))?,
            None => false,
        };

        let admin = match (
            lookup("ADMIN_LOGIN").filter(|v| !v.trim().is_empty()),
            lookup("ADMIN_SECRET").filter(|v| !v.is_empty()),
        ) {
            (Some(login_name), Some(secret)) => Some(AdminBootstrap {
                login_name: login_name.trim().to_string(),
                secret,
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteAdmin),
        };

        Ok(Self {
            host,
            port,
            database_url,
            max_connections,
            acquire_timeout_secs,
            require_auth,
            admin,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid {0} value")]
    InvalidNumber(&'static str),

    #[error("Invalid REQUIRE_AUTH value: {0}")]
    InvalidRequireAuth(String),

    #[error("ADMIN_LOGIN and ADMIN_SECRET must be set together")]
    IncompleteAdmin,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    const DB: (&str, &str) = ("DATABASE_URL", "postgres://localhost/fairway");

    #[test]
    fn defaults() {
        let config = load(&[DB]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_connections, 10);
        assert!(!config.require_auth);
        assert!(config.admin.is_none());

        assert!(matches!(load(&[]), Err(ConfigError::MissingDatabaseUrl)));
    }

    #[test]
    fn admin_bootstrap_needs_both_values() {
        let config = load(&[DB, ("ADMIN_LOGIN", " admin "), ("ADMIN_SECRET", "s3cret")]).unwrap();
        let admin = config.admin.unwrap();
        assert_eq!(admin.login_name, "admin");
        assert_eq!(admin.secret, "s3cret");
        assert!(!format!("{admin:?}").contains("s3cret"));

        assert!(matches!(
            load(&[DB, ("ADMIN_LOGIN", "admin")]),
            Err(ConfigError::IncompleteAdmin)
        ));
        assert!(matches!(
            load(&[DB, ("ADMIN_SECRET", "s3cret")]),
            Err(ConfigError::IncompleteAdmin)
        ));
    }

    #[test]
    fn flags() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
