//! Server configuration, populated from environment variables.

use std::net::SocketAddr;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid socket address (e.g. 0.0.0.0:8000), got {value:?}")]
    InvalidBind { var: &'static str, value: String },

    #[error("{0} must not be empty when set")]
    Empty(&'static str),
}

/// Runtime configuration for the portfolio server.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `PORTFOLIO_BIND` | `0.0.0.0:8000` | TCP socket address to listen on |
/// | `PORTFOLIO_DB` | (absent = in-memory) | Path to the SQLite database file |
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    /// Path to the SQLite database file.
    /// `None` means use an in-memory store (data is lost on restart).
    pub db_path: Option<String>,
}

pub const BIND_VAR: &str = "PORTFOLIO_BIND";
pub const DB_VAR: &str = "PORTFOLIO_DB";
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

impl ServerConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Populate config from `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_bind = lookup(BIND_VAR).unwrap_or_else(|| DEFAULT_BIND.into());
        let bind_addr = raw_bind.parse().map_err(|_| ConfigError::InvalidBind {
            var: BIND_VAR,
            value: raw_bind.clone(),
        })?;

        let db_path = match lookup(DB_VAR) {
            Some(path) if path.trim().is_empty() => return Err(ConfigError::Empty(DB_VAR)),
            other => other,
        };

        Ok(Self { bind_addr, db_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(cfg.db_path, None);
    }

    #[test]
    fn variables_override_defaults() {
        let cfg = config(&[(BIND_VAR, "127.0.0.1:9000"), (DB_VAR, "portfolio.db")]).unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.db_path.as_deref(), Some("portfolio.db"));
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(matches!(
            config(&[(BIND_VAR, "not-an-address")]),
            Err(ConfigError::InvalidBind { .. })
        ));
        assert!(matches!(
            config(&[(DB_VAR, "  ")]),
            Err(ConfigError::Empty(DB_VAR))
        ));
    }
}
