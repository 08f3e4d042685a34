//! Process configuration read from the environment.

use std::collections::HashMap;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {var}: {value}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Raw value found.
        value: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Config {
    /// MySQL connection URL.
    pub database_url: String,
    /// Address the HTTP server binds to.
    pub listen_addr: String,
    /// Pool size.
    pub max_connections: u32,
    /// Key accepted by every key-protected route.
    pub api_key_users: Option<String>,
    /// Key accepted by routes open to any key.
    pub api_key_admin: Option<String>,
    /// Extra keys accepted by routes open to any key.
    pub api_keys: Vec<String>,
    /// HMAC secret for session tokens.
    pub jwt_secret: Option<String>,
    /// bcrypt cost for new password hashes.
    pub salt_rounds: u32,
    /// Production mode disables the open-by-default key check.
    pub production: bool,
    /// Log output format.
    pub log_format: LogFormat,
    /// Schema holding the fiscal-year budget tables.
    pub finance_schema: String,
}

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a required variable is missing or a
    /// numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Reads configuration from an arbitrary key lookup.
    ///
    /// # Errors
    /// See [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let database_url = get("SITARIDA_DB_URL").ok_or(ConfigError::Missing("SITARIDA_DB_URL"))?;
        let listen_addr = get("SITARIDA_LISTEN_ADDR").unwrap_or_else(|| "127.0.0.1:3000".to_owned());
        let max_connections = parse_or("SITARIDA_DB_MAX_CONNECTIONS", get("SITARIDA_DB_MAX_CONNECTIONS"), 10)?;
        let salt_rounds = parse_or("SALT_ROUNDS", get("SALT_ROUNDS"), 12)?;
        if !(4..=31).contains(&salt_rounds) {
            return Err(ConfigError::Invalid {
                var: "SALT_ROUNDS",
                value: salt_rounds.to_string(),
            });
        }
        let api_keys = get("API_KEYS")
            .or_else(|| get("API_KEY"))
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        let log_format = match get("SITARIDA_LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "SITARIDA_LOG_FORMAT",
                    value: other.to_owned(),
                })
            }
        };

        Ok(Self {
            database_url,
            listen_addr,
            max_connections,
            api_key_users: get("API_KEY_USERS"),
            api_key_admin: get("API_KEY_ADMIN"),
            api_keys,
            jwt_secret: get("JWT_SECRET"),
            salt_rounds,
            production: get("SITARIDA_ENV").is_some_and(|e| e.eq_ignore_ascii_case("production")),
            log_format,
            finance_schema: get("SITARIDA_FINANCE_SCHEMA").unwrap_or_else(|| "sitarida2025".to_owned()),
        })
    }

    /// Builds a config from a fixed map; unset keys fall back to defaults.
    ///
    /// # Errors
    /// See [`Config::from_env`].
    pub fn from_map(vars: &HashMap<&str, &str>) -> Result<Self, ConfigError> {
        Self::from_lookup(|k| vars.get(k).map(|v| (*v).to_owned()))
    }

    /// `true` when no key of any kind is configured.
    #[must_use]
    pub fn no_keys_configured(&self) -> bool {
        self.api_key_users.is_none() && self.api_key_admin.is_none() && self.api_keys.is_empty()
    }
}

fn parse_or(var: &'static str, raw: Option<String>, default: u32) -> Result<u32, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.parse::<u32>().map_err(|_| ConfigError::Invalid { var, value: v }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<&str, &str> = pairs.iter().copied().collect();
        Config::from_map(&vars)
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let cfg = match config(&[("SITARIDA_DB_URL", "mysql://u:p@localhost/sitarida")]) {
            Ok(c) => c,
            Err(e) => panic!("config failed: {e}"),
        };
        assert_eq!(cfg.listen_addr, "127.0.0.1:3000");
        assert_eq!(cfg.max_connections, 10);
        assert_eq!(cfg.salt_rounds, 12);
        assert_eq!(cfg.finance_schema, "sitarida2025");
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert!(!cfg.production);
        assert!(cfg.no_keys_configured());
    }

    #[test]
    fn missing_url_is_an_error() {
        assert_eq!(config(&[]), Err(ConfigError::Missing("SITARIDA_DB_URL")));
    }

    #[test]
    fn api_keys_are_split_and_trimmed() {
        let cfg = match config(&[("SITARIDA_DB_URL", "mysql://x"), ("API_KEYS", " a, b ,,c ")]) {
            Ok(c) => c,
            Err(e) => panic!("config failed: {e}"),
        };
        assert_eq!(cfg.api_keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn legacy_api_key_is_a_fallback() {
        let cfg = match config(&[("SITARIDA_DB_URL", "mysql://x"), ("API_KEY", "solo")]) {
            Ok(c) => c,
            Err(e) => panic!("config failed: {e}"),
        };
        assert_eq!(cfg.api_keys, vec!["solo"]);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = config(&[("SITARIDA_DB_URL", "mysql://x"), ("SALT_ROUNDS", "many")]);
        assert!(matches!(err, Err(ConfigError::Invalid { var: "SALT_ROUNDS", .. })));
        let err = config(&[("SITARIDA_DB_URL", "mysql://x"), ("SALT_ROUNDS", "40")]);
        assert!(matches!(err, Err(ConfigError::Invalid { var: "SALT_ROUNDS", .. })));
    }

    #[test]
    fn production_and_json_logging() {
        let cfg = match config(&[
            ("SITARIDA_DB_URL", "mysql://x"),
            ("SITARIDA_ENV", "Production"),
            ("SITARIDA_LOG_FORMAT", "json"),
        ]) {
            Ok(c) => c,
            Err(e) => panic!("config failed: {e}"),
        };
        assert!(cfg.production);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }
}
