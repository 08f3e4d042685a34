//! Shared handler state.

use std::sync::Arc;

use sitarida_store::MySqlPool;

use crate::config::Config;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// MySQL pool.
    pub pool: MySqlPool,
    /// Process configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Wraps a pool and config.
    #[must_use]
    pub fn new(pool: MySqlPool, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use sitarida_store::pool::{self, PoolConfig};

    use super::*;

    /// Users key configured by [`state`].
    pub const USERS_KEY: &str = "users-key";
    /// Admin key configured by [`state`].
    pub const ADMIN_KEY: &str = "admin-key";
    /// JWT secret configured by [`state`].
    pub const SECRET: &str = "test-secret";

    /// State over a pool that never dials; only pre-query paths are testable.
    pub fn state() -> AppState {
        state_with(&[("API_KEY_USERS", USERS_KEY), ("API_KEY_ADMIN", ADMIN_KEY)])
    }

    /// Like [`state`] but with only `keys` configured on top of the database URL and secret.
    pub fn state_with(keys: &[(&'static str, &'static str)]) -> AppState {
        let mut vars: HashMap<&str, &str> = [
            ("SITARIDA_DB_URL", "mysql://u:p@127.0.0.1:1/sitarida"),
            ("JWT_SECRET", SECRET),
            ("SALT_ROUNDS", "4"),
        ]
        .into_iter()
        .collect();
        vars.extend(keys.iter().copied());
        let config = match Config::from_map(&vars) {
            Ok(c) => c,
            Err(e) => panic!("config failed: {e}"),
        };
        let pool = match pool::connect_lazy(&PoolConfig::new(config.database_url.clone())) {
            Ok(p) => p,
            Err(e) => panic!("lazy pool failed: {e}"),
        };
        AppState::new(pool, config)
    }
}
