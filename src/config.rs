use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use snafu::ResultExt as _;

use crate::database::DatabaseConfig;
use crate::error::{ApplicationError, ConfigLoadSnafu};
use crate::time::DebounceWindow;

/// Process configuration, read from the environment (and an optional `.env` file).
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(rename = "host_address", default = "ServerConfig::default_host")]
    pub host: SocketAddr,
    #[serde(default = "ServerConfig::default_log_dir")]
    pub log_dir: PathBuf,
    /// Minutes between two counted views of the same resource by the same user.
    #[serde(rename = "view_debounce_duration", alias = "views_debounce_duration", default)]
    pub debounce: DebounceWindow,
}

impl ServerConfig {
    fn default_host() -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], 3000))
    }

    fn default_log_dir() -> PathBuf {
        PathBuf::from("logs")
    }
}

impl Config {
    pub fn from_env() -> Result<Config, ApplicationError> {
        Self::from_vars(std::env::vars().collect::<Vec<_>>())
    }

    /// Load the configuration from explicit `(KEY, value)` pairs.
    pub fn from_vars(
        vars: impl IntoIterator<Item = (String, String)> + Clone,
    ) -> Result<Config, ApplicationError> {
        // the database section flattens its credentials, so it is read on its own to keep numeric fields parseable
        let server = envy::from_iter::<_, ServerConfig>(vars.clone()).context(ConfigLoadSnafu)?;
        let database = envy::from_iter::<_, DatabaseConfig>(vars).context(ConfigLoadSnafu)?;

        Ok(Config { server, database })
    }
}
