//! Server configuration, read from a TOML file.
//!
//! ```toml
//! bind = "127.0.0.1:8000"
//! log_level = "info"
//! log_file = "tdse-server.log"
//!
//! [limits]
//! max_grid_points = 262144
//! eigen_max_points = 1024
//! ```
//!
//! Every key is optional.

use std::{
    fs,
    net::SocketAddr,
    path::{ Path, PathBuf },
    str::FromStr,
};
use anyhow::{ Context, Result };
use log::LevelFilter;
use serde::{ de::Error, Deserialize, Deserializer };
use tdse::limits::Limits;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "ServerConfig::default_bind")]
    pub bind: SocketAddr,

    /// Maximum log level.
    #[serde(default = "ServerConfig::default_log_level")]
    #[serde(deserialize_with = "ServerConfig::parse_log_level")]
    pub log_level: LevelFilter,

    /// Log file written in addition to stderr.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Per-request resource ceilings.
    #[serde(default)]
    pub limits: Limits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: Self::default_bind(),
            log_level: Self::default_log_level(),
            log_file: None,
            limits: Limits::default(),
        }
    }
}

impl FromStr for ServerConfig {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

impl ServerConfig {
    fn default_bind() -> SocketAddr { SocketAddr::from(([127, 0, 0, 1], 8000)) }

    fn default_log_level() -> LevelFilter { LevelFilter::Info }

    fn parse_log_level<'de, D>(deserializer: D) -> std::result::Result<LevelFilter, D::Error>
    where D: Deserializer<'de>
    {
        let s = String::deserialize(deserializer)?;
        LevelFilter::from_str(&s).map_err(|_| D::Error::custom(
            format!("invalid log_level '{s}'; expected one of off, error, warn, info, debug, trace")
        ))
    }

    /// Read a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        raw.parse()
            .with_context(|| format!("invalid config file {}", path.display()))
    }
}
