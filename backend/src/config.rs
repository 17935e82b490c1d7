//! Server configuration.
//!
//! Read from the environment (after `.env` is loaded by the binary).
//! Unset variables fall back to the defaults below; set but unparseable
//! ones are an error.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use crate::error::ConfigError;

pub const ENV_HOST: &str = "FUELBOARD_HOST";
pub const ENV_PORT: &str = "FUELBOARD_PORT";
pub const ENV_MAX_UPLOAD_MB: &str = "FUELBOARD_MAX_UPLOAD_MB";
pub const ENV_MAX_SESSIONS: &str = "FUELBOARD_MAX_SESSIONS";

pub const DEFAULT_PORT: u16 = 3000;

/// 50 MB
pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;

pub const DEFAULT_MAX_SESSIONS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Largest accepted upload body
    pub max_upload_bytes: usize,
    /// Uploads kept in memory before the oldest is evicted
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl ServerConfig {
    /// Configuration from `FUELBOARD_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_upload_mb = parse_var(&lookup, ENV_MAX_UPLOAD_MB)?.unwrap_or(DEFAULT_MAX_UPLOAD_MB);

        Ok(Self {
            host: parse_var(&lookup, ENV_HOST)?.unwrap_or(defaults.host),
            port: parse_var(&lookup, ENV_PORT)?.unwrap_or(defaults.port),
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
            max_sessions: parse_var(&lookup, ENV_MAX_SESSIONS)?.unwrap_or(defaults.max_sessions),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };

    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }

    value.parse().map(Some).map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: raw.clone(),
    })
}
