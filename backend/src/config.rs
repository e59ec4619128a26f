use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::reminder::Permission;

pub const DEFAULT_POLL_SECS: u64 = 5;
pub const DEFAULT_GRACE_SECS: u64 = 300;
pub const DEFAULT_BANNER_SECS: u64 = 10;
pub const DEFAULT_REFRESH_SECS: u64 = 60;

/// Timing knobs of the reminder pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReminderConfig {
    /// Cadence of the due-now sweep.
    pub poll_interval: Duration,
    /// How late a task may still be picked up by the due-now sweep.
    pub grace_window: Duration,
    /// Lifetime of a reminder banner.
    pub banner_ttl: Duration,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            grace_window: Duration::from_secs(DEFAULT_GRACE_SECS),
            banner_ttl: Duration::from_secs(DEFAULT_BANNER_SECS),
        }
    }
}

impl ReminderConfig {
    pub fn from_vars(vars: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            poll_interval: secs_var(&vars, "TASKMASTER_POLL_SECS", DEFAULT_POLL_SECS)?,
            grace_window: secs_var(&vars, "TASKMASTER_GRACE_SECS", DEFAULT_GRACE_SECS)?,
            banner_ttl: secs_var(&vars, "TASKMASTER_BANNER_SECS", DEFAULT_BANNER_SECS)?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Bearer token -> owner id.
    pub tokens: HashMap<String, String>,
}

impl ServerConfig {
    pub fn new_from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(vars: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = vars("DATABASE_URL")
            .unwrap_or_else(|| "sqlite://taskmaster.db?mode=rwc".to_string());

        let bind_raw = vars("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            key: "BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let tokens = match vars("TASKMASTER_TOKENS") {
            Some(raw) => parse_token_table(&raw)?,
            None => HashMap::new(),
        };

        Ok(Self {
            database_url,
            bind_addr,
            tokens,
        })
    }
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub api_url: String,
    pub token: String,
    pub refresh_interval: Duration,
    /// Native notification permission granted to the agent by its host.
    pub notifications: Permission,
    pub reminder: ReminderConfig,
}

impl AgentConfig {
    pub fn new_from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(vars: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = vars("TASKMASTER_API_URL")
            .unwrap_or_else(|| "http://127.0.0.1:3000".to_string());
        let token = vars("TASKMASTER_TOKEN").ok_or(ConfigError::Missing("TASKMASTER_TOKEN"))?;
        let refresh_interval = secs_var(&vars, "TASKMASTER_REFRESH_SECS", DEFAULT_REFRESH_SECS)?;

        let notifications = match vars("TASKMASTER_NOTIFICATIONS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "TASKMASTER_NOTIFICATIONS",
                value: raw.clone(),
            })?,
            None => Permission::Default,
        };

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            refresh_interval,
            notifications,
            reminder: ReminderConfig::from_vars(&vars)?,
        })
    }
}

fn secs_var(
    vars: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match vars(key) {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::Invalid { key, value: raw }),
        },
    }
}

/// Parses `token=owner,token=owner`.
fn parse_token_table(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut table = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match pair.split_once('=') {
            Some((token, owner)) if !token.trim().is_empty() && !owner.trim().is_empty() => {
                table.insert(token.trim().to_string(), owner.trim().to_string());
            }
            _ => {
                return Err(ConfigError::Invalid {
                    key: "TASKMASTER_TOKENS",
                    value: pair.to_string(),
                });
            }
        }
    }
    Ok(table)
}
