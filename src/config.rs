use crate::error::{AppResult, ConfigErrorKind, InfraError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,      // e.g. "0.0.0.0:12345"
    pub users_file: PathBuf,      // one `username:password` per line
    pub max_sessions: usize,      // concurrent connections, 0 = unlimited
    pub outbound_queue: usize,    // frames buffered per connection
    pub max_line_bytes: usize,    // longest accepted input line
    pub idle_timeout_secs: u64,   // 0 = never time out
    pub max_auth_failures: u32,   // 0 = unlimited retries
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:12345".to_string(),
            users_file: PathBuf::from("users.txt"),
            max_sessions: 1024,
            outbound_queue: 64,
            max_line_bytes: 1024,
            idle_timeout_secs: 0,
            max_auth_failures: 0,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| InfraError::Config {
            path: path.to_path_buf(),
            source: ConfigErrorKind::Read(e),
        })?;
        toml::from_str(&data).map_err(|e| InfraError::Config {
            path: path.to_path_buf(),
            source: ConfigErrorKind::Parse(e),
        })
    }

    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `PARLEY_*` keys resolved through `lookup`; absent keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let d = Self::default();
        Ok(Self {
            listen_addr: lookup("PARLEY_LISTEN_ADDR").unwrap_or(d.listen_addr),
            users_file: lookup("PARLEY_USERS_FILE").map(PathBuf::from).unwrap_or(d.users_file),
            max_sessions: parse_var(&lookup, "PARLEY_MAX_SESSIONS", d.max_sessions)?,
            outbound_queue: parse_var(&lookup, "PARLEY_OUTBOUND_QUEUE", d.outbound_queue)?,
            max_line_bytes: parse_var(&lookup, "PARLEY_MAX_LINE_BYTES", d.max_line_bytes)?,
            idle_timeout_secs: parse_var(&lookup, "PARLEY_IDLE_TIMEOUT_SECS", d.idle_timeout_secs)?,
            max_auth_failures: parse_var(&lookup, "PARLEY_MAX_AUTH_FAILURES", d.max_auth_failures)?,
        })
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    /// Channel capacity; tokio panics on a zero-sized channel.
    pub fn queue_capacity(&self) -> usize {
        self.outbound_queue.max(1)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> AppResult<T> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| InfraError::Env(ConfigErrorKind::InvalidEnv(key.to_string(), raw))),
    }
}
