//! Debugger configuration: defaults, TOML file, environment, command line.

#![allow(missing_docs)]

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use smol_str::SmolStr;
use thiserror::Error;

use scriptdbg_runtime::debug::{DisconnectPolicy, SessionWait};

use crate::adapter::env_override;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:5678";
pub const STOP_ON_ENTRY_ENV: &str = "SCRIPTDBG_STOP_ON_ENTRY";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(SmolStr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebuggerConfig {
    /// Address the protocol server listens on.
    pub listen: SmolStr,
    pub stop_on_entry: bool,
    /// How long entry handling waits for a client before running on.
    pub wait_for_client: SessionWait,
    pub disconnect_policy: DisconnectPolicy,
    /// Bound for handlers that wait for the debuggee to stop.
    pub request_timeout: Duration,
    /// Name reported for the traced thread.
    pub thread_name: SmolStr,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.into(),
            stop_on_entry: true,
            wait_for_client: SessionWait::Forever,
            disconnect_policy: DisconnectPolicy::Resume,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            thread_name: "main".into(),
        }
    }
}

/// Values given explicitly on the command line; `None` keeps the lower layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen: Option<String>,
    pub stop_on_entry: Option<bool>,
    pub wait_for_client: Option<SessionWait>,
    pub disconnect_policy: Option<DisconnectPolicy>,
    pub request_timeout: Option<Duration>,
    pub thread_name: Option<String>,
}

impl DebuggerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let raw: ConfigToml = toml::from_str(text)
            .map_err(|err| ConfigError::Invalid(format!("scriptdbg.toml: {err}").into()))?;
        raw.into_config()
    }

    /// Build the effective configuration: defaults, optional file, environment, overrides.
    pub fn resolve(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.apply(overrides);
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Some(stop_on_entry) = env_override(STOP_ON_ENTRY_ENV) {
            self.stop_on_entry = stop_on_entry;
        }
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(listen) = overrides.listen {
            self.listen = listen.into();
        }
        if let Some(stop_on_entry) = overrides.stop_on_entry {
            self.stop_on_entry = stop_on_entry;
        }
        if let Some(wait) = overrides.wait_for_client {
            self.wait_for_client = wait;
        }
        if let Some(policy) = overrides.disconnect_policy {
            self.disconnect_policy = policy;
        }
        if let Some(timeout) = overrides.request_timeout {
            self.request_timeout = timeout;
        }
        if let Some(name) = overrides.thread_name {
            self.thread_name = name.into();
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigToml {
    debugger: Option<DebuggerSection>,
}

#[derive(Debug, Default, Deserialize)]
struct DebuggerSection {
    listen: Option<String>,
    stop_on_entry: Option<bool>,
    wait_for_client: Option<bool>,
    wait_timeout_ms: Option<u64>,
    disconnect_policy: Option<String>,
    request_timeout_ms: Option<u64>,
    thread_name: Option<String>,
}

impl ConfigToml {
    fn into_config(self) -> Result<DebuggerConfig, ConfigError> {
        let defaults = DebuggerConfig::default();
        let section = self.debugger.unwrap_or_default();
        let disconnect_policy = match section.disconnect_policy.as_deref() {
            Some(text) => text.parse::<DisconnectPolicy>().map_err(|err| {
                ConfigError::Invalid(format!("debugger.disconnect_policy: {err}").into())
            })?,
            None => defaults.disconnect_policy,
        };
        let wait_for_client = match (section.wait_for_client, section.wait_timeout_ms) {
            (Some(false), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "debugger.wait_timeout_ms requires wait_for_client = true".into(),
                ));
            }
            (Some(false), None) => SessionWait::NoWait,
            (_, Some(ms)) => SessionWait::Timeout(Duration::from_millis(ms)),
            (_, None) => defaults.wait_for_client,
        };
        let request_timeout = match section.request_timeout_ms {
            Some(0) => {
                return Err(ConfigError::Invalid(
                    "debugger.request_timeout_ms must be greater than zero".into(),
                ));
            }
            Some(ms) => Duration::from_millis(ms),
            None => defaults.request_timeout,
        };
        Ok(DebuggerConfig {
            listen: section.listen.map_or(defaults.listen, SmolStr::from),
            stop_on_entry: section.stop_on_entry.unwrap_or(defaults.stop_on_entry),
            wait_for_client,
            disconnect_policy,
            request_timeout,
            thread_name: section.thread_name.map_or(defaults.thread_name, SmolStr::from),
        })
    }
}
