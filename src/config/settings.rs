use super::{default_state_dir, ConfigError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub state_root: Option<PathBuf>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub companion: CompanionSettings,
    #[serde(default)]
    pub ports: PortRange,
    #[serde(default)]
    pub readiness: ReadinessSettings,
    #[serde(default)]
    pub chat: ChatSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CompanionSettings {
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Half-open range `[start, end)` of candidate ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn len(&self) -> usize {
        usize::from(self.end.saturating_sub(self.start))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReadinessSettings {
    FixedDelay {
        #[serde(default = "default_delay_ms")]
        delay_ms: u64,
    },
    TcpProbe {
        #[serde(default = "default_probe_attempts")]
        attempts: u32,
        #[serde(default = "default_initial_backoff_ms")]
        initial_backoff_ms: u64,
        #[serde(default = "default_max_backoff_ms")]
        max_backoff_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatSettings {
    #[serde(default = "default_chat_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_listen() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("../composite-node/node")
}

fn default_program() -> String {
    "uv".to_string()
}

fn default_args() -> Vec<String> {
    ["run", "python", "composite_server.py", "server.py", "--api"]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
}

fn default_delay_ms() -> u64 {
    2000
}

fn default_probe_attempts() -> u32 {
    10
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    2000
}

fn default_chat_timeout_ms() -> u64 {
    120_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            state_root: None,
            host: default_host(),
            companion: CompanionSettings::default(),
            ports: PortRange::default(),
            readiness: ReadinessSettings::default(),
            chat: ChatSettings::default(),
        }
    }
}

impl Default for CompanionSettings {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            program: default_program(),
            args: default_args(),
            env: BTreeMap::new(),
        }
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            start: 8000,
            end: 9000,
        }
    }
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self::FixedDelay {
            delay_ms: default_delay_ms(),
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_chat_timeout_ms(),
        }
    }
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        if self.host.trim().is_empty() {
            return Err(ConfigError::Settings("`host` must be non-empty".to_string()));
        }
        if self.companion.program.trim().is_empty() {
            return Err(ConfigError::Settings(
                "`companion.program` must be non-empty".to_string(),
            ));
        }
        if self.ports.start == 0 || self.ports.is_empty() {
            return Err(ConfigError::Settings(format!(
                "`ports` must be a non-empty range above 0, got {}..{}",
                self.ports.start, self.ports.end
            )));
        }
        if let ReadinessSettings::TcpProbe {
            attempts,
            initial_backoff_ms,
            max_backoff_ms,
        } = self.readiness
        {
            if attempts == 0 {
                return Err(ConfigError::Settings(
                    "`readiness.attempts` must be greater than 0".to_string(),
                ));
            }
            if initial_backoff_ms == 0 || max_backoff_ms < initial_backoff_ms {
                return Err(ConfigError::Settings(
                    "`readiness` backoff must be positive with max_backoff_ms >= initial_backoff_ms"
                        .to_string(),
                ));
            }
        }
        if self.chat.timeout_ms == 0 {
            return Err(ConfigError::Settings(
                "`chat.timeout_ms` must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen.parse().map_err(|err| {
            ConfigError::Settings(format!("invalid `listen` address `{}`: {err}", self.listen))
        })
    }

    pub fn resolve_state_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.state_root {
            Some(path) => Ok(path.clone()),
            None => default_state_dir(),
        }
    }

    pub fn control_endpoint(&self) -> String {
        format!("http://{}/api/server", self.listen)
    }
}
