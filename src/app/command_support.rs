use crate::config::{default_global_config_path, load_settings_from, Settings};
use crate::control::ControlClient;
use crate::runtime::{bootstrap_state_root, RuntimeLog, StatePaths};
use crate::shared::ServerId;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub endpoint: Option<String>,
}

pub struct CliContext {
    pub settings: Settings,
    pub paths: StatePaths,
    pub endpoint: String,
}

impl CliContext {
    pub fn log(&self) -> RuntimeLog {
        RuntimeLog::new(&self.paths)
    }

    pub fn client(&self) -> ControlClient {
        ControlClient::new(self.endpoint.clone())
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.chat.timeout_ms)
    }
}

/// Pulls `--config` and `--endpoint` out of the argument list wherever they appear.
pub fn split_global_options(args: Vec<String>) -> Result<(GlobalOptions, Vec<String>), String> {
    let mut options = GlobalOptions::default();
    let mut rest = Vec::new();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "`--config` requires a path".to_string())?;
                options.config = Some(PathBuf::from(value));
            }
            "--endpoint" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "`--endpoint` requires a url".to_string())?;
                options.endpoint = Some(value);
            }
            _ => rest.push(arg),
        }
    }
    Ok((options, rest))
}

pub fn load_context(options: &GlobalOptions) -> Result<CliContext, String> {
    let config_path = match &options.config {
        Some(path) => path.clone(),
        None => default_global_config_path().map_err(|e| e.to_string())?,
    };
    let settings = load_settings_from(&config_path).map_err(|e| e.to_string())?;
    let paths = StatePaths::new(settings.resolve_state_root().map_err(|e| e.to_string())?);
    bootstrap_state_root(&paths).map_err(|e| e.to_string())?;
    let endpoint = options
        .endpoint
        .clone()
        .unwrap_or_else(|| settings.control_endpoint());
    Ok(CliContext {
        settings,
        paths,
        endpoint,
    })
}

pub fn required_arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str, String> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| format!("missing required argument <{name}>"))
}

pub fn parse_server_id(raw: &str) -> Result<ServerId, String> {
    ServerId::parse(raw).map_err(|e| format!("invalid server id `{raw}`: {e}"))
}
