use super::StatePaths;
use crate::shared::now_secs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSON-lines event log shared by the supervisor and its helper threads.
#[derive(Debug, Clone)]
pub struct RuntimeLog {
    path: PathBuf,
    echo: bool,
}

impl RuntimeLog {
    pub fn new(paths: &StatePaths) -> Self {
        Self::at(paths.runtime_log_path())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            echo: false,
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self, event: &str, message: &str) {
        self.append("info", event, message);
    }

    pub fn warn(&self, event: &str, message: &str) {
        self.append("warn", event, message);
    }

    pub fn error(&self, event: &str, message: &str) {
        self.append("error", event, message);
    }

    pub fn append(&self, level: &str, event: &str, message: &str) {
        let payload = serde_json::json!({
            "timestamp": now_secs(),
            "level": level,
            "event": event,
            "message": message,
        });

        let Ok(mut line) = serde_json::to_string(&payload) else {
            return;
        };
        if self.echo {
            eprintln!("{line}");
        }
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let Ok(mut file) = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        else {
            return;
        };
        let _ = file.write_all(line.as_bytes());
    }
}

pub fn append_runtime_log(paths: &StatePaths, level: &str, event: &str, message: &str) {
    RuntimeLog::new(paths).append(level, event, message);
}
