use super::ports::{PortAllocator, PortError};
use super::process::{
    capture_output, command_form, companion_args, spawn_companion, terminate, thread_name,
};
use super::readiness::{Readiness, ReadinessOutcome};
use super::RuntimeLog;
use crate::config::{CompanionSettings, PortRange, Settings};
use crate::shared::ServerId;
use crate::translator::{translate_services, ServiceConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::process::{Child, ExitStatus};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_KILL_PROGRAM: &str = "kill";

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("failed to spawn `{program}` for server `{server_id}`: {source}")]
    Spawn {
        server_id: String,
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to allocate a port for server `{server_id}`: {source}")]
    Ports {
        server_id: String,
        #[source]
        source: PortError,
    },
    #[error(
        "server `{server_id}` did not accept connections on port {port} after {attempts} attempts"
    )]
    NotReady {
        server_id: String,
        port: u16,
        attempts: u32,
    },
    #[error("server `{server_id}` exited before becoming ready")]
    ExitedDuringStartup { server_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub companion: CompanionSettings,
    pub ports: PortRange,
    pub host: String,
    pub readiness: Readiness,
    /// Invoked as `<kill_program> -TERM <pid>` to stop a child on unix.
    pub kill_program: String,
}

impl SupervisorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            companion: settings.companion.clone(),
            ports: settings.ports,
            host: settings.host.clone(),
            readiness: Readiness::from(settings.readiness),
            kill_program: DEFAULT_KILL_PROGRAM.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessHandle {
    pub server_id: ServerId,
    pub pid: u32,
    pub port: u16,
    pub url: String,
    pub spawned_at: DateTime<Utc>,
    pub instance: u64,
    pub command_line: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub running: bool,
    pub url: Option<String>,
}

impl ServerStatus {
    pub fn not_running() -> Self {
        Self {
            running: false,
            url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Spawned(ProcessHandle),
    AlreadyRunning(ProcessHandle),
}

impl StartOutcome {
    pub fn handle(&self) -> &ProcessHandle {
        match self {
            StartOutcome::Spawned(handle) | StartOutcome::AlreadyRunning(handle) => handle,
        }
    }

    pub fn url(&self) -> &str {
        &self.handle().url
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    NotFound,
    Stopped { pid: u32, signal_delivered: bool },
}

impl StopOutcome {
    pub fn success(&self) -> bool {
        matches!(self, StopOutcome::Stopped { .. })
    }
}

struct Tracked {
    handle: ProcessHandle,
    child: Arc<Mutex<Child>>,
}

#[derive(Default)]
struct Registry {
    entries: BTreeMap<ServerId, Tracked>,
    next_instance: u64,
}

impl Registry {
    fn remove_instance(&mut self, server_id: &ServerId, instance: u64) -> Option<Tracked> {
        match self.entries.get(server_id) {
            Some(tracked) if tracked.handle.instance == instance => self.entries.remove(server_id),
            _ => None,
        }
    }
}

/// Owns every companion process. All handle-map mutations, including those made by
/// exit watchers, go through the single `registry` mutex, and a watcher only removes
/// the handle instance it was started for.
pub struct ProcessSupervisor {
    config: SupervisorConfig,
    ports: PortAllocator,
    log: RuntimeLog,
    registry: Arc<Mutex<Registry>>,
}

impl ProcessSupervisor {
    pub fn new(config: SupervisorConfig, log: RuntimeLog) -> Self {
        Self {
            ports: PortAllocator::new(config.ports),
            config,
            log,
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn ports(&self) -> &PortAllocator {
        &self.ports
    }

    pub fn log(&self) -> &RuntimeLog {
        &self.log
    }

    pub fn start(
        &self,
        server_id: &ServerId,
        services: &[ServiceConfig],
    ) -> Result<StartOutcome, SupervisorError> {
        let handle = {
            let mut registry = lock(&self.registry);
            if let Some(tracked) = registry.entries.get(server_id) {
                return Ok(StartOutcome::AlreadyRunning(tracked.handle.clone()));
            }

            let flag_set = translate_services(services);
            for unknown in &flag_set.unknown {
                self.log.warn(
                    "service.unknown_kind",
                    &format!("server={server_id} {unknown}; flag omitted"),
                );
            }

            let port = self
                .ports
                .allocate()
                .map_err(|source| SupervisorError::Ports {
                    server_id: server_id.to_string(),
                    source,
                })?;
            let args = companion_args(&self.config.companion, port, &flag_set.args());
            let program = self.config.companion.program.clone();

            let mut child = match spawn_companion(&self.config.companion, &args) {
                Ok(child) => child,
                Err(source) => {
                    self.ports.release(port);
                    self.log.error(
                        "process.start.failed",
                        &format!(
                            "server={server_id} command=`{}` error={source}",
                            command_form(&program, &args)
                        ),
                    );
                    return Err(SupervisorError::Spawn {
                        server_id: server_id.to_string(),
                        program,
                        source,
                    });
                }
            };
            capture_output(&mut child, server_id, &self.log);

            registry.next_instance += 1;
            let mut command_line = vec![program];
            command_line.extend(args);
            let handle = ProcessHandle {
                server_id: server_id.clone(),
                pid: child.id(),
                port,
                url: format!("http://{}:{port}", self.config.host),
                spawned_at: Utc::now(),
                instance: registry.next_instance,
                command_line,
            };
            let child = Arc::new(Mutex::new(child));

            if let Err(source) = self.watch_exit(handle.clone(), Arc::clone(&child)) {
                let mut child = lock(&child);
                if !self.signal(server_id, handle.pid, &mut child) {
                    let _ = child.kill();
                }
                let _ = child.wait();
                drop(child);
                self.ports.release(port);
                return Err(SupervisorError::Spawn {
                    server_id: server_id.to_string(),
                    program: handle.command_line[0].clone(),
                    source,
                });
            }

            registry.entries.insert(
                server_id.clone(),
                Tracked {
                    handle: handle.clone(),
                    child,
                },
            );
            self.log.info(
                "process.spawned",
                &format!(
                    "server={server_id} pid={} port={port} command=`{}`",
                    handle.pid,
                    handle.command_line.join(" ")
                ),
            );
            handle
        };

        self.await_ready(&handle)?;
        Ok(StartOutcome::Spawned(handle))
    }

    /// Removes the handle right away and signals the process without waiting for it
    /// to exit. The port stays reserved until the exit watcher sees the process go.
    pub fn stop(&self, server_id: &str) -> StopOutcome {
        let tracked = lock(&self.registry).entries.remove(server_id);
        let Some(tracked) = tracked else {
            return StopOutcome::NotFound;
        };

        let pid = tracked.handle.pid;
        self.log.info(
            "process.stop.requested",
            &format!("server={server_id} pid={pid}"),
        );
        let signal_delivered =
            self.signal(&tracked.handle.server_id, pid, &mut lock(&tracked.child));
        StopOutcome::Stopped {
            pid,
            signal_delivered,
        }
    }

    pub fn status(&self, server_id: &str) -> ServerStatus {
        match lock(&self.registry).entries.get(server_id) {
            Some(tracked) => ServerStatus {
                running: true,
                url: Some(tracked.handle.url.clone()),
            },
            None => ServerStatus::not_running(),
        }
    }

    pub fn handle(&self, server_id: &str) -> Option<ProcessHandle> {
        lock(&self.registry)
            .entries
            .get(server_id)
            .map(|tracked| tracked.handle.clone())
    }

    pub fn handles(&self) -> Vec<ProcessHandle> {
        lock(&self.registry)
            .entries
            .values()
            .map(|tracked| tracked.handle.clone())
            .collect()
    }

    /// Terminates every tracked process. Returns how many handles were dropped.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<Tracked> = {
            let mut registry = lock(&self.registry);
            std::mem::take(&mut registry.entries).into_values().collect()
        };
        for tracked in &drained {
            self.signal(
                &tracked.handle.server_id,
                tracked.handle.pid,
                &mut lock(&tracked.child),
            );
        }
        if !drained.is_empty() {
            self.log.info(
                "supervisor.shutdown",
                &format!("terminated={}", drained.len()),
            );
        }
        drained.len()
    }

    fn await_ready(&self, handle: &ProcessHandle) -> Result<(), SupervisorError> {
        let outcome = self
            .config
            .readiness
            .wait(&self.config.host, handle.port, || self.is_current(handle));
        match outcome {
            ReadinessOutcome::Assumed | ReadinessOutcome::Ready { .. } => {
                self.log.info(
                    "process.ready",
                    &format!(
                        "server={} url={} outcome={outcome:?}",
                        handle.server_id, handle.url
                    ),
                );
                Ok(())
            }
            ReadinessOutcome::Exited => Err(SupervisorError::ExitedDuringStartup {
                server_id: handle.server_id.to_string(),
            }),
            ReadinessOutcome::TimedOut { attempts } => {
                let removed = lock(&self.registry).remove_instance(&handle.server_id, handle.instance);
                if let Some(tracked) = removed {
                    self.signal(&handle.server_id, handle.pid, &mut lock(&tracked.child));
                }
                self.log.error(
                    "process.start.failed",
                    &format!(
                        "server={} port={} not ready after {attempts} attempts",
                        handle.server_id, handle.port
                    ),
                );
                Err(SupervisorError::NotReady {
                    server_id: handle.server_id.to_string(),
                    port: handle.port,
                    attempts,
                })
            }
        }
    }

    /// Sends the termination signal, logging a failure. Returns whether it was delivered.
    fn signal(&self, server_id: &ServerId, pid: u32, child: &mut Child) -> bool {
        match terminate(child, &self.config.kill_program) {
            Ok(()) => true,
            Err(err) => {
                self.log.warn(
                    "process.stop.signal_failed",
                    &format!("server={server_id} pid={pid} error={err}"),
                );
                false
            }
        }
    }

    fn is_current(&self, handle: &ProcessHandle) -> bool {
        lock(&self.registry)
            .entries
            .get(&handle.server_id)
            .map(|tracked| tracked.handle.instance == handle.instance)
            .unwrap_or(false)
    }

    fn watch_exit(&self, handle: ProcessHandle, child: Arc<Mutex<Child>>) -> std::io::Result<()> {
        let registry = Arc::clone(&self.registry);
        let ports = self.ports.clone();
        let log = self.log.clone();
        thread::Builder::new()
            .name(thread_name("exit", &handle.server_id))
            .spawn(move || {
                let status = wait_for_exit(&child);
                let removed = lock(&registry)
                    .remove_instance(&handle.server_id, handle.instance)
                    .is_some();
                ports.release(handle.port);
                let code = status
                    .and_then(|status| status.code())
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "none".to_string());
                log.info(
                    "process.exited",
                    &format!(
                        "server={} pid={} code={code} handle_removed={removed}",
                        handle.server_id, handle.pid
                    ),
                );
            })?;
        Ok(())
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn wait_for_exit(child: &Mutex<Child>) -> Option<ExitStatus> {
    loop {
        let polled = lock(child).try_wait();
        match polled {
            Ok(Some(status)) => return Some(status),
            Ok(None) => thread::sleep(EXIT_POLL_INTERVAL),
            Err(_) => return None,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}
