use super::{ControlApi, ServerDirectory, WorkspaceError};
use crate::chat::{ChatRelay, ChatSession};
use crate::graph::{GraphError, GraphModel};
use crate::runtime::{RuntimeLog, ServerStatus};
use crate::shared::ServerId;
use std::thread;
use std::time::Duration;

const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub stopped: Vec<ServerId>,
    pub failed: Vec<ServerId>,
}

/// The editable graph together with the servers its composites are running as.
pub struct Workspace<A> {
    graph: GraphModel,
    servers: ServerDirectory<A>,
    log: RuntimeLog,
    chat_timeout: Duration,
}

impl<A: ControlApi> Workspace<A> {
    pub fn new(api: A, log: RuntimeLog) -> Self {
        Self::with_graph(GraphModel::new(), api, log)
    }

    pub fn with_graph(graph: GraphModel, api: A, log: RuntimeLog) -> Self {
        Self {
            graph,
            servers: ServerDirectory::new(api, log.clone()),
            log,
            chat_timeout: DEFAULT_CHAT_TIMEOUT,
        }
    }

    pub fn with_chat_timeout(mut self, timeout: Duration) -> Self {
        self.chat_timeout = timeout;
        self
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut GraphModel {
        &mut self.graph
    }

    pub fn servers(&self) -> &ServerDirectory<A> {
        &self.servers
    }

    pub fn start_composite(&mut self, id: &str) -> Result<String, WorkspaceError> {
        let services = self.graph.validate_for_start(id)?;
        let server_id = self.server_id(id)?;
        let url = self
            .servers
            .start_server(&server_id, &services)
            .map_err(|source| WorkspaceError::Control {
                server_id: server_id.to_string(),
                source,
            })?;
        self.graph.mark_running(id, &url)?;
        Ok(url)
    }

    /// Returns whether the stop was acknowledged. On `false` the composite keeps
    /// its running flag and cached url.
    pub fn stop_composite(&mut self, id: &str) -> Result<bool, WorkspaceError> {
        let server_id = self.server_id(id)?;
        let stopped = self.servers.stop_server(&server_id);
        if stopped {
            self.graph.mark_stopped(id)?;
        }
        Ok(stopped)
    }

    pub fn refresh_composite(&mut self, id: &str) -> Result<ServerStatus, WorkspaceError> {
        let server_id = self.server_id(id)?;
        let status = self
            .servers
            .refresh(&server_id)
            .map_err(|source| WorkspaceError::Control {
                server_id: server_id.to_string(),
                source,
            })?;
        match (&status.running, &status.url) {
            (true, Some(url)) => self.graph.mark_running(id, url)?,
            _ => self.graph.mark_stopped(id)?,
        }
        Ok(status)
    }

    /// Removes a node and its edges, stopping the composite first when it is running.
    pub fn remove_node(&mut self, id: &str) -> Result<(), WorkspaceError> {
        let running = self
            .graph
            .composite(id)
            .filter(|node| node.running)
            .map(|node| node.id.clone());
        if let Some(server_id) = running {
            if !self.servers.stop_server(&server_id) {
                self.log.warn(
                    "workspace.remove.stop_failed",
                    &format!("server={server_id}; removing node anyway"),
                );
            }
        }
        self.graph.remove_node(id)?;
        Ok(())
    }

    /// Stops every running composite concurrently, waits for all of them to settle,
    /// then empties the graph and the cache whatever the individual outcomes were.
    pub fn clear_all(&mut self) -> ClearReport {
        let running = self.graph.running_composites();
        let servers = &self.servers;
        let outcomes: Vec<(ServerId, bool)> = thread::scope(|scope| {
            let pending: Vec<_> = running
                .iter()
                .map(|server_id| (server_id, scope.spawn(move || servers.stop_server(server_id))))
                .collect();
            pending
                .into_iter()
                .map(|(server_id, task)| (server_id.clone(), task.join().unwrap_or(false)))
                .collect()
        });

        let mut report = ClearReport::default();
        for (server_id, stopped) in outcomes {
            if stopped {
                report.stopped.push(server_id);
            } else {
                self.log.warn(
                    "workspace.clear.stop_failed",
                    &format!("server={server_id}; process may still be running"),
                );
                report.failed.push(server_id);
            }
        }

        self.graph.clear();
        self.servers.cache().clear();
        report
    }

    pub fn open_chat(&self, id: &str) -> Result<ChatSession, WorkspaceError> {
        let url = self
            .servers
            .server_url(id)
            .ok_or_else(|| WorkspaceError::NotRunning { id: id.to_string() })?;
        let relay = ChatRelay::with_timeout(url, self.chat_timeout);
        Ok(ChatSession::new(id, relay).with_log(self.log.clone()))
    }

    fn server_id(&self, id: &str) -> Result<ServerId, GraphError> {
        self.graph
            .composite(id)
            .map(|node| node.id.clone())
            .ok_or_else(|| GraphError::UnknownComposite { id: id.to_string() })
    }
}
