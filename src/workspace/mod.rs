pub mod canvas;
pub mod directory;
pub mod status_cache;

pub use canvas::{ClearReport, Workspace};
pub use directory::ServerDirectory;
pub use status_cache::StatusCache;

use crate::control::router::start_failure_message;
use crate::control::{ControlClient, ControlError};
use crate::graph::GraphError;
use crate::runtime::{ProcessSupervisor, ServerStatus};
use crate::shared::ServerId;
use crate::translator::ServiceConfig;
use std::sync::Arc;

/// The three control operations, reachable over HTTP or in-process.
pub trait ControlApi: Send + Sync {
    fn start(&self, server_id: &ServerId, services: &[ServiceConfig])
        -> Result<String, ControlError>;
    fn stop(&self, server_id: &ServerId) -> Result<bool, ControlError>;
    fn status(&self, server_id: &ServerId) -> Result<ServerStatus, ControlError>;
}

impl ControlApi for ControlClient {
    fn start(
        &self,
        server_id: &ServerId,
        services: &[ServiceConfig],
    ) -> Result<String, ControlError> {
        ControlClient::start(self, server_id.as_str(), services)
    }

    fn stop(&self, server_id: &ServerId) -> Result<bool, ControlError> {
        ControlClient::stop(self, server_id.as_str())
    }

    fn status(&self, server_id: &ServerId) -> Result<ServerStatus, ControlError> {
        ControlClient::status(self, server_id.as_str())
    }
}

impl ControlApi for ProcessSupervisor {
    fn start(
        &self,
        server_id: &ServerId,
        services: &[ServiceConfig],
    ) -> Result<String, ControlError> {
        ProcessSupervisor::start(self, server_id, services)
            .map(|outcome| outcome.url().to_string())
            .map_err(|err| ControlError::Rejected {
                status: 500,
                message: start_failure_message(&err),
            })
    }

    fn stop(&self, server_id: &ServerId) -> Result<bool, ControlError> {
        Ok(ProcessSupervisor::stop(self, server_id.as_str()).success())
    }

    fn status(&self, server_id: &ServerId) -> Result<ServerStatus, ControlError> {
        Ok(ProcessSupervisor::status(self, server_id.as_str()))
    }
}

impl<T: ControlApi + ?Sized> ControlApi for Arc<T> {
    fn start(
        &self,
        server_id: &ServerId,
        services: &[ServiceConfig],
    ) -> Result<String, ControlError> {
        (**self).start(server_id, services)
    }

    fn stop(&self, server_id: &ServerId) -> Result<bool, ControlError> {
        (**self).stop(server_id)
    }

    fn status(&self, server_id: &ServerId) -> Result<ServerStatus, ControlError> {
        (**self).status(server_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("server `{server_id}` request failed: {source}")]
    Control {
        server_id: String,
        #[source]
        source: ControlError,
    },
    #[error("composite `{id}` is not running")]
    NotRunning { id: String },
}
