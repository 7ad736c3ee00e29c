use super::wire::{ControlAction, ControlRequest, ErrorReply, StartReply, StopReply};
use super::ControlError;
use crate::runtime::ServerStatus;
use crate::translator::ServiceConfig;
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Blocking client for the `POST /api/server` control surface.
#[derive(Debug, Clone)]
pub struct ControlClient {
    endpoint: String,
    agent: ureq::Agent,
}

impl ControlClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn start(&self, server_id: &str, services: &[ServiceConfig]) -> Result<String, ControlError> {
        let reply: StartReply = self.post(&ControlRequest::start(server_id, services))?;
        Ok(reply.url)
    }

    pub fn stop(&self, server_id: &str) -> Result<bool, ControlError> {
        let reply: StopReply = self.post(&ControlRequest::new(ControlAction::Stop, server_id))?;
        Ok(reply.success)
    }

    pub fn status(&self, server_id: &str) -> Result<ServerStatus, ControlError> {
        self.post(&ControlRequest::new(ControlAction::Status, server_id))
    }

    pub fn send(&self, request: &ControlRequest) -> Result<serde_json::Value, ControlError> {
        self.post(request)
    }

    fn post<T: DeserializeOwned>(&self, request: &ControlRequest) -> Result<T, ControlError> {
        match self.agent.post(&self.endpoint).send_json(request) {
            Ok(response) => response
                .into_json::<T>()
                .map_err(|e| ControlError::Decode(e.to_string())),
            Err(ureq::Error::Status(status, response)) => {
                let message = response
                    .into_json::<ErrorReply>()
                    .map(|reply| reply.error)
                    .unwrap_or_else(|_| format!("HTTP {status}"));
                Err(ControlError::Rejected { status, message })
            }
            Err(err) => Err(ControlError::Transport(err.to_string())),
        }
    }
}
