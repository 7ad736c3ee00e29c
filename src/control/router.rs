use super::wire::{ControlAction, ControlRequest, StartReply, StopReply};
use crate::runtime::{ProcessSupervisor, SupervisorError};
use crate::shared::ServerId;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct RouterReply {
    pub status: u16,
    pub body: Value,
}

impl RouterReply {
    pub fn ok<T: Serialize>(body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status: 200, body },
            Err(err) => Self::server_error(format!("failed to encode reply: {err}")),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::error(400, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::error(500, message)
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            status,
            body: serde_json::json!({ "error": message }),
        }
    }
}

pub fn start_failure_message(err: &SupervisorError) -> String {
    format!("Failed to start server: {err}")
}

/// Translates `{action, serverId, services}` requests into supervisor calls.
/// Blocking: `start` waits out the readiness policy before replying.
pub struct RequestRouter {
    supervisor: Arc<ProcessSupervisor>,
}

impl RequestRouter {
    pub fn new(supervisor: Arc<ProcessSupervisor>) -> Self {
        Self { supervisor }
    }

    pub fn supervisor(&self) -> &Arc<ProcessSupervisor> {
        &self.supervisor
    }

    pub fn handle_body(&self, body: &[u8]) -> RouterReply {
        match serde_json::from_slice::<ControlRequest>(body) {
            Ok(request) => self.dispatch(request),
            Err(err) => RouterReply::bad_request(format!("invalid request body: {err}")),
        }
    }

    pub fn dispatch(&self, request: ControlRequest) -> RouterReply {
        let Some(action) = ControlAction::parse(&request.action) else {
            return RouterReply::bad_request("Invalid action");
        };
        let server_id = match request.server_id.as_deref().map(ServerId::parse) {
            Some(Ok(server_id)) => server_id,
            Some(Err(err)) => return RouterReply::bad_request(err),
            None => return RouterReply::bad_request("`serverId` is required"),
        };

        match action {
            ControlAction::Start => {
                let services = request.services.unwrap_or_default();
                match self.supervisor.start(&server_id, &services) {
                    Ok(outcome) => RouterReply::ok(&StartReply {
                        url: outcome.url().to_string(),
                    }),
                    Err(err) => RouterReply::server_error(start_failure_message(&err)),
                }
            }
            ControlAction::Stop => {
                let outcome = self.supervisor.stop(server_id.as_str());
                RouterReply::ok(&StopReply {
                    success: outcome.success(),
                })
            }
            ControlAction::Status => RouterReply::ok(&self.supervisor.status(server_id.as_str())),
        }
    }
}
