pub mod client;
pub mod router;
pub mod server;
pub mod wire;

pub use client::ControlClient;
pub use router::{RequestRouter, RouterReply};
pub use server::{build_router, run_control_server, serve, CONTROL_PATH};
pub use wire::{ControlAction, ControlRequest, ErrorReply, StartReply, StopReply};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("control endpoint request failed: {0}")]
    Transport(String),
    #[error("control endpoint returned {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("control endpoint returned an unreadable body: {0}")]
    Decode(String),
}
