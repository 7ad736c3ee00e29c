pub mod logging;
pub mod ports;
pub mod process;
pub mod readiness;
pub mod state_paths;
pub mod supervisor;

pub use logging::{append_runtime_log, RuntimeLog};
pub use ports::{PortAllocator, PortError};
pub use readiness::{Readiness, ReadinessOutcome};
pub use state_paths::{bootstrap_state_root, StatePaths};
pub use supervisor::{
    ProcessHandle, ProcessSupervisor, ServerStatus, StartOutcome, StopOutcome, SupervisorConfig,
    SupervisorError, DEFAULT_KILL_PROGRAM,
};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to create runtime path {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
