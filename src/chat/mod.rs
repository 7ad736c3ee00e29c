pub mod relay;
pub mod session;

pub use relay::{ChatError, ChatRelay, QUERY_PATH};
pub use session::{ChatMessage, ChatRole, ChatSession, RELAY_FAILURE_MESSAGE};
