use super::ChatRelay;
use crate::runtime::RuntimeLog;
use serde::{Deserialize, Serialize};

pub const RELAY_FAILURE_MESSAGE: &str =
    "Sorry, I couldn't process your request. There was an error communicating with the server.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

pub struct ChatSession {
    server_name: String,
    relay: ChatRelay,
    messages: Vec<ChatMessage>,
    log: Option<RuntimeLog>,
}

impl ChatSession {
    pub fn new(server_name: impl Into<String>, relay: ChatRelay) -> Self {
        Self {
            server_name: server_name.into(),
            relay,
            messages: Vec::new(),
            log: None,
        }
    }

    pub fn with_log(mut self, log: RuntimeLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Records the user message and the reply. Blank input is ignored and
    /// relay failures become a canned assistant message rather than an error.
    pub fn send(&mut self, input: &str) -> Option<&ChatMessage> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        self.messages.push(ChatMessage {
            role: ChatRole::User,
            content: text.to_string(),
        });

        let content = match self.relay.query(text) {
            Ok(response) => response,
            Err(err) => {
                if let Some(log) = &self.log {
                    log.warn(
                        "chat.query.failed",
                        &format!("server={} error={err}", self.server_name),
                    );
                }
                RELAY_FAILURE_MESSAGE.to_string()
            }
        };
        self.messages.push(ChatMessage {
            role: ChatRole::Assistant,
            content,
        });
        self.messages.last()
    }
}
