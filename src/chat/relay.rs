use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const QUERY_PATH: &str = "/api/query";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("query request failed: {0}")]
    Transport(String),
    #[error("server error: {0}")]
    Status(u16),
    #[error("query response could not be read: {0}")]
    Decode(String),
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    response: String,
}

/// Sends one query per call to a running composite server. No retries.
#[derive(Debug, Clone)]
pub struct ChatRelay {
    base_url: String,
    agent: ureq::Agent,
}

impl ChatRelay {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn query_url(&self) -> String {
        format!("{}{QUERY_PATH}", self.base_url.trim_end_matches('/'))
    }

    pub fn query(&self, query: &str) -> Result<String, ChatError> {
        let response = match self
            .agent
            .post(&self.query_url())
            .send_json(QueryRequest { query })
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => return Err(ChatError::Status(status)),
            Err(err) => return Err(ChatError::Transport(err.to_string())),
        };
        response
            .into_json::<QueryResponse>()
            .map(|body| body.response)
            .map_err(|e| ChatError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_url_joins_without_double_slash() {
        assert_eq!(
            ChatRelay::new("http://localhost:8123/").query_url(),
            "http://localhost:8123/api/query"
        );
        assert_eq!(
            ChatRelay::new("http://localhost:8123").query_url(),
            "http://localhost:8123/api/query"
        );
    }

    #[test]
    fn unreachable_server_is_a_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let relay = ChatRelay::with_timeout(
            format!("http://127.0.0.1:{port}"),
            Duration::from_secs(2),
        );
        assert!(matches!(
            relay.query("hello"),
            Err(ChatError::Transport(_))
        ));
    }
}
