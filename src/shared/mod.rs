pub mod ids;

pub use ids::{validate_identifier_value, validate_server_id_value, EdgeId, NodeId, ServerId};

use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
