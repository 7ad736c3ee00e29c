use crate::shared::ServerId;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Client-side mirror of `serverId -> url` for servers believed to be running.
#[derive(Debug, Default)]
pub struct StatusCache {
    urls: Mutex<BTreeMap<ServerId, String>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server_url(&self, server_id: &str) -> Option<String> {
        self.urls().get(server_id).cloned()
    }

    pub fn insert(&self, server_id: &ServerId, url: &str) {
        self.urls().insert(server_id.clone(), url.to_string());
    }

    pub fn remove(&self, server_id: &str) -> Option<String> {
        self.urls().remove(server_id)
    }

    pub fn clear(&self) {
        self.urls().clear();
    }

    pub fn len(&self) -> usize {
        self.urls().len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls().is_empty()
    }

    fn urls(&self) -> MutexGuard<'_, BTreeMap<ServerId, String>> {
        self.urls.lock().unwrap_or_else(|err| err.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_by_plain_string() {
        let cache = StatusCache::new();
        let id = ServerId::parse("c1").expect("id");
        cache.insert(&id, "http://localhost:8001");
        assert_eq!(
            cache.server_url("c1").as_deref(),
            Some("http://localhost:8001")
        );
        assert_eq!(cache.server_url("c2"), None);
        assert_eq!(cache.remove("c1").as_deref(), Some("http://localhost:8001"));
        assert!(cache.is_empty());
    }
}
