use super::{ControlApi, StatusCache};
use crate::control::ControlError;
use crate::runtime::{RuntimeLog, ServerStatus};
use crate::shared::ServerId;
use crate::translator::ServiceConfig;

/// Control calls fronted by a [`StatusCache`].
///
/// `start_server` answers from the cache without a round trip when it can;
/// `stop_server` only purges the cache when the stop was acknowledged, so a
/// failed stop leaves the entry in place until `refresh` is called.
pub struct ServerDirectory<A> {
    api: A,
    cache: StatusCache,
    log: RuntimeLog,
}

impl<A: ControlApi> ServerDirectory<A> {
    pub fn new(api: A, log: RuntimeLog) -> Self {
        Self {
            api,
            cache: StatusCache::new(),
            log,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    pub fn start_server(
        &self,
        server_id: &ServerId,
        services: &[ServiceConfig],
    ) -> Result<String, ControlError> {
        if let Some(url) = self.cache.server_url(server_id.as_str()) {
            return Ok(url);
        }
        let url = self.api.start(server_id, services)?;
        self.cache.insert(server_id, &url);
        Ok(url)
    }

    pub fn stop_server(&self, server_id: &ServerId) -> bool {
        match self.api.stop(server_id) {
            Ok(true) => {
                self.cache.remove(server_id.as_str());
                true
            }
            Ok(false) => false,
            Err(err) => {
                self.log.warn(
                    "workspace.stop.failed",
                    &format!("server={server_id} error={err}"),
                );
                false
            }
        }
    }

    pub fn check_status(&self, server_id: &ServerId) -> bool {
        match self.api.status(server_id) {
            Ok(status) => status.running,
            Err(err) => {
                self.log.warn(
                    "workspace.status.failed",
                    &format!("server={server_id} error={err}"),
                );
                false
            }
        }
    }

    /// Asks the supervisor and brings the cached entry in line with its answer.
    pub fn refresh(&self, server_id: &ServerId) -> Result<ServerStatus, ControlError> {
        let status = self.api.status(server_id)?;
        match (&status.running, &status.url) {
            (true, Some(url)) => self.cache.insert(server_id, url),
            _ => {
                self.cache.remove(server_id.as_str());
            }
        }
        Ok(status)
    }

    pub fn server_url(&self, server_id: &str) -> Option<String> {
        self.cache.server_url(server_id)
    }
}
