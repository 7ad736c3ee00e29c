use super::GraphError;
use crate::shared::{EdgeId, NodeId, ServerId};
use crate::translator::ServiceConfig;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceNode {
    pub id: NodeId,
    pub kind: String,
    pub secret: String,
}

impl ServiceNode {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig::new(self.kind.clone(), self.secret.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeNode {
    pub id: ServerId,
    pub running: bool,
    pub bound_port: Option<u16>,
    pub bound_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub source_id: ServerId,
    pub target_id: NodeId,
}

/// Star-shaped dependency graph: edges always run from a composite to a service.
///
/// Edges are kept in insertion order, which is the order services (and so
/// command-line flags) are handed to the spawned process.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    services: BTreeMap<NodeId, ServiceNode>,
    composites: BTreeMap<ServerId, CompositeNode>,
    edges: Vec<Edge>,
    next_edge: u64,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_composite(&mut self, id: ServerId) -> Result<(), GraphError> {
        self.ensure_free(id.as_str())?;
        self.composites.insert(
            id.clone(),
            CompositeNode {
                id,
                running: false,
                bound_port: None,
                bound_url: None,
            },
        );
        Ok(())
    }

    pub fn add_service(
        &mut self,
        id: NodeId,
        kind: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<(), GraphError> {
        self.ensure_free(id.as_str())?;
        self.services.insert(
            id.clone(),
            ServiceNode {
                id,
                kind: kind.into(),
                secret: secret.into(),
            },
        );
        Ok(())
    }

    pub fn set_secret(&mut self, id: &str, secret: impl Into<String>) -> Result<(), GraphError> {
        let node = self
            .services
            .get_mut(id)
            .ok_or_else(|| GraphError::UnknownNode { id: id.to_string() })?;
        node.secret = secret.into();
        Ok(())
    }

    pub fn add_edge(&mut self, source_id: &str, target_id: &str) -> Result<EdgeId, GraphError> {
        if source_id == target_id {
            return Err(GraphError::SelfLoop {
                id: source_id.to_string(),
            });
        }
        let source = match self.composites.get(source_id) {
            Some(node) => node.id.clone(),
            None if self.services.contains_key(source_id) => {
                return Err(GraphError::SourceNotComposite {
                    id: source_id.to_string(),
                })
            }
            None => {
                return Err(GraphError::UnknownNode {
                    id: source_id.to_string(),
                })
            }
        };
        let target = match self.services.get(target_id) {
            Some(node) => node.id.clone(),
            None if self.composites.contains_key(target_id) => {
                return Err(GraphError::TargetNotService {
                    id: target_id.to_string(),
                })
            }
            None => {
                return Err(GraphError::UnknownNode {
                    id: target_id.to_string(),
                })
            }
        };
        if self
            .edges
            .iter()
            .any(|edge| edge.source_id == source && edge.target_id == target)
        {
            return Err(GraphError::DuplicateEdge {
                source_id: source_id.to_string(),
                target_id: target_id.to_string(),
            });
        }

        self.next_edge += 1;
        let id = EdgeId::sequential(self.next_edge);
        self.edges.push(Edge {
            id: id.clone(),
            source_id: source,
            target_id: target,
        });
        Ok(id)
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<Edge, GraphError> {
        let index = self
            .edges
            .iter()
            .position(|edge| edge.id.as_str() == id)
            .ok_or_else(|| GraphError::UnknownEdge { id: id.to_string() })?;
        Ok(self.edges.remove(index))
    }

    /// Removes a node of either kind along with every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Result<(), GraphError> {
        let removed =
            self.composites.remove(id).is_some() || self.services.remove(id).is_some();
        if !removed {
            return Err(GraphError::UnknownNode { id: id.to_string() });
        }
        self.edges
            .retain(|edge| edge.source_id.as_str() != id && edge.target_id.as_str() != id);
        Ok(())
    }

    pub fn validate_for_start(&self, composite_id: &str) -> Result<Vec<ServiceConfig>, GraphError> {
        if !self.composites.contains_key(composite_id) {
            return Err(GraphError::UnknownComposite {
                id: composite_id.to_string(),
            });
        }

        let mut services = Vec::new();
        for edge in self.edges_from(composite_id) {
            let node = self
                .services
                .get(&edge.target_id)
                .ok_or_else(|| GraphError::UnknownNode {
                    id: edge.target_id.to_string(),
                })?;
            let config = node.service_config();
            if config.config.trim().is_empty() {
                return Err(GraphError::IncompleteConfiguration {
                    composite_id: composite_id.to_string(),
                    service_id: node.id.to_string(),
                });
            }
            services.push(config);
        }
        Ok(services)
    }

    pub fn mark_running(&mut self, id: &str, url: &str) -> Result<(), GraphError> {
        let node = self.composite_mut(id)?;
        node.running = true;
        node.bound_port = port_from_url(url);
        node.bound_url = Some(url.to_string());
        Ok(())
    }

    pub fn mark_stopped(&mut self, id: &str) -> Result<(), GraphError> {
        let node = self.composite_mut(id)?;
        node.running = false;
        node.bound_port = None;
        node.bound_url = None;
        Ok(())
    }

    pub fn running_composites(&self) -> Vec<ServerId> {
        self.composites
            .values()
            .filter(|node| node.running)
            .map(|node| node.id.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.services.clear();
        self.composites.clear();
        self.edges.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.composites.is_empty() && self.edges.is_empty()
    }

    pub fn composite(&self, id: &str) -> Option<&CompositeNode> {
        self.composites.get(id)
    }

    pub fn service(&self, id: &str) -> Option<&ServiceNode> {
        self.services.get(id)
    }

    pub fn composites(&self) -> impl Iterator<Item = &CompositeNode> {
        self.composites.values()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_from<'a>(&'a self, composite_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .iter()
            .filter(move |edge| edge.source_id.as_str() == composite_id)
    }

    fn composite_mut(&mut self, id: &str) -> Result<&mut CompositeNode, GraphError> {
        self.composites
            .get_mut(id)
            .ok_or_else(|| GraphError::UnknownComposite { id: id.to_string() })
    }

    fn ensure_free(&self, id: &str) -> Result<(), GraphError> {
        if self.composites.contains_key(id) || self.services.contains_key(id) {
            return Err(GraphError::DuplicateNode { id: id.to_string() });
        }
        Ok(())
    }
}

fn port_from_url(url: &str) -> Option<u16> {
    url.rsplit_once(':')
        .and_then(|(_, tail)| tail.trim_end_matches('/').parse().ok())
}
