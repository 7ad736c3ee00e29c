use super::{GraphError, GraphModel};
use crate::shared::{NodeId, ServerId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub composites: Vec<ServerId>,
    #[serde(default)]
    pub services: Vec<ServiceDocument>,
    #[serde(default)]
    pub edges: Vec<EdgeDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDocument {
    pub id: NodeId,
    pub kind: String,
    #[serde(default)]
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDocument {
    pub from: String,
    pub to: String,
}

impl GraphDocument {
    pub fn from_path(path: &Path) -> Result<Self, GraphError> {
        let raw = fs::read_to_string(path).map_err(|err| {
            GraphError::Document(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_yaml(&raw)
            .map_err(|err| GraphError::Document(format!("{}: {err}", path.display())))
    }

    pub fn from_yaml(raw: &str) -> Result<Self, String> {
        serde_yaml::from_str(raw).map_err(|err| err.to_string())
    }

    pub fn into_model(self) -> Result<GraphModel, GraphError> {
        let mut graph = GraphModel::new();
        for id in self.composites {
            graph.add_composite(id)?;
        }
        for service in self.services {
            graph.add_service(service.id, service.kind, service.secret)?;
        }
        for edge in &self.edges {
            graph.add_edge(&edge.from, &edge.to)?;
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_builds_graph_in_edge_order() {
        let document = GraphDocument::from_yaml(
            r#"
composites: [c1]
services:
  - id: gh
    kind: github
    secret: tok1
  - id: cache
    kind: redis
    secret: redis://x
edges:
  - from: c1
    to: cache
  - from: c1
    to: gh
"#,
        )
        .expect("parse document");

        let graph = document.into_model().expect("build graph");
        let services = graph.validate_for_start("c1").expect("valid");
        let names: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["redis", "github"]);
    }

    #[test]
    fn document_edges_are_checked_like_interactive_edits() {
        let document = GraphDocument::from_yaml(
            r#"
composites: [c1]
services:
  - id: gh
    kind: github
edges:
  - from: gh
    to: c1
"#,
        )
        .expect("parse document");

        let err = document.into_model().expect_err("reverse edge");
        assert_eq!(
            err,
            GraphError::SourceNotComposite {
                id: "gh".to_string()
            }
        );
    }
}
