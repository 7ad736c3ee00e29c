pub mod document;
pub mod model;

pub use document::{EdgeDocument, GraphDocument, ServiceDocument};
pub use model::{CompositeNode, Edge, GraphModel, ServiceNode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node `{id}` does not exist")]
    UnknownNode { id: String },
    #[error("composite node `{id}` does not exist")]
    UnknownComposite { id: String },
    #[error("edge `{id}` does not exist")]
    UnknownEdge { id: String },
    #[error("node `{id}` already exists")]
    DuplicateNode { id: String },
    #[error("edge from `{source_id}` to `{target_id}` already exists")]
    DuplicateEdge { source_id: String, target_id: String },
    #[error("node `{id}` cannot connect to itself")]
    SelfLoop { id: String },
    #[error("edge source `{id}` must be a composite node")]
    SourceNotComposite { id: String },
    #[error("edge target `{id}` must be a service node")]
    TargetNotService { id: String },
    #[error(
        "composite `{composite_id}` has incomplete configuration: service `{service_id}` has no value"
    )]
    IncompleteConfiguration {
        composite_id: String,
        service_id: String,
    },
    #[error("invalid graph document: {0}")]
    Document(String),
}
