use arbor_core::BlackboardError;
use thiserror::Error;

use crate::NodeId;

/// A template that does not describe a well-formed tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("template has no root node")]
    MissingRoot,

    #[error("template already has a root ({existing:?})")]
    MultipleRoots { existing: NodeId },

    #[error("node {node:?} is set as root but is not a Root node")]
    NotARoot { node: NodeId },

    #[error("node {node:?} does not exist")]
    UnknownNode { node: NodeId },

    #[error("`{name}` ({node:?}) requires exactly one child")]
    MissingChild { node: NodeId, name: String },

    #[error("`{name}` ({node:?}) accepts at most {max} children")]
    TooManyChildren {
        node: NodeId,
        name: String,
        max: usize,
    },

    #[error("root node {node:?} cannot be a child")]
    RootHasParent { node: NodeId },

    #[error("node {node:?} has more than one parent")]
    MultipleParents { node: NodeId },

    #[error("connecting {node:?} would create a cycle")]
    Cycle { node: NodeId },

    #[error("`{name}` ({node:?}) is not reachable from the root")]
    Orphaned { node: NodeId, name: String },

    #[error("{child:?} is not a child of {parent:?}")]
    NotConnected { parent: NodeId, child: NodeId },

    #[error("`{name}` ({node:?}) is misconfigured: {reason}")]
    InvalidNodeConfig {
        node: NodeId,
        name: String,
        reason: String,
    },
}

/// Why a runtime tree could not be built. Nothing is returned on error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("node `{node}` cannot bind `{field}`: {source}")]
    Binding {
        node: String,
        field: String,
        #[source]
        source: BlackboardError,
    },

    #[error("node `{node}` has unhandled kind `{kind}`")]
    UnhandledNodeKind { node: String, kind: String },

    #[error("node `{node}` has invalid parameters: {reason}")]
    InvalidParams { node: String, reason: String },

    #[error("invalid blackboard: {0}")]
    Blackboard(#[from] BlackboardError),
}

/// A tree document that could not be parsed.
#[cfg(feature = "serde")]
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid tree document: {0}")]
    Json(#[from] serde_json::Error),
}
