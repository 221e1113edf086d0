use thiserror::Error;

use crate::{BbType, Comparison};

/// Errors raised by blackboard access and binding.
///
/// These are always recoverable: callers get them back as values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlackboardError {
    #[error("blackboard property `{key}` not found")]
    PropertyNotFound { key: String },

    #[error("blackboard property #{id} does not exist")]
    UnknownProperty { id: usize },

    #[error("blackboard property `{key}` holds {found}, requested {expected}")]
    PropertyTypeMismatch {
        key: String,
        expected: BbType,
        found: BbType,
    },

    #[error("blackboard already contains a property named `{key}`")]
    DuplicateKey { key: String },

    #[error("comparison {comparison:?} against {literal} is not supported for {found} property `{key}`")]
    UnsupportedComparison {
        key: String,
        comparison: Comparison,
        found: BbType,
        literal: BbType,
    },
}
