//! Behaviour-tree runtime built on `arbor-core`.
//!
//! An authored [`TreeTemplate`] is cloned into a [`RuntimeTree`] per actor. The runtime keeps the
//! nodes in an arena, gives every parallel branch its own call stack and unwinds partially-run
//! subtrees when a decision invalidates them.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod call_stack;
pub mod clone;
#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
pub mod document;
pub mod driver;
pub mod error;
mod exec;
pub mod kind;
pub mod node;
pub mod nodes;
pub mod template;
pub mod tree;

pub use action::{ActionNode, Binding, NodeContext};
pub use arbor_core::{BtStatus, TickContext};
pub use call_stack::{CallStackError, CallStackId, CallStacks};
pub use clone::{instantiate, instantiate_with, InstanceOptions};
#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
pub use document::{ActionRegistry, NodeDocument, TreeDocument};
pub use driver::TickDriver;
#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
pub use error::DocumentError;
pub use error::{BuildError, StructuralError};
pub use kind::{CompositeKind, DecoratorKind, NodeCategory, NodeKind, ParallelPolicy};
pub use node::{CallState, NodeHandle, RuntimeNode};
pub use nodes::{Check, Fail, Run, SetProperty, Succeed, Wait};
pub use template::{NodeDefinition, NodeId, PropertySlot, TreeTemplate};
pub use tree::{NodeEvent, NodePhase, RuntimeTree};
