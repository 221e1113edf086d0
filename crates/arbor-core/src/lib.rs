//! Deterministic, engine-agnostic behaviour-tree primitives.
//!
//! Everything here is shared by the runtime (`arbor-bt`) and by tooling: node results, the typed
//! blackboard, condition comparison, tick context and a small deterministic RNG.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod blackboard;
pub mod condition;
pub mod error;
pub mod rng;
pub mod status;
pub mod tick;

pub use blackboard::{
    BbKey, BbType, BbValue, Blackboard, BlackboardProperty, BlackboardValue, PropertyId, Vec3,
};
pub use condition::{Comparison, Condition};
pub use error::BlackboardError;
pub use rng::{DeterministicRng, SplitMix64};
pub use status::BtStatus;
pub use tick::TickContext;
