use arbor_core::{BtStatus, Condition};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ActionNode;

/// How a parallel composite turns its children's results into its own.
///
/// The policy names what counts as success. `RequireAllFailure` succeeds once every child has
/// failed and fails as soon as one succeeds; `RequireOneFailure` succeeds on the first failing
/// child and fails once every child has succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ParallelPolicy {
    #[default]
    RequireAllSuccess,
    RequireAllFailure,
    RequireOneSuccess,
    RequireOneFailure,
}

impl ParallelPolicy {
    /// Result after a tick in which `successes + failures` of `total` children have finished.
    pub fn resolve(self, successes: usize, failures: usize, total: usize) -> BtStatus {
        let (wanted, unwanted) = match self {
            ParallelPolicy::RequireAllSuccess | ParallelPolicy::RequireOneSuccess => {
                (successes, failures)
            }
            ParallelPolicy::RequireAllFailure | ParallelPolicy::RequireOneFailure => {
                (failures, successes)
            }
        };
        match self {
            ParallelPolicy::RequireAllSuccess | ParallelPolicy::RequireAllFailure => {
                if unwanted > 0 {
                    BtStatus::Failure
                } else if wanted >= total {
                    BtStatus::Success
                } else {
                    BtStatus::Running
                }
            }
            ParallelPolicy::RequireOneSuccess | ParallelPolicy::RequireOneFailure => {
                if wanted > 0 {
                    BtStatus::Success
                } else if unwanted >= total {
                    BtStatus::Failure
                } else {
                    BtStatus::Running
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CompositeKind {
    Sequence,
    Selector,
    RandomSelector,
    Parallel(ParallelPolicy),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecoratorKind {
    /// Swap `Success` and `Failure`.
    Inverter,
    /// Re-run the child forever; always `Running`.
    Repeat,
    /// Run the child until it has completed `count` times, then `Success`.
    Repeater { count: u32 },
    /// Re-run the child until it returns `target`, then `Success`.
    UntilFor { target: BtStatus },
    /// Evaluate the (AND-combined) conditions every tick before delegating.
    ConditionGate { conditions: Vec<Condition> },
    ForceSuccess,
    ForceFailure,
}

impl DecoratorKind {
    pub fn label(&self) -> &'static str {
        match self {
            DecoratorKind::Inverter => "Inverter",
            DecoratorKind::Repeat => "Repeat",
            DecoratorKind::Repeater { .. } => "Repeater",
            DecoratorKind::UntilFor { .. } => "UntilFor",
            DecoratorKind::ConditionGate { .. } => "ConditionGate",
            DecoratorKind::ForceSuccess => "ForceSuccess",
            DecoratorKind::ForceFailure => "ForceFailure",
        }
    }
}

impl CompositeKind {
    pub fn label(&self) -> &'static str {
        match self {
            CompositeKind::Sequence => "Sequence",
            CompositeKind::Selector => "Selector",
            CompositeKind::RandomSelector => "RandomSelector",
            CompositeKind::Parallel(_) => "Parallel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    Root,
    Action,
    Composite,
    Decorator,
}

/// Template-side kind of a node, with its authored parameters.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Root,
    Action(Box<dyn ActionNode>),
    Composite(CompositeKind),
    Decorator(DecoratorKind),
}

impl NodeKind {
    pub fn category(&self) -> NodeCategory {
        match self {
            NodeKind::Root => NodeCategory::Root,
            NodeKind::Action(_) => NodeCategory::Action,
            NodeKind::Composite(_) => NodeCategory::Composite,
            NodeKind::Decorator(_) => NodeCategory::Decorator,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Root => "Root",
            NodeKind::Action(action) => action.label(),
            NodeKind::Composite(kind) => kind.label(),
            NodeKind::Decorator(kind) => kind.label(),
        }
    }

    /// Maximum number of children, `None` for unbounded.
    pub fn max_children(&self) -> Option<usize> {
        match self {
            NodeKind::Root | NodeKind::Decorator(_) => Some(1),
            NodeKind::Action(_) => Some(0),
            NodeKind::Composite(_) => None,
        }
    }

    /// Root and decorators need exactly one child.
    pub fn requires_child(&self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::Decorator(_))
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, NodeKind::Composite(CompositeKind::Parallel(_)))
    }
}
