use arbor_core::{Blackboard, BtStatus, Condition, DeterministicRng, PropertyId, SplitMix64};

use crate::{ActionNode, Binding, CallStackId, DecoratorKind, NodeCategory, NodeId, ParallelPolicy};

/// Index of a node inside its runtime tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle(pub u32);

impl NodeHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a node is in its enter/update/exit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallState {
    #[default]
    BeforeEnter,
    Updating,
    BeforeExit,
}

/// Live, per-instance copy of a node definition.
#[derive(Debug)]
pub struct RuntimeNode {
    pub(crate) guid: String,
    pub(crate) name: String,
    pub(crate) tag: String,
    pub(crate) description: String,
    pub(crate) template_id: NodeId,
    pub(crate) kind: RuntimeKind,
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,
    pub(crate) depth: u32,
    pub(crate) call_stack_id: CallStackId,
    pub(crate) call_state: CallState,
    pub(crate) last_result: BtStatus,
    pub(crate) call_count: u64,
    pub(crate) bindings: Vec<Binding>,
}

impl RuntimeNode {
    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The template node this was cloned from.
    pub fn template_id(&self) -> NodeId {
        self.template_id
    }

    pub fn category(&self) -> NodeCategory {
        self.kind.category()
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn call_stack_id(&self) -> CallStackId {
        self.call_stack_id
    }

    pub fn call_state(&self) -> CallState {
        self.call_state
    }

    pub fn last_result(&self) -> BtStatus {
        self.last_result
    }

    /// Number of times the node was visited. Informational only.
    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Whether the node has been entered and not yet exited.
    pub fn is_active(&self) -> bool {
        self.call_state != CallState::BeforeEnter
    }

    pub(crate) fn reset(&mut self) {
        self.call_state = CallState::BeforeEnter;
        self.last_result = BtStatus::Running;
        self.call_count = 0;
        match &mut self.kind {
            RuntimeKind::Composite(state) => state.on_exit(),
            RuntimeKind::Decorator(state) => state.on_exit(),
            RuntimeKind::Root | RuntimeKind::Action(_) => {}
        }
    }
}

/// State-machine hooks shared by the built-in composite and decorator states.
pub(crate) trait Lifecycle {
    fn on_enter(&mut self, rng: &mut SplitMix64);

    fn on_exit(&mut self);

    /// Runs once after the whole tree exists.
    fn on_post_creation(&mut self, child_count: usize);
}

#[derive(Debug)]
pub(crate) enum RuntimeKind {
    Root,
    Action(Box<dyn ActionNode>),
    Composite(CompositeState),
    Decorator(DecoratorState),
}

impl RuntimeKind {
    pub(crate) fn category(&self) -> NodeCategory {
        match self {
            RuntimeKind::Root => NodeCategory::Root,
            RuntimeKind::Action(_) => NodeCategory::Action,
            RuntimeKind::Composite(_) => NodeCategory::Composite,
            RuntimeKind::Decorator(_) => NodeCategory::Decorator,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            RuntimeKind::Root => "Root",
            RuntimeKind::Action(action) => action.label(),
            RuntimeKind::Composite(state) => state.label(),
            RuntimeKind::Decorator(state) => state.label(),
        }
    }

    pub(crate) fn on_post_creation(&mut self, child_count: usize) {
        match self {
            RuntimeKind::Composite(state) => state.on_post_creation(child_count),
            RuntimeKind::Decorator(state) => state.on_post_creation(child_count),
            RuntimeKind::Root | RuntimeKind::Action(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CompositeState {
    Sequence {
        index: usize,
    },
    Selector {
        index: usize,
    },
    RandomSelector {
        order: Vec<usize>,
        cursor: usize,
    },
    Parallel {
        policy: ParallelPolicy,
        stopped: Vec<bool>,
        successes: usize,
        failures: usize,
    },
}

impl CompositeState {
    fn label(&self) -> &'static str {
        match self {
            CompositeState::Sequence { .. } => "Sequence",
            CompositeState::Selector { .. } => "Selector",
            CompositeState::RandomSelector { .. } => "RandomSelector",
            CompositeState::Parallel { .. } => "Parallel",
        }
    }
}

impl Lifecycle for CompositeState {
    fn on_enter(&mut self, rng: &mut SplitMix64) {
        match self {
            CompositeState::Sequence { index } | CompositeState::Selector { index } => *index = 0,
            CompositeState::RandomSelector { order, cursor } => {
                for (i, slot) in order.iter_mut().enumerate() {
                    *slot = i;
                }
                rng.shuffle(order);
                *cursor = 0;
            }
            CompositeState::Parallel {
                stopped,
                successes,
                failures,
                ..
            } => {
                stopped.iter_mut().for_each(|s| *s = false);
                *successes = 0;
                *failures = 0;
            }
        }
    }

    fn on_exit(&mut self) {
        match self {
            CompositeState::Sequence { index } | CompositeState::Selector { index } => *index = 0,
            CompositeState::RandomSelector { cursor, .. } => *cursor = 0,
            CompositeState::Parallel {
                successes,
                failures,
                ..
            } => {
                *successes = 0;
                *failures = 0;
            }
        }
    }

    fn on_post_creation(&mut self, child_count: usize) {
        match self {
            CompositeState::RandomSelector { order, .. } => *order = (0..child_count).collect(),
            CompositeState::Parallel { stopped, .. } => *stopped = vec![false; child_count],
            CompositeState::Sequence { .. } | CompositeState::Selector { .. } => {}
        }
    }
}

/// A condition whose key was resolved against the tree's blackboard.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoundCondition {
    pub(crate) property: PropertyId,
    pub(crate) condition: Condition,
}

impl BoundCondition {
    pub(crate) fn holds(&self, blackboard: &Blackboard) -> bool {
        blackboard
            .value(self.property)
            .map(|value| self.condition.evaluate(value))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DecoratorState {
    Inverter,
    Repeat,
    Repeater { count: u32, completed: u32 },
    UntilFor { target: BtStatus },
    ConditionGate { conditions: Vec<BoundCondition> },
    ForceSuccess,
    ForceFailure,
}

impl DecoratorState {
    /// Runtime state for an authored decorator; condition gates get their bound conditions
    /// separately.
    pub(crate) fn from_kind(kind: &DecoratorKind, conditions: Vec<BoundCondition>) -> Self {
        match kind {
            DecoratorKind::Inverter => DecoratorState::Inverter,
            DecoratorKind::Repeat => DecoratorState::Repeat,
            DecoratorKind::Repeater { count } => DecoratorState::Repeater {
                count: *count,
                completed: 0,
            },
            DecoratorKind::UntilFor { target } => DecoratorState::UntilFor { target: *target },
            DecoratorKind::ConditionGate { .. } => DecoratorState::ConditionGate { conditions },
            DecoratorKind::ForceSuccess => DecoratorState::ForceSuccess,
            DecoratorKind::ForceFailure => DecoratorState::ForceFailure,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            DecoratorState::Inverter => "Inverter",
            DecoratorState::Repeat => "Repeat",
            DecoratorState::Repeater { .. } => "Repeater",
            DecoratorState::UntilFor { .. } => "UntilFor",
            DecoratorState::ConditionGate { .. } => "ConditionGate",
            DecoratorState::ForceSuccess => "ForceSuccess",
            DecoratorState::ForceFailure => "ForceFailure",
        }
    }
}

impl Lifecycle for DecoratorState {
    fn on_enter(&mut self, _rng: &mut SplitMix64) {
        if let DecoratorState::Repeater { completed, .. } = self {
            *completed = 0;
        }
    }

    fn on_exit(&mut self) {
        if let DecoratorState::Repeater { completed, .. } = self {
            *completed = 0;
        }
    }

    fn on_post_creation(&mut self, _child_count: usize) {}
}
