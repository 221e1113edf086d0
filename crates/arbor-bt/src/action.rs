use std::fmt;

use arbor_core::{BbValue, Blackboard, BlackboardError, BlackboardValue, BtStatus, PropertyId, TickContext};

use crate::NodeHandle;

/// A declared slot resolved against the tree's blackboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub field: String,
    pub property: PropertyId,
}

/// What an action sees while one of its hooks runs.
pub struct NodeContext<'a> {
    pub tick: &'a TickContext,
    pub blackboard: &'a mut Blackboard,
    pub node: NodeHandle,
    bindings: &'a [Binding],
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(
        tick: &'a TickContext,
        blackboard: &'a mut Blackboard,
        bindings: &'a [Binding],
        node: NodeHandle,
    ) -> Self {
        Self {
            tick,
            blackboard,
            node,
            bindings,
        }
    }

    /// The property bound to `field`, if the node declared that slot.
    pub fn binding(&self, field: &str) -> Option<PropertyId> {
        self.bindings
            .iter()
            .find(|b| b.field == field)
            .map(|b| b.property)
    }

    pub fn read<T: BlackboardValue>(&self, field: &str) -> Result<T, BlackboardError> {
        let id = self.require(field)?;
        self.blackboard.read(id)
    }

    pub fn write<T: BlackboardValue>(&mut self, field: &str, value: T) -> Result<(), BlackboardError> {
        let id = self.require(field)?;
        self.blackboard.write(id, value)
    }

    pub fn write_value(&mut self, field: &str, value: BbValue) -> Result<(), BlackboardError> {
        let id = self.require(field)?;
        self.blackboard.write_value(id, value)
    }

    fn require(&self, field: &str) -> Result<PropertyId, BlackboardError> {
        self.binding(field)
            .ok_or_else(|| BlackboardError::PropertyNotFound {
                key: field.to_string(),
            })
    }
}

/// Leaf behaviour.
///
/// Each runtime tree owns its own copy of every action (cloned from the template), so actions are
/// free to keep per-instance state in `self`.
pub trait ActionNode: ActionClone + 'static {
    fn on_enter(&mut self, _ctx: &mut NodeContext<'_>) {}

    fn on_update(&mut self, ctx: &mut NodeContext<'_>) -> BtStatus;

    /// Runs on natural completion and on abort.
    fn on_exit(&mut self, _ctx: &mut NodeContext<'_>) {}

    fn on_fixed_update(&mut self, _ctx: &mut NodeContext<'_>) {}

    fn on_gizmo(&mut self, _ctx: &mut NodeContext<'_>) {}

    fn label(&self) -> &'static str {
        "Action"
    }
}

pub trait ActionClone {
    fn clone_box(&self) -> Box<dyn ActionNode>;
}

impl<T> ActionClone for T
where
    T: ActionNode + Clone,
{
    fn clone_box(&self) -> Box<dyn ActionNode> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn ActionNode> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl fmt::Debug for dyn ActionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionNode({})", self.label())
    }
}
