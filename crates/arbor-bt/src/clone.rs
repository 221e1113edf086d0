//! Template → runtime tree cloning.

use std::collections::VecDeque;

use arbor_core::{Blackboard, BlackboardError, Condition};

use crate::node::{BoundCondition, CompositeState, DecoratorState, RuntimeKind};
use crate::{
    Binding, BuildError, CallStackId, CallStacks, CompositeKind, DecoratorKind, NodeDefinition,
    NodeHandle, NodeId, NodeKind, RuntimeNode, RuntimeTree, StructuralError, TreeTemplate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstanceOptions {
    /// Seeds the random selectors of this instance.
    pub seed: u64,
}

impl InstanceOptions {
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }
}

pub fn instantiate(template: &TreeTemplate) -> Result<RuntimeTree, BuildError> {
    instantiate_with(template, InstanceOptions::default())
}

/// Clone `template` into a new runtime tree with its own blackboard.
///
/// The template is validated first and the tree is only assembled once every node has been
/// created and bound, so callers never observe a partial tree.
pub fn instantiate_with(
    template: &TreeTemplate,
    options: InstanceOptions,
) -> Result<RuntimeTree, BuildError> {
    template.validate()?;
    let root = template.root().ok_or(StructuralError::MissingRoot)?;
    let blackboard = template.blackboard().clone();

    let mut nodes: Vec<RuntimeNode> = Vec::with_capacity(template.node_count());
    let mut queue = VecDeque::from([Discovered {
        id: root,
        parent: None,
        depth: 0,
        stack: CallStackId::ROOT,
    }]);
    let mut next_stack = 1u32;

    while let Some(found) = queue.pop_front() {
        let def = template
            .node(found.id)
            .ok_or(StructuralError::UnknownNode { node: found.id })?;
        let handle = NodeHandle(nodes.len() as u32);

        // Parallel children each get a fresh stack, numbered in discovery order.
        let parallel = def.kind.is_parallel();
        for &child in template.children(found.id) {
            let stack = if parallel {
                let id = CallStackId(next_stack);
                next_stack += 1;
                id
            } else {
                found.stack
            };
            queue.push_back(Discovered {
                id: child,
                parent: Some(handle),
                depth: found.depth + 1,
                stack,
            });
        }

        if let Some(parent) = found.parent {
            nodes[parent.index()].children.push(handle);
        }
        nodes.push(RuntimeNode {
            guid: def.guid.clone(),
            name: def.name.clone(),
            tag: def.tag.clone(),
            description: def.description.clone(),
            template_id: found.id,
            kind: runtime_kind(def, &blackboard)?,
            parent: found.parent,
            children: Vec::new(),
            depth: found.depth,
            call_stack_id: found.stack,
            call_state: Default::default(),
            last_result: Default::default(),
            call_count: 0,
            bindings: bind_slots(def, &blackboard)?,
        });
    }

    for node in nodes.iter_mut() {
        let child_count = node.children.len();
        node.kind.on_post_creation(child_count);
    }

    let stacks = CallStacks::new(next_stack as usize);
    tracing::debug!(
        nodes = nodes.len(),
        call_stacks = stacks.len(),
        seed = options.seed,
        "behaviour tree instantiated"
    );
    Ok(RuntimeTree::from_parts(nodes, stacks, blackboard, options.seed))
}

struct Discovered {
    id: NodeId,
    parent: Option<NodeHandle>,
    depth: u32,
    stack: CallStackId,
}

fn runtime_kind(def: &NodeDefinition, blackboard: &Blackboard) -> Result<RuntimeKind, BuildError> {
    let kind = match &def.kind {
        NodeKind::Root => RuntimeKind::Root,
        NodeKind::Action(action) => RuntimeKind::Action(action.clone()),
        NodeKind::Composite(kind) => RuntimeKind::Composite(match kind {
            CompositeKind::Sequence => CompositeState::Sequence { index: 0 },
            CompositeKind::Selector => CompositeState::Selector { index: 0 },
            CompositeKind::RandomSelector => CompositeState::RandomSelector {
                order: Vec::new(),
                cursor: 0,
            },
            CompositeKind::Parallel(policy) => CompositeState::Parallel {
                policy: *policy,
                stopped: Vec::new(),
                successes: 0,
                failures: 0,
            },
        }),
        NodeKind::Decorator(kind) => {
            let conditions = match kind {
                DecoratorKind::ConditionGate { conditions } => {
                    bind_conditions(def, conditions, blackboard)?
                }
                _ => Vec::new(),
            };
            RuntimeKind::Decorator(DecoratorState::from_kind(kind, conditions))
        }
    };
    Ok(kind)
}

fn bind_slots(def: &NodeDefinition, blackboard: &Blackboard) -> Result<Vec<Binding>, BuildError> {
    def.slots
        .iter()
        .map(|slot| {
            let property =
                blackboard
                    .find_property(&slot.key)
                    .ok_or_else(|| BuildError::Binding {
                        node: def.name.clone(),
                        field: slot.field.clone(),
                        source: BlackboardError::PropertyNotFound {
                            key: slot.key.clone(),
                        },
                    })?;
            Ok(Binding {
                field: slot.field.clone(),
                property,
            })
        })
        .collect()
}

fn bind_conditions(
    def: &NodeDefinition,
    conditions: &[Condition],
    blackboard: &Blackboard,
) -> Result<Vec<BoundCondition>, BuildError> {
    conditions
        .iter()
        .map(|condition| {
            let binding_error = |source| BuildError::Binding {
                node: def.name.clone(),
                field: condition.key.clone(),
                source,
            };
            let (property, ty) = blackboard
                .find_property(&condition.key)
                .and_then(|id| blackboard.property(id).map(|p| (id, p.ty())))
                .ok_or_else(|| {
                    binding_error(BlackboardError::PropertyNotFound {
                        key: condition.key.clone(),
                    })
                })?;
            condition.check_types(ty).map_err(binding_error)?;
            Ok(BoundCondition {
                property,
                condition: condition.clone(),
            })
        })
        .collect()
}
