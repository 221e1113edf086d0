//! Authored tree templates.
//!
//! A template is the shared, editor-owned description of a tree: node definitions, parent/child
//! edges and the initial blackboard. Runtime trees are cloned from it and never write back.

use arbor_core::{BbValue, Blackboard, BlackboardError, BlackboardValue};
use uuid::Uuid;

use crate::{
    ActionNode, BuildError, CompositeKind, DecoratorKind, NodeKind, ParallelPolicy, RuntimeTree,
    StructuralError,
};

/// Stable index of a node inside its template. Ids are never reused after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A field of a node bound to a blackboard key. Resolved by key when the tree is cloned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySlot {
    pub field: String,
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct NodeDefinition {
    pub guid: String,
    pub name: String,
    pub tag: String,
    pub description: String,
    pub kind: NodeKind,
    pub slots: Vec<PropertySlot>,
}

impl NodeDefinition {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            name: name.into(),
            tag: String::new(),
            description: String::new(),
            kind,
            slots: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new("Root", NodeKind::Root)
    }

    pub fn action(name: impl Into<String>, action: impl ActionNode) -> Self {
        Self::new(name, NodeKind::Action(Box::new(action)))
    }

    pub fn sequence(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Composite(CompositeKind::Sequence))
    }

    pub fn selector(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Composite(CompositeKind::Selector))
    }

    pub fn random_selector(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Composite(CompositeKind::RandomSelector))
    }

    pub fn parallel(name: impl Into<String>, policy: ParallelPolicy) -> Self {
        Self::new(name, NodeKind::Composite(CompositeKind::Parallel(policy)))
    }

    pub fn decorator(name: impl Into<String>, kind: DecoratorKind) -> Self {
        Self::new(name, NodeKind::Decorator(kind))
    }

    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = guid.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare that `field` reads/writes the blackboard property `key`.
    pub fn bind(mut self, field: impl Into<String>, key: impl Into<String>) -> Self {
        self.slots.push(PropertySlot {
            field: field.into(),
            key: key.into(),
        });
        self
    }
}

#[derive(Debug, Clone)]
struct TemplateNode {
    def: NodeDefinition,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The authored node set plus its edges and initial blackboard.
#[derive(Debug, Clone, Default)]
pub struct TreeTemplate {
    nodes: Vec<Option<TemplateNode>>,
    root: Option<NodeId>,
    blackboard: Blackboard,
}

impl TreeTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a template from raw parts, e.g. an imported flat node list.
    ///
    /// No invariant is checked here; [`TreeTemplate::validate`] (and therefore instantiation)
    /// rejects malformed input.
    pub fn from_edges(
        blackboard: Blackboard,
        definitions: Vec<NodeDefinition>,
        edges: &[(NodeId, NodeId)],
        root: Option<NodeId>,
    ) -> Self {
        let mut nodes: Vec<Option<TemplateNode>> = definitions
            .into_iter()
            .map(|def| {
                Some(TemplateNode {
                    def,
                    parent: None,
                    children: Vec::new(),
                })
            })
            .collect();

        for &(parent, child) in edges {
            if let Some(Some(p)) = nodes.get_mut(parent.index()) {
                p.children.push(child);
            }
            if let Some(Some(c)) = nodes.get_mut(child.index()) {
                c.parent = Some(parent);
            }
        }

        Self {
            nodes,
            root,
            blackboard,
        }
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    /// Declare an initial blackboard value.
    pub fn declare<T: BlackboardValue>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), BlackboardError> {
        self.blackboard.insert(key, value).map(|_| ())
    }

    pub fn declare_value(
        &mut self,
        key: impl Into<String>,
        value: BbValue,
    ) -> Result<(), BlackboardError> {
        self.blackboard.insert_value(key, value).map(|_| ())
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeDefinition> {
        self.slot(id).map(|n| &n.def)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeDefinition> {
        self.nodes
            .get_mut(id.index())
            .and_then(|n| n.as_mut())
            .map(|n| &mut n.def)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeDefinition)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i as u32), &n.def)))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|n| n.parent)
    }

    /// Add a detached node. The first `Root` node added becomes the template root.
    pub fn add_node(&mut self, def: NodeDefinition) -> Result<NodeId, StructuralError> {
        let is_root = matches!(def.kind, NodeKind::Root);
        if is_root {
            if let Some(existing) = self.root {
                return Err(StructuralError::MultipleRoots { existing });
            }
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(TemplateNode {
            def,
            parent: None,
            children: Vec::new(),
        }));
        if is_root {
            self.root = Some(id);
        }
        Ok(id)
    }

    /// Add `def` and connect it as the last child of `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        def: NodeDefinition,
    ) -> Result<NodeId, StructuralError> {
        let id = self.add_node(def)?;
        if let Err(err) = self.connect(parent, id) {
            self.nodes.pop();
            if self.root == Some(id) {
                self.root = None;
            }
            return Err(err);
        }
        Ok(id)
    }

    /// Remove a node. Its children stay in the template, detached.
    pub fn remove_node(&mut self, id: NodeId) -> Result<NodeDefinition, StructuralError> {
        let node = self
            .nodes
            .get_mut(id.index())
            .and_then(|n| n.take())
            .ok_or(StructuralError::UnknownNode { node: id })?;

        if let Some(parent) = node.parent {
            if let Some(Some(p)) = self.nodes.get_mut(parent.index()) {
                p.children.retain(|&c| c != id);
            }
        }
        for child in &node.children {
            if let Some(Some(c)) = self.nodes.get_mut(child.index()) {
                c.parent = None;
            }
        }
        if self.root == Some(id) {
            self.root = None;
        }
        Ok(node.def)
    }

    /// Append `child` to `parent`'s children, preserving tree invariants.
    pub fn connect(&mut self, parent: NodeId, child: NodeId) -> Result<(), StructuralError> {
        let parent_node = self.slot(parent).ok_or(StructuralError::UnknownNode { node: parent })?;
        let child_node = self.slot(child).ok_or(StructuralError::UnknownNode { node: child })?;

        if matches!(child_node.def.kind, NodeKind::Root) {
            return Err(StructuralError::RootHasParent { node: child });
        }
        if child_node.parent.is_some() {
            return Err(StructuralError::MultipleParents { node: child });
        }
        if let Some(max) = parent_node.def.kind.max_children() {
            if parent_node.children.len() >= max {
                return Err(StructuralError::TooManyChildren {
                    node: parent,
                    name: parent_node.def.name.clone(),
                    max,
                });
            }
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(StructuralError::Cycle { node: child });
        }

        if let Some(Some(p)) = self.nodes.get_mut(parent.index()) {
            p.children.push(child);
        }
        if let Some(Some(c)) = self.nodes.get_mut(child.index()) {
            c.parent = Some(parent);
        }
        Ok(())
    }

    pub fn disconnect(&mut self, parent: NodeId, child: NodeId) -> Result<(), StructuralError> {
        let connected = self
            .slot(parent)
            .map(|p| p.children.contains(&child))
            .unwrap_or(false);
        if !connected {
            return Err(StructuralError::NotConnected { parent, child });
        }

        if let Some(Some(p)) = self.nodes.get_mut(parent.index()) {
            p.children.retain(|&c| c != child);
        }
        if let Some(Some(c)) = self.nodes.get_mut(child.index()) {
            c.parent = None;
        }
        Ok(())
    }

    /// Check every structural invariant the runtime relies on.
    pub fn validate(&self) -> Result<(), StructuralError> {
        let root = self.root.ok_or(StructuralError::MissingRoot)?;
        let root_node = self.slot(root).ok_or(StructuralError::UnknownNode { node: root })?;
        if !matches!(root_node.def.kind, NodeKind::Root) {
            return Err(StructuralError::NotARoot { node: root });
        }

        // Incoming edges, taken from the children lists (the source of truth for traversal).
        let mut incoming: Vec<Option<NodeId>> = vec![None; self.nodes.len()];
        for (id, node) in self.live_nodes() {
            for &child in &node.children {
                if self.slot(child).is_none() {
                    return Err(StructuralError::UnknownNode { node: child });
                }
                if child == root {
                    return Err(StructuralError::RootHasParent { node: root });
                }
                if incoming[child.index()].replace(id).is_some() {
                    return Err(StructuralError::MultipleParents { node: child });
                }
            }
        }

        // With a single parent per node, everything reachable from the root is a tree.
        let mut reachable = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            reachable[id.index()] = true;
            stack.extend(self.children(id).iter().copied());
        }

        for (id, node) in self.live_nodes() {
            if !reachable[id.index()] {
                return Err(self.unreachable_error(id, &incoming));
            }
            self.check_arity(id, node)?;
            check_config(id, &node.def)?;
        }
        Ok(())
    }

    /// Validate and clone into a fresh runtime tree.
    pub fn instantiate(&self) -> Result<RuntimeTree, BuildError> {
        crate::instantiate(self)
    }

    fn slot(&self, id: NodeId) -> Option<&TemplateNode> {
        self.nodes.get(id.index()).and_then(|n| n.as_ref())
    }

    fn live_nodes(&self) -> impl Iterator<Item = (NodeId, &TemplateNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i as u32), n)))
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, mut of: NodeId) -> bool {
        let mut steps = 0;
        loop {
            if of == candidate {
                return true;
            }
            match self.parent(of) {
                Some(parent) if steps <= self.nodes.len() => {
                    of = parent;
                    steps += 1;
                }
                _ => return false,
            }
        }
    }

    fn unreachable_error(&self, id: NodeId, incoming: &[Option<NodeId>]) -> StructuralError {
        let mut seen = vec![false; self.nodes.len()];
        let mut top = id;
        while let Some(parent) = incoming[top.index()] {
            if seen[parent.index()] {
                return StructuralError::Cycle { node: parent };
            }
            seen[top.index()] = true;
            top = parent;
        }
        let name = self.node(top).map(|d| d.name.clone()).unwrap_or_default();
        StructuralError::Orphaned { node: top, name }
    }

    fn check_arity(&self, id: NodeId, node: &TemplateNode) -> Result<(), StructuralError> {
        let count = node.children.len();
        if node.def.kind.requires_child() && count == 0 {
            return Err(StructuralError::MissingChild {
                node: id,
                name: node.def.name.clone(),
            });
        }
        if let Some(max) = node.def.kind.max_children() {
            if count > max {
                return Err(StructuralError::TooManyChildren {
                    node: id,
                    name: node.def.name.clone(),
                    max,
                });
            }
        }
        Ok(())
    }
}

fn check_config(id: NodeId, def: &NodeDefinition) -> Result<(), StructuralError> {
    let reason = match &def.kind {
        NodeKind::Decorator(DecoratorKind::UntilFor { target }) if target.is_running() => {
            Some("UntilFor target must be Success or Failure")
        }
        NodeKind::Decorator(DecoratorKind::ConditionGate { conditions }) if conditions.is_empty() => {
            Some("ConditionGate needs at least one condition")
        }
        _ => None,
    };
    match reason {
        Some(reason) => Err(StructuralError::InvalidNodeConfig {
            node: id,
            name: def.name.clone(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
