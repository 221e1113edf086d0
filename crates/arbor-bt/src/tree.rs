use std::fmt;

use arbor_core::{Blackboard, BlackboardError, BlackboardValue, BtStatus, SplitMix64, TickContext};
use arbor_tools::{TraceEvent, TraceSink};

use crate::{CallStackId, CallStacks, NodeHandle, RuntimeNode};

/// Stream id used to derive the random-selector generator from the instance seed.
pub(crate) const RANDOM_STREAM: u64 = 0xB7_5E1E_C7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodePhase {
    Enter,
    Exit,
}

/// Passed to node listeners.
#[derive(Debug, Clone, Copy)]
pub struct NodeEvent<'a> {
    pub node: NodeHandle,
    pub name: &'a str,
    pub phase: NodePhase,
    pub tick: u64,
    /// `Running` on enter; the final result on exit.
    pub result: BtStatus,
    /// The exit was forced by an abort.
    pub aborted: bool,
}

pub(crate) struct NodeListener {
    pub(crate) node: NodeHandle,
    pub(crate) phase: NodePhase,
    pub(crate) callback: Box<dyn FnMut(&NodeEvent<'_>)>,
}

/// A live behaviour tree owned by one actor.
pub struct RuntimeTree {
    pub(crate) nodes: Vec<RuntimeNode>,
    pub(crate) stacks: CallStacks,
    pub(crate) blackboard: Blackboard,
    pub(crate) initial_blackboard: Blackboard,
    pub(crate) seed: u64,
    pub(crate) rng: SplitMix64,
    pub(crate) clock: TickContext,
    pub(crate) last_result: BtStatus,
    pub(crate) listeners: Vec<NodeListener>,
    pub(crate) trace: Option<Box<dyn TraceSink>>,
}

impl RuntimeTree {
    pub(crate) fn from_parts(
        nodes: Vec<RuntimeNode>,
        stacks: CallStacks,
        blackboard: Blackboard,
        seed: u64,
    ) -> Self {
        Self {
            nodes,
            stacks,
            initial_blackboard: blackboard.clone(),
            blackboard,
            seed,
            rng: SplitMix64::for_stream(seed, RANDOM_STREAM),
            clock: TickContext::default(),
            last_result: BtStatus::Running,
            listeners: Vec::new(),
            trace: None,
        }
    }

    /// The root node is always the first node of the arena.
    pub fn root(&self) -> NodeHandle {
        NodeHandle(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&RuntimeNode> {
        self.nodes.get(handle.index())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeHandle, &RuntimeNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeHandle(i as u32), n))
    }

    pub fn call_stacks(&self) -> &CallStacks {
        &self.stacks
    }

    pub fn stack_count(&self) -> usize {
        self.stacks.len()
    }

    /// Top of a call stack.
    pub fn current(&self, stack: CallStackId) -> Option<NodeHandle> {
        self.stacks.current(stack)
    }

    pub fn last_result(&self) -> BtStatus {
        self.last_result
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    pub fn get_property<T: BlackboardValue>(&self, key: &str) -> Result<T, BlackboardError> {
        self.blackboard.get_by_name(key)
    }

    pub fn set_property<T: BlackboardValue>(
        &mut self,
        key: &str,
        value: T,
    ) -> Result<(), BlackboardError> {
        self.blackboard.set_by_name(key, value)
    }

    /// Resolve a `/`-delimited path of node names starting at the root, e.g. `Root/Patrol/Wait`.
    ///
    /// When siblings share a name the first one wins.
    pub fn find_node_by_path(&self, path: &str) -> Option<NodeHandle> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let root = self.root();
        if self.node(root)?.name != segments.next()? {
            return None;
        }

        segments.try_fold(root, |current, segment| {
            self.node(current)?
                .children
                .iter()
                .copied()
                .find(|&child| self.nodes[child.index()].name == segment)
        })
    }

    /// Inverse of [`RuntimeTree::find_node_by_path`].
    pub fn path_of(&self, handle: NodeHandle) -> Option<String> {
        let mut names = Vec::new();
        let mut current = Some(handle);
        while let Some(h) = current {
            let node = self.node(h)?;
            names.push(node.name.as_str());
            current = node.parent;
        }
        names.reverse();
        Some(names.join("/"))
    }

    pub fn find_nodes_by_tag(&self, tag: &str) -> Vec<NodeHandle> {
        self.nodes()
            .filter(|(_, n)| n.tag == tag)
            .map(|(h, _)| h)
            .collect()
    }

    pub fn find_node_by_guid(&self, guid: &str) -> Option<NodeHandle> {
        self.nodes().find(|(_, n)| n.guid == guid).map(|(h, _)| h)
    }

    /// Call `callback` every time `node` is entered.
    pub fn on_enter(&mut self, node: NodeHandle, callback: impl FnMut(&NodeEvent<'_>) + 'static) {
        self.listen(node, NodePhase::Enter, callback);
    }

    /// Call `callback` every time `node` exits, including forced exits.
    pub fn on_exit(&mut self, node: NodeHandle, callback: impl FnMut(&NodeEvent<'_>) + 'static) {
        self.listen(node, NodePhase::Exit, callback);
    }

    pub fn clear_listeners(&mut self, node: NodeHandle) {
        self.listeners.retain(|l| l.node != node);
    }

    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.trace = Some(sink);
    }

    pub fn take_trace_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        self.trace.take()
    }

    fn listen(
        &mut self,
        node: NodeHandle,
        phase: NodePhase,
        callback: impl FnMut(&NodeEvent<'_>) + 'static,
    ) {
        self.listeners.push(NodeListener {
            node,
            phase,
            callback: Box::new(callback),
        });
    }

    pub(crate) fn emit(&mut self, event: TraceEvent) {
        if let Some(sink) = self.trace.as_mut() {
            sink.emit(event);
        }
    }

    pub(crate) fn notify(&mut self, node: NodeHandle, phase: NodePhase, aborted: bool) {
        let RuntimeTree {
            nodes,
            listeners,
            clock,
            ..
        } = self;
        let Some(runtime) = nodes.get(node.index()) else {
            return;
        };
        let event = NodeEvent {
            node,
            name: &runtime.name,
            phase,
            tick: clock.tick,
            result: runtime.last_result,
            aborted,
        };
        for listener in listeners
            .iter_mut()
            .filter(|l| l.node == node && l.phase == phase)
        {
            (listener.callback)(&event);
        }
    }
}

impl fmt::Debug for RuntimeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeTree")
            .field("nodes", &self.nodes.len())
            .field("call_stacks", &self.stacks)
            .field("blackboard", &self.blackboard)
            .field("seed", &self.seed)
            .field("last_result", &self.last_result)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
