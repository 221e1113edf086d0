//! Node state machine, per-kind update logic and the abort engine.

use std::collections::VecDeque;

use arbor_core::{BtStatus, SplitMix64, TickContext};
use arbor_tools::{tags, TraceEvent};

use crate::call_stack::AbortRequest;
use crate::node::{CompositeState, DecoratorState, Lifecycle, RuntimeKind};
use crate::tree::{NodePhase, RANDOM_STREAM};
use crate::{ActionNode, CallState, CallStackId, NodeCategory, NodeContext, NodeHandle, RuntimeTree};

impl RuntimeTree {
    /// Advance the tree one step from the root.
    pub fn tick(&mut self, ctx: TickContext) -> BtStatus {
        self.clock = ctx;
        let result = self.visit(self.root());
        self.last_result = result;
        self.emit(TraceEvent::new(ctx.tick, tags::TREE_RESULT).with_a(status_code(result)));
        result
    }

    /// Secondary fixed-rate hook for the actions currently on a call stack.
    pub fn fixed_tick(&mut self, ctx: TickContext) {
        self.clock = ctx;
        for node in self.active_nodes() {
            self.with_action(node, |action, ctx| action.on_fixed_update(ctx));
        }
    }

    /// Debug-drawing hook for the actions currently on a call stack.
    pub fn gizmo_tick(&mut self, ctx: TickContext) {
        self.clock = ctx;
        for node in self.active_nodes() {
            self.with_action(node, |action, ctx| action.on_gizmo(ctx));
        }
    }

    /// Unwind every running node. Calling it on an idle tree does nothing.
    pub fn abort(&mut self) {
        let ids: Vec<CallStackId> = self.stacks.ids().collect();
        for id in ids {
            self.abort_all(id);
        }
    }

    /// Abort, then return every node and the blackboard to their just-instantiated state.
    pub fn restart(&mut self) {
        self.abort();
        self.stacks.clear();
        for node in self.nodes.iter_mut() {
            node.reset();
        }
        self.blackboard = self.initial_blackboard.clone();
        self.rng = SplitMix64::for_stream(self.seed, RANDOM_STREAM);
        self.last_result = BtStatus::Running;
        tracing::debug!(nodes = self.nodes.len(), "behaviour tree restarted");
    }

    /// Unwind stack `stack` from the top down to, but not including, `target`.
    pub fn abort_from(&mut self, stack: CallStackId, target: NodeHandle) {
        self.run_aborts(AbortRequest::down_to(stack, target));
    }

    /// Unwind stack `stack` completely.
    pub fn abort_all(&mut self, stack: CallStackId) {
        self.run_aborts(AbortRequest::all(stack));
    }

    /// One visit of the enter → update → exit cycle. Falls through the states within one call.
    pub(crate) fn visit(&mut self, node: NodeHandle) -> BtStatus {
        let Some(runtime) = self.nodes.get_mut(node.index()) else {
            tracing::warn!(node = node.0, "visit of unknown node");
            return BtStatus::Failure;
        };
        runtime.call_count += 1;

        if runtime.call_state == CallState::BeforeEnter {
            self.enter(node);
        }

        if self.nodes[node.index()].call_state == CallState::Updating {
            let result = self.update(node);
            let runtime = &mut self.nodes[node.index()];
            runtime.last_result = result;
            if result.is_running() {
                return result;
            }

            // Descendants still on the stack (e.g. a gate that stopped delegating).
            let stack = runtime.call_stack_id;
            if self.stacks.current(stack) != Some(node) {
                self.abort_from(stack, node);
            }
            self.nodes[node.index()].call_state = CallState::BeforeExit;
        }

        if self.nodes[node.index()].call_state == CallState::BeforeExit {
            self.exit(node, false);
        }
        self.nodes[node.index()].last_result
    }

    fn enter(&mut self, node: NodeHandle) {
        let RuntimeTree {
            nodes, stacks, rng, ..
        } = self;
        let runtime = &mut nodes[node.index()];
        stacks.push(runtime.call_stack_id, node);
        runtime.last_result = BtStatus::Running;
        match &mut runtime.kind {
            RuntimeKind::Composite(state) => state.on_enter(rng),
            RuntimeKind::Decorator(state) => state.on_enter(rng),
            RuntimeKind::Root | RuntimeKind::Action(_) => {}
        }
        let stack = runtime.call_stack_id;

        self.with_action(node, |action, ctx| action.on_enter(ctx));
        self.nodes[node.index()].call_state = CallState::Updating;

        tracing::trace!(node = node.0, stack = stack.0, "enter");
        self.emit(
            TraceEvent::new(self.clock.tick, tags::NODE_ENTER)
                .with_a(node.0 as u64)
                .with_b(stack.0 as u64),
        );
        self.notify(node, NodePhase::Enter, false);
    }

    fn exit(&mut self, node: NodeHandle, aborted: bool) {
        self.with_action(node, |action, ctx| action.on_exit(ctx));

        let RuntimeTree { nodes, stacks, .. } = self;
        let runtime = &mut nodes[node.index()];
        match &mut runtime.kind {
            RuntimeKind::Composite(state) => state.on_exit(),
            RuntimeKind::Decorator(state) => state.on_exit(),
            RuntimeKind::Root | RuntimeKind::Action(_) => {}
        }

        let stack = runtime.call_stack_id;
        if stacks.current(stack) == Some(node) {
            stacks.pop(stack);
        } else if !stacks.remove(stack, node) {
            tracing::warn!(
                node = node.0,
                stack = stack.0,
                "exiting node was not on its call stack"
            );
        }

        runtime.call_state = CallState::BeforeEnter;
        if runtime.last_result.is_running() {
            runtime.last_result = BtStatus::Failure;
        }

        let tag = if aborted {
            tracing::debug!(node = node.0, stack = stack.0, "aborted");
            tags::NODE_ABORT
        } else {
            tracing::trace!(node = node.0, stack = stack.0, "exit");
            tags::NODE_EXIT
        };
        self.emit(
            TraceEvent::new(self.clock.tick, tag)
                .with_a(node.0 as u64)
                .with_b(stack.0 as u64),
        );
        self.notify(node, NodePhase::Exit, aborted);
    }

    fn update(&mut self, node: NodeHandle) -> BtStatus {
        match self.nodes[node.index()].category() {
            NodeCategory::Root => match self.child(node, 0) {
                Some(child) => self.visit(child),
                None => BtStatus::Failure,
            },
            NodeCategory::Action => self
                .with_action(node, |action, ctx| action.on_update(ctx))
                .unwrap_or(BtStatus::Failure),
            NodeCategory::Composite => self.update_composite(node),
            NodeCategory::Decorator => self.update_decorator(node),
        }
    }

    fn update_composite(&mut self, node: NodeHandle) -> BtStatus {
        let child_count = self.nodes[node.index()].children.len();
        match self.composite(node) {
            Some(CompositeState::Sequence { index }) => {
                let index = *index;
                self.step_ordered(node, index, child_count, BtStatus::Success)
            }
            Some(CompositeState::Selector { index }) => {
                let index = *index;
                self.step_ordered(node, index, child_count, BtStatus::Failure)
            }
            Some(CompositeState::RandomSelector { order, cursor }) => {
                // Bounds are checked before the permutation is indexed.
                let Some(&position) = order.get(*cursor) else {
                    return BtStatus::Failure;
                };
                self.step_random(node, position)
            }
            Some(CompositeState::Parallel { .. }) => self.update_parallel(node, child_count),
            None => BtStatus::Failure,
        }
    }

    fn step_random(&mut self, node: NodeHandle, position: usize) -> BtStatus {
        let Some(child) = self.child(node, position) else {
            return BtStatus::Failure;
        };
        match self.visit(child) {
            BtStatus::Failure => match self.composite(node) {
                Some(CompositeState::RandomSelector { order, cursor }) => {
                    *cursor += 1;
                    if *cursor >= order.len() {
                        BtStatus::Failure
                    } else {
                        BtStatus::Running
                    }
                }
                _ => BtStatus::Failure,
            },
            other => other,
        }
    }

    /// Sequence (`advance_on == Success`) and Selector (`advance_on == Failure`): one child per
    /// tick, moving on when the child returns `advance_on`.
    fn step_ordered(
        &mut self,
        node: NodeHandle,
        index: usize,
        child_count: usize,
        advance_on: BtStatus,
    ) -> BtStatus {
        let Some(child) = self.child(node, index) else {
            return advance_on;
        };
        let result = self.visit(child);
        if result != advance_on {
            return result;
        }

        let next = index + 1;
        if let Some(CompositeState::Sequence { index } | CompositeState::Selector { index }) =
            self.composite(node)
        {
            *index = next;
        }
        if next >= child_count {
            advance_on
        } else {
            BtStatus::Running
        }
    }

    fn update_parallel(&mut self, node: NodeHandle, child_count: usize) -> BtStatus {
        for i in 0..child_count {
            let stopped = match self.composite(node) {
                Some(CompositeState::Parallel { stopped, .. }) => {
                    stopped.get(i).copied().unwrap_or(true)
                }
                _ => true,
            };
            if stopped {
                continue;
            }
            let Some(child) = self.child(node, i) else {
                continue;
            };

            let result = self.visit(child);
            if let Some(CompositeState::Parallel {
                stopped,
                successes,
                failures,
                ..
            }) = self.composite(node)
            {
                match result {
                    BtStatus::Success => *successes += 1,
                    BtStatus::Failure => *failures += 1,
                    BtStatus::Running => continue,
                }
                stopped[i] = true;
            }
        }

        let result = match self.composite(node) {
            Some(CompositeState::Parallel {
                policy,
                successes,
                failures,
                ..
            }) => policy.resolve(*successes, *failures, child_count),
            _ => BtStatus::Failure,
        };
        if result.is_done() {
            for stack in self.running_branches(node) {
                self.abort_all(stack);
            }
        }
        result
    }

    fn update_decorator(&mut self, node: NodeHandle) -> BtStatus {
        let Some(child) = self.child(node, 0) else {
            return BtStatus::Failure;
        };
        let RuntimeKind::Decorator(state) = &self.nodes[node.index()].kind else {
            return BtStatus::Failure;
        };

        match state {
            DecoratorState::Inverter => self.visit(child).invert(),
            DecoratorState::Repeat => {
                self.visit(child);
                BtStatus::Running
            }
            DecoratorState::Repeater { count, completed } => {
                if completed >= count {
                    return BtStatus::Success;
                }
                let result = self.visit(child);
                let Some(DecoratorState::Repeater { count, completed }) = self.decorator(node)
                else {
                    return BtStatus::Failure;
                };
                if result.is_done() {
                    *completed += 1;
                }
                if *completed >= *count {
                    BtStatus::Success
                } else {
                    BtStatus::Running
                }
            }
            DecoratorState::UntilFor { target } => {
                let target = *target;
                if self.visit(child) == target {
                    BtStatus::Success
                } else {
                    BtStatus::Running
                }
            }
            DecoratorState::ConditionGate { conditions } => {
                if conditions.iter().all(|c| c.holds(&self.blackboard)) {
                    self.visit(child)
                } else {
                    BtStatus::Failure
                }
            }
            DecoratorState::ForceSuccess => match self.visit(child) {
                BtStatus::Running => BtStatus::Running,
                _ => BtStatus::Success,
            },
            DecoratorState::ForceFailure => match self.visit(child) {
                BtStatus::Running => BtStatus::Running,
                _ => BtStatus::Failure,
            },
        }
    }

    /// Process aborts through a work queue. A parallel node being unwound first has the stacks
    /// of its running branches queued ahead of it, so its exit runs after theirs.
    fn run_aborts(&mut self, first: AbortRequest) {
        let mut queue = VecDeque::from([first]);
        while let Some(request) = queue.pop_front() {
            if !self.stacks.contains(request.stack) {
                tracing::warn!(stack = request.stack.0, "abort of unknown call stack ignored");
                continue;
            }
            let Some(top) = self.stacks.current(request.stack) else {
                continue;
            };
            if let Some(target) = request.until {
                if top == target || self.depth(top) <= self.depth(target) {
                    continue;
                }
            }

            let branches = self.running_branches(top);
            queue.push_front(request);
            if branches.is_empty() {
                self.exit(top, true);
            } else {
                for stack in branches.into_iter().rev() {
                    queue.push_front(AbortRequest::all(stack));
                }
            }
        }
    }

    /// Stacks of a parallel node's children that are still running.
    fn running_branches(&self, node: NodeHandle) -> Vec<CallStackId> {
        let runtime = &self.nodes[node.index()];
        let RuntimeKind::Composite(CompositeState::Parallel { stopped, .. }) = &runtime.kind else {
            return Vec::new();
        };
        runtime
            .children
            .iter()
            .enumerate()
            .filter(|(i, _)| !stopped.get(*i).copied().unwrap_or(false))
            .map(|(_, &child)| &self.nodes[child.index()])
            .filter(|child| child.is_active() && self.stacks.depth(child.call_stack_id) > 0)
            .map(|child| child.call_stack_id)
            .collect()
    }

    /// Every node currently on a call stack: stacks in id order, bottom to top.
    fn active_nodes(&self) -> Vec<NodeHandle> {
        self.stacks
            .ids()
            .flat_map(|id| self.stacks.nodes(id).iter().copied())
            .collect()
    }

    fn with_action<R>(
        &mut self,
        node: NodeHandle,
        f: impl FnOnce(&mut Box<dyn ActionNode>, &mut NodeContext<'_>) -> R,
    ) -> Option<R> {
        let RuntimeTree {
            nodes,
            blackboard,
            clock,
            ..
        } = self;
        let runtime = nodes.get_mut(node.index())?;
        let RuntimeKind::Action(action) = &mut runtime.kind else {
            return None;
        };
        let mut ctx = NodeContext::new(clock, blackboard, &runtime.bindings, node);
        Some(f(action, &mut ctx))
    }

    fn child(&self, node: NodeHandle, position: usize) -> Option<NodeHandle> {
        self.nodes.get(node.index())?.children.get(position).copied()
    }

    fn depth(&self, node: NodeHandle) -> u32 {
        self.nodes.get(node.index()).map(|n| n.depth).unwrap_or(0)
    }

    fn composite(&mut self, node: NodeHandle) -> Option<&mut CompositeState> {
        match &mut self.nodes.get_mut(node.index())?.kind {
            RuntimeKind::Composite(state) => Some(state),
            _ => None,
        }
    }

    fn decorator(&mut self, node: NodeHandle) -> Option<&mut DecoratorState> {
        match &mut self.nodes.get_mut(node.index())?.kind {
            RuntimeKind::Decorator(state) => Some(state),
            _ => None,
        }
    }
}

fn status_code(status: BtStatus) -> u64 {
    match status {
        BtStatus::Running => 0,
        BtStatus::Success => 1,
        BtStatus::Failure => 2,
    }
}
