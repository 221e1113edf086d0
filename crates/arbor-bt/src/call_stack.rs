//! One LIFO of active nodes per logically concurrent branch.
//!
//! The root chain owns stack 0; every child of a parallel composite owns a fresh stack. A stack
//! holds the currently-entered nodes of its branch from the branch head down to the active leaf.

use thiserror::Error;

use crate::NodeHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CallStackId(pub u32);

impl CallStackId {
    pub const ROOT: CallStackId = CallStackId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Misuse of a call stack. Never fatal: the runtime logs it and carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CallStackError {
    #[error("call stack {id:?} is out of range (have {count})")]
    OutOfRange { id: CallStackId, count: usize },

    #[error("call stack {id:?} is empty")]
    Empty { id: CallStackId },
}

#[derive(Debug, Clone, Default)]
pub struct CallStacks {
    stacks: Vec<Vec<NodeHandle>>,
}

impl CallStacks {
    pub fn new(count: usize) -> Self {
        Self {
            stacks: vec![Vec::new(); count],
        }
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = CallStackId> {
        (0..self.stacks.len() as u32).map(CallStackId)
    }

    pub fn contains(&self, id: CallStackId) -> bool {
        id.index() < self.stacks.len()
    }

    /// Active nodes of one stack, bottom first.
    pub fn nodes(&self, id: CallStackId) -> &[NodeHandle] {
        self.stacks.get(id.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn current(&self, id: CallStackId) -> Option<NodeHandle> {
        self.stacks.get(id.index())?.last().copied()
    }

    pub fn depth(&self, id: CallStackId) -> usize {
        self.nodes(id).len()
    }

    /// Whether every stack is empty (nothing is running).
    pub fn is_idle(&self) -> bool {
        self.stacks.iter().all(Vec::is_empty)
    }

    pub fn try_push(&mut self, id: CallStackId, node: NodeHandle) -> Result<(), CallStackError> {
        let count = self.stacks.len();
        let stack = self
            .stacks
            .get_mut(id.index())
            .ok_or(CallStackError::OutOfRange { id, count })?;
        stack.push(node);
        Ok(())
    }

    pub fn try_pop(&mut self, id: CallStackId) -> Result<NodeHandle, CallStackError> {
        let count = self.stacks.len();
        let stack = self
            .stacks
            .get_mut(id.index())
            .ok_or(CallStackError::OutOfRange { id, count })?;
        stack.pop().ok_or(CallStackError::Empty { id })
    }

    pub fn push(&mut self, id: CallStackId, node: NodeHandle) {
        if let Err(err) = self.try_push(id, node) {
            tracing::warn!(node = node.0, error = %err, "invalid call stack push ignored");
        }
    }

    pub fn pop(&mut self, id: CallStackId) -> Option<NodeHandle> {
        match self.try_pop(id) {
            Ok(node) => Some(node),
            Err(err) => {
                tracing::warn!(error = %err, "invalid call stack pop ignored");
                None
            }
        }
    }

    /// Drop `node` from wherever it sits in stack `id`. Used to repair out-of-order exits.
    pub(crate) fn remove(&mut self, id: CallStackId, node: NodeHandle) -> bool {
        let Some(stack) = self.stacks.get_mut(id.index()) else {
            return false;
        };
        match stack.iter().rposition(|&n| n == node) {
            Some(pos) => {
                stack.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.stacks.iter_mut().for_each(Vec::clear);
    }
}

/// One unit of work for the abort engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AbortRequest {
    pub(crate) stack: CallStackId,
    /// Stop before this node (and before anything at or above its depth); `None` empties the
    /// stack.
    pub(crate) until: Option<NodeHandle>,
}

impl AbortRequest {
    pub(crate) fn all(stack: CallStackId) -> Self {
        Self { stack, until: None }
    }

    pub(crate) fn down_to(stack: CallStackId, target: NodeHandle) -> Self {
        Self {
            stack,
            until: Some(target),
        }
    }
}
