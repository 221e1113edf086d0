use arbor_core::{BtStatus, TickContext};

use crate::RuntimeTree;

/// Owns a runtime tree and the clock that feeds it.
#[derive(Debug)]
pub struct TickDriver {
    tree: RuntimeTree,
    clock: TickContext,
    /// Run the fixed-rate hooks after every `fixed_every` ticks; 0 disables them.
    fixed_every: u64,
    last: BtStatus,
}

impl TickDriver {
    pub fn new(tree: RuntimeTree, dt_seconds: f32) -> Self {
        Self {
            tree,
            clock: TickContext::new(0, dt_seconds),
            fixed_every: 0,
            last: BtStatus::Running,
        }
    }

    pub fn with_fixed_every(mut self, ticks: u64) -> Self {
        self.fixed_every = ticks;
        self
    }

    pub fn tree(&self) -> &RuntimeTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut RuntimeTree {
        &mut self.tree
    }

    pub fn into_tree(self) -> RuntimeTree {
        self.tree
    }

    /// Number of ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.clock.tick
    }

    pub fn last_status(&self) -> BtStatus {
        self.last
    }

    pub fn tick(&mut self) -> BtStatus {
        self.clock = self.clock.next();
        self.last = self.tree.tick(self.clock);
        if self.fixed_every > 0 && self.clock.tick % self.fixed_every == 0 {
            self.tree.fixed_tick(self.clock);
        }
        self.last
    }

    pub fn fixed_tick(&mut self) {
        self.tree.fixed_tick(self.clock);
    }

    pub fn gizmo_tick(&mut self) {
        self.tree.gizmo_tick(self.clock);
    }

    pub fn abort(&mut self) {
        self.tree.abort();
    }

    /// Restart the tree and rewind the clock.
    pub fn restart(&mut self) {
        self.tree.restart();
        self.clock = TickContext::new(0, self.clock.dt_seconds);
        self.last = BtStatus::Running;
    }

    /// Tick until the root completes or `max_ticks` more ticks have run.
    pub fn run_until_done(&mut self, max_ticks: u64) -> BtStatus {
        for _ in 0..max_ticks {
            if self.tick().is_done() {
                break;
            }
        }
        self.last
    }
}
