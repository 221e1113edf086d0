/// Per-tick input handed to every node visited during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    pub tick: u64,
    pub dt_seconds: f32,
}

impl TickContext {
    pub fn new(tick: u64, dt_seconds: f32) -> Self {
        Self { tick, dt_seconds }
    }

    /// Context for the tick following this one, with the same step length.
    pub fn next(self) -> Self {
        Self {
            tick: self.tick.wrapping_add(1),
            dt_seconds: self.dt_seconds,
        }
    }
}

impl Default for TickContext {
    fn default() -> Self {
        Self {
            tick: 0,
            dt_seconds: 0.0,
        }
    }
}
