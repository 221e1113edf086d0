//! Built-in leaf actions.

use std::fmt;

use arbor_core::{BbValue, Blackboard, BtStatus};

use crate::{ActionNode, NodeContext};

/// Runs until `seconds` of tick time have elapsed since it was entered.
#[derive(Debug, Clone, PartialEq)]
pub struct Wait {
    pub seconds: f32,
    elapsed: f32,
}

impl Wait {
    pub fn new(seconds: f32) -> Self {
        Self {
            seconds,
            elapsed: 0.0,
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

impl ActionNode for Wait {
    fn on_enter(&mut self, _ctx: &mut NodeContext<'_>) {
        self.elapsed = 0.0;
    }

    fn on_update(&mut self, ctx: &mut NodeContext<'_>) -> BtStatus {
        self.elapsed += ctx.tick.dt_seconds.max(0.0);
        if self.elapsed >= self.seconds {
            BtStatus::Success
        } else {
            BtStatus::Running
        }
    }

    fn label(&self) -> &'static str {
        "Wait"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Succeed;

impl ActionNode for Succeed {
    fn on_update(&mut self, _ctx: &mut NodeContext<'_>) -> BtStatus {
        BtStatus::Success
    }

    fn label(&self) -> &'static str {
        "Succeed"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fail;

impl ActionNode for Fail {
    fn on_update(&mut self, _ctx: &mut NodeContext<'_>) -> BtStatus {
        BtStatus::Failure
    }

    fn label(&self) -> &'static str {
        "Fail"
    }
}

/// Writes `value` to the property bound to its [`SetProperty::TARGET`] slot.
///
/// Fails when the slot is unbound or the property holds a different type.
#[derive(Debug, Clone, PartialEq)]
pub struct SetProperty {
    pub value: BbValue,
}

impl SetProperty {
    pub const TARGET: &'static str = "target";

    pub fn new(value: impl Into<BbValue>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl ActionNode for SetProperty {
    fn on_update(&mut self, ctx: &mut NodeContext<'_>) -> BtStatus {
        match ctx.write_value(Self::TARGET, self.value.clone()) {
            Ok(()) => BtStatus::Success,
            Err(err) => {
                tracing::warn!(node = ctx.node.0, error = %err, "set_property failed");
                BtStatus::Failure
            }
        }
    }

    fn label(&self) -> &'static str {
        "SetProperty"
    }
}

/// Succeeds when the predicate holds for the blackboard, fails otherwise.
#[derive(Clone)]
pub struct Check<F> {
    predicate: F,
}

impl<F> Check<F>
where
    F: Fn(&Blackboard) -> bool + Clone + 'static,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> ActionNode for Check<F>
where
    F: Fn(&Blackboard) -> bool + Clone + 'static,
{
    fn on_update(&mut self, ctx: &mut NodeContext<'_>) -> BtStatus {
        BtStatus::from((self.predicate)(ctx.blackboard))
    }

    fn label(&self) -> &'static str {
        "Check"
    }
}

impl<F> fmt::Debug for Check<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check").finish_non_exhaustive()
    }
}

/// Adapts a closure into an action. The closure is called on every update.
#[derive(Clone)]
pub struct Run<F> {
    label: &'static str,
    update: F,
}

impl<F> Run<F>
where
    F: FnMut(&mut NodeContext<'_>) -> BtStatus + Clone + 'static,
{
    pub fn new(update: F) -> Self {
        Self {
            label: "Run",
            update,
        }
    }

    pub fn labeled(label: &'static str, update: F) -> Self {
        Self { label, update }
    }
}

impl<F> ActionNode for Run<F>
where
    F: FnMut(&mut NodeContext<'_>) -> BtStatus + Clone + 'static,
{
    fn on_update(&mut self, ctx: &mut NodeContext<'_>) -> BtStatus {
        (self.update)(ctx)
    }

    fn label(&self) -> &'static str {
        self.label
    }
}

impl<F> fmt::Debug for Run<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Run").field("label", &self.label).finish_non_exhaustive()
    }
}
