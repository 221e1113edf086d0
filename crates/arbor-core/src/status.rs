#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of evaluating a node for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BtStatus {
    #[default]
    Running,
    Success,
    Failure,
}

impl BtStatus {
    /// Swap `Success` and `Failure`; `Running` passes through.
    pub fn invert(self) -> Self {
        match self {
            BtStatus::Running => BtStatus::Running,
            BtStatus::Success => BtStatus::Failure,
            BtStatus::Failure => BtStatus::Success,
        }
    }

    pub fn is_running(self) -> bool {
        self == BtStatus::Running
    }

    pub fn is_done(self) -> bool {
        !self.is_running()
    }
}

impl From<bool> for BtStatus {
    fn from(value: bool) -> Self {
        if value {
            BtStatus::Success
        } else {
            BtStatus::Failure
        }
    }
}
