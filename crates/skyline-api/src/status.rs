//! Node status vocabulary.
//!
//! Shared by pipeline stages and steps.

use serde::{Deserialize, Serialize};

/// Execution status of a stage or step node.
///
/// Any wire value outside the known vocabulary deserializes to `Unknown`,
/// which is neither active nor terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NodeStatus {
    /// Node has not begun executing.
    NotStarted,
    /// Node is waiting for an executor slot.
    Queued,
    /// Node is actively executing.
    Running,
    /// Node is suspended waiting on an async callback.
    AsyncWaiting,
    /// Node finished successfully.
    Success,
    /// Node finished with a failure.
    Failed,
    /// Node failed but the failure is configured to be ignored.
    IgnoreFailed,
    /// Unrecognized status string.
    #[serde(other)]
    #[default]
    Unknown,
}

impl NodeStatus {
    /// Check if the node is still in flight.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::NotStarted | Self::Queued | Self::Running | Self::AsyncWaiting
        )
    }

    /// Check if the node is done.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::IgnoreFailed)
    }
}
