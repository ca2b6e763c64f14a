//! What the render layer should offer after a widget failure.

use serde::{Deserialize, Serialize};

/// Suggested UI treatment for a failed operation.
///
/// - `Retry`: return the triggering control to its idle state so it can be pressed again
/// - `ShowEmptyState`: render the "no data" placeholder instead of content
/// - `HideAction`: drop the control entirely (the host cannot serve it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum Remediation {
    /// Re-enable the control that triggered the failed call.
    Retry,
    /// Render the empty placeholder.
    ShowEmptyState,
    /// Remove the control.
    HideAction,
}

impl Remediation {
    /// Label for the control that accompanies the notice, if any.
    pub fn button_label(&self) -> Option<&'static str> {
        match self {
            Self::Retry => Some("Try Again"),
            Self::ShowEmptyState | Self::HideAction => None,
        }
    }

    /// Check if the affected control stays interactive.
    pub fn keeps_action_enabled(&self) -> bool {
        matches!(self, Self::Retry)
    }
}
