//! Error handling for the widget core.
//!
//! This module provides:
//! - `WidgetError`, the typed failure taxonomy for polling, tool calls and transitions
//! - Stable `E_*` kinds for diagnostics
//! - `WidgetNotice`, the local UI state a failure is converted into
//!
//! # Error Categories
//!
//! | Category     | Errors                                        | UI treatment       |
//! |--------------|-----------------------------------------------|--------------------|
//! | Delivery     | DataUnavailable                               | Empty state        |
//! | Tool calls   | ToolCallFailed, MalformedResult, EmptyResult  | Retry              |
//! | Capabilities | CapabilityMissing, MissingContext             | Hide the control   |
//! | Transitions  | UnsupportedMode, InvalidTransition, InFlight  | Logged only        |
//! | Lifecycle    | Unmounted                                     | Ignored            |

mod kinds;
mod remediation;

pub use kinds::ErrorKind;
pub use remediation::Remediation;

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::catalog::WidgetKind;
use crate::host::HostCapability;
use crate::view_state::ViewMode;

/// Failures that can occur inside one widget instance.
///
/// None of these escape the widget boundary: `Widget` converts each one into a
/// `WidgetNotice` and keeps rendering.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WidgetError {
    #[error("initial data not delivered after {attempts} attempts ({waited:?})")]
    DataUnavailable { attempts: u32, waited: Duration },

    #[error("tool {tool} failed: {message}")]
    ToolCallFailed { tool: String, message: String },

    #[error("tool {tool} returned no {expected} payload")]
    MalformedResult { tool: String, expected: String },

    #[error("tool {tool} returned an empty result")]
    EmptyResult { tool: String },

    #[error("host does not provide {0}")]
    CapabilityMissing(HostCapability),

    #[error("{kind} widget does not support the {mode} view")]
    UnsupportedMode { kind: WidgetKind, mode: ViewMode },

    #[error("invalid view transition from {from} to {to}")]
    InvalidTransition { from: ViewMode, to: ViewMode },

    #[error("a transition to {pending} is still waiting on the host")]
    TransitionInFlight { pending: ViewMode },

    #[error("missing {field} needed to call the host")]
    MissingContext { field: &'static str },

    #[error("widget is unmounted")]
    Unmounted,
}

impl WidgetError {
    /// Stable kind for logging and notices.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DataUnavailable { .. } => ErrorKind::DataUnavailable,
            Self::ToolCallFailed { .. } => ErrorKind::ToolCallFailed,
            Self::MalformedResult { .. } => ErrorKind::MalformedResult,
            Self::EmptyResult { .. } => ErrorKind::EmptyResult,
            Self::CapabilityMissing(_) => ErrorKind::CapabilityMissing,
            Self::UnsupportedMode { .. } => ErrorKind::UnsupportedMode,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::TransitionInFlight { .. } => ErrorKind::TransitionInFlight,
            Self::MissingContext { .. } => ErrorKind::MissingContext,
            Self::Unmounted => ErrorKind::Unmounted,
        }
    }

    /// Convert to the notice shown by the render layer.
    pub fn to_notice(&self) -> WidgetNotice {
        map_error_to_notice(self)
    }
}

/// User-facing failure state.
///
/// - `title` and `message` are human-readable
/// - `error_kind` links back to the diagnostic record
/// - `remediation` tells the render layer how to treat the affected control
/// - `details` holds the technical text (not shown to the user)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetNotice {
    /// Short title.
    pub title: String,
    /// Message explaining what happened.
    pub message: String,
    /// Technical error kind.
    pub error_kind: ErrorKind,
    /// Suggested UI treatment.
    pub remediation: Remediation,
    /// Technical details for diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl WidgetNotice {
    /// Create a notice with all fields.
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        error_kind: ErrorKind,
        remediation: Remediation,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            error_kind,
            remediation,
            details: None,
        }
    }

    /// Attach technical details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Central mapping from errors to notices. All copy lives here.
fn map_error_to_notice(error: &WidgetError) -> WidgetNotice {
    let kind = error.kind();
    match error {
        WidgetError::DataUnavailable { .. } => WidgetNotice::new(
            "No Data",
            "Nothing to show yet. Ask again to load this view.",
            kind,
            Remediation::ShowEmptyState,
        )
        .with_details(error.to_string()),

        WidgetError::ToolCallFailed { .. } => WidgetNotice::new(
            "Request Failed",
            "Couldn't load that information. Please try again.",
            kind,
            Remediation::Retry,
        )
        .with_details(error.to_string()),

        WidgetError::MalformedResult { .. } => WidgetNotice::new(
            "Request Failed",
            "The response was missing the expected information. Please try again.",
            kind,
            Remediation::Retry,
        )
        .with_details(error.to_string()),

        WidgetError::EmptyResult { .. } => WidgetNotice::new(
            "Nothing Found",
            "No results were found for this mountain.",
            kind,
            Remediation::Retry,
        )
        .with_details(error.to_string()),

        WidgetError::CapabilityMissing(_) | WidgetError::MissingContext { .. } => {
            WidgetNotice::new(
                "Unavailable",
                "This action isn't available here.",
                kind,
                Remediation::HideAction,
            )
            .with_details(error.to_string())
        }

        WidgetError::UnsupportedMode { .. }
        | WidgetError::InvalidTransition { .. }
        | WidgetError::TransitionInFlight { .. } => WidgetNotice::new(
            "Please Wait",
            "That view can't be opened right now.",
            kind,
            Remediation::Retry,
        )
        .with_details(error.to_string()),

        WidgetError::Unmounted => WidgetNotice::new(
            "Closed",
            "This widget is no longer displayed.",
            kind,
            Remediation::HideAction,
        ),
    }
}
