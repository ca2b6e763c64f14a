//! Stable error kind codes.
//!
//! These identifiers appear in log records and in the notices handed to the
//! render layer, so they must not change once shipped.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error kinds that can occur inside a widget.
///
/// The string representation uses the `E_*` convention so diagnostics can be
/// grepped across host and widget logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    // === Data delivery ===
    /// Initial payload never arrived within the retry budget.
    DataUnavailable,

    // === Host tool calls ===
    /// A `callTool` invocation rejected.
    ToolCallFailed,
    /// A tool result had no payload under any recognized location.
    MalformedResult,
    /// A tool result carried an empty list/bundle.
    EmptyResult,

    // === Host capabilities ===
    /// An optional host capability is absent.
    CapabilityMissing,

    // === View transitions ===
    /// Requested mode is not offered by this widget.
    UnsupportedMode,
    /// Transition is not allowed from the current mode.
    InvalidTransition,
    /// Another transition is still waiting on the host.
    TransitionInFlight,
    /// The data needed to build tool arguments is missing.
    MissingContext,

    // === Lifecycle ===
    /// The widget has been unmounted.
    Unmounted,
}

impl ErrorKind {
    /// Parse an `E_*` code back into an ErrorKind.
    ///
    /// Returns `None` if the string is not a recognized code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "E_DATA_UNAVAILABLE" => Some(Self::DataUnavailable),
            "E_TOOL_CALL_FAILED" => Some(Self::ToolCallFailed),
            "E_MALFORMED_RESULT" => Some(Self::MalformedResult),
            "E_EMPTY_RESULT" => Some(Self::EmptyResult),
            "E_CAPABILITY_MISSING" => Some(Self::CapabilityMissing),
            "E_UNSUPPORTED_MODE" => Some(Self::UnsupportedMode),
            "E_INVALID_TRANSITION" => Some(Self::InvalidTransition),
            "E_TRANSITION_IN_FLIGHT" => Some(Self::TransitionInFlight),
            "E_MISSING_CONTEXT" => Some(Self::MissingContext),
            "E_UNMOUNTED" => Some(Self::Unmounted),
            _ => None,
        }
    }

    /// Convert to the `E_*` code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DataUnavailable => "E_DATA_UNAVAILABLE",
            Self::ToolCallFailed => "E_TOOL_CALL_FAILED",
            Self::MalformedResult => "E_MALFORMED_RESULT",
            Self::EmptyResult => "E_EMPTY_RESULT",
            Self::CapabilityMissing => "E_CAPABILITY_MISSING",
            Self::UnsupportedMode => "E_UNSUPPORTED_MODE",
            Self::InvalidTransition => "E_INVALID_TRANSITION",
            Self::TransitionInFlight => "E_TRANSITION_IN_FLIGHT",
            Self::MissingContext => "E_MISSING_CONTEXT",
            Self::Unmounted => "E_UNMOUNTED",
        }
    }

    /// Check if the user can retry the action that produced this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ToolCallFailed | Self::MalformedResult | Self::EmptyResult
        )
    }

    /// Check if this error kind is internal (logged, never shown to the user).
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedMode
                | Self::InvalidTransition
                | Self::TransitionInFlight
                | Self::Unmounted
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
