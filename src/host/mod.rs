//! Host bridge: the only integration point with the embedding application.
//!
//! The host is injected into each widget as an `Arc<dyn HostBridge>`. Every
//! operation is optional; a widget asks `capabilities()` before relying on one
//! and degrades (hides the affected control, renders an empty state) when it
//! is absent. The bridge may be shared by several widgets at once, so
//! implementations must tolerate concurrent use.

pub mod memory;
pub mod result;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use memory::{InMemoryHost, SessionStore, ToolCallRecord, ToolResponse};
pub use result::ToolPayload;

/// One optional member of the host bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostCapability {
    /// Synchronous read of the initial-data slot.
    InitialData,
    /// Asynchronous named tool invocation.
    CallTool,
    /// Fire-and-forget view state persistence.
    SaveViewState,
    /// Synchronous read of previously saved view state.
    PersistedViewState,
}

impl fmt::Display for HostCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InitialData => "getInitialData",
            Self::CallTool => "callTool",
            Self::SaveViewState => "saveViewState",
            Self::PersistedViewState => "getPersistedViewState",
        })
    }
}

/// Which bridge members the host provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostCapabilities {
    pub initial_data: bool,
    pub call_tool: bool,
    pub save_view_state: bool,
    pub persisted_view_state: bool,
}

impl HostCapabilities {
    /// Every member present.
    pub const fn all() -> Self {
        Self {
            initial_data: true,
            call_tool: true,
            save_view_state: true,
            persisted_view_state: true,
        }
    }

    /// No member present.
    pub const fn none() -> Self {
        Self {
            initial_data: false,
            call_tool: false,
            save_view_state: false,
            persisted_view_state: false,
        }
    }

    pub fn has(&self, capability: HostCapability) -> bool {
        match capability {
            HostCapability::InitialData => self.initial_data,
            HostCapability::CallTool => self.call_tool,
            HostCapability::SaveViewState => self.save_view_state,
            HostCapability::PersistedViewState => self.persisted_view_state,
        }
    }

    pub fn without(mut self, capability: HostCapability) -> Self {
        match capability {
            HostCapability::InitialData => self.initial_data = false,
            HostCapability::CallTool => self.call_tool = false,
            HostCapability::SaveViewState => self.save_view_state = false,
            HostCapability::PersistedViewState => self.persisted_view_state = false,
        }
        self
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Why a host tool call rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostCallError {
    #[error("host rejected the call: {0}")]
    Rejected(String),

    #[error("host does not implement callTool")]
    Unsupported,
}

/// The capability object the embedding host hands to each widget.
///
/// Default method bodies model an absent member, so a host only overrides
/// what it actually offers (and reports it in `capabilities`).
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Which members are present.
    fn capabilities(&self) -> HostCapabilities;

    /// Non-blocking read of the initial-data slot; `None` until delivered.
    fn initial_data(&self) -> Option<Value> {
        None
    }

    /// Invoke a named host-side tool. No local timeout is applied.
    async fn call_tool(&self, name: &str, args: Value) -> Result<Value, HostCallError> {
        let _ = (name, args);
        Err(HostCallError::Unsupported)
    }

    /// Best-effort persistence; there is no acknowledgment.
    fn save_view_state(&self, state: Value) {
        let _ = state;
    }

    /// State saved by an earlier mount of the same widget, if any.
    fn persisted_view_state(&self) -> Option<Value> {
        None
    }
}
