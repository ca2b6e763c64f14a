//! Fourteeners widgets - host/widget synchronization core
//!
//! This library provides the data and view state protocol behind the
//! mountain map, mountain info card, route list and weather carousel widgets:
//! polling the host for the initial payload, invoking host tools to switch
//! views, and persisting the current view through the host.

pub mod catalog;
pub mod config;
pub mod errors;
pub mod event_seq;
pub mod host;
pub mod model;
pub mod poller;
pub mod state;
pub mod tools;
pub mod view_state;
pub mod widget;

pub use catalog::WidgetKind;
pub use config::WidgetsConfig;
pub use errors::{WidgetError, WidgetNotice};
pub use host::{HostBridge, HostCapabilities, HostCapability, HostCallError};
pub use view_state::{ViewMode, ViewState};
pub use widget::{TransitionOutcome, Widget, WidgetPhase};

/// Initialize logging with an `info` default, overridable through `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
