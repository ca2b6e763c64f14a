//! Serializable view state persisted through the host.
//!
//! The wire shape is `{"mode": "info"}`, `{"mode": "routes", "routes": [...]}`
//! or `{"mode": "weather", "weather": {...}}`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Route, WeatherBundle};

/// Which sub-view a widget is displaying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Default view backed by the mount-time payload.
    Info,
    /// Route list fetched through the host.
    Routes,
    /// Weather fetched through the host.
    Weather,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Routes => "routes",
            Self::Weather => "weather",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The widget's own record of what is on screen.
///
/// The data a mode needs travels inside the variant, so a `Routes` state
/// without routes cannot be built by accident; `restore` and the state
/// machine additionally reject empty payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ViewState {
    Info,
    Routes { routes: Vec<Route> },
    Weather { weather: WeatherBundle },
}

impl Default for ViewState {
    fn default() -> Self {
        Self::Info
    }
}

impl ViewState {
    pub fn mode(&self) -> ViewMode {
        match self {
            Self::Info => ViewMode::Info,
            Self::Routes { .. } => ViewMode::Routes,
            Self::Weather { .. } => ViewMode::Weather,
        }
    }

    /// Whether the data backing the mode is present.
    ///
    /// `Info` is always backed (by the mount payload).
    pub fn is_backed(&self) -> bool {
        match self {
            Self::Info => true,
            Self::Routes { routes } => !routes.is_empty(),
            Self::Weather { weather } => !weather.is_empty(),
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Rebuild a view state from whatever the host persisted.
    ///
    /// Falls back to `Info` when nothing was saved, the value does not parse,
    /// the mode is not offered by the widget, or the mode's data is empty.
    pub fn restore(persisted: Option<&Value>, supported: &[ViewMode]) -> Self {
        let Some(value) = persisted else {
            return Self::Info;
        };

        let state = match serde_json::from_value::<ViewState>(value.clone()) {
            Ok(state) => state,
            Err(e) => {
                log::debug!("Ignoring unparsable persisted view state: {}", e);
                return Self::Info;
            }
        };

        if !supported.contains(&state.mode()) {
            log::debug!(
                "Ignoring persisted {} view: not supported by this widget",
                state.mode()
            );
            return Self::Info;
        }

        if !state.is_backed() {
            log::debug!(
                "Ignoring persisted {} view: backing data is empty",
                state.mode()
            );
            return Self::Info;
        }

        state
    }
}
