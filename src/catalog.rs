//! Widget catalog: the four widget kinds and their host-facing descriptors.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::poller::PollPolicy;
use crate::view_state::ViewMode;

/// MIME type the host expects for widget templates.
pub const WIDGET_MIME_TYPE: &str = "text/html+skybridge";

/// The independently mounted widget variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    /// Search results plotted on a map.
    MountainsMap,
    /// Detail card for one mountain, with routes and weather sub-views.
    MountainInfo,
    /// List of climbing routes.
    RouteList,
    /// Current conditions and forecast carousel.
    WeatherCarousel,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 4] = [
        WidgetKind::MountainsMap,
        WidgetKind::MountainInfo,
        WidgetKind::RouteList,
        WidgetKind::WeatherCarousel,
    ];

    /// Static descriptor for this kind.
    pub fn descriptor(self) -> &'static WidgetDescriptor {
        match self {
            Self::MountainsMap => &DESCRIPTORS[0],
            Self::MountainInfo => &DESCRIPTORS[1],
            Self::RouteList => &DESCRIPTORS[2],
            Self::WeatherCarousel => &DESCRIPTORS[3],
        }
    }

    /// View modes this widget can display. `Info` is always first.
    pub fn supported_modes(self) -> &'static [ViewMode] {
        self.descriptor().modes
    }

    pub fn supports(self, mode: ViewMode) -> bool {
        self.supported_modes().contains(&mode)
    }

    /// Top-level payload key the widget reads its data from.
    pub fn payload_key(self) -> &'static str {
        match self {
            Self::MountainsMap => "mountains",
            Self::MountainInfo => "mountain",
            Self::RouteList => "routes",
            Self::WeatherCarousel => "weather",
        }
    }

    /// Polling budget observed for this widget.
    pub fn default_poll_policy(self) -> PollPolicy {
        let d = self.descriptor();
        PollPolicy::new(Duration::from_millis(d.poll_interval_ms), d.poll_max_attempts)
    }

    pub fn identifier(self) -> &'static str {
        self.descriptor().identifier
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Host-facing metadata for a widget template.
#[derive(Debug)]
pub struct WidgetDescriptor {
    pub kind: WidgetKind,
    pub identifier: &'static str,
    pub title: &'static str,
    pub template_uri: &'static str,
    /// Status line while the producing tool runs.
    pub invoking: &'static str,
    /// Status line once the producing tool returns.
    pub invoked: &'static str,
    pub modes: &'static [ViewMode],
    poll_interval_ms: u64,
    poll_max_attempts: u32,
}

impl WidgetDescriptor {
    /// `_meta` block attached to the producing tool and its resource.
    pub fn tool_meta(&self) -> Value {
        json!({
            "openai/outputTemplate": self.template_uri,
            "openai/toolInvocation/invoking": self.invoking,
            "openai/toolInvocation/invoked": self.invoked,
            "openai/widgetAccessible": true,
            "openai/resultCanProduceWidget": true,
        })
    }

    /// `_meta` block attached to an individual tool result.
    pub fn invocation_meta(&self) -> Value {
        json!({
            "openai/toolInvocation/invoking": self.invoking,
            "openai/toolInvocation/invoked": self.invoked,
        })
    }

    pub fn resource_description(&self) -> String {
        format!("{} widget markup", self.title)
    }
}

static DESCRIPTORS: [WidgetDescriptor; 4] = [
    WidgetDescriptor {
        kind: WidgetKind::MountainsMap,
        identifier: "mountains-map",
        title: "Show Mountains Map",
        template_uri: "ui://widget/mountains.html",
        invoking: "Searching for mountains...",
        invoked: "Found mountains",
        modes: &[ViewMode::Info],
        poll_interval_ms: 250,
        poll_max_attempts: 40,
    },
    WidgetDescriptor {
        kind: WidgetKind::MountainInfo,
        identifier: "mountain-info",
        title: "Mountain Information",
        template_uri: "ui://widget/mountain-info.html",
        invoking: "Loading mountain information...",
        invoked: "Mountain information loaded",
        modes: &[ViewMode::Info, ViewMode::Routes, ViewMode::Weather],
        poll_interval_ms: 200,
        poll_max_attempts: 50,
    },
    WidgetDescriptor {
        kind: WidgetKind::RouteList,
        identifier: "route-list",
        title: "Show Routes",
        template_uri: "ui://widget/routes.html",
        invoking: "Finding routes...",
        invoked: "Found routes",
        modes: &[ViewMode::Info],
        poll_interval_ms: 250,
        poll_max_attempts: 60,
    },
    WidgetDescriptor {
        kind: WidgetKind::WeatherCarousel,
        identifier: "weather-carousel",
        title: "Show Weather",
        template_uri: "ui://widget/weather.html",
        invoking: "Checking the forecast...",
        invoked: "Forecast ready",
        modes: &[ViewMode::Info],
        poll_interval_ms: 250,
        poll_max_attempts: 80,
    },
];

/// Look up a descriptor by identifier (`"mountain-info"`).
pub fn by_identifier(identifier: &str) -> Option<&'static WidgetDescriptor> {
    DESCRIPTORS.iter().find(|d| d.identifier == identifier)
}

/// Look up a descriptor by template URI (`"ui://widget/mountain-info.html"`).
pub fn by_template_uri(uri: &str) -> Option<&'static WidgetDescriptor> {
    DESCRIPTORS.iter().find(|d| d.template_uri == uri)
}
