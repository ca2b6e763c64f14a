//! Domain records delivered by the host.
//!
//! Every field is optional: the backing rows have gaps, and the render layer
//! omits whatever is missing instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::WidgetKind;

/// A mountain as returned by `get_mountains` / `get_mountain_info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mountain {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub rank: Option<i64>,
    pub elevation: Option<i64>,
    pub elevation_ft: Option<String>,
    pub range: Option<String>,
    pub county: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub nearby_towns: Option<String>,
    pub image_url: Option<String>,
    pub image_filename: Option<String>,
    pub mountain_url: Option<String>,
}

impl Mountain {
    /// Coordinates when both halves are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// Elevation label, preferring the host-formatted string.
    pub fn elevation_label(&self) -> Option<String> {
        self.elevation_ft
            .clone()
            .or_else(|| self.elevation.map(|ft| format!("{ft}ft")))
    }
}

/// A climbing route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Route {
    pub mountain_name: Option<String>,
    pub route_name: Option<String>,
    pub route_difficulty: Option<String>,
    pub roundtrip_distance: Option<f64>,
    pub elevation_gain: Option<i64>,
    pub range: Option<String>,
    pub snow: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snow_difficulty: Option<String>,
    pub risk_factor_exposure: Option<String>,
    pub risk_factor_rockfall: Option<String>,
    pub risk_factor_route_finding: Option<String>,
    pub risk_factor_commitment: Option<String>,
    pub route_url: Option<String>,
    pub standard: Option<bool>,
}

/// Latitude/longitude pair attached to a weather bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// One forecast period (or the current conditions).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherPeriod {
    pub name: Option<String>,
    pub temperature: Option<f64>,
    #[serde(rename = "temperatureUnit")]
    pub temperature_unit: Option<String>,
    pub wind_speed: Option<String>,
    pub wind_direction: Option<String>,
    pub short_forecast: Option<String>,
    pub detailed_forecast: Option<String>,
}

impl WeatherPeriod {
    /// `"54°F"`; the unit defaults to F when the host omits it.
    pub fn temperature_label(&self) -> Option<String> {
        let temperature = self.temperature?;
        let unit = self.temperature_unit.as_deref().unwrap_or("F");
        Some(format!("{temperature}°{unit}"))
    }

    /// `"10 mph NW"`, or just the speed when direction is absent.
    pub fn wind_label(&self) -> Option<String> {
        let speed = self.wind_speed.as_deref().filter(|s| !s.is_empty())?;
        match self.wind_direction.as_deref().filter(|d| !d.is_empty()) {
            Some(direction) => Some(format!("{speed} {direction}")),
            None => Some(speed.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Current conditions plus upcoming periods for one mountain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherBundle {
    pub mountain_name: Option<String>,
    pub location: Option<Location>,
    pub current_conditions: Option<WeatherPeriod>,
    pub forecast: Vec<WeatherPeriod>,
}

impl WeatherBundle {
    /// True when there is nothing to display: no current conditions and no forecast.
    pub fn is_empty(&self) -> bool {
        let no_current = self
            .current_conditions
            .as_ref()
            .map_or(true, WeatherPeriod::is_empty);
        no_current && self.forecast.is_empty()
    }
}

/// Initial payload handed to a widget at mount time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "shape")]
pub enum ToolOutput {
    /// Search results for the map widget.
    Mountains { mountains: Vec<Mountain> },
    /// One mountain plus how many routes it has.
    MountainInfo {
        mountain: Option<Mountain>,
        route_count: Option<u32>,
    },
    /// Route list widget payload.
    Routes { routes: Vec<Route> },
    /// Weather carousel payload.
    Weather { weather: WeatherBundle },
}

#[derive(Deserialize)]
struct MountainsPayload {
    #[serde(default)]
    mountains: Vec<Mountain>,
}

#[derive(Deserialize)]
struct MountainInfoPayload {
    #[serde(default)]
    mountain: Option<Mountain>,
    #[serde(default)]
    route_count: Option<u32>,
}

#[derive(Deserialize)]
struct RoutesPayload {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Deserialize)]
struct WeatherPayload {
    #[serde(default)]
    weather: WeatherBundle,
}

impl ToolOutput {
    /// Decode the canonical payload object for the given widget kind.
    pub fn from_payload(kind: WidgetKind, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            WidgetKind::MountainsMap => {
                let p: MountainsPayload = serde_json::from_value(payload)?;
                Self::Mountains {
                    mountains: p.mountains,
                }
            }
            WidgetKind::MountainInfo => {
                let p: MountainInfoPayload = serde_json::from_value(payload)?;
                Self::MountainInfo {
                    mountain: p.mountain,
                    route_count: p.route_count,
                }
            }
            WidgetKind::RouteList => {
                let p: RoutesPayload = serde_json::from_value(payload)?;
                Self::Routes { routes: p.routes }
            }
            WidgetKind::WeatherCarousel => {
                let p: WeatherPayload = serde_json::from_value(payload)?;
                Self::Weather { weather: p.weather }
            }
        })
    }

    /// The mountain this payload is about, when it is about exactly one.
    pub fn focus_mountain_name(&self) -> Option<&str> {
        match self {
            Self::MountainInfo {
                mountain: Some(mountain),
                ..
            } => mountain.name.as_deref(),
            Self::Weather { weather } => weather.mountain_name.as_deref(),
            Self::Routes { routes } => {
                let first = routes.first()?.mountain_name.as_deref()?;
                routes
                    .iter()
                    .all(|r| r.mountain_name.as_deref() == Some(first))
                    .then_some(first)
            }
            _ => None,
        }
    }

    /// Route count advertised alongside a single mountain.
    pub fn route_count(&self) -> Option<u32> {
        match self {
            Self::MountainInfo { route_count, .. } => *route_count,
            _ => None,
        }
    }
}
