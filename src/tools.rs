//! Host tool names and typed arguments.
//!
//! Arguments are normalized before they leave the widget so the backend never
//! rejects them. Limits are clamped into the backend's accepted `1..=1000`
//! range, and unknown ordering values fall back to the backend default.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GET_MOUNTAINS: &str = "get_mountains";
pub const GET_MOUNTAIN_INFO: &str = "get_mountain_info";
pub const GET_ROUTES: &str = "get_routes";
pub const GET_WEATHER: &str = "get_weather";

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 1000;

static LEADING_MOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^mount\s+").expect("valid leading-mount regex"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Normalize a mountain name the way the backend expects it.
///
/// `"  Mount   Elbert "` becomes `"Mt. Elbert"`. Returns `None` for blank input.
pub fn normalize_mountain_name(name: &str) -> Option<String> {
    let collapsed = WHITESPACE.replace_all(name.trim(), " ");
    if collapsed.is_empty() {
        return None;
    }
    Some(LEADING_MOUNT.replace(&collapsed, "Mt. ").into_owned())
}

/// Clamp a requested result count to the backend's accepted range.
pub fn clamp_limit(limit: i64) -> u32 {
    limit.clamp(1, MAX_LIMIT as i64) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Case-insensitive parse; `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteOrder {
    RoundtripDistance,
    ElevationGain,
    RouteDifficulty,
    #[default]
    MountainName,
}

impl RouteOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "roundtrip_distance" => Some(Self::RoundtripDistance),
            "elevation_gain" => Some(Self::ElevationGain),
            "route_difficulty" => Some(Self::RouteDifficulty),
            "mountain_name" => Some(Self::MountainName),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountainOrder {
    #[default]
    Elevation,
    Rank,
}

impl MountainOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "elevation" => Some(Self::Elevation),
            "rank" => Some(Self::Rank),
            _ => None,
        }
    }
}

/// Arguments for `get_routes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteQuery {
    pub mountain_name: String,
    pub limit: u32,
    pub order_by: RouteOrder,
    pub order_direction: SortDirection,
}

impl RouteQuery {
    pub fn new(mountain_name: &str) -> Option<Self> {
        Some(Self {
            mountain_name: normalize_mountain_name(mountain_name)?,
            limit: DEFAULT_LIMIT,
            order_by: RouteOrder::default(),
            order_direction: SortDirection::Asc,
        })
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = clamp_limit(limit);
        self
    }

    /// Order by the named column; unknown names keep the default.
    pub fn ordered_by(mut self, order_by: &str, direction: &str) -> Self {
        self.order_by = RouteOrder::parse(order_by).unwrap_or_default();
        self.order_direction = SortDirection::parse(direction).unwrap_or(SortDirection::Asc);
        self
    }

    pub fn to_args(&self) -> Value {
        to_args(self)
    }
}

/// Arguments for `get_weather`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherQuery {
    pub mountain_name: String,
}

impl WeatherQuery {
    pub fn new(mountain_name: &str) -> Option<Self> {
        Some(Self {
            mountain_name: normalize_mountain_name(mountain_name)?,
        })
    }

    pub fn to_args(&self) -> Value {
        to_args(self)
    }
}

/// Arguments for `get_mountain_info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MountainInfoQuery {
    pub mountain_name: String,
}

impl MountainInfoQuery {
    pub fn new(mountain_name: &str) -> Option<Self> {
        Some(Self {
            mountain_name: normalize_mountain_name(mountain_name)?,
        })
    }

    pub fn to_args(&self) -> Value {
        to_args(self)
    }
}

/// Arguments for `get_mountains`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MountainSearch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mountain_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_elevation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_elevation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    pub order_by: MountainOrder,
    pub order_direction: SortDirection,
}

impl MountainSearch {
    pub fn new() -> Self {
        Self {
            order_direction: SortDirection::Desc,
            ..Default::default()
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name_search = normalize_mountain_name(name);
        self
    }

    pub fn in_range(mut self, range: &str) -> Self {
        let range = range.trim();
        let range = range.strip_suffix(" Range").unwrap_or(range);
        self.mountain_range = (!range.is_empty()).then(|| range.to_string());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(clamp_limit(limit));
        self
    }

    pub fn ordered_by(mut self, order_by: &str, direction: &str) -> Self {
        self.order_by = MountainOrder::parse(order_by).unwrap_or_default();
        self.order_direction = SortDirection::parse(direction).unwrap_or(SortDirection::Desc);
        self
    }

    pub fn to_args(&self) -> Value {
        to_args(self)
    }
}

fn to_args<T: Serialize>(args: &T) -> Value {
    match serde_json::to_value(args) {
        Ok(value) => value,
        Err(e) => {
            log::error!("Failed to serialize tool arguments: {}", e);
            Value::Object(Default::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_mountain_name() {
        assert_eq!(normalize_mountain_name("Mount Elbert").as_deref(), Some("Mt. Elbert"));
        assert_eq!(normalize_mountain_name("  mount   Massive ").as_deref(), Some("Mt. Massive"));
        assert_eq!(normalize_mountain_name("Longs  Peak").as_deref(), Some("Longs Peak"));
        assert_eq!(normalize_mountain_name("Mt. Elbert").as_deref(), Some("Mt. Elbert"));
        assert_eq!(normalize_mountain_name("Mountain View").as_deref(), Some("Mountain View"));
        assert!(normalize_mountain_name("   ").is_none());
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(-5), 1);
        assert_eq!(clamp_limit(5), 5);
        assert_eq!(clamp_limit(5000), 1000);
    }

    #[test]
    fn test_route_query_defaults() {
        let query = RouteQuery::new("Mount Elbert").unwrap();
        assert_eq!(
            query.to_args(),
            json!({
                "mountain_name": "Mt. Elbert",
                "limit": 10,
                "order_by": "mountain_name",
                "order_direction": "ASC"
            })
        );
    }

    #[test]
    fn test_route_query_limit_stays_in_accepted_range() {
        let args = RouteQuery::new("Mt. Elbert").unwrap().with_limit(5000).to_args();
        assert_eq!(args["limit"], 1000);
        let args = RouteQuery::new("Mt. Elbert").unwrap().with_limit(0).to_args();
        assert_eq!(args["limit"], 1);
    }

    #[test]
    fn test_route_query_invalid_order_falls_back() {
        let query = RouteQuery::new("Longs Peak")
            .unwrap()
            .ordered_by("height; DROP TABLE", "sideways");
        assert_eq!(query.order_by, RouteOrder::MountainName);
        assert_eq!(query.order_direction, SortDirection::Asc);

        let query = RouteQuery::new("Longs Peak")
            .unwrap()
            .ordered_by("elevation_gain", "desc");
        assert_eq!(query.order_by, RouteOrder::ElevationGain);
        assert_eq!(query.order_direction, SortDirection::Desc);
    }

    #[test]
    fn test_blank_name_has_no_query() {
        assert!(RouteQuery::new("").is_none());
        assert!(WeatherQuery::new(" ").is_none());
        assert!(MountainInfoQuery::new("\t").is_none());
    }

    #[test]
    fn test_mountain_search_defaults_and_omissions() {
        let search = MountainSearch::new().named("mount evans").in_range("Front Range");
        assert_eq!(
            search.to_args(),
            json!({
                "name_search": "Mt. evans",
                "mountain_range": "Front",
                "order_by": "elevation",
                "order_direction": "DESC"
            })
        );

        let search = MountainSearch::new().ordered_by("height", "up").with_limit(9999);
        assert_eq!(search.order_by, MountainOrder::Elevation);
        assert_eq!(search.order_direction, SortDirection::Desc);
        assert_eq!(search.limit, Some(1000));
    }

    #[test]
    fn test_weather_query_args() {
        let query = WeatherQuery::new("Mt. Elbert").unwrap();
        assert_eq!(query.to_args(), json!({"mountain_name": "Mt. Elbert"}));
    }
}
