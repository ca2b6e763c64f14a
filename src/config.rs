//! Configuration persistence with atomic writes and migrations.
//!
//! Stores widget configuration in a JSON file with:
//! - Atomic writes (write temp, rename)
//! - Corruption fallback (regenerate defaults if parse fails)
//! - Schema versioning with migration support
//! - Platform-specific config paths

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::WidgetKind;
use crate::poller::PollPolicy;
use crate::tools;

/// Current schema version.
const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "FourteenersWidgets";

/// Config file name.
const CONFIG_FILE_NAME: &str = "widgets.json";

const MIN_INTERVAL_MS: u64 = 10;
const MAX_INTERVAL_MS: u64 = 5000;
const MIN_ATTEMPTS: u32 = 1;
const MAX_ATTEMPTS: u32 = 600;

/// Root widget configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetsConfig {
    /// Schema version for migrations.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Default for WidgetsConfig {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            polling: PollingConfig::default(),
            tools: ToolsConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl WidgetsConfig {
    /// Poll policy for one widget kind.
    pub fn poll_policy(&self, kind: WidgetKind) -> PollPolicy {
        self.polling.for_kind(kind).to_policy()
    }

    /// Validate and clamp values to acceptable ranges.
    pub fn validate_and_clamp(&mut self) {
        for kind in WidgetKind::ALL {
            let settings = self.polling.for_kind_mut(kind);
            let interval = settings.interval_ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS);
            if interval != settings.interval_ms {
                log::warn!(
                    "Clamped {} poll interval from {}ms to {}ms",
                    kind,
                    settings.interval_ms,
                    interval
                );
                settings.interval_ms = interval;
            }
            let attempts = settings.max_attempts.clamp(MIN_ATTEMPTS, MAX_ATTEMPTS);
            if attempts != settings.max_attempts {
                log::warn!(
                    "Clamped {} poll attempts from {} to {}",
                    kind,
                    settings.max_attempts,
                    attempts
                );
                settings.max_attempts = attempts;
            }
        }

        if self.tools.routes.trim().is_empty() {
            self.tools.routes = default_routes_tool();
        }
        if self.tools.weather.trim().is_empty() {
            self.tools.weather = default_weather_tool();
        }
    }
}

/// Poll schedule for one widget kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl PollSettings {
    fn defaults_for(kind: WidgetKind) -> Self {
        let policy = kind.default_poll_policy();
        Self {
            interval_ms: policy.interval.as_millis() as u64,
            max_attempts: policy.max_attempts,
        }
    }

    pub fn to_policy(self) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(self.interval_ms), self.max_attempts)
    }
}

/// Per-widget poll schedules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_map_poll")]
    pub mountains_map: PollSettings,
    #[serde(default = "default_info_poll")]
    pub mountain_info: PollSettings,
    #[serde(default = "default_routes_poll")]
    pub route_list: PollSettings,
    #[serde(default = "default_weather_poll")]
    pub weather_carousel: PollSettings,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            mountains_map: default_map_poll(),
            mountain_info: default_info_poll(),
            route_list: default_routes_poll(),
            weather_carousel: default_weather_poll(),
        }
    }
}

impl PollingConfig {
    pub fn for_kind(&self, kind: WidgetKind) -> PollSettings {
        match kind {
            WidgetKind::MountainsMap => self.mountains_map,
            WidgetKind::MountainInfo => self.mountain_info,
            WidgetKind::RouteList => self.route_list,
            WidgetKind::WeatherCarousel => self.weather_carousel,
        }
    }

    fn for_kind_mut(&mut self, kind: WidgetKind) -> &mut PollSettings {
        match kind {
            WidgetKind::MountainsMap => &mut self.mountains_map,
            WidgetKind::MountainInfo => &mut self.mountain_info,
            WidgetKind::RouteList => &mut self.route_list,
            WidgetKind::WeatherCarousel => &mut self.weather_carousel,
        }
    }
}

/// Host tool names used by view transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_routes_tool")]
    pub routes: String,
    #[serde(default = "default_weather_tool")]
    pub weather: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            routes: default_routes_tool(),
            weather: default_weather_tool(),
        }
    }
}

/// View state persistence through the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Save view state after each transition.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Honor persisted view state at mount.
    #[serde(default = "default_true")]
    pub restore: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            restore: true,
        }
    }
}

fn default_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

fn default_true() -> bool {
    true
}

fn default_routes_tool() -> String {
    tools::GET_ROUTES.to_string()
}

fn default_weather_tool() -> String {
    tools::GET_WEATHER.to_string()
}

fn default_map_poll() -> PollSettings {
    PollSettings::defaults_for(WidgetKind::MountainsMap)
}

fn default_info_poll() -> PollSettings {
    PollSettings::defaults_for(WidgetKind::MountainInfo)
}

fn default_routes_poll() -> PollSettings {
    PollSettings::defaults_for(WidgetKind::RouteList)
}

fn default_weather_poll() -> PollSettings {
    PollSettings::defaults_for(WidgetKind::WeatherCarousel)
}

/// Get the platform-specific config directory path.
pub fn config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~"))
            .join(CONFIG_DIR_NAME)
    }

    #[cfg(target_os = "windows")]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
    }

    #[cfg(target_os = "linux")]
    {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".config")
            })
            .join(CONFIG_DIR_NAME)
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        PathBuf::from(".").join(CONFIG_DIR_NAME)
    }
}

/// Get the full config file path.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Load configuration from disk.
///
/// If the config file doesn't exist or is corrupted, returns defaults.
/// Corrupted files are backed up for debugging.
pub fn load_config() -> WidgetsConfig {
    load_config_from_path(&config_path())
}

/// Load configuration from a specific path.
pub fn load_config_from_path(path: &Path) -> WidgetsConfig {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<Value>(&content) {
            Ok(value) => {
                let mut config = migrate_config(value);
                config.validate_and_clamp();
                config
            }
            Err(e) => {
                log::error!("Config parse error, using defaults: {}", e);
                let backup = path.with_extension("json.corrupt");
                if let Err(backup_err) = fs::rename(path, &backup) {
                    log::warn!("Failed to backup corrupt config: {}", backup_err);
                }
                WidgetsConfig::default()
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("No config file found, using defaults");
            WidgetsConfig::default()
        }
        Err(e) => {
            log::error!("Config read error, using defaults: {}", e);
            WidgetsConfig::default()
        }
    }
}

/// Save configuration to disk atomically.
pub fn save_config(config: &WidgetsConfig) -> Result<(), ConfigError> {
    save_config_to_path(config, &config_path())
}

/// Save configuration to a specific path.
///
/// Writes to a temp file first, then renames to the final path.
pub fn save_config_to_path(config: &WidgetsConfig, path: &Path) -> Result<(), ConfigError> {
    let temp = path.with_extension("json.tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)?;
    fs::write(&temp, &json)?;

    fs::rename(&temp, path)?;

    Ok(())
}

/// Migrate configuration from older schema versions.
fn migrate_config(mut config: Value) -> WidgetsConfig {
    if !config.is_object() {
        log::error!("Config root is not an object, using defaults");
        return WidgetsConfig::default();
    }

    let version = config["schema_version"].as_u64().unwrap_or(0) as u32;

    // v0 → v1: one flat poll schedule becomes per-widget schedules
    if version < 1 {
        let interval = config.get("poll_interval_ms").and_then(Value::as_u64);
        let attempts = config.get("poll_max_attempts").and_then(Value::as_u64);

        if interval.is_some() || attempts.is_some() {
            let mut polling = serde_json::Map::new();
            for kind in WidgetKind::ALL {
                let defaults = PollSettings::defaults_for(kind);
                polling.insert(
                    polling_key(kind).to_string(),
                    json!({
                        "interval_ms": interval.unwrap_or(defaults.interval_ms),
                        "max_attempts": attempts
                            .map(|a| a.min(u32::MAX as u64))
                            .unwrap_or(defaults.max_attempts as u64),
                    }),
                );
            }
            config["polling"] = Value::Object(polling);
        }

        if let Some(root) = config.as_object_mut() {
            root.remove("poll_interval_ms");
            root.remove("poll_max_attempts");
        }
        config["schema_version"] = json!(1);
        log::info!("Migrated config v0 → v1: per-widget poll schedules");
    }

    serde_json::from_value(config).unwrap_or_else(|e| {
        log::error!("Config migration failed, using defaults: {}", e);
        WidgetsConfig::default()
    })
}

fn polling_key(kind: WidgetKind) -> &'static str {
    match kind {
        WidgetKind::MountainsMap => "mountains_map",
        WidgetKind::MountainInfo => "mountain_info",
        WidgetKind::RouteList => "route_list",
        WidgetKind::WeatherCarousel => "weather_carousel",
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
