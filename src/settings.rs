/// User settings persisted under `extensionSettings`
///
/// Every field carries a serde default, so a partial stored record is merged
/// over the defaults instead of replacing them. A key whose value can't be
/// read keeps its default without discarding the other keys.
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SettingsError;

pub const WINDOW_WIDTH_RANGE: (u32, u32) = (400, 2000);
pub const WINDOW_HEIGHT_RANGE: (u32, u32) = (300, 1500);
pub const HISTORY_LIMIT_RANGE: (u32, u32) = (10, 200);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Auto,
    Light,
    Dark,
}

/// Concrete theme after resolving `Auto` against the system preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn resolve(self, prefers_dark: bool) -> Theme {
        match self {
            ThemeMode::Auto if prefers_dark => Theme::Dark,
            ThemeMode::Auto => Theme::Light,
            ThemeMode::Light => Theme::Light,
            ThemeMode::Dark => Theme::Dark,
        }
    }
}

impl Theme {
    /// Class applied to `<body>`
    pub fn body_class(self) -> &'static str {
        match self {
            Theme::Light => "light-theme",
            Theme::Dark => "dark-theme",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub window_width: u32,
    pub window_height: u32,
    pub history_limit: u32,
    /// Retention in days, 0 keeps history forever
    pub history_duration: u32,
    pub theme_mode: ThemeMode,
    pub auto_focus: bool,
    pub remember_window_state: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            window_width: 854,
            window_height: 480,
            history_limit: 50,
            history_duration: 30,
            theme_mode: ThemeMode::Auto,
            auto_focus: true,
            remember_window_state: true,
            gemini_api_key: None,
        }
    }
}

impl Settings {
    /// Merge a stored record over the defaults, one key at a time
    pub fn from_stored(value: Value) -> Result<Settings, SettingsError> {
        let Value::Object(stored) = value else {
            return Err(SettingsError::Parse("settings record is not an object".to_string()));
        };

        let mut merged = match serde_json::to_value(Settings::default()) {
            Ok(Value::Object(defaults)) => defaults,
            _ => Map::new(),
        };

        for (key, value) in stored {
            let previous = merged.insert(key.clone(), value);
            if serde_json::from_value::<Settings>(Value::Object(merged.clone())).is_err() {
                warn!("Ignoring unreadable setting {}", key);
                match previous {
                    Some(default) => merged.insert(key, default),
                    None => merged.remove(&key),
                };
            }
        }

        serde_json::from_value(Value::Object(merged)).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Check the ranges the settings page enforces
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_range("windowWidth", self.window_width, WINDOW_WIDTH_RANGE)?;
        check_range("windowHeight", self.window_height, WINDOW_HEIGHT_RANGE)?;
        check_range("historyLimit", self.history_limit, HISTORY_LIMIT_RANGE)?;
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.gemini_api_key
            .as_deref()
            .map_or(false, |key| !key.trim().is_empty())
    }

    /// Pretty JSON for the settings backup file
    pub fn export_json(&self) -> Result<String, SettingsError> {
        serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Parse a backup file, filling missing keys with defaults
    pub fn import_json(text: &str) -> Result<Settings, SettingsError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| SettingsError::Parse(e.to_string()))?;
        let settings = Settings::from_stored(value)?;
        settings.validate()?;
        Ok(settings)
    }
}

fn check_range(field: &'static str, value: u32, (min, max): (u32, u32)) -> Result<(), SettingsError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange { field, min, max, value })
    }
}
