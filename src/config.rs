//! Configuration data structures and TOML parsing.
//!
//! The config file uses TOML format. Example:
//!
//! ```toml
//! [global]
//! log_level = "info"
//!
//! [device]
//! usb_id = "06cb:ce7e"
//! exclusive_grab = true
//! auto_detect_range = true
//!
//! [display]
//! width = 1920
//! height = 1080
//!
//! [touchpad]
//! cursor_sensitivity = 0.7
//! scroll_sensitivity = 0.5
//! natural_scroll = true
//! double_tap_interval_ms = 100
//! swap_axes = false
//! invert_y = false
//! ```
//!
//! Every `[touchpad]` key is optional and falls back to [`Settings::default`].

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;
use thiserror::Error;

/// Top-level error type used throughout the crate.
#[derive(Debug, Error)]
pub enum PadgestrError {
    #[error("Failed to read config file {path}: {source}")]
    ConfigReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("No touchpad found ({0})")]
    DeviceNotFound(String),

    #[error("Failed to open input device {path}: {source}")]
    DeviceOpenError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create virtual {kind} device: {source}")]
    UinputError {
        kind: &'static str,
        source: std::io::Error,
    },
}

/// Immutable snapshot of the user-tunable gesture settings.
///
/// Passed by reference into every frame, so a new snapshot takes effect on
/// the next frame without rebuilding the engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub single_finger_move: bool,
    pub single_finger_tap: bool,
    /// Relay the pad's physical click key as a primary button.
    pub physical_click: bool,
    pub double_tap_drag: bool,
    pub two_finger_tap: bool,
    pub two_finger_scroll: bool,
    pub edge_swipe: bool,
    pub three_finger_move: bool,
    pub natural_scroll: bool,

    pub cursor_sensitivity: f32,
    pub scroll_sensitivity: f32,
    pub touch_inject_speed: f32,

    /// Raw sensor range, `[0, pad_max_x] x [0, pad_max_y]`.
    pub pad_max_x: i32,
    pub pad_max_y: i32,

    /// Width of the edge band as a fraction of `pad_max_x`.
    pub edge_threshold: f32,

    // Axis correction for injected touches.
    pub swap_axes: bool,
    pub invert_x: bool,
    pub invert_y: bool,

    /// Max gap between the first tap's lift and the second tap's landing.
    pub double_tap_interval_ms: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            single_finger_move: true,
            single_finger_tap: true,
            physical_click: true,
            double_tap_drag: true,
            two_finger_tap: true,
            two_finger_scroll: true,
            edge_swipe: true,
            three_finger_move: true,
            natural_scroll: true,
            cursor_sensitivity: 0.7,
            scroll_sensitivity: 0.5,
            touch_inject_speed: 1.0,
            pad_max_x: 2879,
            pad_max_y: 1799,
            edge_threshold: 0.1,
            swap_axes: true,
            invert_x: false,
            invert_y: true,
            double_tap_interval_ms: 100,
        }
    }
}

impl Settings {
    /// Take the sensor range reported by a device. Non-positive maxima are
    /// ignored; returns whether the range was applied.
    pub fn set_pad_range(&mut self, max_x: i32, max_y: i32) -> bool {
        if max_x <= 0 || max_y <= 0 {
            return false;
        }
        self.pad_max_x = max_x;
        self.pad_max_y = max_y;
        true
    }

    /// Check value ranges; the engine assumes a validated snapshot.
    pub fn validate(&self) -> Result<(), PadgestrError> {
        let positive = [
            ("cursor_sensitivity", self.cursor_sensitivity),
            ("scroll_sensitivity", self.scroll_sensitivity),
            ("touch_inject_speed", self.touch_inject_speed),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(PadgestrError::InvalidSetting {
                    field,
                    reason: format!("must be a positive number, got {value}"),
                });
            }
        }

        if !(0.0..=1.0).contains(&self.edge_threshold) {
            return Err(PadgestrError::InvalidSetting {
                field: "edge_threshold",
                reason: format!("must be within 0.0..=1.0, got {}", self.edge_threshold),
            });
        }

        for (field, value) in [("pad_max_x", self.pad_max_x), ("pad_max_y", self.pad_max_y)] {
            if value <= 0 {
                return Err(PadgestrError::InvalidSetting {
                    field,
                    reason: format!("must be greater than zero, got {value}"),
                });
            }
        }

        if self.double_tap_interval_ms > 1000 {
            return Err(PadgestrError::InvalidSetting {
                field: "double_tap_interval_ms",
                reason: format!("must be at most 1000, got {}", self.double_tap_interval_ms),
            });
        }

        Ok(())
    }
}

/// Display size in pixels, in the display's natural orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub width: i32,
    pub height: i32,
}

impl DisplayGeometry {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Dimensions of the injected touch device: display dimensions, swapped
    /// when the touch panel is mounted rotated.
    pub fn output_size(&self, swap_axes: bool) -> (i32, i32) {
        if swap_axes {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

/// How to find the physical touchpad.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceSelector {
    pub path: Option<PathBuf>,
    pub usb_id: Option<String>,
    pub exclusive_grab: bool,
    pub auto_detect_range: bool,
}

/// Top-level parsed configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub log_level: String,
    pub log_file: Option<String>,
    pub device: DeviceSelector,
    pub display: DisplayGeometry,
    pub settings: Settings,
}

/// Root of the TOML config file.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    global: RawGlobal,
    device: RawDevice,
    display: RawDisplay,
    touchpad: Settings,
}

/// The `[global]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawGlobal {
    log_level: Option<String>,
    log_file: Option<String>,
}

/// The `[device]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawDevice {
    path: Option<String>,
    usb_id: Option<String>,
    exclusive_grab: Option<bool>,
    auto_detect_range: Option<bool>,
}

/// The `[display]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawDisplay {
    width: Option<i32>,
    height: Option<i32>,
}

const DEFAULT_DISPLAY: DisplayGeometry = DisplayGeometry {
    width: 1920,
    height: 1080,
};

impl RawDisplay {
    fn into_validated(self) -> Result<DisplayGeometry, PadgestrError> {
        let geometry = DisplayGeometry {
            width: self.width.unwrap_or(DEFAULT_DISPLAY.width),
            height: self.height.unwrap_or(DEFAULT_DISPLAY.height),
        };
        for (field, value) in [("width", geometry.width), ("height", geometry.height)] {
            if value <= 0 {
                return Err(PadgestrError::InvalidSetting {
                    field,
                    reason: format!("display {field} must be greater than zero, got {value}"),
                });
            }
        }
        Ok(geometry)
    }
}

/// Parse a TOML config string. `path` is only used for error messages.
pub fn parse_config_str(content: &str, path: &Path) -> Result<AppConfig, PadgestrError> {
    let raw: RawConfig = toml::from_str(content).map_err(|e| PadgestrError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    raw.touchpad.validate()?;
    let display = raw.display.into_validated()?;

    let device_path = raw.device.path.filter(|p| !p.is_empty());
    let device = DeviceSelector {
        path: device_path.map(PathBuf::from),
        usb_id: raw.device.usb_id.filter(|s| !s.is_empty()),
        exclusive_grab: raw.device.exclusive_grab.unwrap_or(true),
        auto_detect_range: raw.device.auto_detect_range.unwrap_or(true),
    };
    if device.path.is_none() && device.usb_id.is_none() {
        debug!("No device path or USB ID configured - touchpad will be auto-detected.");
    }

    Ok(AppConfig {
        log_level: raw.global.log_level.unwrap_or_else(|| "info".to_string()),
        log_file: raw.global.log_file,
        device,
        display,
        settings: raw.touchpad,
    })
}

/// Parse a TOML config file and return the fully resolved `AppConfig`.
pub fn parse_config_file(path: &Path) -> Result<AppConfig, PadgestrError> {
    let content = fs::read_to_string(path).map_err(|e| PadgestrError::ConfigReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_config_str(&content, path)
}
