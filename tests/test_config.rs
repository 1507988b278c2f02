//! Tests for `padgestr::config` - TOML parsing, defaults, device selection,
//! and validation errors.

use std::io::Write;
use tempfile::NamedTempFile;

use padgestr::config::{AppConfig, DisplayGeometry, PadgestrError, Settings, parse_config_file};

// ── Helpers ──────────────────────────────────────────────────

/// Write TOML to a temp file and parse it.
fn load(toml_content: &str) -> AppConfig {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(toml_content.as_bytes()).unwrap();
    f.flush().unwrap();
    parse_config_file(f.path()).unwrap()
}

/// Parse raw TOML that is expected to fail.
fn load_err(toml_content: &str) -> String {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(toml_content.as_bytes()).unwrap();
    f.flush().unwrap();
    parse_config_file(f.path()).unwrap_err().to_string()
}

// ── Error handling ───────────────────────────────────────────

#[test]
fn test_file_not_found() {
    let err = parse_config_file(std::path::Path::new("/no/such/file.toml")).unwrap_err();
    assert!(matches!(err, PadgestrError::ConfigReadError { .. }));
    let msg = err.to_string();
    assert!(msg.contains("Failed to read config file"));
    assert!(msg.contains("/no/such/file.toml"));
}

#[test]
fn test_invalid_toml() {
    let msg = load_err("this is not valid toml [[[");
    assert!(msg.contains("Failed to parse config file"));
}

#[test]
fn test_wrong_type_is_parse_error() {
    let msg = load_err(
        r#"
[touchpad]
natural_scroll = "yes"
"#,
    );
    assert!(msg.contains("Failed to parse config file"));
}

#[test]
fn test_non_positive_sensitivity_rejected() {
    let msg = load_err(
        r#"
[touchpad]
cursor_sensitivity = 0.0
"#,
    );
    assert!(msg.contains("cursor_sensitivity"));
    assert!(msg.contains("positive"));
}

#[test]
fn test_edge_threshold_out_of_range() {
    let msg = load_err(
        r#"
[touchpad]
edge_threshold = 1.5
"#,
    );
    assert!(msg.contains("edge_threshold"));
}

#[test]
fn test_double_tap_interval_upper_bound() {
    let msg = load_err(
        r#"
[touchpad]
double_tap_interval_ms = 1001
"#,
    );
    assert!(msg.contains("double_tap_interval_ms"));
    assert!(msg.contains("1000"));

    let config = load(
        r#"
[touchpad]
double_tap_interval_ms = 1000
"#,
    );
    assert_eq!(config.settings.double_tap_interval_ms, 1000);
}

#[test]
fn test_zero_pad_range_rejected() {
    let msg = load_err(
        r#"
[touchpad]
pad_max_y = 0
"#,
    );
    assert!(msg.contains("pad_max_y"));
}

#[test]
fn test_zero_display_rejected() {
    let msg = load_err(
        r#"
[display]
width = 0
"#,
    );
    assert!(msg.contains("width"));
}

// ── Empty / minimal configs ──────────────────────────────────

#[test]
fn test_empty_config_uses_defaults() {
    let config = load("");
    assert_eq!(config.log_level, "info");
    assert_eq!(config.log_file, None);
    assert_eq!(config.settings, Settings::default());
    assert_eq!(config.display, DisplayGeometry::new(1920, 1080));
    assert_eq!(config.device.path, None);
    assert_eq!(config.device.usb_id, None);
    assert!(config.device.exclusive_grab);
    assert!(config.device.auto_detect_range);
}

#[test]
fn test_default_settings() {
    let s = Settings::default();
    assert!(s.single_finger_move && s.single_finger_tap && s.physical_click);
    assert!(s.double_tap_drag && s.two_finger_tap && s.two_finger_scroll);
    assert!(s.edge_swipe && s.three_finger_move && s.natural_scroll);
    assert_eq!(s.cursor_sensitivity, 0.7);
    assert_eq!(s.scroll_sensitivity, 0.5);
    assert_eq!(s.touch_inject_speed, 1.0);
    assert_eq!((s.pad_max_x, s.pad_max_y), (2879, 1799));
    assert_eq!(s.edge_threshold, 0.1);
    assert!(s.swap_axes && !s.invert_x && s.invert_y);
    assert_eq!(s.double_tap_interval_ms, 100);
    assert!(s.validate().is_ok());
}

#[test]
fn test_set_pad_range() {
    let mut s = Settings::default();
    assert!(!s.set_pad_range(0, 1200));
    assert!(!s.set_pad_range(3000, -1));
    assert_eq!((s.pad_max_x, s.pad_max_y), (2879, 1799));

    assert!(s.set_pad_range(3000, 1900));
    assert_eq!((s.pad_max_x, s.pad_max_y), (3000, 1900));
}

// ── Overrides ────────────────────────────────────────────────

#[test]
fn test_partial_touchpad_section() {
    let config = load(
        r#"
[touchpad]
cursor_sensitivity = 1.25
natural_scroll = false
swap_axes = false
"#,
    );
    let s = &config.settings;
    assert_eq!(s.cursor_sensitivity, 1.25);
    assert!(!s.natural_scroll);
    assert!(!s.swap_axes);
    // Untouched keys keep their defaults.
    assert_eq!(s.scroll_sensitivity, 0.5);
    assert!(s.invert_y);
}

#[test]
fn test_global_and_display() {
    let config = load(
        r#"
[global]
log_level = "debug"
log_file = "/tmp/padgestr.log"

[display]
width = 2560
height = 1600
"#,
    );
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.log_file.as_deref(), Some("/tmp/padgestr.log"));
    assert_eq!(config.display, DisplayGeometry::new(2560, 1600));
}

#[test]
fn test_device_section() {
    let config = load(
        r#"
[device]
path = "/dev/input/event7"
usb_id = "06cb:ce7e"
exclusive_grab = false
auto_detect_range = false
"#,
    );
    let d = &config.device;
    assert_eq!(
        d.path.as_deref(),
        Some(std::path::Path::new("/dev/input/event7"))
    );
    assert_eq!(d.usb_id.as_deref(), Some("06cb:ce7e"));
    assert!(!d.exclusive_grab);
    assert!(!d.auto_detect_range);
}

#[test]
fn test_empty_device_strings_mean_auto_detect() {
    let config = load(
        r#"
[device]
path = ""
usb_id = ""
"#,
    );
    assert_eq!(config.device.path, None);
    assert_eq!(config.device.usb_id, None);
}

#[test]
fn test_unknown_keys_ignored() {
    let config = load(
        r#"
[touchpad]
some_future_option = 3
"#,
    );
    assert_eq!(config.settings, Settings::default());
}
