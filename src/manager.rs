//! Touchpad discovery, event loop, and reconnection (I/O layer).
//!
//! Pure event-processing logic lives in [`crate::event`].
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use evdev::{AbsoluteAxisType, Device, Key};
use log::{debug, error, info, warn};

use crate::config::{AppConfig, DeviceSelector, PadgestrError, Settings, parse_config_file};
use crate::event::{FrameAssembler, classify_event, parse_usb_id};
use crate::recognizer::GestureEngine;
use crate::session::Session;
use crate::uinput::{POINTER_NAME, TOUCH_NAME, UinputSink, VirtualPointer, VirtualTouchscreen};

// -- TouchpadManager (top-level orchestrator) -----------------

/// Owns the configuration and drives one touchpad session.
pub struct TouchpadManager {
    config: AppConfig,
    running: Arc<AtomicBool>,
}

impl TouchpadManager {
    pub fn new(config_path: impl AsRef<Path>) -> Result<Self, PadgestrError> {
        Ok(Self {
            config: parse_config_file(config_path.as_ref())?,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Open the touchpad and virtual devices, then process events until
    /// stopped.
    pub fn start(&mut self) -> Result<(), PadgestrError> {
        let (path, mut device) = find_device(&self.config.device)?;
        info!(
            "Using touchpad {} ({})",
            device.name().unwrap_or("unknown"),
            path
        );

        let mut settings = self.config.settings.clone();
        if self.config.device.auto_detect_range {
            apply_pad_range(&device, &mut settings);
        }

        if self.config.device.exclusive_grab {
            match device.grab() {
                Ok(()) => info!("Grabbed {path} exclusively"),
                Err(e) => warn!("Cannot grab {path}, continuing without exclusive access: {e}"),
            }
        }

        let (width, height) = self.config.display.output_size(settings.swap_axes);
        let sink = UinputSink::new(
            VirtualPointer::create()?,
            VirtualTouchscreen::create(width, height)?,
        );
        // Give the compositor a moment to pick up the new devices.
        thread::sleep(Duration::from_millis(100));

        let mut session = Session::new(GestureEngine::new(sink, self.config.display), settings);

        self.running.store(true, Ordering::Relaxed);
        info!("Starting touchpad session");
        let selector = &self.config.device;
        event_loop(&mut device, &mut session, selector, &self.running);

        session.shutdown();
        if self.config.device.exclusive_grab {
            let _ = device.ungrab();
        }
        info!("Touchpad session stopped");
        Ok(())
    }

    /// Get a reference to the running flag for signal handling.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Get the log level from the parsed configuration.
    pub fn config_log_level(&self) -> &str {
        &self.config.log_level
    }

    /// Get the optional log file path from the parsed configuration.
    pub fn config_log_file(&self) -> Option<&str> {
        self.config.log_file.as_deref()
    }
}

// -- Device I/O -----------------------------------------------

/// Check if a device looks like a multi-touch touchpad we did not create.
fn is_touchpad(device: &Device) -> bool {
    if matches!(device.name(), Some(POINTER_NAME | TOUCH_NAME)) {
        return false;
    }
    let Some(abs_axes) = device.supported_absolute_axes() else {
        return false;
    };
    let finger_tool = device
        .supported_keys()
        .is_some_and(|keys| keys.contains(Key::BTN_TOOL_FINGER));
    abs_axes.contains(AbsoluteAxisType::ABS_MT_POSITION_X)
        && abs_axes.contains(AbsoluteAxisType::ABS_MT_POSITION_Y)
        && finger_tool
}

/// Find the touchpad: explicit path first, then USB ID, then the first
/// touchpad found.
fn find_device(selector: &DeviceSelector) -> Result<(String, Device), PadgestrError> {
    if let Some(path) = &selector.path {
        let device = Device::open(path).map_err(|source| PadgestrError::DeviceOpenError {
            path: path.clone(),
            source,
        })?;
        return Ok((path.display().to_string(), device));
    }

    let wanted = match selector.usb_id.as_deref() {
        Some(raw) => Some(parse_usb_id(raw).ok_or_else(|| {
            PadgestrError::DeviceNotFound(format!(
                "invalid USB ID format '{raw}' (expected vendor:product)"
            ))
        })?),
        None => None,
    };

    for (path, device) in evdev::enumerate() {
        if !is_touchpad(&device) {
            continue;
        }
        let id = device.input_id();
        let found = (id.vendor(), id.product());
        if wanted.is_none_or(|usb_id| usb_id == found) {
            debug!(
                "Matched {} ({:04x}:{:04x})",
                path.display(),
                found.0,
                found.1
            );
            return Ok((path.display().to_string(), device));
        }
    }

    Err(PadgestrError::DeviceNotFound(match &selector.usb_id {
        Some(raw) => format!("no touchpad with USB ID {raw}"),
        None => "no multi-touch touchpad detected".to_string(),
    }))
}

/// Take the pad's coordinate range from the device itself.
fn apply_pad_range(device: &Device, settings: &mut Settings) {
    let abs = match device.get_abs_state() {
        Ok(state) => state,
        Err(e) => {
            warn!("Cannot read axis ranges, keeping configured pad range: {e}");
            return;
        }
    };
    let x = &abs[AbsoluteAxisType::ABS_MT_POSITION_X.0 as usize];
    let y = &abs[AbsoluteAxisType::ABS_MT_POSITION_Y.0 as usize];
    if !settings.set_pad_range(x.maximum, y.maximum) {
        warn!("Device reports an empty axis range, keeping configured pad range");
    }
    debug!(
        "  X range: {}..{}, Y range: {}..{}",
        x.minimum, x.maximum, y.minimum, y.maximum
    );
}

/// Blocking event loop - reads from the device and feeds the session.
fn event_loop(
    device: &mut Device,
    session: &mut Session<UinputSink>,
    selector: &DeviceSelector,
    running: &Arc<AtomicBool>,
) {
    let mut assembler = FrameAssembler::new();
    let mut ready = Vec::new();

    while running.load(Ordering::Relaxed) {
        match device.fetch_events().map(|iter| iter.collect::<Vec<_>>()) {
            Ok(events) => {
                for event in &events {
                    if !running.load(Ordering::Relaxed) {
                        break;
                    }
                    if let Some(te) = classify_event(event) {
                        assembler.push(te, &mut ready);
                        for dispatch in ready.drain(..) {
                            session.handle(&dispatch);
                        }
                    }
                }
            }
            Err(e) => {
                if running.load(Ordering::Relaxed) {
                    warn!("Touchpad disconnected: {e}");
                    // Whatever was down is gone with the device.
                    session.shutdown();
                    attempt_reconnect(device, session, selector, running);
                }
                break;
            }
        }
    }
}

/// Attempt to reconnect to the touchpad after it disconnects.
fn attempt_reconnect(
    device: &mut Device,
    session: &mut Session<UinputSink>,
    selector: &DeviceSelector,
    running: &Arc<AtomicBool>,
) {
    const MAX_RETRIES: usize = 10;
    const RETRY_INTERVAL: Duration = Duration::from_secs(5);

    for attempt in 1..=MAX_RETRIES {
        if !running.load(Ordering::Relaxed) {
            return;
        }
        info!("Reconnect attempt {attempt}/{MAX_RETRIES}...");
        thread::sleep(RETRY_INTERVAL);

        if let Ok((path, mut new_device)) = find_device(selector) {
            info!("Reconnected to {path}");
            if selector.auto_detect_range {
                // The new device may not be the same model.
                let mut settings = session.settings().clone();
                apply_pad_range(&new_device, &mut settings);
                session.set_settings(settings);
            }
            if selector.exclusive_grab {
                if let Err(e) = new_device.grab() {
                    warn!("Cannot grab {path}: {e}");
                }
            }
            *device = new_device;
            event_loop(device, session, selector, running);
            return;
        }
    }
    error!("Failed to reconnect after {MAX_RETRIES} attempts");
}

/// List all multi-touch touchpads.
pub fn list_touch_devices() -> ExitCode {
    println!("\n=== padgestr: Available Touchpads ===\n");
    let mut touch_count = 0;

    for (path, device) in evdev::enumerate() {
        if !is_touchpad(&device) {
            continue;
        }

        touch_count += 1;
        let range = device
            .get_abs_state()
            .map(|abs| {
                let x = abs[AbsoluteAxisType::ABS_MT_POSITION_X.0 as usize].maximum;
                let y = abs[AbsoluteAxisType::ABS_MT_POSITION_Y.0 as usize].maximum;
                format!("{x} x {y}")
            })
            .unwrap_or_else(|_| "unknown".to_string());
        println!(
            "Device {touch_count}:\n\
             \x20 Path:      {}\n\
             \x20 Name:      {}\n\
             \x20 USB ID:    {:04x}:{:04x}\n\
             \x20 Range:     {range}\n",
            path.display(),
            device.name().unwrap_or("unknown"),
            device.input_id().vendor(),
            device.input_id().product(),
        );
    }

    if touch_count == 0 {
        println!(
            "No touchpads found.\n\n\
             Troubleshooting:\n\
             \x20 - Run 'libinput list-devices' to see all devices\n\
             \x20 - Run as root if devices are not visible"
        );
        return ExitCode::FAILURE;
    }

    println!(
        "Found {touch_count} touchpad(s).\n\n\
         Pin one in your padgestr.toml:\n\
         \x20 [device]\n\
         \x20 usb_id = \"<USB ID>\""
    );
    ExitCode::SUCCESS
}
