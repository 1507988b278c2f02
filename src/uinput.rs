//! Virtual pointer and touchscreen devices backing [`OutputSink`].

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    PropType, RelativeAxisType, UinputAbsSetup,
};
use log::{info, warn};

use crate::config::PadgestrError;
use crate::motion::NotchCarry;
use crate::output::{Button, OutputSink, TouchContact};

pub const POINTER_NAME: &str = "padgestr virtual pointer";
pub const TOUCH_NAME: &str = "padgestr virtual touch";

/// Synthetic contacts the touchscreen exposes.
const TOUCH_SLOTS: i32 = 3;

const VENDOR: u16 = 0x1234;
const POINTER_PRODUCT: u16 = 0x5678;
const TOUCH_PRODUCT: u16 = 0x5679;

fn rel(axis: RelativeAxisType, value: i32) -> InputEvent {
    InputEvent::new(EventType::RELATIVE, axis.0, value)
}

fn abs(axis: AbsoluteAxisType, value: i32) -> InputEvent {
    InputEvent::new(EventType::ABSOLUTE, axis.0, value)
}

fn abs_range(max: i32) -> AbsInfo {
    AbsInfo::new(0, 0, max, 0, 0, 0)
}

/// Relative pointer with two buttons and hi-res wheels.
pub struct VirtualPointer {
    device: VirtualDevice,
    notches_v: NotchCarry,
    notches_h: NotchCarry,
}

impl VirtualPointer {
    pub fn create() -> Result<Self, PadgestrError> {
        let id = InputId::new(BusType::BUS_VIRTUAL, VENDOR, POINTER_PRODUCT, 1);
        let build = || {
            VirtualDeviceBuilder::new()?
                .name(POINTER_NAME)
                .input_id(id)
                .with_keys(&AttributeSet::from_iter([
                    Key::BTN_LEFT,
                    Key::BTN_RIGHT,
                    Key::BTN_MIDDLE,
                ]))?
                .with_relative_axes(&AttributeSet::from_iter([
                    RelativeAxisType::REL_X,
                    RelativeAxisType::REL_Y,
                    RelativeAxisType::REL_WHEEL,
                    RelativeAxisType::REL_HWHEEL,
                    RelativeAxisType::REL_WHEEL_HI_RES,
                    RelativeAxisType::REL_HWHEEL_HI_RES,
                ]))?
                .build()
        };
        let device = build().map_err(|source| PadgestrError::UinputError {
            kind: "pointer",
            source,
        })?;
        info!("Created {POINTER_NAME}");
        Ok(Self {
            device,
            notches_v: NotchCarry::default(),
            notches_h: NotchCarry::default(),
        })
    }

    fn emit(&mut self, events: &[InputEvent]) {
        if let Err(e) = self.device.emit(events) {
            warn!("Failed to write to {POINTER_NAME}: {e}");
        }
    }
}

/// Direct-touch device with three contact slots, sized to the output
/// orientation of the display.
pub struct VirtualTouchscreen {
    device: VirtualDevice,
}

impl VirtualTouchscreen {
    pub fn create(width: i32, height: i32) -> Result<Self, PadgestrError> {
        let id = InputId::new(BusType::BUS_VIRTUAL, VENDOR, TOUCH_PRODUCT, 1);
        let build = || {
            VirtualDeviceBuilder::new()?
                .name(TOUCH_NAME)
                .input_id(id)
                .with_properties(&AttributeSet::from_iter([PropType::DIRECT]))?
                .with_absolute_axis(&UinputAbsSetup::new(
                    AbsoluteAxisType::ABS_MT_SLOT,
                    abs_range(TOUCH_SLOTS - 1),
                ))?
                .with_absolute_axis(&UinputAbsSetup::new(
                    AbsoluteAxisType::ABS_MT_TRACKING_ID,
                    abs_range(65535),
                ))?
                .with_absolute_axis(&UinputAbsSetup::new(
                    AbsoluteAxisType::ABS_MT_POSITION_X,
                    abs_range(width - 1),
                ))?
                .with_absolute_axis(&UinputAbsSetup::new(
                    AbsoluteAxisType::ABS_MT_POSITION_Y,
                    abs_range(height - 1),
                ))?
                .with_absolute_axis(&UinputAbsSetup::new(
                    AbsoluteAxisType::ABS_X,
                    abs_range(width - 1),
                ))?
                .with_absolute_axis(&UinputAbsSetup::new(
                    AbsoluteAxisType::ABS_Y,
                    abs_range(height - 1),
                ))?
                .build()
        };
        let device = build().map_err(|source| PadgestrError::UinputError {
            kind: "touch",
            source,
        })?;
        info!("Created {TOUCH_NAME} ({width}x{height})");
        Ok(Self { device })
    }

    fn emit(&mut self, events: &[InputEvent]) {
        if let Err(e) = self.device.emit(events) {
            warn!("Failed to write to {TOUCH_NAME}: {e}");
        }
    }
}

/// The pointer/touchscreen pair a session writes to.
pub struct UinputSink {
    pointer: VirtualPointer,
    touch: VirtualTouchscreen,
}

impl UinputSink {
    pub fn new(pointer: VirtualPointer, touch: VirtualTouchscreen) -> Self {
        Self { pointer, touch }
    }
}

impl OutputSink for UinputSink {
    fn relative_move(&mut self, dx: i32, dy: i32) {
        let mut events = Vec::with_capacity(2);
        if dx != 0 {
            events.push(rel(RelativeAxisType::REL_X, dx));
        }
        if dy != 0 {
            events.push(rel(RelativeAxisType::REL_Y, dy));
        }
        self.pointer.emit(&events);
    }

    fn button(&mut self, button: Button, down: bool) {
        let event = InputEvent::new(EventType::KEY, button.code(), i32::from(down));
        self.pointer.emit(&[event]);
    }

    fn wheel(&mut self, vertical: i32, horizontal: i32) {
        // Legacy notches ride along for clients that ignore hi-res axes.
        let mut events = Vec::with_capacity(4);
        if vertical != 0 {
            events.push(rel(RelativeAxisType::REL_WHEEL_HI_RES, vertical));
            let notches = self.pointer.notches_v.add(vertical);
            if notches != 0 {
                events.push(rel(RelativeAxisType::REL_WHEEL, notches));
            }
        }
        if horizontal != 0 {
            events.push(rel(RelativeAxisType::REL_HWHEEL_HI_RES, horizontal));
            let notches = self.pointer.notches_h.add(horizontal);
            if notches != 0 {
                events.push(rel(RelativeAxisType::REL_HWHEEL, notches));
            }
        }
        self.pointer.emit(&events);
    }

    fn inject_touches(&mut self, contacts: &[TouchContact]) {
        let mut events = Vec::with_capacity(contacts.len() * 4);
        for contact in contacts {
            events.extend([
                abs(AbsoluteAxisType::ABS_MT_SLOT, contact.slot as i32),
                abs(AbsoluteAxisType::ABS_MT_TRACKING_ID, contact.tracking_id),
                abs(AbsoluteAxisType::ABS_MT_POSITION_X, contact.x),
                abs(AbsoluteAxisType::ABS_MT_POSITION_Y, contact.y),
            ]);
        }
        self.touch.emit(&events);
    }

    fn release_touches(&mut self, count: usize) {
        let mut events = Vec::with_capacity(count * 2);
        for slot in 0..count {
            events.push(abs(AbsoluteAxisType::ABS_MT_SLOT, slot as i32));
            events.push(abs(AbsoluteAxisType::ABS_MT_TRACKING_ID, -1));
        }
        self.touch.emit(&events);
    }
}
