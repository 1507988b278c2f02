//! Touch event classification and frame assembly - no I/O, no hardware,
//! fully testable.
//!
//! Raw kernel events are classified into [`TouchEvent`]s, which a
//! [`FrameAssembler`] folds into a live slot table. Every `SYN_REPORT` closes
//! a frame: key events buffered since the previous report are released first,
//! then a snapshot of the slot table.

use crate::frame::{Frame, MAX_SLOTS, SlotSnapshot};

/// Key events kept per frame; extras are dropped.
pub const MAX_KEYS_PER_FRAME: usize = 16;

// -- TouchEvent -----------------------------------------------

/// Intermediate representation of a relevant input event,
/// decoupled from `evdev` types for testability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchEvent {
    Slot(i32),
    TrackingId(i32),
    FingerUp,
    PositionX(i32),
    PositionY(i32),
    Key { code: u16, value: i32 },
    SynReport,
    SynDropped,
}

/// What one completed frame hands to the engine, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Key { code: u16, value: i32 },
    Frame(Frame),
}

// -- Frame assembly -------------------------------------------

/// Live multi-touch slot table following the kernel's type-B protocol.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    slots: Frame,
    current_slot: usize,
    keys: Vec<(u16, i32)>,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self {
            slots: Frame::EMPTY,
            current_slot: 0,
            keys: Vec::with_capacity(MAX_KEYS_PER_FRAME),
        }
    }
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current slot table, as of the last event.
    pub fn slots(&self) -> &Frame {
        &self.slots
    }

    /// Forget every contact, e.g. after the kernel dropped events.
    pub fn reset(&mut self) {
        self.slots = Frame::EMPTY;
        self.keys.clear();
    }

    /// Apply one event, appending anything it completes to `out`.
    pub fn push(&mut self, event: TouchEvent, out: &mut Vec<Dispatch>) {
        match event {
            TouchEvent::Slot(slot) => {
                self.current_slot = slot.clamp(0, MAX_SLOTS as i32 - 1) as usize;
            }
            TouchEvent::TrackingId(id) => {
                let slot = &mut self.slots.slots[self.current_slot];
                slot.tracking_id = id;
                slot.active = true;
            }
            TouchEvent::FingerUp => {
                let slot = &mut self.slots.slots[self.current_slot];
                slot.tracking_id = SlotSnapshot::EMPTY.tracking_id;
                slot.active = false;
            }
            TouchEvent::PositionX(x) => self.slots.slots[self.current_slot].x = x.max(0),
            TouchEvent::PositionY(y) => self.slots.slots[self.current_slot].y = y.max(0),
            TouchEvent::Key { code, value } => {
                if self.keys.len() < MAX_KEYS_PER_FRAME {
                    self.keys.push((code, value));
                }
            }
            TouchEvent::SynReport => {
                out.extend(
                    self.keys
                        .drain(..)
                        .map(|(code, value)| Dispatch::Key { code, value }),
                );
                out.push(Dispatch::Frame(self.slots));
            }
            TouchEvent::SynDropped => {
                log::warn!("SYN_DROPPED - slot state reset");
                self.reset();
            }
        }
    }
}

// -- Core processing ------------------------------------------

/// Feed a sequence of [`TouchEvent`]s into an assembler and collect what
/// they complete. Pure, deterministic, and testable without hardware.
pub fn process_touch_events(
    assembler: &mut FrameAssembler,
    events: &[TouchEvent],
) -> Vec<Dispatch> {
    let mut out = Vec::new();
    for event in events {
        assembler.push(*event, &mut out);
    }
    out
}

// -- Helpers --------------------------------------------------

/// Parse a USB vendor:product ID string into `(vendor, product)`.
///
/// Accepts formats like `"06cb:ce7e"` or `"USB:06cb:ce7e"` (case-insensitive).
/// Returns `None` if the format is invalid or the hex values cannot be parsed.
pub fn parse_usb_id(raw: &str) -> Option<(u16, u16)> {
    let cleaned = raw.to_lowercase().replace("usb:", "");
    let (vendor_str, product_str) = cleaned.split_once(':')?;
    let vendor = u16::from_str_radix(vendor_str, 16).ok()?;
    let product = u16::from_str_radix(product_str, 16).ok()?;
    Some((vendor, product))
}

/// Classify a single `evdev::InputEvent` into one of the categories the
/// assembler cares about. Returns `None` for irrelevant events.
pub fn classify_event(event: &evdev::InputEvent) -> Option<TouchEvent> {
    use evdev::{AbsoluteAxisType, InputEventKind, Synchronization};

    match event.kind() {
        InputEventKind::AbsAxis(axis) => match axis {
            AbsoluteAxisType::ABS_MT_SLOT => Some(TouchEvent::Slot(event.value())),
            AbsoluteAxisType::ABS_MT_POSITION_X => Some(TouchEvent::PositionX(event.value())),
            AbsoluteAxisType::ABS_MT_POSITION_Y => Some(TouchEvent::PositionY(event.value())),
            AbsoluteAxisType::ABS_MT_TRACKING_ID => {
                if event.value() == -1 {
                    Some(TouchEvent::FingerUp)
                } else {
                    Some(TouchEvent::TrackingId(event.value()))
                }
            }
            _ => None,
        },
        InputEventKind::Key(key) => Some(TouchEvent::Key {
            code: key.code(),
            value: event.value(),
        }),
        InputEventKind::Synchronization(Synchronization::SYN_REPORT) => Some(TouchEvent::SynReport),
        InputEventKind::Synchronization(Synchronization::SYN_DROPPED) => {
            Some(TouchEvent::SynDropped)
        }
        _ => None,
    }
}
