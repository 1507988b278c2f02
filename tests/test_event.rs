//! Integration tests for the event-processing logic in `event`.
//!
//! Tests use `TouchEvent` directly (no hardware) and also verify
//! `classify_event` with synthetic `evdev::InputEvent`s.
use evdev::{AbsoluteAxisType, EventType, InputEvent, Synchronization};
use padgestr::event::{
    Dispatch, FrameAssembler, MAX_KEYS_PER_FRAME, TouchEvent, classify_event, parse_usb_id,
    process_touch_events,
};
use padgestr::frame::Frame;

// -- Helpers --------------------------------------------------

/// Events that put a finger down in `slot` at `(x, y)`.
fn finger_down(slot: i32, id: i32, x: i32, y: i32) -> Vec<TouchEvent> {
    vec![
        TouchEvent::Slot(slot),
        TouchEvent::TrackingId(id),
        TouchEvent::PositionX(x),
        TouchEvent::PositionY(y),
    ]
}

/// Shorthand: feed TouchEvents into a fresh assembler.
fn feed(events: &[TouchEvent]) -> Vec<Dispatch> {
    let mut assembler = FrameAssembler::new();
    process_touch_events(&mut assembler, events)
}

fn frames(out: &[Dispatch]) -> Vec<Frame> {
    out.iter()
        .filter_map(|d| match d {
            Dispatch::Frame(f) => Some(*f),
            Dispatch::Key { .. } => None,
        })
        .collect()
}

// -- Frame assembly -------------------------------------------

#[test]
fn test_single_contact_frame() {
    let mut events = finger_down(0, 42, 300, 400);
    events.push(TouchEvent::SynReport);

    let out = feed(&events);
    assert_eq!(out.len(), 1);
    let frame = frames(&out)[0];
    assert_eq!(frame.active_count(), 1);
    assert_eq!(frame.slot(0).tracking_id, 42);
    assert_eq!((frame.slot(0).x, frame.slot(0).y), (300, 400));
}

#[test]
fn test_no_frame_without_syn_report() {
    assert!(feed(&finger_down(0, 1, 10, 10)).is_empty());
}

#[test]
fn test_two_contacts_and_lift() {
    let mut events = finger_down(0, 1, 100, 100);
    events.extend(finger_down(1, 2, 600, 100));
    events.push(TouchEvent::SynReport);
    events.extend([
        TouchEvent::Slot(0),
        TouchEvent::FingerUp,
        TouchEvent::SynReport,
    ]);

    let frames = frames(&feed(&events));
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].first_active::<2>(), Some([0, 1]));
    assert_eq!(frames[1].active_count(), 1);
    assert_eq!(frames[1].first_active::<1>(), Some([1]));

    // Lifted slot keeps its last position.
    let lifted = frames[1].slot(0);
    assert!(!lifted.active);
    assert_eq!(lifted.tracking_id, -1);
    assert_eq!(lifted.x, 100);
}

#[test]
fn test_position_update_persists_across_frames() {
    let mut events = finger_down(0, 1, 100, 100);
    events.push(TouchEvent::SynReport);
    events.extend([TouchEvent::PositionX(150), TouchEvent::SynReport]);
    // No slot event: updates land in the last selected slot.
    events.extend([TouchEvent::PositionY(175), TouchEvent::SynReport]);

    let frames = frames(&feed(&events));
    assert_eq!((frames[1].slot(0).x, frames[1].slot(0).y), (150, 100));
    assert_eq!((frames[2].slot(0).x, frames[2].slot(0).y), (150, 175));
}

#[test]
fn test_slot_index_clamped() {
    let mut events = finger_down(15, 7, 10, 20);
    events.push(TouchEvent::SynReport);
    let frame = frames(&feed(&events))[0];
    assert!(frame.slot(9).active);
    assert_eq!(frame.slot(9).tracking_id, 7);
}

#[test]
fn test_negative_position_clamped() {
    let mut events = finger_down(0, 1, -20, -1);
    events.push(TouchEvent::SynReport);
    let frame = frames(&feed(&events))[0];
    assert_eq!((frame.slot(0).x, frame.slot(0).y), (0, 0));
}

#[test]
fn test_keys_dispatched_before_their_frame() {
    let mut events = vec![TouchEvent::Key {
        code: 0x110,
        value: 1,
    }];
    events.extend(finger_down(0, 1, 10, 10));
    events.push(TouchEvent::Key {
        code: 0x14a,
        value: 1,
    });
    events.push(TouchEvent::SynReport);

    let out = feed(&events);
    assert_eq!(out.len(), 3);
    assert_eq!(
        out[0],
        Dispatch::Key {
            code: 0x110,
            value: 1
        }
    );
    assert_eq!(
        out[1],
        Dispatch::Key {
            code: 0x14a,
            value: 1
        }
    );
    assert!(matches!(out[2], Dispatch::Frame(_)));
}

#[test]
fn test_keys_per_frame_bounded() {
    let mut events: Vec<TouchEvent> = (0..MAX_KEYS_PER_FRAME + 4)
        .map(|i| TouchEvent::Key {
            code: 0x110,
            value: (i % 2) as i32,
        })
        .collect();
    events.push(TouchEvent::SynReport);

    let out = feed(&events);
    assert_eq!(out.len(), MAX_KEYS_PER_FRAME + 1);
}

#[test]
fn test_keys_not_repeated_in_next_frame() {
    let events = [
        TouchEvent::Key {
            code: 0x110,
            value: 1,
        },
        TouchEvent::SynReport,
        TouchEvent::SynReport,
    ];
    let out = feed(&events);
    assert_eq!(out.len(), 3);
    assert!(matches!(out[2], Dispatch::Frame(_)));
}

#[test]
fn test_syn_dropped_resets_slots() {
    let mut assembler = FrameAssembler::new();
    let mut events = finger_down(0, 1, 10, 10);
    events.extend(finger_down(1, 2, 20, 20));
    events.push(TouchEvent::SynReport);
    process_touch_events(&mut assembler, &events);
    assert_eq!(assembler.slots().active_count(), 2);

    let out = process_touch_events(
        &mut assembler,
        &[TouchEvent::SynDropped, TouchEvent::SynReport],
    );
    assert_eq!(frames(&out)[0].active_count(), 0);
}

#[test]
fn test_reset_clears_buffered_keys() {
    let mut assembler = FrameAssembler::new();
    process_touch_events(
        &mut assembler,
        &[TouchEvent::Key {
            code: 0x110,
            value: 1,
        }],
    );
    assembler.reset();
    let out = process_touch_events(&mut assembler, &[TouchEvent::SynReport]);
    assert_eq!(out.len(), 1);
}

// -- classify_event -------------------------------------------

#[test]
fn test_classify_slot() {
    let ev = InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_MT_SLOT.0, 3);
    assert_eq!(classify_event(&ev), Some(TouchEvent::Slot(3)));
}

#[test]
fn test_classify_tracking_id() {
    let ev = InputEvent::new(
        EventType::ABSOLUTE,
        AbsoluteAxisType::ABS_MT_TRACKING_ID.0,
        5,
    );
    assert_eq!(classify_event(&ev), Some(TouchEvent::TrackingId(5)));
}

#[test]
fn test_classify_finger_up() {
    let ev = InputEvent::new(
        EventType::ABSOLUTE,
        AbsoluteAxisType::ABS_MT_TRACKING_ID.0,
        -1,
    );
    assert_eq!(classify_event(&ev), Some(TouchEvent::FingerUp));
}

#[test]
fn test_classify_position_x() {
    let ev = InputEvent::new(
        EventType::ABSOLUTE,
        AbsoluteAxisType::ABS_MT_POSITION_X.0,
        42,
    );
    assert_eq!(classify_event(&ev), Some(TouchEvent::PositionX(42)));
}

#[test]
fn test_classify_position_y() {
    let ev = InputEvent::new(
        EventType::ABSOLUTE,
        AbsoluteAxisType::ABS_MT_POSITION_Y.0,
        99,
    );
    assert_eq!(classify_event(&ev), Some(TouchEvent::PositionY(99)));
}

#[test]
fn test_classify_key() {
    let ev = InputEvent::new(EventType::KEY, 0x110, 1);
    assert_eq!(
        classify_event(&ev),
        Some(TouchEvent::Key {
            code: 0x110,
            value: 1
        })
    );
}

#[test]
fn test_classify_syn_report() {
    let ev = InputEvent::new(EventType::SYNCHRONIZATION, Synchronization::SYN_REPORT.0, 0);
    assert_eq!(classify_event(&ev), Some(TouchEvent::SynReport));
}

#[test]
fn test_classify_syn_dropped() {
    let ev = InputEvent::new(
        EventType::SYNCHRONIZATION,
        Synchronization::SYN_DROPPED.0,
        0,
    );
    assert_eq!(classify_event(&ev), Some(TouchEvent::SynDropped));
}

#[test]
fn test_classify_irrelevant() {
    // ABS_X (single-touch) is ignored in favour of the MT axes.
    let ev = InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_X.0, 100);
    assert_eq!(classify_event(&ev), None);

    let ev = InputEvent::new(EventType::RELATIVE, 0, 5);
    assert_eq!(classify_event(&ev), None);
}

// -- parse_usb_id ---------------------------------------------

#[test]
fn test_parse_usb_id_valid() {
    assert_eq!(parse_usb_id("06cb:ce7e"), Some((0x06cb, 0xce7e)));
}

#[test]
fn test_parse_usb_id_with_prefix() {
    assert_eq!(parse_usb_id("USB:06CB:CE7E"), Some((0x06cb, 0xce7e)));
}

#[test]
fn test_parse_usb_id_invalid() {
    assert_eq!(parse_usb_id("nonsense"), None);
    assert_eq!(parse_usb_id("zzzz:0001"), None);
    assert_eq!(parse_usb_id(""), None);
}
