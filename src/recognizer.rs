//! Gesture recognition engine for touchpad frames.
//!
//! [`GestureEngine::on_frame`] is a single transition function over
//! [`GestureState`], dispatched first on how many contacts are down and then
//! on the current state. Every state that owns a pressed button or a
//! synthetic touch releases it on every path out of that state.
use std::mem;
use std::thread;
use std::time::Duration;

use log::{debug, trace};
use strum::{Display, IntoStaticStr};

use crate::config::{DisplayGeometry, Settings};
use crate::frame::Frame;
use crate::motion::{OutputTransform, SubUnitCarry, centroid, scroll_delta};
use crate::output::{Button, OutputSink, TouchContact};
use crate::tap::{self, CLICK_HOLD, DeferredTap, TapTimer};

/// First tracking id handed to synthetic contacts.
const FIRST_TRACKING_ID: i32 = 100;

/// Largest tracking id the virtual touchscreen accepts.
const MAX_TRACKING_ID: i32 = 65535;

/// A two-finger swipe that started in an edge band, driving one synthetic
/// touch inward from the matching display edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeAnchor {
    pub right_edge: bool,
    /// Current injection point in output-device coordinates.
    pub position: (i32, i32),
    pub tracking_id: i32,
}

/// Three contacts moved together as three synthetic touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreeFingerAnchor {
    pub slots: [usize; 3],
    pub start_centroid: (i32, i32),
    /// Contacts use `base_tracking_id..base_tracking_id + 3`.
    pub base_tracking_id: i32,
}

/// Gesture states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum GestureState {
    #[default]
    Idle,
    SingleMoving,
    Drag,
    Scroll,
    EdgeSwipe(EdgeAnchor),
    ThreeFinger(ThreeFingerAnchor),
}

/// Turns touchpad frames into pointer, wheel, and synthetic touch output.
#[derive(Debug)]
pub struct GestureEngine<S> {
    sink: S,
    display: DisplayGeometry,
    click_hold: Duration,

    state: GestureState,
    prev_slots: Frame,
    start_slots: Frame,
    /// Slots of the current two-finger gesture, as captured at its start.
    pair: [usize; 2],
    down_time_ms: u64,

    taps: TapTimer,
    /// Residual finger after a two-finger gesture; it must not move the pointer.
    trailing_after_scroll: bool,

    pointer: SubUnitCarry,
    /// `x` carries horizontal, `y` vertical hi-res wheel units.
    scroll: SubUnitCarry,

    next_tracking_id: i32,
}

impl<S: OutputSink> GestureEngine<S> {
    pub fn new(sink: S, display: DisplayGeometry) -> Self {
        Self {
            sink,
            display,
            click_hold: CLICK_HOLD,
            state: GestureState::Idle,
            prev_slots: Frame::EMPTY,
            start_slots: Frame::EMPTY,
            pair: [0, 1],
            down_time_ms: 0,
            taps: TapTimer::default(),
            trailing_after_scroll: false,
            pointer: SubUnitCarry::default(),
            scroll: SubUnitCarry::default(),
            next_tracking_id: FIRST_TRACKING_ID,
        }
    }

    /// Override the press-to-release hold of synthesized clicks.
    pub fn with_click_hold(mut self, hold: Duration) -> Self {
        self.click_hold = hold;
        self
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn taps(&self) -> &TapTimer {
        &self.taps
    }

    pub fn is_trailing_after_scroll(&self) -> bool {
        self.trailing_after_scroll
    }

    /// The fallback click queued by the last lift, if any. The caller is
    /// expected to run [`Self::fire_deferred_tap`] once its delay elapses.
    pub fn take_scheduled_tap(&mut self) -> Option<DeferredTap> {
        self.taps.take_scheduled()
    }

    /// Feed one sensor frame.
    pub fn on_frame(&mut self, frame: &Frame, now_ms: u64, settings: &Settings) {
        let active = frame.active_count();
        let prev_active = self.prev_slots.active_count();
        let before = self.state;

        match active {
            0 => self.on_no_contacts(prev_active, now_ms, settings),
            1 => self.on_one_contact(frame, prev_active, now_ms, settings),
            2 => self.on_two_contacts(frame, now_ms, settings),
            _ => self.on_three_contacts(frame, now_ms, settings),
        }

        if mem::discriminant(&before) != mem::discriminant(&self.state) {
            debug!("{before} -> {} ({active} contacts)", self.state);
        }
        self.prev_slots = *frame;
    }

    /// Relay the pad's physical click key.
    pub fn on_key_event(&mut self, code: u16, value: i32, settings: &Settings) {
        if settings.physical_click && Button::from_code(code) == Some(Button::Left) {
            self.sink.button(Button::Left, value != 0);
        }
    }

    /// Run a deferred single-tap fallback. Clicks only if the tap it was
    /// queued for is still pending; returns whether it clicked.
    pub fn fire_deferred_tap(&mut self, tap: DeferredTap) -> bool {
        if !self.taps.claim_deferred(tap) {
            trace!("Deferred tap from {} ms superseded", tap.up_ms);
            return false;
        }
        debug!("No second tap within {:?}, clicking", tap.delay);
        self.click(Button::Left);
        true
    }

    /// Release whatever the current gesture holds and return to idle.
    pub fn shutdown(&mut self) {
        match self.state {
            GestureState::Drag => self.sink.button(Button::Left, false),
            GestureState::EdgeSwipe(_) => self.sink.release_touches(1),
            GestureState::ThreeFinger(_) => self.sink.release_touches(3),
            GestureState::Idle | GestureState::SingleMoving | GestureState::Scroll => {}
        }
        self.state = GestureState::Idle;
        self.taps = TapTimer::default();
        self.prev_slots = Frame::EMPTY;
        self.reset_carries();
    }

    // -- 0 contacts -------------------------------------------

    fn on_no_contacts(&mut self, prev_active: usize, now_ms: u64, settings: &Settings) {
        self.handle_lift(prev_active, now_ms, settings);
        self.state = GestureState::Idle;
        self.reset_carries();
    }

    /// Decide what the gesture that just ended was worth.
    fn handle_lift(&mut self, prev_active: usize, now_ms: u64, settings: &Settings) {
        // One finger of a two-finger tap already lifted.
        if self.taps.take_two_finger_tap() {
            self.click(Button::Right);
            return;
        }

        let short = tap::is_short(self.down_time_ms, now_ms);
        match self.state {
            GestureState::Drag => self.sink.button(Button::Left, false),
            GestureState::SingleMoving => {
                if self.trailing_after_scroll
                    || !settings.single_finger_tap
                    || prev_active != 1
                    || !short
                {
                    return;
                }
                let Some(slot) = self.prev_slots.first_active::<1>() else {
                    return;
                };
                if !tap::stayed_put(&self.prev_slots, &self.start_slots, &slot) {
                    return;
                }
                if !settings.double_tap_drag {
                    self.click(Button::Left);
                } else if !self.taps.has_pending_first_tap() {
                    self.taps
                        .arm_first_tap(now_ms, settings.double_tap_interval_ms);
                    trace!("First tap at {now_ms} ms, waiting for a second");
                }
            }
            GestureState::Scroll => {
                if settings.two_finger_tap
                    && prev_active == 2
                    && short
                    && tap::stayed_put(&self.prev_slots, &self.start_slots, &self.pair)
                {
                    self.click(Button::Right);
                }
            }
            GestureState::EdgeSwipe(_) => self.sink.release_touches(1),
            GestureState::ThreeFinger(_) => self.sink.release_touches(3),
            GestureState::Idle => {}
        }
    }

    // -- 1 contact --------------------------------------------

    fn on_one_contact(
        &mut self,
        frame: &Frame,
        prev_active: usize,
        now_ms: u64,
        settings: &Settings,
    ) {
        let Some([slot]) = frame.first_active::<1>() else {
            return;
        };
        match self.state {
            GestureState::Idle if prev_active == 0 => {
                self.begin_single(frame, slot, now_ms, settings)
            }
            GestureState::Scroll => self.scroll_to_trailing(now_ms, settings),
            GestureState::SingleMoving | GestureState::Drag => {
                self.track_pointer(frame, slot, settings)
            }
            GestureState::Idle | GestureState::EdgeSwipe(_) | GestureState::ThreeFinger(_) => {}
        }
    }

    fn begin_single(&mut self, frame: &Frame, slot: usize, now_ms: u64, settings: &Settings) {
        self.down_time_ms = now_ms;
        self.start_slots.slots[slot] = *frame.slot(slot);
        self.trailing_after_scroll = false;
        self.settle_expired_tap(now_ms, settings);

        let second_tap = self
            .taps
            .take_second_tap(now_ms, settings.double_tap_interval_ms);
        if settings.double_tap_drag && second_tap {
            self.sink.button(Button::Left, true);
            self.state = GestureState::Drag;
        } else {
            self.state = GestureState::SingleMoving;
        }
    }

    /// One finger of a two-finger gesture lifted.
    fn scroll_to_trailing(&mut self, now_ms: u64, settings: &Settings) {
        if settings.two_finger_tap
            && tap::is_short(self.down_time_ms, now_ms)
            && tap::stayed_put(&self.prev_slots, &self.start_slots, &self.pair)
        {
            self.taps.arm_two_finger_tap();
        }
        self.trailing_after_scroll = true;
        self.state = GestureState::SingleMoving;
    }

    fn track_pointer(&mut self, frame: &Frame, slot: usize, settings: &Settings) {
        let prev = self.prev_slots.slot(slot);
        if !prev.active || !settings.single_finger_move || self.trailing_after_scroll {
            return;
        }
        let cur = frame.slot(slot);
        let (dx, dy) = (cur.x - prev.x, cur.y - prev.y);
        if dx == 0 && dy == 0 {
            return;
        }
        let gain = settings.cursor_sensitivity;
        if let Some((ix, iy)) = self.pointer.add(dx as f32 * gain, dy as f32 * gain) {
            self.sink.relative_move(ix, iy);
        }
    }

    // -- 2 contacts -------------------------------------------

    fn on_two_contacts(&mut self, frame: &Frame, now_ms: u64, settings: &Settings) {
        let Some(pair) = frame.first_active::<2>() else {
            return;
        };
        match self.state {
            GestureState::Idle | GestureState::SingleMoving | GestureState::Drag => {
                self.begin_two(frame, pair, now_ms, settings)
            }
            GestureState::Scroll => self.scroll(frame, pair, settings),
            GestureState::EdgeSwipe(edge) => self.slide_edge(frame, pair, edge, settings),
            GestureState::ThreeFinger(_) => {}
        }
    }

    fn begin_two(&mut self, frame: &Frame, pair: [usize; 2], now_ms: u64, settings: &Settings) {
        if self.state == GestureState::Drag {
            self.sink.button(Button::Left, false);
        }
        self.settle_expired_tap(now_ms, settings);
        self.taps.clear_first_tap();
        self.taps.clear_two_finger_tap();
        self.trailing_after_scroll = false;
        self.down_time_ms = now_ms;
        for i in pair {
            self.start_slots.slots[i] = *frame.slot(i);
        }
        self.pair = pair;

        let [a, b] = pair.map(|i| frame.slot(i).x);
        let edge_px = (settings.pad_max_x as f32 * settings.edge_threshold) as i32;
        let right_band = settings.pad_max_x - edge_px;
        let both_right = a > right_band && b > right_band;
        let both_left = a < edge_px && b < edge_px;

        if settings.edge_swipe && (both_right || both_left) {
            let transform = OutputTransform::new(self.display, settings);
            let edge = EdgeAnchor {
                right_edge: both_right,
                position: transform.edge_anchor(both_right),
                tracking_id: self.allocate_tracking_ids(1),
            };
            self.inject_edge(&edge);
            self.state = GestureState::EdgeSwipe(edge);
        } else {
            self.state = GestureState::Scroll;
        }
    }

    fn scroll(&mut self, frame: &Frame, [a, b]: [usize; 2], settings: &Settings) {
        let (pa, pb) = (self.prev_slots.slot(a), self.prev_slots.slot(b));
        if !pa.active || !pb.active || !settings.two_finger_scroll {
            return;
        }
        let (ca, cb) = (frame.slot(a), frame.slot(b));
        let avg_dx = ((ca.x - pa.x) + (cb.x - pb.x)) as f32 / 2.0;
        let avg_dy = ((ca.y - pa.y) + (cb.y - pb.y)) as f32 / 2.0;

        let (v, h) = scroll_delta(avg_dx, avg_dy, settings);
        if let Some((hi_h, hi_v)) = self.scroll.add(h, v) {
            self.sink.wheel(hi_v, hi_h);
        }
    }

    fn slide_edge(
        &mut self,
        frame: &Frame,
        [a, b]: [usize; 2],
        mut edge: EdgeAnchor,
        settings: &Settings,
    ) {
        let (pa, pb) = (self.prev_slots.slot(a), self.prev_slots.slot(b));
        if !pa.active || !pb.active || !settings.edge_swipe {
            return;
        }
        let (ca, cb) = (frame.slot(a), frame.slot(b));
        let pad_dx = (ca.x + cb.x) as f32 / 2.0 - (pa.x + pb.x) as f32 / 2.0;

        let transform = OutputTransform::new(self.display, settings);
        edge.position = transform.edge_slide(edge.position, pad_dx);
        self.inject_edge(&edge);
        self.state = GestureState::EdgeSwipe(edge);
    }

    fn inject_edge(&mut self, edge: &EdgeAnchor) {
        let (x, y) = edge.position;
        self.sink.inject_touches(&[TouchContact {
            slot: 0,
            x,
            y,
            tracking_id: edge.tracking_id,
        }]);
    }

    // -- 3+ contacts ------------------------------------------

    fn on_three_contacts(&mut self, frame: &Frame, now_ms: u64, settings: &Settings) {
        let Some(slots) = frame.first_active::<3>() else {
            return;
        };
        match self.state {
            GestureState::Idle
            | GestureState::SingleMoving
            | GestureState::Drag
            | GestureState::Scroll
            | GestureState::EdgeSwipe(_) => self.begin_three(frame, slots, now_ms, settings),
            GestureState::ThreeFinger(three) => self.move_three(frame, three, settings),
        }
    }

    fn begin_three(&mut self, frame: &Frame, slots: [usize; 3], now_ms: u64, settings: &Settings) {
        match self.state {
            GestureState::Drag => self.sink.button(Button::Left, false),
            GestureState::EdgeSwipe(_) => self.sink.release_touches(1),
            _ => {}
        }
        self.settle_expired_tap(now_ms, settings);
        self.taps.clear_first_tap();
        self.taps.clear_two_finger_tap();
        self.down_time_ms = now_ms;

        let three = ThreeFingerAnchor {
            slots,
            start_centroid: centroid(frame, slots),
            base_tracking_id: self.allocate_tracking_ids(3),
        };
        self.state = GestureState::ThreeFinger(three);

        if settings.three_finger_move {
            let transform = OutputTransform::new(self.display, settings);
            self.inject_three(&three, transform.three_finger_home());
        }
    }

    fn move_three(&mut self, frame: &Frame, three: ThreeFingerAnchor, settings: &Settings) {
        if !settings.three_finger_move {
            return;
        }
        let transform = OutputTransform::new(self.display, settings);
        let (cx, cy) = centroid(frame, three.slots);
        let (sx, sy) = three.start_centroid;
        let offset = transform.three_finger_offset(cx - sx, cy - sy, settings.touch_inject_speed);
        self.inject_three(&three, transform.three_finger_points(offset));
    }

    fn inject_three(&mut self, three: &ThreeFingerAnchor, points: [(i32, i32); 3]) {
        let contacts: [TouchContact; 3] = std::array::from_fn(|i| {
            let (x, y) = points[i];
            TouchContact {
                slot: i,
                x,
                y,
                tracking_id: three.base_tracking_id + i as i32,
            }
        });
        self.sink.inject_touches(&contacts);
    }

    // -- Helpers ----------------------------------------------

    /// Click for a first tap whose window ran out before its fallback got
    /// the lock.
    fn settle_expired_tap(&mut self, now_ms: u64, settings: &Settings) {
        if self
            .taps
            .take_expired_first_tap(now_ms, settings.double_tap_interval_ms)
        {
            debug!("Second tap window over, clicking for the first tap");
            self.click(Button::Left);
        }
    }

    /// Reserve `count` consecutive synthetic tracking ids.
    fn allocate_tracking_ids(&mut self, count: i32) -> i32 {
        if self.next_tracking_id + count > MAX_TRACKING_ID {
            self.next_tracking_id = FIRST_TRACKING_ID;
        }
        let id = self.next_tracking_id;
        self.next_tracking_id += count;
        id
    }

    fn click(&mut self, button: Button) {
        self.sink.button(button, true);
        if !self.click_hold.is_zero() {
            thread::sleep(self.click_hold);
        }
        self.sink.button(button, false);
    }

    fn reset_carries(&mut self) {
        self.pointer.reset();
        self.scroll.reset();
        self.trailing_after_scroll = false;
    }
}
