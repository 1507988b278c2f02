//! Tap qualification and double-tap-drag bookkeeping.

use std::time::Duration;

use crate::frame::Frame;

/// A contact held at least this long is not a tap.
pub const TAP_MAX_MS: u64 = 280;

/// A contact that travelled this far (sensor units) is not a tap.
pub const TAP_MAX_MOVE: f64 = 180.0;

/// Hold between the press and release of a synthesized click.
pub const CLICK_HOLD: Duration = Duration::from_millis(16);

pub fn is_short(down_ms: u64, now_ms: u64) -> bool {
    now_ms.saturating_sub(down_ms) < TAP_MAX_MS
}

/// True if every listed slot was active in `last` and stayed within tap
/// range of where it started.
pub fn stayed_put(last: &Frame, start: &Frame, slots: &[usize]) -> bool {
    slots.iter().all(|&i| {
        let now = last.slot(i);
        now.active && now.distance_to(start.slot(i)) < TAP_MAX_MOVE
    })
}

/// Single-click fallback owed for a first tap unless a second tap lands
/// before `delay` runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredTap {
    pub up_ms: u64,
    pub delay: Duration,
}

/// Pending-tap flags shared by the lift handler, new gestures, and the
/// deferred fallback.
#[derive(Debug, Clone, Default)]
pub struct TapTimer {
    pending_first_tap: bool,
    first_tap_up_ms: u64,
    pending_two_finger_tap: bool,
    scheduled: Option<DeferredTap>,
}

impl TapTimer {
    pub fn has_pending_first_tap(&self) -> bool {
        self.pending_first_tap
    }

    pub fn first_tap_up_ms(&self) -> u64 {
        self.first_tap_up_ms
    }

    /// Record a qualifying first tap and queue its fallback click.
    pub fn arm_first_tap(&mut self, now_ms: u64, interval_ms: u32) {
        self.pending_first_tap = true;
        self.first_tap_up_ms = now_ms;
        self.scheduled = Some(DeferredTap {
            up_ms: now_ms,
            delay: Duration::from_millis(u64::from(interval_ms)),
        });
    }

    /// Clear a pending first tap whose window has already run out and
    /// report whether its click is still owed. This covers a landing that
    /// wins the race against the fallback timer.
    pub fn take_expired_first_tap(&mut self, now_ms: u64, interval_ms: u32) -> bool {
        let expired = self.pending_first_tap
            && now_ms.saturating_sub(self.first_tap_up_ms) >= u64::from(interval_ms);
        if expired {
            self.pending_first_tap = false;
        }
        expired
    }

    /// A finger landed: consume any pending first tap and report whether the
    /// landing completes a double tap.
    pub fn take_second_tap(&mut self, now_ms: u64, interval_ms: u32) -> bool {
        let second = self.pending_first_tap
            && now_ms.saturating_sub(self.first_tap_up_ms) < u64::from(interval_ms);
        self.pending_first_tap = false;
        second
    }

    pub fn clear_first_tap(&mut self) {
        self.pending_first_tap = false;
    }

    /// Check-and-clear for a fired fallback. Succeeds only if the tap it was
    /// scheduled for is still the pending one.
    pub fn claim_deferred(&mut self, tap: DeferredTap) -> bool {
        if self.pending_first_tap && self.first_tap_up_ms == tap.up_ms {
            self.pending_first_tap = false;
            true
        } else {
            false
        }
    }

    /// Hand the most recently queued fallback to whoever runs timers.
    pub fn take_scheduled(&mut self) -> Option<DeferredTap> {
        self.scheduled.take()
    }

    pub fn has_pending_two_finger_tap(&self) -> bool {
        self.pending_two_finger_tap
    }

    pub fn arm_two_finger_tap(&mut self) {
        self.pending_two_finger_tap = true;
    }

    pub fn take_two_finger_tap(&mut self) -> bool {
        std::mem::take(&mut self.pending_two_finger_tap)
    }

    pub fn clear_two_finger_tap(&mut self) {
        self.pending_two_finger_tap = false;
    }
}
