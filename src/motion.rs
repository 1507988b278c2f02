//! Sub-unit motion carries and pad-to-output coordinate transforms.

use crate::config::{DisplayGeometry, Settings};
use crate::frame::Frame;

/// Hi-res wheel units per notch.
pub const HI_RES_PER_NOTCH: i32 = 120;

/// Pad-unit to hi-res wheel unit gain, before `scroll_sensitivity`.
pub const SCROLL_GAIN: f32 = 3.0;

/// Horizontal spacing between the three synthetic contacts.
pub const THREE_FINGER_SPREAD: i32 = 100;

/// Fractional remainder carried between frames on two axes.
///
/// Whole units are handed out truncated toward zero, the rest stays behind,
/// so slow motion is never dropped and never counted twice.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubUnitCarry {
    pub x: f32,
    pub y: f32,
}

impl SubUnitCarry {
    /// Add a delta and take out the whole part, if any.
    pub fn add(&mut self, dx: f32, dy: f32) -> Option<(i32, i32)> {
        self.x += dx;
        self.y += dy;
        let ix = self.x.trunc() as i32;
        let iy = self.y.trunc() as i32;
        if ix == 0 && iy == 0 {
            return None;
        }
        self.x -= ix as f32;
        self.y -= iy as f32;
        Some((ix, iy))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Hi-res wheel delta `(vertical, horizontal)` for an average two-finger
/// pad delta.
pub fn scroll_delta(avg_dx: f32, avg_dy: f32, settings: &Settings) -> (f32, f32) {
    let sign = if settings.natural_scroll { 1.0 } else { -1.0 };
    let scale = settings.scroll_sensitivity * SCROLL_GAIN * sign;
    (avg_dy * scale, avg_dx * scale)
}

/// Turns a stream of hi-res wheel units into legacy whole notches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotchCarry {
    acc: i32,
}

impl NotchCarry {
    /// Returns the number of whole notches completed by `hi_res`.
    pub fn add(&mut self, hi_res: i32) -> i32 {
        self.acc += hi_res;
        let notches = self.acc / HI_RES_PER_NOTCH;
        self.acc -= notches * HI_RES_PER_NOTCH;
        notches
    }
}

/// Integer centroid of three tracked slots.
pub fn centroid(frame: &Frame, slots: [usize; 3]) -> (i32, i32) {
    let (sx, sy) = slots.iter().fold((0, 0), |(sx, sy), &i| {
        let s = frame.slot(i);
        (sx + s.x, sy + s.y)
    });
    (sx / 3, sy / 3)
}

/// Maps pad and display coordinates onto the injected touch device.
///
/// The touch device may be mounted rotated relative to the display
/// (`swap_axes`), and either display axis may run backwards.
#[derive(Debug, Clone, Copy)]
pub struct OutputTransform {
    display: DisplayGeometry,
    swap_axes: bool,
    invert_x: bool,
    invert_y: bool,
    pad_max_x: f32,
    pad_max_y: f32,
}

impl OutputTransform {
    pub fn new(display: DisplayGeometry, settings: &Settings) -> Self {
        Self {
            display,
            swap_axes: settings.swap_axes,
            invert_x: settings.invert_x,
            invert_y: settings.invert_y,
            pad_max_x: settings.pad_max_x as f32,
            pad_max_y: settings.pad_max_y as f32,
        }
    }

    /// `(width, height)` of the injected touch device.
    pub fn output_size(&self) -> (i32, i32) {
        self.display.output_size(self.swap_axes)
    }

    pub fn clamp(&self, x: i32, y: i32) -> (i32, i32) {
        let (w, h) = self.output_size();
        (x.clamp(0, (w - 1).max(0)), y.clamp(0, (h - 1).max(0)))
    }

    fn display_to_output(&self, disp_x: i32, disp_y: i32) -> (i32, i32) {
        if self.swap_axes {
            self.clamp(disp_y, disp_x)
        } else {
            self.clamp(disp_x, disp_y)
        }
    }

    /// Starting point of an edge swipe: on the display edge the fingers
    /// started from, vertically centered.
    pub fn edge_anchor(&self, right_edge: bool) -> (i32, i32) {
        let far = self.display.width - 1;
        let disp_x = match (right_edge, self.invert_x) {
            (true, false) | (false, true) => far,
            (true, true) | (false, false) => 0,
        };
        self.display_to_output(disp_x, self.display.height / 2)
    }

    /// Move an edge-swipe anchor along display-X by an average pad-X delta.
    /// The other axis never changes.
    pub fn edge_slide(&self, anchor: (i32, i32), pad_dx: f32) -> (i32, i32) {
        let mut disp_dx = (pad_dx / self.pad_max_x * self.display.width as f32) as i32;
        if self.invert_x {
            disp_dx = -disp_dx;
        }
        let (x, y) = anchor;
        if self.swap_axes {
            self.clamp(x, y + disp_dx)
        } else {
            self.clamp(x + disp_dx, y)
        }
    }

    /// Resting positions of the three synthetic contacts, spread around the
    /// output center.
    pub fn three_finger_home(&self) -> [(i32, i32); 3] {
        self.three_finger_points((0, 0))
    }

    /// Output-space offset for a pad centroid displacement.
    pub fn three_finger_offset(&self, pad_dx: i32, pad_dy: i32, speed: f32) -> (i32, i32) {
        let mut disp_dx =
            (pad_dx as f32 / self.pad_max_x * self.display.width as f32 * speed) as i32;
        let mut disp_dy =
            (pad_dy as f32 / self.pad_max_y * self.display.height as f32 * speed) as i32;
        if self.invert_x {
            disp_dx = -disp_dx;
        }
        if self.invert_y {
            disp_dy = -disp_dy;
        }
        if self.swap_axes {
            (disp_dy, disp_dx)
        } else {
            (disp_dx, disp_dy)
        }
    }

    /// Home positions shifted by an output-space offset, each clamped.
    pub fn three_finger_points(&self, offset: (i32, i32)) -> [(i32, i32); 3] {
        let (w, h) = self.output_size();
        let (ox, oy) = offset;
        let mut points = [(0, 0); 3];
        for (i, point) in points.iter_mut().enumerate() {
            let spread = (i as i32 - 1) * THREE_FINGER_SPREAD;
            *point = self.clamp(w / 2 + spread + ox, h / 2 + oy);
        }
        points
    }
}
