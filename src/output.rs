//! The output side of the engine: commands for a virtual pointer and a
//! virtual touchscreen.

use strum::{Display, IntoStaticStr};

/// Pointer buttons the engine can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Button {
    Left,
    Right,
}

impl Button {
    /// Linux `BTN_LEFT` / `BTN_RIGHT` key code.
    pub const fn code(self) -> u16 {
        match self {
            Button::Left => 0x110,
            Button::Right => 0x111,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x110 => Some(Button::Left),
            0x111 => Some(Button::Right),
            _ => None,
        }
    }
}

/// One synthetic contact on the virtual touchscreen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchContact {
    pub slot: usize,
    pub x: i32,
    pub y: i32,
    pub tracking_id: i32,
}

/// Receiver of synthesized input.
///
/// All operations are fire-and-forget; implementations must apply them in
/// call order.
pub trait OutputSink {
    fn relative_move(&mut self, dx: i32, dy: i32);

    fn button(&mut self, button: Button, down: bool);

    /// Wheel motion in hi-res units (120 per notch).
    fn wheel(&mut self, vertical: i32, horizontal: i32);

    fn inject_touches(&mut self, contacts: &[TouchContact]);

    /// Lift slots `0..count` of the virtual touchscreen.
    fn release_touches(&mut self, count: usize);
}

/// A recorded sink call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move { dx: i32, dy: i32 },
    Button { button: Button, down: bool },
    Wheel { vertical: i32, horizontal: i32 },
    Touch(Vec<TouchContact>),
    Release(usize),
}

/// Sink that records every command, for tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub commands: Vec<Command>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return everything recorded so far.
    pub fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Number of press (`down = true`) edges recorded for `button`.
    pub fn presses(&self, button: Button) -> usize {
        self.count_edges(button, true)
    }

    /// Number of release edges recorded for `button`.
    pub fn releases(&self, button: Button) -> usize {
        self.count_edges(button, false)
    }

    fn count_edges(&self, button: Button, down: bool) -> usize {
        self.commands
            .iter()
            .filter(|c| **c == Command::Button { button, down })
            .count()
    }

    /// Sum of all relative moves.
    pub fn total_motion(&self) -> (i32, i32) {
        self.commands.iter().fold((0, 0), |(x, y), c| match c {
            Command::Move { dx, dy } => (x + dx, y + dy),
            _ => (x, y),
        })
    }

    /// Sum of all wheel output as `(vertical, horizontal)` hi-res units.
    pub fn total_wheel(&self) -> (i32, i32) {
        self.commands.iter().fold((0, 0), |(v, h), c| match c {
            Command::Wheel {
                vertical,
                horizontal,
            } => (v + vertical, h + horizontal),
            _ => (v, h),
        })
    }

    /// The most recent touch injection, if any.
    pub fn last_touch(&self) -> Option<&[TouchContact]> {
        self.commands.iter().rev().find_map(|c| match c {
            Command::Touch(points) => Some(points.as_slice()),
            _ => None,
        })
    }

    pub fn releases_of_touches(&self) -> Vec<usize> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Release(n) => Some(*n),
                _ => None,
            })
            .collect()
    }
}

impl OutputSink for RecordingSink {
    fn relative_move(&mut self, dx: i32, dy: i32) {
        self.commands.push(Command::Move { dx, dy });
    }

    fn button(&mut self, button: Button, down: bool) {
        self.commands.push(Command::Button { button, down });
    }

    fn wheel(&mut self, vertical: i32, horizontal: i32) {
        self.commands.push(Command::Wheel {
            vertical,
            horizontal,
        });
    }

    fn inject_touches(&mut self, contacts: &[TouchContact]) {
        self.commands.push(Command::Touch(contacts.to_vec()));
    }

    fn release_touches(&mut self, count: usize) {
        self.commands.push(Command::Release(count));
    }
}
