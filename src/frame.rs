//! Per-frame contact snapshots, addressed by hardware slot index.

/// Number of hardware contact slots tracked per frame.
pub const MAX_SLOTS: usize = 10;

/// One hardware slot at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub active: bool,
    pub tracking_id: i32,
    pub x: i32,
    pub y: i32,
}

impl SlotSnapshot {
    pub const EMPTY: SlotSnapshot = SlotSnapshot {
        active: false,
        tracking_id: -1,
        x: 0,
        y: 0,
    };

    pub fn new(tracking_id: i32, x: i32, y: i32) -> Self {
        Self {
            active: true,
            tracking_id,
            x,
            y,
        }
    }

    /// Euclidean distance between two snapshots of the same slot.
    pub fn distance_to(&self, other: &SlotSnapshot) -> f64 {
        f64::from(self.x - other.x).hypot(f64::from(self.y - other.y))
    }
}

impl Default for SlotSnapshot {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Fixed-capacity slot table for one sensor frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    pub slots: [SlotSnapshot; MAX_SLOTS],
}

impl Frame {
    pub const EMPTY: Frame = Frame {
        slots: [SlotSnapshot::EMPTY; MAX_SLOTS],
    };

    /// Build a frame from the parallel arrays delivered by the input side.
    ///
    /// Slots beyond [`MAX_SLOTS`] (or beyond the shortest array) are dropped
    /// and negative coordinates clamp to zero.
    pub fn from_parallel(active: &[bool], tracking_ids: &[i32], xs: &[i32], ys: &[i32]) -> Self {
        let mut frame = Frame::EMPTY;
        let count = active
            .len()
            .min(tracking_ids.len())
            .min(xs.len())
            .min(ys.len())
            .min(MAX_SLOTS);
        for i in 0..count {
            frame.slots[i] = SlotSnapshot {
                active: active[i],
                tracking_id: tracking_ids[i],
                x: xs[i].max(0),
                y: ys[i].max(0),
            };
        }
        frame
    }

    /// Convenience constructor: `(slot, x, y)` for each active contact.
    /// The slot index doubles as tracking id.
    pub fn with_contacts(contacts: &[(usize, i32, i32)]) -> Self {
        let mut frame = Frame::EMPTY;
        for &(slot, x, y) in contacts {
            if slot < MAX_SLOTS {
                frame.slots[slot] = SlotSnapshot::new(slot as i32, x, y);
            }
        }
        frame
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    /// Slot indices of active contacts, lowest first.
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, _)| i)
    }

    /// The first `N` active slot indices, or `None` if fewer are active.
    pub fn first_active<const N: usize>(&self) -> Option<[usize; N]> {
        let mut out = [0; N];
        let mut it = self.active_indices();
        for slot in &mut out {
            *slot = it.next()?;
        }
        Some(out)
    }

    pub fn slot(&self, index: usize) -> &SlotSnapshot {
        &self.slots[index]
    }
}
