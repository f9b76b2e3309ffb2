//! Bounded step history for undo.
//!
//! [`History`] is a ring of world [`Snapshot`]s, one per fixed step. The write
//! cursor wraps modulo the capacity, overwriting the oldest entry, and the
//! undo count is clamped to `CAP - 1` so stepping back never reaches a slot
//! that has already been overwritten.

use heapless::Vec;
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of steps kept by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// The part of a body's state that history records and restores.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyState {
    pub velocity: Vector3<f32>,
    pub position: Vector3<f32>,
    pub acceleration: Vector3<f32>,
    pub angular_velocity: Vector3<f32>,
    /// Euler degrees.
    pub orientation: Vector3<f32>,
}

/// State of every body in a world, indexed by body slot.
pub type Snapshot<const N: usize> = Vec<BodyState, N>;

/// Ring buffer of snapshots with a clamped undo count.
#[derive(Debug, Clone)]
pub struct History<const N: usize, const CAP: usize = DEFAULT_HISTORY_CAPACITY> {
    slots: Vec<Snapshot<N>, CAP>,
    cursor: usize,
    undo_count: usize,
}

impl<const N: usize, const CAP: usize> Default for History<N, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, const CAP: usize> History<N, CAP> {
    const CAPACITY_OK: () = assert!(CAP > 1, "history needs room for at least two snapshots");

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_OK;
        Self {
            slots: Vec::new(),
            cursor: 0,
            undo_count: 0,
        }
    }

    /// Record a snapshot, overwriting the oldest one once the ring is full.
    pub fn push(&mut self, snapshot: Snapshot<N>) {
        if self.cursor < self.slots.len() {
            self.slots[self.cursor] = snapshot;
        } else {
            // cursor == len < CAP here, so the push cannot fail
            let _ = self.slots.push(snapshot);
        }
        self.cursor = (self.cursor + 1) % CAP;
        self.undo_count = (self.undo_count + 1).min(CAP - 1);
    }

    /// Step back one entry and return it, or `None` when nothing is left to
    /// undo.
    pub fn pop(&mut self) -> Option<&Snapshot<N>> {
        if self.undo_count == 0 {
            return None;
        }
        self.undo_count -= 1;
        self.cursor = (self.cursor + CAP - 1) % CAP;
        self.slots.get(self.cursor)
    }

    /// Forget every entry.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.cursor = 0;
        self.undo_count = 0;
    }

    /// Entries available to [`History::pop`].
    #[inline]
    pub fn undo_count(&self) -> usize {
        self.undo_count
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        CAP
    }

    /// Slot the next push writes to.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.undo_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(x: f32) -> BodyState {
        BodyState {
            velocity: Vector3::zeros(),
            position: Vector3::new(x, 0.0, 0.0),
            acceleration: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            orientation: Vector3::zeros(),
        }
    }

    fn snapshot(x: f32) -> Snapshot<2> {
        Vec::from_slice(&[state(x), state(-x)]).unwrap()
    }

    #[test]
    fn test_pop_returns_entries_newest_first() {
        let mut history = History::<2, 8>::new();
        for i in 0..3 {
            history.push(snapshot(i as f32));
        }
        assert_eq!(history.undo_count(), 3);
        assert_eq!(history.pop().unwrap()[0].position.x, 2.0);
        assert_eq!(history.pop().unwrap()[1].position.x, -1.0);
        assert_eq!(history.pop().unwrap()[0].position.x, 0.0);
        assert!(history.pop().is_none());
        assert_eq!(history.undo_count(), 0);
    }

    #[test]
    fn test_pop_on_empty_is_a_no_op() {
        let mut history = History::<2, 4>::new();
        assert!(history.is_empty());
        assert!(history.pop().is_none());
        assert_eq!(history.cursor(), 0);
        assert_eq!(history.undo_count(), 0);
    }

    #[test]
    fn test_wraps_and_clamps_undo_count() {
        let mut history = History::<2, 4>::new();
        for i in 0..10 {
            history.push(snapshot(i as f32));
        }
        assert_eq!(history.capacity(), 4);
        assert_eq!(history.undo_count(), 3);
        assert_eq!(history.cursor(), 10 % 4);
        // only the three newest survive
        assert_eq!(history.pop().unwrap()[0].position.x, 9.0);
        assert_eq!(history.pop().unwrap()[0].position.x, 8.0);
        assert_eq!(history.pop().unwrap()[0].position.x, 7.0);
        assert!(history.pop().is_none());
    }

    #[test]
    fn test_push_after_pop_overwrites_forward_entries() {
        let mut history = History::<2, 8>::new();
        history.push(snapshot(0.0));
        history.push(snapshot(1.0));
        history.pop();
        history.push(snapshot(5.0));
        assert_eq!(history.undo_count(), 2);
        assert_eq!(history.pop().unwrap()[0].position.x, 5.0);
        assert_eq!(history.pop().unwrap()[0].position.x, 0.0);
    }

    #[test]
    fn test_clear() {
        let mut history = History::<2, 8>::new();
        history.push(snapshot(1.0));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.cursor(), 0);
        assert!(history.pop().is_none());
    }
}
