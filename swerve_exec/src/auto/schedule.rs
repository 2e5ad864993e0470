//! # Heading schedule and action queues
//!
//! Both are owned by the executor for the duration of one trajectory step and only ever move
//! forwards: the rotation cursor never goes back and an action leaves its queue exactly once.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;

use comms_if::auto::{AutoAction, TimedAction, TimedRotation};

use super::AutoError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Headings to face while following a path, each from a given time onwards.
#[derive(Debug, Clone)]
pub struct RotationSchedule {
    /// `(time_s, heading_rad)` pairs sorted by time.
    entries: Vec<(f64, f64)>,

    /// Index of the next entry to apply. The first entry is applied when the path starts.
    cursor: usize,
}

/// An action waiting for its trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledAction {
    /// Elapsed time or completion fraction, depending on the queue.
    pub trigger: f64,
    pub action: AutoAction,
}

/// Actions sorted by trigger, popped once due.
#[derive(Debug, Clone, Default)]
pub struct ActionQueue {
    queue: VecDeque<ScheduledAction>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RotationSchedule {
    /// Build a schedule from `(time_s, heading_rad)` pairs.
    ///
    /// Entries are sorted by time, entries with the same time keep their given order.
    pub fn new(mut entries: Vec<(f64, f64)>) -> Result<Self, AutoError> {
        if entries.is_empty() {
            return Err(AutoError::NoRotations);
        }

        if let Some(&(t, _)) = entries.iter().find(|(t, h)| !t.is_finite() || !h.is_finite()) {
            return Err(AutoError::NonFiniteTrigger(t));
        }

        entries.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(Self { entries, cursor: 1 })
    }

    pub fn from_rotations(rotations: &[TimedRotation]) -> Result<Self, AutoError> {
        Self::new(
            rotations
                .iter()
                .map(|r| (r.time_s, r.heading_deg.to_radians()))
                .collect(),
        )
    }

    /// Heading to face at the start of the path.
    ///
    /// Units: radians
    pub fn initial_heading_rad(&self) -> f64 {
        self.entries[0].1
    }

    /// Advance past every entry due at `elapsed_s`, returning the heading of the last one passed.
    pub fn advance(&mut self, elapsed_s: f64) -> Option<f64> {
        let mut heading = None;

        while let Some(&(t, h)) = self.entries.get(self.cursor) {
            if t > elapsed_s {
                break;
            }
            heading = Some(h);
            self.cursor += 1;
        }

        heading
    }

    /// Move the cursor to the end, returning the final heading if it had not been reached.
    pub fn finish(&mut self) -> Option<f64> {
        if self.is_finished() {
            return None;
        }

        self.cursor = self.entries.len();
        self.entries.last().map(|&(_, h)| h)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.entries.len()
    }
}

impl ScheduledAction {
    pub fn new(trigger: f64, action: AutoAction) -> Self {
        Self { trigger, action }
    }
}

impl From<&TimedAction> for ScheduledAction {
    fn from(a: &TimedAction) -> Self {
        Self::new(a.trigger, a.action.clone())
    }
}

impl ActionQueue {
    /// Create a queue sorted by trigger. Actions with equal triggers keep their given order.
    pub fn new(mut actions: Vec<ScheduledAction>) -> Result<Self, AutoError> {
        if let Some(a) = actions.iter().find(|a| !a.trigger.is_finite()) {
            return Err(AutoError::NonFiniteTrigger(a.trigger));
        }

        actions.sort_by(|a, b| a.trigger.total_cmp(&b.trigger));

        Ok(Self {
            queue: actions.into(),
        })
    }

    /// Remove and return the earliest action if its trigger is at or before `key`.
    pub fn pop_due(&mut self, key: f64) -> Option<ScheduledAction> {
        match self.queue.front() {
            Some(a) if a.trigger <= key => self.queue.pop_front(),
            _ => None,
        }
    }

    /// Remove and return every remaining action, in order.
    pub fn drain_all(&mut self) -> impl Iterator<Item = ScheduledAction> + '_ {
        self.queue.drain(..)
    }

    pub fn actions(&self) -> impl Iterator<Item = &ScheduledAction> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
