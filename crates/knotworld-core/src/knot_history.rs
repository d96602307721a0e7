//! Fixed-capacity history of recent knots.

use std::collections::VecDeque;

use knotworld_types::KnotEvent;

/// Number of knots retained.
pub const KNOT_HISTORY_CAPACITY: usize = 21;

/// Ring buffer of the most recent knots, oldest first. Pushing onto a full
/// buffer evicts the oldest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct KnotHistory {
    events: VecDeque<KnotEvent>,
    capacity: usize,
}

impl KnotHistory {
    /// An empty history holding at most [`KNOT_HISTORY_CAPACITY`] knots.
    pub fn new() -> Self {
        Self::with_capacity(KNOT_HISTORY_CAPACITY)
    }

    /// An empty history holding at most `capacity` knots (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a knot, evicting the oldest if full.
    pub fn push(&mut self, event: KnotEvent) {
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// The most recent knot.
    pub fn last(&self) -> Option<&KnotEvent> {
        self.events.back()
    }

    /// Number of knots held.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no knot has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Knots oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &KnotEvent> {
        self.events.iter()
    }

    /// Copy out as a vector, oldest first.
    pub fn to_vec(&self) -> Vec<KnotEvent> {
        self.events.iter().copied().collect()
    }
}

impl Default for KnotHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knot(tick: u64) -> KnotEvent {
        KnotEvent {
            tick,
            energy_value: 1.0,
            phase_value: 1.0,
            projected_res: 0.5,
        }
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let mut history = KnotHistory::new();
        for tick in 0..30 {
            history.push(knot(tick));
        }
        assert_eq!(history.len(), KNOT_HISTORY_CAPACITY);
        assert_eq!(history.iter().next().map(|k| k.tick), Some(9));
        assert_eq!(history.last().map(|k| k.tick), Some(29));
    }

    #[test]
    fn starts_empty() {
        let history = KnotHistory::default();
        assert!(history.is_empty());
        assert!(history.last().is_none());
        assert!(history.to_vec().is_empty());
    }
}
