//! Bounded message-id deduplication window.
//!
//! OneBot implementations occasionally redeliver events (reconnects, relay
//! quirks), so the adapter remembers the last `capacity` distinct message
//! ids and drops repeats. Best-effort and in-memory only: the window does
//! not survive a restart.

use std::collections::HashSet;

/// Fixed-capacity membership cache over message identifiers.
///
/// A presence set gives O(1) lookup; a same-size ring of ids in insertion
/// order gives O(1) eviction of the oldest entry. Invariant: the set and the
/// non-empty ring slots always hold exactly the same ids.
#[derive(Debug)]
pub struct DedupWindow {
    seen: HashSet<String>,
    ring: Vec<String>,
    cursor: usize,
}

impl DedupWindow {
    /// Creates a window remembering the last `capacity` distinct ids.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
            ring: vec![String::new(); capacity.max(1)],
            cursor: 0,
        }
    }

    /// Returns whether `id` was already seen, recording it if not.
    ///
    /// Ids equal to `""` or `"0"` mean "no id": they are never recorded and
    /// never reported as duplicates.
    pub fn check_and_insert(&mut self, id: &str) -> bool {
        if id.is_empty() || id == "0" {
            return false;
        }

        if self.seen.contains(id) {
            return true;
        }

        // Evict the slot at the cursor before reusing it.
        let slot = &mut self.ring[self.cursor];
        if !slot.is_empty() {
            self.seen.remove(slot.as_str());
        }
        *slot = id.to_string();
        self.seen.insert(id.to_string());
        self.cursor = (self.cursor + 1) % self.ring.len();

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_check_is_duplicate() {
        let mut window = DedupWindow::with_capacity(8);
        assert!(!window.check_and_insert("m1"));
        assert!(window.check_and_insert("m1"));
    }

    #[test]
    fn no_id_values_are_never_recorded() {
        let mut window = DedupWindow::with_capacity(8);
        assert!(!window.check_and_insert(""));
        assert!(!window.check_and_insert(""));
        assert!(!window.check_and_insert("0"));
        assert!(!window.check_and_insert("0"));
        assert!(window.seen.is_empty());
    }

    #[test]
    fn capacity_distinct_insertions_evict_the_oldest() {
        let mut window = DedupWindow::with_capacity(3);
        assert!(!window.check_and_insert("a"));
        assert!(!window.check_and_insert("b"));
        assert!(!window.check_and_insert("c"));
        assert!(window.check_and_insert("a"));

        // Three distinct insertions later, "a" has been evicted and its
        // duplicate status reverts.
        assert!(!window.check_and_insert("d"));
        assert!(!window.check_and_insert("e"));
        assert!(!window.check_and_insert("f"));
        assert!(!window.check_and_insert("a"));

        assert_eq!(window.seen.len(), 3);
    }

    #[test]
    fn set_tracks_ring_contents() {
        let mut window = DedupWindow::with_capacity(2);
        for id in ["x", "y", "z", "w"] {
            window.check_and_insert(id);
        }
        assert_eq!(window.seen.len(), 2);
        assert!(window.check_and_insert("z"));
        assert!(window.check_and_insert("w"));
        assert!(!window.check_and_insert("x"));
    }
}
