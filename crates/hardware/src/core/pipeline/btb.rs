//! Branch target buffer: predicts the next PC for a conditional branch
//! fetch has already seen once (§4.1, §4.6).
//!
//! Capacity-bounded, no eviction policy: once full, a branch PC that has
//! never been seen before simply cannot install an entry until the
//! simulation ends. Fetch then falls back to the default not-taken
//! prediction (PC + stride) for that branch, same as for any never-seen
//! branch. This mirrors the issue unit's "stall rather than silently drop"
//! posture in `super::rob` and `super::bis`: capacity limits change timing,
//! never correctness.

/// A single BTB entry: the branch's own PC, the target PC it resolved to
/// last time, and a 1-bit taken/not-taken history (§3).
#[derive(Debug, Clone, Copy)]
struct BtbEntry {
    pc: u64,
    target: u64,
    taken: bool,
}

/// Branch target buffer keyed by branch PC (§3, capacity from
/// `Config::btb_size`, 8 in the reference design).
pub struct Btb {
    entries: Vec<BtbEntry>,
    capacity: usize,
}

impl Btb {
    /// Builds an empty BTB with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of installed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the BTB holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, pc: u64) -> Option<usize> {
        self.entries.iter().position(|e| e.pc == pc)
    }

    /// Fetch-time prediction for `pc`: `Some(target)` only when an entry
    /// exists and its history bit reads taken (§4.1). Any other PC,
    /// including one the BTB has never seen, predicts not-taken and
    /// returns `None`.
    #[must_use]
    pub fn predict(&self, pc: u64) -> Option<u64> {
        self.find(pc).and_then(|i| self.entries[i].taken.then_some(self.entries[i].target))
    }

    /// The raw history bit for `pc`, or `false` if absent. Used by the
    /// branch FU to compare the outcome it just computed against what
    /// fetch predicted (§4.6).
    #[must_use]
    pub fn history(&self, pc: u64) -> bool {
        self.find(pc).is_some_and(|i| self.entries[i].taken)
    }

    /// Installs a placeholder not-taken entry for `pc` if one doesn't
    /// already exist, so the branch FU has a slot to update once it
    /// resolves (§4.2 step 6). A no-op under the no-eviction policy once
    /// the table is full and `pc` is new.
    pub fn insert_if_absent(&mut self, pc: u64) {
        if self.find(pc).is_some() {
            return;
        }
        if self.entries.len() < self.capacity {
            self.entries.push(BtbEntry {
                pc,
                target: pc,
                taken: false,
            });
        }
    }

    /// Updates the entry for `pc` with the branch FU's resolved target and
    /// outcome (§4.6). No-op if the entry was never installed (table was
    /// full at dispatch time).
    pub fn update(&mut self, pc: u64, target: u64, taken: bool) {
        if let Some(i) = self.find(pc) {
            self.entries[i].target = target;
            self.entries[i].taken = taken;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_pc_predicts_not_taken() {
        let btb = Btb::new(8);
        assert_eq!(btb.predict(4008), None);
        assert!(!btb.history(4008));
    }

    #[test]
    fn insert_then_update_enables_taken_prediction() {
        let mut btb = Btb::new(8);
        btb.insert_if_absent(4008);
        assert_eq!(btb.predict(4008), None);
        btb.update(4008, 4032, true);
        assert_eq!(btb.predict(4008), Some(4032));
        assert!(btb.history(4008));
    }

    #[test]
    fn update_to_not_taken_clears_prediction() {
        let mut btb = Btb::new(8);
        btb.insert_if_absent(4008);
        btb.update(4008, 4032, true);
        btb.update(4008, 4032, false);
        assert_eq!(btb.predict(4008), None);
        assert!(!btb.history(4008));
    }

    #[test]
    fn full_table_rejects_new_pc_but_keeps_existing() {
        let mut btb = Btb::new(2);
        btb.insert_if_absent(4000);
        btb.insert_if_absent(4008);
        assert!(btb.len() == 2);
        btb.insert_if_absent(4016);
        assert_eq!(btb.len(), 2);
        btb.update(4000, 4100, true);
        assert_eq!(btb.predict(4000), Some(4100));
        assert_eq!(btb.predict(4016), None);
    }

    #[test]
    fn insert_if_absent_is_idempotent_for_existing_entry() {
        let mut btb = Btb::new(8);
        btb.insert_if_absent(4008);
        btb.update(4008, 4032, true);
        btb.insert_if_absent(4008);
        assert_eq!(btb.predict(4008), Some(4032));
    }
}
