//! Issue queue: an unordered pool of dispatched-but-not-yet-issued
//! instructions, woken by tag broadcasts and drained oldest-ready-first per
//! functional-unit class (§3, §4.3).
//!
//! Unlike `Rob`/`Lsq`/`Bis`, this is not a circular FIFO — entries leave
//! the pool out of order, so allocation is "first free slot" and
//! occupancy is tracked with a plain `Vec<Option<IqEntry>>`, the same shape
//! `PhysicalRegisterFile` uses for its own unordered pool of registers.

use crate::isa::{FuClass, Opcode};

/// A dispatched instruction waiting in the issue queue.
///
/// `src1`/`src2` are deliberately generic: for arithmetic ops they are the
/// two register sources, for memory ops they are the address-base and
/// (STR/LDR only) offset registers, and for conditional branches `src1` is
/// the most recent zero-flag-writer's destination tag (§4.2 "branch source
/// readiness policy") rather than that register's arithmetic value — hence
/// `src1_wants_zero_flag`.
#[derive(Debug, Clone, Copy)]
pub struct IqEntry {
    pub opcode: Opcode,
    pub pc: u64,
    pub fu_class: FuClass,
    pub literal: i64,
    pub src1_tag: Option<usize>,
    pub src1_value: i64,
    pub src1_ready: bool,
    pub src1_wants_zero_flag: bool,
    pub src2_tag: Option<usize>,
    pub src2_value: i64,
    pub src2_ready: bool,
    pub dest: Option<usize>,
    pub rob_index: usize,
    pub lsq_index: Option<usize>,
    pub branch_epoch: Option<u64>,
}

impl IqEntry {
    /// Whether every source this opcode needs (§4.3) has its ready bit set.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        match self.opcode.required_sources() {
            0 => true,
            1 => self.src1_ready,
            _ => self.src1_ready && self.src2_ready,
        }
    }
}

/// Issue queue: fixed-capacity unordered pool (§3, capacity from
/// `Config::iq_size`, 8 in the reference design).
pub struct Iq {
    entries: Vec<Option<IqEntry>>,
}

impl Iq {
    /// Builds an empty issue queue with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![None; capacity],
        }
    }

    /// Total capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// Whether the queue holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether every slot is occupied.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.iter().all(Option::is_some)
    }

    /// Installs `entry` into the first free slot. Returns the slot index,
    /// or `None` if the queue is full.
    pub fn allocate(&mut self, entry: IqEntry) -> Option<usize> {
        let slot = self.entries.iter().position(Option::is_none)?;
        self.entries[slot] = Some(entry);
        Some(slot)
    }

    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&IqEntry> {
        self.entries.get(slot).and_then(Option::as_ref)
    }

    /// Wakes any slot whose source tags match `tag`, filling in the
    /// broadcast value (or, for a zero-flag consumer, the broadcast zero
    /// flag) and setting the matching ready bit (§4.4).
    pub fn broadcast(&mut self, tag: usize, value: i64, zero_flag: Option<bool>) {
        for entry in self.entries.iter_mut().flatten() {
            if entry.src1_tag == Some(tag) {
                entry.src1_value = if entry.src1_wants_zero_flag {
                    i64::from(zero_flag.unwrap_or(false))
                } else {
                    value
                };
                entry.src1_ready = true;
            }
            if entry.src2_tag == Some(tag) {
                entry.src2_value = value;
                entry.src2_ready = true;
            }
        }
    }

    /// Selects the oldest (smallest PC) ready entry belonging to `fu_class`,
    /// without removing it (§4.3: "select the oldest instruction, by
    /// program order, among the ready candidates").
    #[must_use]
    pub fn select_ready(&self, fu_class: FuClass) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i, e)))
            .filter(|(_, e)| e.fu_class == fu_class && e.is_ready())
            .min_by_key(|(_, e)| e.pc)
            .map(|(i, _)| i)
    }

    /// Removes and returns the entry at `slot` (issued to its FU).
    pub fn take(&mut self, slot: usize) -> Option<IqEntry> {
        self.entries.get_mut(slot).and_then(Option::take)
    }

    /// Drops every entry speculative under a branch at or after
    /// `cutoff` (§4.9: "IQ: mark matching slots free").
    pub fn flush_after(&mut self, cutoff: u64) {
        for slot in &mut self.entries {
            if slot.is_some_and(|e| e.branch_epoch.is_some_and(|epoch| epoch >= cutoff)) {
                *slot = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pc: u64, opcode: Opcode) -> IqEntry {
        IqEntry {
            opcode,
            pc,
            fu_class: opcode.fu_class(),
            literal: 0,
            src1_tag: Some(5),
            src1_value: 0,
            src1_ready: false,
            src1_wants_zero_flag: false,
            src2_tag: Some(6),
            src2_value: 0,
            src2_ready: false,
            dest: Some(16),
            rob_index: 0,
            lsq_index: None,
            branch_epoch: None,
        }
    }

    #[test]
    fn allocate_fills_first_free_slot() {
        let mut iq = Iq::new(2);
        let a = iq.allocate(entry(4000, Opcode::Add)).unwrap();
        let b = iq.allocate(entry(4008, Opcode::Add)).unwrap();
        assert_ne!(a, b);
        assert!(iq.is_full());
        assert!(iq.allocate(entry(4016, Opcode::Add)).is_none());
    }

    #[test]
    fn broadcast_wakes_matching_sources() {
        let mut iq = Iq::new(4);
        let slot = iq.allocate(entry(4000, Opcode::Add)).unwrap();
        assert!(!iq.get(slot).unwrap().is_ready());
        iq.broadcast(5, 10, None);
        assert!(!iq.get(slot).unwrap().is_ready());
        iq.broadcast(6, 20, None);
        let e = iq.get(slot).unwrap();
        assert!(e.is_ready());
        assert_eq!(e.src1_value, 10);
        assert_eq!(e.src2_value, 20);
    }

    #[test]
    fn zero_flag_consumer_reads_flag_not_value() {
        let mut iq = Iq::new(4);
        let mut e = entry(4000, Opcode::Bz);
        e.src1_wants_zero_flag = true;
        e.src2_tag = None;
        e.src2_ready = true;
        let slot = iq.allocate(e).unwrap();
        iq.broadcast(5, 999, Some(true));
        assert_eq!(iq.get(slot).unwrap().src1_value, 1);
        assert!(iq.get(slot).unwrap().is_ready());
    }

    #[test]
    fn select_ready_picks_oldest_by_pc() {
        let mut iq = Iq::new(4);
        let mut young = entry(4008, Opcode::Add);
        young.src1_ready = true;
        young.src2_ready = true;
        let mut old = entry(4000, Opcode::Add);
        old.src1_ready = true;
        old.src2_ready = true;
        let _ = iq.allocate(young);
        let old_slot = iq.allocate(old).unwrap();
        assert_eq!(iq.select_ready(FuClass::Int), Some(old_slot));
    }

    #[test]
    fn select_ready_ignores_other_fu_classes_and_not_ready() {
        let mut iq = Iq::new(4);
        let mut mul_ready = entry(4000, Opcode::Mul);
        mul_ready.src1_ready = true;
        mul_ready.src2_ready = true;
        let _ = iq.allocate(mul_ready);
        let not_ready = entry(4008, Opcode::Add);
        let _ = iq.allocate(not_ready);
        assert_eq!(iq.select_ready(FuClass::Int), None);
        assert!(iq.select_ready(FuClass::Mul).is_some());
    }

    #[test]
    fn flush_after_drops_only_younger_epochs() {
        let mut iq = Iq::new(4);
        let mut keep = entry(4000, Opcode::Add);
        keep.branch_epoch = Some(3);
        let mut drop_same = entry(4008, Opcode::Add);
        drop_same.branch_epoch = Some(5);
        let mut drop_newer = entry(4016, Opcode::Add);
        drop_newer.branch_epoch = Some(9);
        let keep_slot = iq.allocate(keep).unwrap();
        let _ = iq.allocate(drop_same);
        let _ = iq.allocate(drop_newer);

        iq.flush_after(5);

        assert!(iq.get(keep_slot).is_some());
        assert_eq!(iq.len(), 1);
    }
}
