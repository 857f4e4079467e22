//! Architectural registers, the physical register file, and the rename state
//! that maps one onto the other.

/// The architectural register file. Unset registers read as `-1` (scenarios
/// in §8: "registers default to -1 architecturally").
#[derive(Debug, Clone)]
pub struct ArchRegisterFile {
    values: Vec<i64>,
}

impl ArchRegisterFile {
    /// Builds an ARF of `size` registers, each initialized to `-1`.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            values: vec![-1; size],
        }
    }

    /// Reads architectural register `r`.
    #[must_use]
    pub fn read(&self, r: u8) -> i64 {
        self.values[r as usize]
    }

    /// Writes architectural register `r`.
    pub fn write(&mut self, r: u8, value: i64) {
        self.values[r as usize] = value;
    }

    /// Number of architectural registers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the ARF has zero registers (never true in practice).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Registers holding a nonzero value, in index order (§6: the verbose
    /// trace and final dump print only nonzero architectural registers).
    pub fn nonzero(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.values
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, v)| v != 0)
    }
}

/// One physical register: value, validity, zero flag, and consumer count
/// (§3: "pending IQ/LSQ entries referring to it by tag").
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysRegister {
    /// Last committed or forwarded value.
    pub value: i64,
    /// `true` once the in-flight writer (if any) has broadcast.
    pub valid: bool,
    /// Condition flag set by the last arithmetic write (ADD/SUB/ADDL/SUBL).
    pub zero_flag: bool,
    /// Number of outstanding IQ/LSQ entries holding this register as a tag.
    pub consumers: u32,
}

/// The pool of renamable backing storage for architectural registers.
#[derive(Debug, Clone)]
pub struct PhysicalRegisterFile {
    regs: Vec<PhysRegister>,
}

impl PhysicalRegisterFile {
    /// Builds a PRF of `size` registers, all invalid with zero value.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            regs: vec![PhysRegister::default(); size],
        }
    }

    /// Number of physical registers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regs.len()
    }

    /// A copy of physical register `p`'s full state.
    #[must_use]
    pub fn get(&self, p: usize) -> PhysRegister {
        self.regs[p]
    }

    /// Broadcasts a computed result into physical register `p`: sets its
    /// value, marks it valid, and optionally updates its zero flag (§4.4:
    /// "for ADD/SUB/ADDL/SUBL only" — other writers pass `None` to leave the
    /// flag untouched).
    pub fn complete(&mut self, p: usize, value: i64, zero_flag: Option<bool>) {
        let reg = &mut self.regs[p];
        reg.value = value;
        reg.valid = true;
        if let Some(flag) = zero_flag {
            reg.zero_flag = flag;
        }
    }

    /// Increments the consumer count for `p` (a new IQ/LSQ entry now tags it).
    pub fn add_consumer(&mut self, p: usize) {
        self.regs[p].consumers += 1;
    }

    /// Decrements the consumer count for `p` (an entry tagging it has drained).
    pub fn remove_consumer(&mut self, p: usize) {
        self.regs[p].consumers = self.regs[p].consumers.saturating_sub(1);
    }

    /// Resets `p` to its post-reclaim state (invalid, zero value, no consumers).
    pub fn reclaim(&mut self, p: usize) {
        self.regs[p] = PhysRegister::default();
    }
}

/// Current architectural→physical mapping and the free-list of physical
/// registers backing no architectural register, no in-flight writer, and no
/// outstanding consumer (§3 invariant 3).
#[derive(Debug, Clone)]
pub struct RenameState {
    table: Vec<usize>,
    free: Vec<bool>,
}

impl RenameState {
    /// Builds the initial rename state: architectural register `a` starts
    /// bound 1:1 to physical register `a`; the remaining physical registers
    /// (`arf_size..prf_size`) start on the free list.
    #[must_use]
    pub fn new(arf_size: usize, prf_size: usize) -> Self {
        let mut table = vec![0; arf_size];
        let mut free = vec![true; prf_size];
        for (a, slot) in table.iter_mut().enumerate() {
            *slot = a;
            free[a] = false;
        }
        Self { table, free }
    }

    /// The physical register currently backing architectural register `a`.
    #[must_use]
    pub fn mapping(&self, a: u8) -> usize {
        self.table[a as usize]
    }

    /// Rebinds architectural register `a` to physical register `p`.
    pub fn remap(&mut self, a: u8, p: usize) {
        self.table[a as usize] = p;
    }

    /// Whether any architectural register currently maps to `p`.
    #[must_use]
    pub fn is_mapped(&self, p: usize) -> bool {
        self.table.iter().any(|&mapped| mapped == p)
    }

    /// Whether `p` is on the free list.
    #[must_use]
    pub fn is_free(&self, p: usize) -> bool {
        self.free[p]
    }

    /// Takes the lowest-indexed free physical register off the free list.
    #[must_use]
    pub fn alloc(&mut self) -> Option<usize> {
        let p = self.free.iter().position(|&f| f)?;
        self.free[p] = false;
        Some(p)
    }

    /// Returns `p` to the free list.
    pub fn free(&mut self, p: usize) {
        self.free[p] = true;
    }

    /// Number of physical registers presently on the free list.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.iter().filter(|&&f| f).count()
    }

    /// Snapshot of the architectural→physical table, in register order.
    pub fn table(&self) -> &[usize] {
        &self.table
    }
}

/// The two checkpoint slots used to restore rename state on a branch
/// misprediction (§3: "Two parallel checkpoint copies"). Each slot also
/// carries the zero-flag producer tag in effect at checkpoint time, so a
/// flush can restore `Engine::last_zero_flag_producer` alongside the rename
/// table rather than leaving it pointing at a squashed instruction's
/// reclaimed physical register.
#[derive(Debug, Clone, Default)]
pub struct Checkpoints {
    slots: [Option<(RenameState, Option<usize>)>; 2],
}

impl Checkpoints {
    /// The index of a free checkpoint slot, if any.
    #[must_use]
    pub fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Snapshots `state` and the current zero-flag producer into checkpoint
    /// slot `slot`.
    pub fn save(&mut self, slot: usize, state: &RenameState, zero_flag_producer: Option<usize>) {
        self.slots[slot] = Some((state.clone(), zero_flag_producer));
    }

    /// Restores and returns the rename state and zero-flag producer saved in
    /// `slot`.
    #[must_use]
    pub fn restore(&self, slot: usize) -> (RenameState, Option<usize>) {
        self.slots[slot]
            .clone()
            .expect("checkpoint slot read before it was saved")
    }

    /// Frees checkpoint `slot` for reuse by a future branch.
    pub fn release(&mut self, slot: usize) {
        self.slots[slot] = None;
    }

    /// Number of free checkpoint slots.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arf_defaults_to_minus_one() {
        let arf = ArchRegisterFile::new(16);
        assert_eq!(arf.read(0), -1);
        assert_eq!(arf.read(15), -1);
    }

    #[test]
    fn arf_nonzero_filters_zero_values() {
        let mut arf = ArchRegisterFile::new(4);
        arf.write(0, 0);
        arf.write(1, 5);
        arf.write(2, -1);
        let nz: Vec<_> = arf.nonzero().collect();
        assert_eq!(nz, vec![(1, 5), (2, -1)]);
    }

    #[test]
    fn rename_state_starts_identity_mapped() {
        let rename = RenameState::new(16, 24);
        for a in 0..16u8 {
            assert_eq!(rename.mapping(a), a as usize);
            assert!(!rename.is_free(a as usize));
        }
        assert_eq!(rename.free_count(), 8);
    }

    #[test]
    fn alloc_and_free_round_trip() {
        let mut rename = RenameState::new(16, 24);
        let p = rename.alloc().unwrap();
        assert!(p >= 16);
        assert!(!rename.is_free(p));
        rename.free(p);
        assert!(rename.is_free(p));
    }

    #[test]
    fn checkpoints_restore_independent_slots() {
        let mut rename = RenameState::new(4, 6);
        let mut checkpoints = Checkpoints::default();
        let slot = checkpoints.free_slot().unwrap();
        checkpoints.save(slot, &rename, Some(2));

        rename.remap(0, 5);
        let (restored, zero_flag_producer) = checkpoints.restore(slot);
        assert_eq!(restored.mapping(0), 0);
        assert_eq!(rename.mapping(0), 5);
        assert_eq!(zero_flag_producer, Some(2));
    }

    #[test]
    fn prf_complete_sets_value_and_validity() {
        let mut prf = PhysicalRegisterFile::new(4);
        prf.complete(2, 42, Some(true));
        let reg = prf.get(2);
        assert_eq!(reg.value, 42);
        assert!(reg.valid);
        assert!(reg.zero_flag);
    }

    #[test]
    fn prf_consumer_count_saturates_at_zero() {
        let mut prf = PhysicalRegisterFile::new(2);
        prf.remove_consumer(0);
        assert_eq!(prf.get(0).consumers, 0);
        prf.add_consumer(0);
        prf.remove_consumer(0);
        assert_eq!(prf.get(0).consumers, 0);
    }
}
