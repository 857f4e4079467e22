//! Load/store queue: the in-order memory-operation drain queue.
//!
//! Allocation is symmetric between loads and stores (§9, resolved ambiguity:
//! the reference's asymmetric handling of LOAD/LDR allocation is not carried
//! forward). A flush rewinds the tail and recomputes the size; it never
//! touches the head, since entries that already reached the head side are
//! older than any branch still capable of mispredicting.

/// Load (`0`) or store (`1`) (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemOpKind {
    /// `LOAD`/`LDR`.
    Load,
    /// `STORE`/`STR`.
    Store,
}

/// A single LSQ entry (§3). `src1` is the address-base register; its
/// readiness and value are broadcast-tracked like an IQ source. The
/// store-value register is tracked separately via `store_value_tag`/
/// `store_value_ready` and is read from the PRF directly at drain time
/// rather than forwarded through this entry's own src1/src2 (§9 decision
/// resolving the STR/STORE operand-role ambiguity against `cpu.c`).
#[derive(Debug, Clone, Copy)]
pub struct LsqEntry {
    /// Load or store.
    pub kind: MemOpKind,
    /// PC of the instruction.
    pub pc: u64,
    /// Slot index of the owning ROB entry.
    pub rob_index: usize,
    /// Youngest unresolved branch's BIS sequence at dispatch, if any (§3
    /// invariant 6).
    pub branch_epoch: Option<u64>,
    /// Address-base register's physical tag.
    pub addr_base_tag: Option<usize>,
    /// Address-base register's value, captured or forwarded.
    pub addr_base_value: i64,
    /// Whether `addr_base_value` is ready.
    pub addr_base_ready: bool,
    /// Offset register's physical tag (`STR` only; `STORE`/`LOAD`/`LDR` use
    /// `literal` instead).
    pub offset_tag: Option<usize>,
    /// Offset register's value (`STR` only).
    pub offset_value: i64,
    /// Whether `offset_value` is ready (`STR` only; always `true` otherwise).
    pub offset_ready: bool,
    /// Immediate offset (`STORE`/`LOAD`; zero for `STR`/`LDR`).
    pub literal: i64,
    /// Computed effective address, valid once `address_valid`.
    pub address: i64,
    /// Set once the INT pipeline's address side-channel writes `address`.
    pub address_valid: bool,
    /// Store-value register's physical tag (`STORE`/`STR` only).
    pub store_value_tag: Option<usize>,
    /// Store-value register's value, once ready.
    pub store_value: i64,
    /// Whether the store value is ready.
    pub store_value_ready: bool,
    /// Destination physical register for a load.
    pub load_dest: Option<usize>,
    /// Cycles spent draining so far (0..=3, §4.7).
    pub drain_cycles: u8,
}

impl LsqEntry {
    /// Whether this entry may advance its drain counter this cycle (§4.7):
    /// at the ROB head, address resolved, and — for stores — the value
    /// ready.
    #[must_use]
    pub fn ready_to_drain(&self, rob_head_index: usize) -> bool {
        self.rob_index == rob_head_index
            && self.address_valid
            && (self.kind == MemOpKind::Load || self.store_value_ready)
    }
}

/// Load/store queue: circular FIFO, capacity from `Config::lsq_size`.
pub struct Lsq {
    entries: Vec<Option<LsqEntry>>,
    head: usize,
    tail: usize,
    count: usize,
}

impl Lsq {
    /// Builds an empty LSQ with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![None; capacity],
            head: 0,
            tail: 0,
            count: 0,
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
        self.count
    }

    /// Whether the LSQ holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether the LSQ is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.count == self.entries.len()
    }

    /// Allocates a new entry at the tail. Returns its slot index, or `None`
    /// if the LSQ is full.
    pub fn allocate(&mut self, entry: LsqEntry) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        let idx = self.tail;
        self.entries[idx] = Some(entry);
        self.tail = (self.tail + 1) % self.entries.len();
        self.count += 1;
        Some(idx)
    }

    /// Reads entry `idx`.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&LsqEntry> {
        self.entries[idx].as_ref()
    }

    /// Mutably accesses entry `idx`.
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut LsqEntry> {
        self.entries[idx].as_mut()
    }

    /// The slot index of the oldest entry.
    #[must_use]
    pub fn head_index(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.head)
    }

    /// The oldest entry.
    #[must_use]
    pub fn peek_head(&self) -> Option<&LsqEntry> {
        (!self.is_empty()).then(|| self.entries[self.head].as_ref().expect("head is occupied"))
    }

    /// Removes and returns the head entry once it has fully drained.
    pub fn pop_head(&mut self) -> Option<LsqEntry> {
        if self.is_empty() {
            return None;
        }
        let entry = self.entries[self.head].take()?;
        self.head = (self.head + 1) % self.entries.len();
        self.count -= 1;
        Some(entry)
    }

    /// Broadcasts a completed tag's value to every matching address-base,
    /// offset, or store-value slot, setting the corresponding ready bit
    /// (§4.4: "broadcasts ... to all LSQ entries matching the tag").
    pub fn broadcast(&mut self, tag: usize, value: i64) {
        self.for_each_mut(|entry| {
            if entry.addr_base_tag == Some(tag) {
                entry.addr_base_value = value;
                entry.addr_base_ready = true;
            }
            if entry.offset_tag == Some(tag) {
                entry.offset_value = value;
                entry.offset_ready = true;
            }
            if entry.store_value_tag == Some(tag) {
                entry.store_value = value;
                entry.store_value_ready = true;
            }
        });
    }

    /// Drops entries whose `branch_epoch` is at or after `cutoff`, from the
    /// tail side (§4.9: "drop matching entries from the head side" refers to
    /// ROB position, not LSQ slot order — the entries being dropped are
    /// necessarily the youngest ones, which sit nearest this queue's tail).
    pub fn flush_younger(&mut self, cutoff: u64) {
        if self.is_empty() {
            return;
        }
        let cap = self.entries.len();
        let mut idx = self.head;
        let mut kept_count = 0;
        let mut write = self.head;
        for _ in 0..self.count {
            let keep = match &self.entries[idx] {
                Some(entry) => entry.branch_epoch.is_none_or(|epoch| epoch < cutoff),
                None => false,
            };
            if keep {
                if write != idx {
                    self.entries[write] = self.entries[idx].take();
                }
                write = (write + 1) % cap;
                kept_count += 1;
            } else {
                self.entries[idx] = None;
            }
            idx = (idx + 1) % cap;
        }
        self.tail = write;
        self.count = kept_count;
    }

    fn for_each_mut(&mut self, mut f: impl FnMut(&mut LsqEntry)) {
        if self.is_empty() {
            return;
        }
        let mut idx = self.head;
        for _ in 0..self.count {
            if let Some(entry) = &mut self.entries[idx] {
                f(entry);
            }
            idx = (idx + 1) % self.entries.len();
        }
    }

    /// Visits every occupied entry head-to-tail, in program order.
    pub fn for_each(&self, mut f: impl FnMut(usize, &LsqEntry)) {
        if self.is_empty() {
            return;
        }
        let mut idx = self.head;
        for _ in 0..self.count {
            if let Some(entry) = &self.entries[idx] {
                f(idx, entry);
            }
            idx = (idx + 1) % self.entries.len();
        }
    }
}
