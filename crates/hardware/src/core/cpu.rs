//! Architectural state: registers, the rename layer, data memory, and the
//! immutable instruction image (§2).

use crate::config::Config;
use crate::core::memory::DataMemory;
use crate::core::regfile::{ArchRegisterFile, Checkpoints, PhysicalRegisterFile, RenameState};
use crate::isa::CodeMemory;

/// Everything the pipeline reads and writes that survives a flush:
/// architectural registers, the physical register file, the rename table
/// and its checkpoints, data memory, the code image, and the PC.
///
/// The reorder buffer, load/store queue, issue queue, BIS, and BTB are
/// pipeline bookkeeping rather than architectural state, so `core::pipeline`
/// owns them instead of `Cpu`.
pub struct Cpu {
    /// Program counter of the next instruction to fetch.
    pub pc: u64,
    /// Architectural register file.
    pub arf: ArchRegisterFile,
    /// Physical register file.
    pub prf: PhysicalRegisterFile,
    /// Current architectural → physical mapping and free list.
    pub rename: RenameState,
    /// The two speculative rename/free-list checkpoint slots (§3).
    pub checkpoints: Checkpoints,
    /// Data memory.
    pub memory: DataMemory,
    /// Immutable instruction image.
    pub code: CodeMemory,
    /// Cycles elapsed.
    pub cycle: u64,
    /// Instructions retired (HALT itself is not counted).
    pub retired: u64,
    /// Set once HALT retires; the driver stops advancing once this is `true`.
    pub halted: bool,
}

impl Cpu {
    /// Builds the initial architectural state for `code`, sized per `config`.
    ///
    /// Physical registers `0..arf_size` start identity-mapped to their
    /// architectural register and must already read as valid — otherwise an
    /// instruction whose source was never written would wait forever for a
    /// broadcast that will never come. They're seeded to the ARF's own reset
    /// value (`-1`) via [`PhysicalRegisterFile::complete`], exactly as if
    /// cycle 0 had already "retired" them.
    #[must_use]
    pub fn new(code: CodeMemory, config: &Config) -> Self {
        let mut prf = PhysicalRegisterFile::new(config.prf_size);
        for p in 0..config.arf_size {
            prf.complete(p, -1, None);
        }
        Self {
            pc: config.code_base,
            arf: ArchRegisterFile::new(config.arf_size),
            prf,
            rename: RenameState::new(config.arf_size, config.prf_size),
            checkpoints: Checkpoints::default(),
            memory: DataMemory::new(config.data_memory_size),
            code,
            cycle: 0,
            retired: 0,
            halted: false,
        }
    }
}
