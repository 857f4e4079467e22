//! A cycle-accurate out-of-order superscalar simulator for the APEX
//! instruction set.
//!
//! 1. **Core:** rename/dispatch, issue, the INT/MUL/BRANCH functional
//!    units, and in-order retirement, backed by a ROB, LSQ, IQ, BIS, and
//!    BTB (`core::pipeline::Engine`), plus the architectural/physical
//!    register files, rename table, and data memory (`core::Cpu`).
//! 2. **ISA:** the sixteen APEX opcodes, instruction representation, the
//!    immutable code image instructions are fetched from, and trace
//!    disassembly.
//! 3. **Simulation:** `Simulator` (owns the `Cpu` + `Engine` pair), the
//!    assembly loader, configuration, and statistics.

/// Common types shared across the simulator: structural constants and the
/// typed error surface.
pub mod common;
/// Simulator configuration (structural capacities, layout, and run limits).
pub mod config;
/// CPU architectural state and the out-of-order pipeline that drives it.
pub mod core;
/// The APEX instruction set: opcodes, instructions, the code image, and
/// trace disassembly.
pub mod isa;
/// Simulation driver: `Simulator` and the assembly loader.
pub mod sim;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Architectural CPU state: registers, rename, memory, and the code image.
pub use crate::core::Cpu;
/// Top-level simulator; owns the CPU and pipeline engine side-by-side.
pub use crate::sim::simulator::Simulator;
