//! The APEX instruction set: opcodes, instruction representation, and the
//! code image they are fetched from.

/// Opcode enum and the static classification tables derived from it
/// (functional-unit class, source arity, zero-flag writers).
pub mod opcode;

/// `Instruction` and the immutable `CodeMemory` array it is fetched from.
pub mod instruction;

/// Trace disassembly: rendering an `Instruction` back to assembly text.
pub mod disasm;

pub use disasm::{disassemble, disassemble_renamed};
pub use instruction::{CodeMemory, Instruction};
pub use opcode::{FuClass, Opcode};
