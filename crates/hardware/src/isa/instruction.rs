//! Instruction representation and the code image instructions are fetched from.

use crate::isa::Opcode;

/// A decoded instruction. The fields present depend on the opcode; unused
/// register slots are `None`.
///
/// Register roles vary by opcode (§9 / design notes):
///
/// - `rd` — architectural destination, populated when `opcode.writes_arch_reg()`.
/// - `rs1` — first source in assembly order. For `STORE`/`STR` this is the
///   *value* register being written to memory, not an address operand.
/// - `rs2` — second source in assembly order: the base address register for
///   `STORE`/`STR`/`LDR`, the second operand for two-register arithmetic ops,
///   unused for `LOAD`/`ADDL`/`SUBL` (which use `imm` instead).
/// - `rs3` — `STR` only: the offset register.
/// - `imm` — the literal for `MOVC`/`ADDL`/`SUBL`/`LOAD`/`STORE`/`BZ`/`BNZ`/`JUMP`.
///
/// The issue queue does not track `rs1`/`rs2`/`rs3` directly — see
/// `core::pipeline::iq` for how these map onto its two broadcast-tracked
/// source tags. For `STORE`/`STR` the address operands (`rs2`, and `rs3` for
/// `STR`) are what the IQ tracks; the store-value register (`rs1`) is read
/// from the physical register file directly when the store drains from the
/// LSQ, not forwarded through the IQ's src1/src2 broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// The operation this instruction performs.
    pub opcode: Opcode,
    /// Architectural destination register, if any.
    pub rd: Option<u8>,
    /// First source register in assembly order.
    pub rs1: Option<u8>,
    /// Second source register in assembly order.
    pub rs2: Option<u8>,
    /// Third source register in assembly order (`STR` only).
    pub rs3: Option<u8>,
    /// Literal operand, zero when the opcode has none.
    pub imm: i64,
}

impl Instruction {
    /// An instruction with no register operands and a zero literal.
    #[must_use]
    pub const fn bare(opcode: Opcode) -> Self {
        Self {
            opcode,
            rd: None,
            rs1: None,
            rs2: None,
            rs3: None,
            imm: 0,
        }
    }
}

/// The immutable instruction image a program is loaded into.
///
/// Instructions are addressed by `pc`, not by array index: `pc = code_base +
/// index * code_stride` (§4.1, §11). [`CodeMemory::index_of`] is the one place
/// that translates between the two; fetch, the BTB, and trace printing all go
/// through it rather than re-deriving the arithmetic.
#[derive(Debug, Clone, Default)]
pub struct CodeMemory {
    instructions: Vec<Instruction>,
    base: u64,
    stride: u64,
}

impl CodeMemory {
    /// Builds a code image over `instructions`, addressed starting at `base`
    /// with `stride` bytes between consecutive instructions.
    #[must_use]
    pub fn new(instructions: Vec<Instruction>, base: u64, stride: u64) -> Self {
        Self {
            instructions,
            base,
            stride: stride.max(1),
        }
    }

    /// Translates a `pc` to an array index, or `None` if `pc` is out of
    /// range, below `code_base`, or not aligned to `code_stride`.
    #[must_use]
    pub fn index_of(&self, pc: u64) -> Option<usize> {
        let offset = pc.checked_sub(self.base)?;
        if offset % self.stride != 0 {
            return None;
        }
        let index = usize::try_from(offset / self.stride).ok()?;
        (index < self.instructions.len()).then_some(index)
    }

    /// The instruction at `pc`, or `None` if `pc` does not address one.
    #[must_use]
    pub fn fetch(&self, pc: u64) -> Option<&Instruction> {
        self.index_of(pc).map(|i| &self.instructions[i])
    }

    /// The `pc` that addresses the instruction at `index`.
    #[must_use]
    pub fn pc_of(&self, index: usize) -> u64 {
        self.base + index as u64 * self.stride
    }

    /// Number of instructions in the image.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the image contains no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The first address in the image, `code_base`.
    #[must_use]
    pub fn base(&self) -> u64 {
        self.base
    }

    /// The byte distance between consecutive instructions, `code_stride`.
    #[must_use]
    pub fn stride(&self) -> u64 {
        self.stride
    }
}
