//! Trace disassembly: rendering an [`Instruction`] back to APEX assembly
//! text for the verbose per-stage trace (§6).

use crate::isa::{Instruction, Opcode};

/// Renders `instr` in its architectural (pre-rename) form, e.g.
/// `"ADD R3, R1, R2"` or `"MOVC R1, #5"`.
#[must_use]
pub fn disassemble(instr: &Instruction) -> String {
    let operands = match instr.opcode {
        Opcode::Movc => format!("{}, #{}", reg(instr.rd), instr.imm),
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::And | Opcode::Or | Opcode::Xor => {
            format!("{}, {}, {}", reg(instr.rd), reg(instr.rs1), reg(instr.rs2))
        }
        Opcode::Addl | Opcode::Subl => {
            format!("{}, {}, #{}", reg(instr.rd), reg(instr.rs1), instr.imm)
        }
        Opcode::Load => format!("{}, {}, #{}", reg(instr.rd), reg(instr.rs1), instr.imm),
        Opcode::Store => format!("{}, {}, #{}", reg(instr.rs1), reg(instr.rs2), instr.imm),
        Opcode::Ldr => format!("{}, {}, {}", reg(instr.rd), reg(instr.rs1), reg(instr.rs2)),
        Opcode::Str => format!("{}, {}, {}", reg(instr.rs1), reg(instr.rs2), reg(instr.rs3)),
        Opcode::Bz | Opcode::Bnz => format!("#{}", instr.imm),
        Opcode::Jump => format!("{}, #{}", reg(instr.rs1), instr.imm),
        Opcode::Halt => String::new(),
    };
    format!("{:<5} {}", instr.opcode.to_string(), operands.trim())
        .trim_end()
        .to_string()
}

/// Renders `instr` with its source/destination slots shown as physical
/// register tags rather than architectural names, e.g. `"ADD P7, P2, P4"`.
/// Used in the trace's `[<renamed instr>]` suffix (§6).
#[must_use]
pub fn disassemble_renamed(
    instr: &Instruction,
    phys_dest: Option<usize>,
    phys_src1: Option<usize>,
    phys_src2: Option<usize>,
) -> String {
    let operands = match instr.opcode {
        Opcode::Movc => format!("{}, #{}", phys_reg(phys_dest), instr.imm),
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::And | Opcode::Or | Opcode::Xor => {
            format!(
                "{}, {}, {}",
                phys_reg(phys_dest),
                phys_reg(phys_src1),
                phys_reg(phys_src2)
            )
        }
        Opcode::Addl | Opcode::Subl => {
            format!("{}, {}, #{}", phys_reg(phys_dest), phys_reg(phys_src1), instr.imm)
        }
        Opcode::Load => format!("{}, {}, #{}", phys_reg(phys_dest), phys_reg(phys_src1), instr.imm),
        Opcode::Store => format!("{}, {}, #{}", phys_reg(phys_src1), phys_reg(phys_src2), instr.imm),
        Opcode::Ldr => format!("{}, {}, {}", phys_reg(phys_dest), phys_reg(phys_src1), phys_reg(phys_src2)),
        Opcode::Str => format!("{}, {}", phys_reg(phys_src1), phys_reg(phys_src2)),
        Opcode::Bz | Opcode::Bnz => format!("#{}", instr.imm),
        Opcode::Jump => format!("{}, #{}", phys_reg(phys_src1), instr.imm),
        Opcode::Halt => String::new(),
    };
    format!("{:<5} {}", instr.opcode.to_string(), operands.trim())
        .trim_end()
        .to_string()
}

fn reg(slot: Option<u8>) -> String {
    slot.map_or_else(|| "-".to_string(), |r| format!("R{r}"))
}

fn phys_reg(slot: Option<usize>) -> String {
    slot.map_or_else(|| "-".to_string(), |p| format!("P{p}"))
}
