//! Functional-unit compute: the pure arithmetic, effective-address, and
//! branch-resolution logic applied once an issued entry reaches the first
//! stage of its functional unit (§4.4-§4.6).
//!
//! Stage sequencing, latches, and broadcast wiring live in `engine`; this
//! module only turns operand values into results, the same split the
//! teacher keeps between its ALU decode tables and its pipeline stages.

use crate::isa::Opcode;

/// An issued instruction's payload as it flows through its functional
/// unit's stage latches. Carries `src1_tag`/`src2_tag` (not just values)
/// so the unit that finishes with this operation can release the consumer
/// counts it holds on the producing physical registers (§4.4: "decrement
/// consumer counts for the sources used").
#[derive(Debug, Clone, Copy)]
pub struct FuOp {
    pub opcode: Opcode,
    pub pc: u64,
    pub rob_index: usize,
    pub lsq_index: Option<usize>,
    pub branch_epoch: Option<u64>,
    pub dest: Option<usize>,
    pub src1_tag: Option<usize>,
    pub src1_value: i64,
    pub src2_tag: Option<usize>,
    pub src2_value: i64,
    pub literal: i64,
}

/// What a first-stage compute produced: an arithmetic result bound for the
/// PRF and a broadcast, or a memory effective address bound for the
/// write-LSQ side channel.
#[derive(Debug, Clone, Copy)]
pub enum Computed {
    Value { result: i64, zero_flag: Option<bool> },
    Address(i64),
}

/// INT1: arithmetic compute, or effective-address compute for a memory op
/// (§4.4). `STORE`/`LOAD` use the instruction's literal as the offset;
/// `STR`/`LDR` use the register-carried offset latched into `src2`.
#[must_use]
pub fn int1_compute(op: &FuOp) -> Computed {
    if op.opcode.is_memory_op() {
        let offset = match op.opcode {
            Opcode::Str | Opcode::Ldr => op.src2_value,
            _ => op.literal,
        };
        return Computed::Address(op.src1_value + offset);
    }
    let result = match op.opcode {
        Opcode::Movc => op.literal,
        Opcode::Add => op.src1_value + op.src2_value,
        Opcode::Sub => op.src1_value - op.src2_value,
        Opcode::And => op.src1_value & op.src2_value,
        Opcode::Or => op.src1_value | op.src2_value,
        Opcode::Xor => op.src1_value ^ op.src2_value,
        Opcode::Addl => op.src1_value + op.literal,
        Opcode::Subl => op.src1_value - op.literal,
        _ => 0,
    };
    let zero_flag = op.opcode.writes_zero_flag().then_some(result == 0);
    Computed::Value { result, zero_flag }
}

/// MUL1: multiply (§4.5). `MUL` never sets the zero flag.
#[must_use]
pub fn mul1_compute(op: &FuOp) -> Computed {
    Computed::Value {
        result: op.src1_value * op.src2_value,
        zero_flag: None,
    }
}

/// The outcome of resolving a `BZ`/`BNZ`/`JUMP` in the branch FU's one
/// stage.
#[derive(Debug, Clone, Copy)]
pub struct BranchResolution {
    /// Target to record in the BTB (meaningless for `JUMP`, which never
    /// uses the BTB).
    pub btb_target: u64,
    /// Corrected PC to redirect fetch to if this resolution requires a
    /// flush.
    pub redirect_pc: u64,
    pub taken: bool,
    pub mispredicted: bool,
}

/// Resolves a branch against the BTB's prediction at fetch time
/// (`predicted_taken`, read before this call updates the BTB) (§4.6).
///
/// # Panics
///
/// Panics if `op.opcode` is not `Bz`, `Bnz`, or `Jump`.
#[must_use]
pub fn resolve_branch(op: &FuOp, predicted_taken: bool) -> BranchResolution {
    match op.opcode {
        Opcode::Jump => {
            let target = (op.src1_value + op.literal) as u64;
            BranchResolution {
                btb_target: target,
                redirect_pc: target,
                taken: true,
                mispredicted: true,
            }
        }
        Opcode::Bz | Opcode::Bnz => {
            let zero_flag = op.src1_value != 0;
            let taken = if op.opcode == Opcode::Bz { zero_flag } else { !zero_flag };
            let btb_target = (op.pc as i64 + op.literal) as u64;
            let redirect_pc = if taken { btb_target } else { op.pc.wrapping_add(4) };
            BranchResolution {
                btb_target,
                redirect_pc,
                taken,
                mispredicted: taken != predicted_taken,
            }
        }
        other => unreachable!("resolve_branch called with non-branch opcode {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(opcode: Opcode) -> FuOp {
        FuOp {
            opcode,
            pc: 4000,
            rob_index: 0,
            lsq_index: None,
            branch_epoch: None,
            dest: Some(16),
            src1_tag: Some(0),
            src1_value: 0,
            src2_tag: Some(1),
            src2_value: 0,
            literal: 0,
        }
    }

    #[test]
    fn int1_add_sets_zero_flag_on_zero_result() {
        let mut o = op(Opcode::Add);
        o.src1_value = 5;
        o.src2_value = -5;
        match int1_compute(&o) {
            Computed::Value { result, zero_flag } => {
                assert_eq!(result, 0);
                assert_eq!(zero_flag, Some(true));
            }
            Computed::Address(_) => panic!("expected arithmetic result"),
        }
    }

    #[test]
    fn int1_mul_class_ops_never_set_zero_flag() {
        let mut o = op(Opcode::And);
        o.src1_value = 0;
        o.src2_value = 0;
        match int1_compute(&o) {
            Computed::Value { zero_flag, .. } => assert_eq!(zero_flag, None),
            Computed::Address(_) => panic!("expected arithmetic result"),
        }
    }

    #[test]
    fn int1_store_computes_literal_offset_address() {
        let mut o = op(Opcode::Store);
        o.src1_value = 1000;
        o.literal = 8;
        match int1_compute(&o) {
            Computed::Address(addr) => assert_eq!(addr, 1008),
            Computed::Value { .. } => panic!("expected address"),
        }
    }

    #[test]
    fn int1_str_computes_register_offset_address() {
        let mut o = op(Opcode::Str);
        o.src1_value = 1000;
        o.src2_value = 16;
        match int1_compute(&o) {
            Computed::Address(addr) => assert_eq!(addr, 1016),
            Computed::Value { .. } => panic!("expected address"),
        }
    }

    #[test]
    fn bz_taken_on_zero_flag_set() {
        let mut o = op(Opcode::Bz);
        o.src1_value = 1;
        o.literal = 16;
        let res = resolve_branch(&o, false);
        assert!(res.taken);
        assert!(res.mispredicted);
        assert_eq!(res.redirect_pc, 4016);
    }

    #[test]
    fn bnz_not_taken_falls_through() {
        let mut o = op(Opcode::Bnz);
        o.src1_value = 1;
        o.literal = 16;
        let res = resolve_branch(&o, false);
        assert!(!res.taken);
        assert!(!res.mispredicted);
        assert_eq!(res.redirect_pc, 4004);
    }

    #[test]
    fn correct_prediction_never_mispredicts() {
        let mut o = op(Opcode::Bz);
        o.src1_value = 1;
        o.literal = 16;
        let res = resolve_branch(&o, true);
        assert!(!res.mispredicted);
    }

    #[test]
    fn jump_always_flushes() {
        let mut o = op(Opcode::Jump);
        o.src1_value = 2000;
        o.literal = 4;
        let res = resolve_branch(&o, true);
        assert!(res.mispredicted);
        assert_eq!(res.redirect_pc, 2004);
    }
}
