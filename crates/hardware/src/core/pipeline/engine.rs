//! The out-of-order pipeline driver.
//!
//! `Engine::tick` runs one cycle of fetch → rename/dispatch → issue →
//! execute → memory → retire, in the back-to-front stage order the design
//! requires (§5): downstream stages are processed before the upstream
//! stages that feed them, so a value a stage produces this cycle only
//! becomes visible to a stage that reads it next cycle — never within the
//! same cycle. Flush is the one exception: a branch resolved this cycle is
//! applied at the very end of `tick`, after every other stage (including
//! speculative dispatch/fetch beyond it) has already run.
//!
//! `Engine` owns every structure that is pipeline bookkeeping rather than
//! committed architectural state — ROB, LSQ, IQ, BIS, BTB, and the
//! functional-unit stage latches. `Cpu` (registers, rename, memory) is
//! passed in by `&mut` rather than embedded, so a flush can restore it
//! (rename/free-list) without the engine needing to own it.

use crate::config::Config;
use crate::core::cpu::Cpu;
use crate::core::pipeline::bis::Bis;
use crate::core::pipeline::btb::Btb;
use crate::core::pipeline::fu::{self, FuOp};
use crate::core::pipeline::iq::{Iq, IqEntry};
use crate::core::pipeline::lsq::{Lsq, LsqEntry, MemOpKind};
use crate::core::pipeline::rob::Rob;
use crate::core::regfile::PhysicalRegisterFile;
use crate::isa::{FuClass, Instruction, Opcode};
use crate::stats::Stats;

/// What a resolved branch or jump requires of the end-of-cycle flush.
enum FlushRequest {
    /// `JUMP`: dispatch froze fetch/decode at its own dispatch, so nothing
    /// younger was ever allowed to enter the machine. Flushing reduces to
    /// clearing the freeze and redirecting the PC.
    Jump { redirect_pc: u64 },
    /// A mispredicted `BZ`/`BNZ`: every structure speculative under it
    /// (sequence numbers ≥ `cutoff`) is discarded, and rename/free-list is
    /// restored from `checkpoint_slot` (§4.9).
    Branch {
        cutoff: u64,
        rob_keep_index: usize,
        checkpoint_slot: usize,
        redirect_pc: u64,
    },
}

/// The out-of-order pipeline: rename/dispatch, issue, functional units, and
/// in-order retirement, plus the structures backing them (§3, §4).
pub struct Engine {
    pub rob: Rob,
    pub lsq: Lsq,
    pub iq: Iq,
    pub bis: Bis,
    pub btb: Btb,

    memory_latency: u8,
    code_stride: u64,

    /// Set once a `JUMP` dispatches; cleared again when that jump's own
    /// flush runs. `HALT` stops fetch through `cpu.halted` instead.
    freeze_fetch_decode: bool,
    /// Instruction fetched last cycle, waiting for dispatch to consume it.
    fetch_latch: Option<(u64, Instruction)>,
    /// Physical tag of the most recently dispatched zero-flag writer
    /// (ADD/SUB/ADDL/SUBL); `None` before the first one dispatches (§4.2
    /// "branch source readiness policy").
    last_zero_flag_producer: Option<usize>,

    int1: Option<FuOp>,
    int2: Option<(FuOp, i64, Option<bool>)>,
    write_lsq: Option<(FuOp, i64)>,
    mul1: Option<FuOp>,
    mul2: Option<(FuOp, i64)>,
    mul3: Option<(FuOp, i64)>,
    branch: Option<FuOp>,
}

impl Engine {
    /// Builds an empty engine sized per `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            rob: Rob::new(config.rob_size),
            lsq: Lsq::new(config.lsq_size),
            iq: Iq::new(config.iq_size),
            bis: Bis::new(config.bis_size),
            btb: Btb::new(config.btb_size),
            memory_latency: config.memory_latency.min(u64::from(u8::MAX)) as u8,
            code_stride: config.code_stride,
            freeze_fetch_decode: false,
            fetch_latch: None,
            last_zero_flag_producer: None,
            int1: None,
            int2: None,
            write_lsq: None,
            mul1: None,
            mul2: None,
            mul3: None,
            branch: None,
        }
    }

    /// Whether the pipeline has fully drained: nothing left in the ROB, IQ,
    /// or LSQ, and no functional-unit stage occupied. Combined with
    /// `cpu.halted`, tells `run` it is safe to stop.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.rob.is_empty()
            && self.iq.is_empty()
            && self.lsq.is_empty()
            && self.int1.is_none()
            && self.int2.is_none()
            && self.mul1.is_none()
            && self.mul2.is_none()
            && self.mul3.is_none()
            && self.branch.is_none()
            && self.write_lsq.is_none()
    }

    /// Runs one cycle (§5).
    pub fn tick(&mut self, cpu: &mut Cpu, stats: &mut Stats) {
        stats.cycles += 1;
        cpu.cycle += 1;

        self.retire_stage(cpu, stats);
        self.memory_stage(cpu);
        let flush_request = self.branch_stage(cpu, stats);

        if let Some((op, address)) = self.write_lsq.take() {
            if let Some(idx) = op.lsq_index {
                if let Some(entry) = self.lsq.get_mut(idx) {
                    entry.address = address;
                    entry.address_valid = true;
                }
            }
            release_sources(&mut cpu.prf, &op);
        }

        if let Some((op, value)) = self.mul3.take() {
            self.complete_and_broadcast(cpu, &op, value, None);
        }
        self.mul3 = self.mul2.take();

        if let Some(op) = self.mul1.take() {
            let value = match fu::mul1_compute(&op) {
                fu::Computed::Value { result, .. } => result,
                fu::Computed::Address(_) => unreachable!("MUL never computes an address"),
            };
            self.mul2 = Some((op, value));
        }

        if let Some((op, value, zero_flag)) = self.int2.take() {
            self.complete_and_broadcast(cpu, &op, value, zero_flag);
        }

        if let Some(op) = self.int1.take() {
            match fu::int1_compute(&op) {
                fu::Computed::Value { result, zero_flag } => {
                    self.int2 = Some((op, result, zero_flag));
                }
                fu::Computed::Address(addr) => {
                    self.write_lsq = Some((op, addr));
                }
            }
        }

        self.issue_stage();
        self.dispatch_stage(cpu, stats);
        self.fetch_stage(cpu, stats);

        if let Some(request) = flush_request {
            self.apply_flush(cpu, request);
        }
    }

    fn complete_and_broadcast(&mut self, cpu: &mut Cpu, op: &FuOp, value: i64, zero_flag: Option<bool>) {
        if let Some(dest) = op.dest {
            cpu.prf.complete(dest, value, zero_flag);
            self.iq.broadcast(dest, value, zero_flag);
            self.lsq.broadcast(dest, value);
        }
        if let Some(entry) = self.rob.get_mut(op.rob_index) {
            entry.result = value;
            entry.result_valid = true;
        }
        release_sources(&mut cpu.prf, op);
    }

    fn retire_stage(&mut self, cpu: &mut Cpu, stats: &mut Stats) {
        let Some(entry) = self.rob.commit_head() else {
            return;
        };

        if entry.opcode == Opcode::Halt {
            cpu.halted = true;
            self.reclaim_free_registers(cpu);
            return;
        }

        if entry.opcode.writes_arch_reg() {
            if let Some(arch) = entry.arch_dest {
                cpu.arf.write(arch, entry.result);
            }
        }

        if entry.opcode.is_conditional_branch() {
            if let Some(bis_entry) = self.bis.pop_head() {
                cpu.checkpoints.release(bis_entry.checkpoint_slot);
            }
        }

        if entry.opcode.is_load() {
            stats.inst_load += 1;
        } else if entry.opcode.is_store() {
            stats.inst_store += 1;
        } else if matches!(entry.opcode, Opcode::Bz | Opcode::Bnz | Opcode::Jump) {
            stats.inst_branch += 1;
        } else {
            stats.inst_alu += 1;
        }

        cpu.retired += 1;
        stats.instructions_retired = cpu.retired;
        #[cfg(feature = "commit-log")]
        println!(
            "commit cycle={} pc={:#06x} {} -> {}",
            cpu.cycle, entry.pc, entry.opcode, entry.result
        );
        self.reclaim_free_registers(cpu);
    }

    /// Opportunistic free-list sweep (§4.8, §3 invariant 3): a physical
    /// register returns to the free list once it backs no architectural
    /// register, has no outstanding IQ/LSQ consumer, and no in-flight ROB
    /// entry still names it as a destination. Subsumes the literal
    /// per-instruction reclaim the design spells out, at the cost of an
    /// O(prf_size) scan every retiring cycle — trivial at this scale.
    fn reclaim_free_registers(&mut self, cpu: &mut Cpu) {
        for p in 0..cpu.prf.len() {
            if cpu.rename.is_free(p) || cpu.rename.is_mapped(p) {
                continue;
            }
            if cpu.prf.get(p).consumers > 0 {
                continue;
            }
            let mut targeted = false;
            self.rob.for_each(|_, e| {
                if e.phys_dest == Some(p) {
                    targeted = true;
                }
            });
            if targeted {
                continue;
            }
            cpu.rename.free(p);
            cpu.prf.reclaim(p);
        }
    }

    fn memory_stage(&mut self, cpu: &mut Cpu) {
        let Some(rob_head) = self.rob.head_index() else {
            return;
        };
        let Some(head_idx) = self.lsq.head_index() else {
            return;
        };
        let ready = self.lsq.get(head_idx).is_some_and(|e| e.ready_to_drain(rob_head));
        if !ready {
            return;
        }
        {
            let entry = self.lsq.get_mut(head_idx).expect("checked occupied above");
            entry.drain_cycles += 1;
            if entry.drain_cycles < self.memory_latency {
                return;
            }
        }
        let entry = self.lsq.pop_head().expect("head was just verified occupied");
        match entry.kind {
            MemOpKind::Store => {
                cpu.memory.write(entry.address, entry.store_value);
                if let Some(tag) = entry.store_value_tag {
                    cpu.prf.remove_consumer(tag);
                }
            }
            MemOpKind::Load => {
                let value = cpu.memory.read(entry.address);
                if let Some(dest) = entry.load_dest {
                    cpu.prf.complete(dest, value, None);
                    self.iq.broadcast(dest, value, None);
                    self.lsq.broadcast(dest, value);
                }
                if let Some(rob_entry) = self.rob.get_mut(entry.rob_index) {
                    rob_entry.result = value;
                }
            }
        }
        if let Some(rob_entry) = self.rob.get_mut(entry.rob_index) {
            rob_entry.result_valid = true;
        }
    }

    fn branch_stage(&mut self, cpu: &mut Cpu, stats: &mut Stats) -> Option<FlushRequest> {
        let op = self.branch.take()?;
        release_sources(&mut cpu.prf, &op);
        if let Some(rob_entry) = self.rob.get_mut(op.rob_index) {
            rob_entry.result_valid = true;
        }

        if op.opcode == Opcode::Jump {
            stats.flushes += 1;
            let redirect_pc = (op.src1_value + op.literal) as u64;
            return Some(FlushRequest::Jump { redirect_pc });
        }

        let predicted_taken = self.btb.history(op.pc);
        let resolution = fu::resolve_branch(&op, predicted_taken);
        self.btb.update(op.pc, resolution.btb_target, resolution.taken);

        if !resolution.mispredicted {
            return None;
        }
        stats.branch_mispredictions += 1;
        stats.flushes += 1;
        let bis_entry = self
            .bis
            .find_by_rob(op.rob_index)
            .expect("a dispatched conditional branch always has a BIS entry");
        Some(FlushRequest::Branch {
            cutoff: bis_entry.seq,
            rob_keep_index: bis_entry.rob_index,
            checkpoint_slot: bis_entry.checkpoint_slot,
            redirect_pc: resolution.redirect_pc,
        })
    }

    fn issue_stage(&mut self) {
        if let Some(slot) = self.iq.select_ready(FuClass::Int) {
            let entry = self.iq.take(slot).expect("select_ready named an occupied slot");
            self.int1 = Some(to_fu_op(&entry));
        }
        if let Some(slot) = self.iq.select_ready(FuClass::Mul) {
            let entry = self.iq.take(slot).expect("select_ready named an occupied slot");
            self.mul1 = Some(to_fu_op(&entry));
        }
        if let Some(slot) = self.iq.select_ready(FuClass::Branch) {
            let entry = self.iq.take(slot).expect("select_ready named an occupied slot");
            self.branch = Some(to_fu_op(&entry));
        }
    }

    fn dispatch_stage(&mut self, cpu: &mut Cpu, stats: &mut Stats) {
        let Some((pc, instr)) = self.fetch_latch else {
            return;
        };
        if self.try_dispatch(cpu, stats, pc, instr) {
            self.fetch_latch = None;
        }
    }

    fn try_dispatch(&mut self, cpu: &mut Cpu, stats: &mut Stats, pc: u64, instr: Instruction) -> bool {
        let needs_lsq = instr.opcode.is_memory_op();
        let needs_bis = instr.opcode.is_conditional_branch();
        let needs_phys = instr.opcode.writes_arch_reg();

        if self.rob.is_full() {
            stats.stalls_rob += 1;
            return false;
        }
        if needs_lsq && self.lsq.is_full() {
            stats.stalls_lsq += 1;
            return false;
        }
        if needs_bis && (self.bis.is_full() || cpu.checkpoints.free_slot().is_none()) {
            stats.stalls_bis += 1;
            return false;
        }
        if self.iq.is_full() {
            stats.stalls_iq += 1;
            return false;
        }
        if needs_phys && cpu.rename.free_count() == 0 {
            stats.stalls_prf += 1;
            return false;
        }

        let branch_epoch = self.bis.youngest_seq();

        let (src1_tag, src1_value, src1_ready, src1_wants_zero_flag) = if instr.opcode.is_conditional_branch() {
            match self.last_zero_flag_producer {
                None => (None, 0, true, true),
                Some(tag) => {
                    let reg = cpu.prf.get(tag);
                    (Some(tag), i64::from(reg.zero_flag), reg.valid, true)
                }
            }
        } else {
            let (tag, value, ready) = resolve_operand(cpu, iq_src1_reg(&instr));
            (tag, value, ready, false)
        };
        let (src2_tag, src2_value, src2_ready) = resolve_operand(cpu, iq_src2_reg(&instr));

        let mut phys_dest = None;
        if needs_phys {
            let p = cpu.rename.alloc().expect("free_count checked above");
            let arch = instr.rd.expect("writes_arch_reg implies rd is set");
            cpu.rename.remap(arch, p);
            phys_dest = Some(p);
        }

        let rob_index = self
            .rob
            .allocate(pc, instr.opcode, instr.rd, phys_dest)
            .expect("is_full checked above");

        if instr.opcode == Opcode::Halt {
            self.rob.get_mut(rob_index).expect("just allocated").result_valid = true;
            self.freeze_fetch_decode = true;
        }

        let mut lsq_index = None;
        if needs_lsq {
            let (addr_base_tag, addr_base_value, addr_base_ready) = (src1_tag, src1_value, src1_ready);
            let (offset_tag, offset_value, offset_ready) = if instr.opcode == Opcode::Str {
                (src2_tag, src2_value, src2_ready)
            } else {
                (None, 0, true)
            };
            let (store_value_tag, store_value, store_value_ready) = resolve_operand(cpu, store_value_reg(&instr));

            let entry = LsqEntry {
                kind: if instr.opcode.is_load() { MemOpKind::Load } else { MemOpKind::Store },
                pc,
                rob_index,
                branch_epoch,
                addr_base_tag,
                addr_base_value,
                addr_base_ready,
                offset_tag,
                offset_value,
                offset_ready,
                literal: instr.imm,
                address: 0,
                address_valid: false,
                store_value_tag,
                store_value,
                store_value_ready,
                load_dest: phys_dest,
                drain_cycles: 0,
            };
            if let Some(tag) = store_value_tag {
                cpu.prf.add_consumer(tag);
            }
            let idx = self.lsq.allocate(entry).expect("is_full checked above");
            lsq_index = Some(idx);
        }

        if needs_bis {
            let slot = cpu.checkpoints.free_slot().expect("checked above");
            cpu.checkpoints.save(slot, &cpu.rename, self.last_zero_flag_producer);
            self.bis
                .dispatch(pc, rob_index, slot)
                .expect("is_full checked above");
            self.btb.insert_if_absent(pc);
        }

        if instr.opcode == Opcode::Jump {
            self.freeze_fetch_decode = true;
        }

        if instr.opcode.writes_zero_flag() {
            self.last_zero_flag_producer = phys_dest;
        }

        if let Some(tag) = src1_tag {
            cpu.prf.add_consumer(tag);
        }
        if let Some(tag) = src2_tag {
            cpu.prf.add_consumer(tag);
        }

        let iq_entry = IqEntry {
            opcode: instr.opcode,
            pc,
            fu_class: instr.opcode.fu_class(),
            literal: instr.imm,
            src1_tag,
            src1_value,
            src1_ready,
            src1_wants_zero_flag,
            src2_tag,
            src2_value,
            src2_ready,
            dest: phys_dest,
            rob_index,
            lsq_index,
            branch_epoch,
        };
        self.iq.allocate(iq_entry).expect("is_full checked above");
        true
    }

    fn fetch_stage(&mut self, cpu: &mut Cpu, stats: &mut Stats) {
        if self.freeze_fetch_decode || self.fetch_latch.is_some() || cpu.halted {
            return;
        }
        let Some(&instr) = cpu.code.fetch(cpu.pc) else {
            return;
        };
        let pc = cpu.pc;
        if instr.opcode.is_conditional_branch() {
            stats.branch_predictions += 1;
        }
        let next_pc = self.btb.predict(pc).unwrap_or(pc + self.code_stride);
        self.fetch_latch = Some((pc, instr));
        cpu.pc = next_pc;
    }

    fn apply_flush(&mut self, cpu: &mut Cpu, request: FlushRequest) {
        match request {
            FlushRequest::Jump { redirect_pc } => {
                self.fetch_latch = None;
                self.freeze_fetch_decode = false;
                cpu.pc = redirect_pc;
            }
            FlushRequest::Branch {
                cutoff,
                rob_keep_index,
                checkpoint_slot,
                redirect_pc,
            } => {
                self.iq.flush_after(cutoff);
                self.lsq.flush_younger(cutoff);
                self.rob.flush_after(rob_keep_index);
                for dropped in self.bis.flush_after(cutoff) {
                    cpu.checkpoints.release(dropped.checkpoint_slot);
                }
                clear_if_speculative(&mut self.int1, cutoff, |op| op.branch_epoch);
                clear_if_speculative(&mut self.int2, cutoff, |(op, _, _)| op.branch_epoch);
                clear_if_speculative(&mut self.write_lsq, cutoff, |(op, _)| op.branch_epoch);
                clear_if_speculative(&mut self.mul1, cutoff, |op| op.branch_epoch);
                clear_if_speculative(&mut self.mul2, cutoff, |(op, _)| op.branch_epoch);
                clear_if_speculative(&mut self.mul3, cutoff, |(op, _)| op.branch_epoch);
                clear_if_speculative(&mut self.branch, cutoff, |op| op.branch_epoch);
                let (rename, zero_flag_producer) = cpu.checkpoints.restore(checkpoint_slot);
                cpu.rename = rename;
                self.last_zero_flag_producer = zero_flag_producer;
                self.fetch_latch = None;
                cpu.pc = redirect_pc;
            }
        }
    }
}

/// Clears `latch` if it holds a value speculative under `cutoff` — i.e. its
/// branch epoch is the misprediction's own epoch or younger (§4.9).
fn clear_if_speculative<T>(latch: &mut Option<T>, cutoff: u64, epoch_of: impl Fn(&T) -> Option<u64>) {
    if latch.as_ref().is_some_and(|v| epoch_of(v).is_some_and(|e| e >= cutoff)) {
        *latch = None;
    }
}

fn release_sources(prf: &mut PhysicalRegisterFile, op: &FuOp) {
    if let Some(tag) = op.src1_tag {
        prf.remove_consumer(tag);
    }
    if let Some(tag) = op.src2_tag {
        prf.remove_consumer(tag);
    }
}

fn to_fu_op(entry: &IqEntry) -> FuOp {
    FuOp {
        opcode: entry.opcode,
        pc: entry.pc,
        rob_index: entry.rob_index,
        lsq_index: entry.lsq_index,
        branch_epoch: entry.branch_epoch,
        dest: entry.dest,
        src1_tag: entry.src1_tag,
        src1_value: entry.src1_value,
        src2_tag: entry.src2_tag,
        src2_value: entry.src2_value,
        literal: entry.literal,
    }
}

fn resolve_operand(cpu: &Cpu, arch: Option<u8>) -> (Option<usize>, i64, bool) {
    match arch {
        None => (None, 0, true),
        Some(a) => {
            let tag = cpu.rename.mapping(a);
            let reg = cpu.prf.get(tag);
            (Some(tag), reg.value, reg.valid)
        }
    }
}

/// The issue queue's `src1` register for this opcode: the address-base
/// register for memory ops (`rs1` for LOAD/LDR, `rs2` for STORE/STR), `rs1`
/// otherwise. `None` for MOVC/HALT (no sources) and for BZ/BNZ, whose
/// zero-flag source is resolved separately.
fn iq_src1_reg(instr: &Instruction) -> Option<u8> {
    match instr.opcode {
        Opcode::Load | Opcode::Ldr => instr.rs1,
        Opcode::Store | Opcode::Str => instr.rs2,
        Opcode::Movc | Opcode::Halt | Opcode::Bz | Opcode::Bnz => None,
        _ => instr.rs1,
    }
}

/// The issue queue's `src2` register: the offset register for LDR/STR, the
/// second operand for two-register arithmetic, `None` otherwise (LOAD/STORE
/// use a literal offset; ADDL/SUBL/JUMP/BZ/BNZ have only one source).
fn iq_src2_reg(instr: &Instruction) -> Option<u8> {
    match instr.opcode {
        Opcode::Ldr => instr.rs2,
        Opcode::Str => instr.rs3,
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::And | Opcode::Or | Opcode::Xor => instr.rs2,
        _ => None,
    }
}

/// The store-value register (`rs1` for STORE/STR), read from the PRF
/// directly rather than forwarded through the IQ's src1/src2 (§9).
fn store_value_reg(instr: &Instruction) -> Option<u8> {
    match instr.opcode {
        Opcode::Store | Opcode::Str => instr.rs1,
        _ => None,
    }
}
