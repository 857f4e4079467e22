//! Simulation statistics collection and reporting.

use std::time::Instant;

/// Counters accumulated over the course of one `run`.
#[derive(Debug)]
pub struct Stats {
    /// Wall-clock start of the run, for host-throughput reporting.
    start_time: Instant,
    /// Cycles executed.
    pub cycles: u64,
    /// Instructions retired (HALT itself is not counted).
    pub instructions_retired: u64,
    /// Retired loads (LOAD/LDR).
    pub inst_load: u64,
    /// Retired stores (STORE/STR).
    pub inst_store: u64,
    /// Retired branches/jumps (BZ/BNZ/JUMP).
    pub inst_branch: u64,
    /// Retired arithmetic/MOVC instructions.
    pub inst_alu: u64,
    /// Branch predictions made at fetch time.
    pub branch_predictions: u64,
    /// Branch mispredictions detected at the branch FU.
    pub branch_mispredictions: u64,
    /// Cycles dispatch stalled because the ROB was full.
    pub stalls_rob: u64,
    /// Cycles dispatch stalled because the LSQ was full.
    pub stalls_lsq: u64,
    /// Cycles dispatch stalled because the BIS/checkpoints were exhausted.
    pub stalls_bis: u64,
    /// Cycles dispatch stalled because the IQ was full.
    pub stalls_iq: u64,
    /// Cycles dispatch stalled because no physical register was free.
    pub stalls_prf: u64,
    /// Flushes executed (mispredictions + JUMPs).
    pub flushes: u64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: 0,
            instructions_retired: 0,
            inst_load: 0,
            inst_store: 0,
            inst_branch: 0,
            inst_alu: 0,
            branch_predictions: 0,
            branch_mispredictions: 0,
            stalls_rob: 0,
            stalls_lsq: 0,
            stalls_bis: 0,
            stalls_iq: 0,
            stalls_prf: 0,
            flushes: 0,
        }
    }
}

impl Stats {
    /// Prints a labeled statistics report to stdout.
    pub fn print(&self) {
        let seconds = self.start_time.elapsed().as_secs_f64();
        let cyc = self.cycles.max(1);
        let instr = self.instructions_retired.max(1);
        let ipc = self.instructions_retired as f64 / cyc as f64;
        let mispredict_rate = if self.branch_predictions == 0 {
            0.0
        } else {
            self.branch_mispredictions as f64 / self.branch_predictions as f64 * 100.0
        };

        println!("\n==========================================================");
        println!("APEX SIMULATION STATISTICS");
        println!("==========================================================");
        println!("host_seconds             {seconds:.4} s");
        println!("sim_cycles               {}", self.cycles);
        println!("sim_insts                {}", self.instructions_retired);
        println!("sim_ipc                  {ipc:.4}");
        println!("----------------------------------------------------------");
        println!("INSTRUCTION MIX");
        println!(
            "  alu                    {} ({:.2}%)",
            self.inst_alu,
            self.inst_alu as f64 / instr as f64 * 100.0
        );
        println!(
            "  load                   {} ({:.2}%)",
            self.inst_load,
            self.inst_load as f64 / instr as f64 * 100.0
        );
        println!(
            "  store                  {} ({:.2}%)",
            self.inst_store,
            self.inst_store as f64 / instr as f64 * 100.0
        );
        println!(
            "  branch                 {} ({:.2}%)",
            self.inst_branch,
            self.inst_branch as f64 / instr as f64 * 100.0
        );
        println!("----------------------------------------------------------");
        println!("BRANCH PREDICTION");
        println!("  predictions            {}", self.branch_predictions);
        println!("  mispredictions         {}", self.branch_mispredictions);
        println!("  mispredict_rate        {mispredict_rate:.2}%");
        println!("  flushes                {}", self.flushes);
        println!("----------------------------------------------------------");
        println!("DISPATCH STALLS (cycles)");
        println!("  rob_full               {}", self.stalls_rob);
        println!("  lsq_full               {}", self.stalls_lsq);
        println!("  bis_full               {}", self.stalls_bis);
        println!("  iq_full                {}", self.stalls_iq);
        println!("  prf_exhausted          {}", self.stalls_prf);
        println!("==========================================================");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zeroed() {
        let stats = Stats::default();
        assert_eq!(stats.cycles, 0);
        assert_eq!(stats.instructions_retired, 0);
        assert_eq!(stats.flushes, 0);
    }
}
