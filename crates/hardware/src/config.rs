//! Simulator configuration.
//!
//! `Config` groups the structural capacities and layout constants that the
//! design fixes as constants but that a test harness needs to vary: ROB/LSQ/
//! BIS/IQ/PRF/ARF sizes, code memory layout, data memory size, the fixed
//! memory-issue latency, and BTB capacity. `Config::default()` reproduces the
//! reference design's constants exactly; deserializing a partial JSON
//! document overrides only the fields present.
//!
//! # Examples
//!
//! ```
//! use apex_core::config::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.rob_size, 12);
//! assert_eq!(config.prf_size, 24);
//! ```
//!
//! ```
//! use apex_core::config::Config;
//!
//! let config: Config = serde_json::from_str(r#"{"max_cycles": 1000}"#).unwrap();
//! assert_eq!(config.max_cycles, 1000);
//! assert_eq!(config.rob_size, 12); // unspecified fields keep their default
//! ```

use serde::Deserialize;

use crate::common::constants;

/// Root simulator configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of architectural registers.
    pub arf_size: usize,
    /// Number of physical registers.
    pub prf_size: usize,
    /// Reorder buffer capacity.
    pub rob_size: usize,
    /// Load/store queue capacity.
    pub lsq_size: usize,
    /// Branch instruction stack capacity (and checkpoint count).
    pub bis_size: usize,
    /// Issue queue capacity.
    pub iq_size: usize,
    /// Branch target buffer capacity.
    pub btb_size: usize,
    /// Address of the first instruction in the code image.
    pub code_base: u64,
    /// Byte distance between consecutive instructions.
    pub code_stride: u64,
    /// Number of words in data memory.
    pub data_memory_size: usize,
    /// Fixed latency, in cycles, for a load/store to drain the LSQ head.
    pub memory_latency: u64,
    /// Upper bound on cycles `run` will execute before giving up.
    pub max_cycles: u64,
    /// Emit the verbose per-stage trace format (see §6 of the design).
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            arf_size: constants::ARF_SIZE,
            prf_size: constants::PRF_SIZE,
            rob_size: constants::ROB_SIZE,
            lsq_size: constants::LSQ_SIZE,
            bis_size: constants::BIS_SIZE,
            iq_size: constants::IQ_SIZE,
            btb_size: constants::BTB_SIZE,
            code_base: constants::CODE_BASE,
            code_stride: constants::CODE_STRIDE,
            data_memory_size: constants::DATA_MEMORY_SIZE,
            memory_latency: constants::MEMORY_LATENCY,
            max_cycles: 1_000_000,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_constants() {
        let config = Config::default();
        assert_eq!(config.rob_size, 12);
        assert_eq!(config.lsq_size, 6);
        assert_eq!(config.bis_size, 2);
        assert_eq!(config.iq_size, 8);
        assert_eq!(config.prf_size, 24);
        assert_eq!(config.arf_size, 16);
        assert_eq!(config.btb_size, 8);
        assert_eq!(config.code_base, 4000);
        assert_eq!(config.code_stride, 4);
        assert_eq!(config.memory_latency, 3);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config: Config = serde_json::from_str(r#"{"verbose": true}"#).unwrap();
        assert!(config.verbose);
        assert_eq!(config.rob_size, 12);
    }
}
