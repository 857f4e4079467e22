//! The out-of-order pipeline: rename/dispatch, issue, the functional units,
//! and in-order retirement, plus the structures that back them (§3, §4).
//!
//! 1. **ROB:** in-order commit queue.
//! 2. **LSQ:** in-order memory-op drain queue.
//! 3. **IQ:** unordered wakeup/select pool.
//! 4. **BIS / BTB:** speculative-branch bookkeeping and prediction.
//! 5. **FU:** pure compute for the INT/MUL/BRANCH functional units.
//! 6. **Engine:** the `tick`-by-`tick` driver tying all of the above together.

/// Branch instruction stack.
pub mod bis;

/// Branch target buffer.
pub mod btb;

/// Out-of-order pipeline driver: latches, dispatch, issue, and flush.
pub mod engine;

/// Pure functional-unit compute (arithmetic, addresses, branch resolution).
pub mod fu;

/// Issue queue.
pub mod iq;

/// Load/store queue.
pub mod lsq;

/// Reorder buffer.
pub mod rob;

pub use self::engine::Engine;
