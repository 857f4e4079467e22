//! Error types for the driver API and instruction loader.
//!
//! Nothing inside the per-cycle tick path returns `Result`: structural stalls
//! and branch mispredictions are ordinary control flow, not errors (see the
//! module docs on `core::pipeline::engine`). `SimError` only surfaces at the
//! boundary the spec calls out explicitly — `init`, and the loader it wraps.

use thiserror::Error;

/// Errors returned by [`crate::sim::Simulator::init`] and the instruction loader.
#[derive(Debug, Error)]
pub enum SimError {
    /// The program file could not be opened or read.
    #[error("cannot read program file {path}: {source}")]
    ProgramFileUnreadable {
        /// Path that was passed to `init`.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A line in the program file did not parse as a valid instruction.
    #[error("malformed instruction on line {line}: {text:?}")]
    MalformedInstruction {
        /// 1-based line number in the source file.
        line: usize,
        /// The offending line, verbatim.
        text: String,
    },

    /// The program contains more instructions than the code image can address
    /// without exceeding the configured base/stride layout.
    #[error("program has {count} instructions, which overflows the code image")]
    ProgramTooLarge {
        /// Number of instructions the loader parsed.
        count: usize,
    },
}
