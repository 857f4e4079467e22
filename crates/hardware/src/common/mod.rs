//! Common utilities and types shared across the simulator.
//!
//! 1. **Constants:** structural capacities and code-memory layout defaults.
//! 2. **Error Handling:** the typed error surface returned by `init`/loader paths.

/// Default capacities and layout constants, overridable via [`crate::config::Config`].
pub mod constants;

/// Error types returned by the driver API.
pub mod error;

pub use error::SimError;
