//! Capability-scoped script execution.
//!
//! Runs caller-supplied Rhai scripts against an explicit allow-list of host
//! functions and captures everything they print into a single buffer. A
//! fresh engine is built per call; the only way a script touches the host
//! is through the injected capabilities (output capture, CSV parsing,
//! table formatting, chart writing, JSON codec). This is functional
//! isolation for a demo workload, not a hardened security boundary.

mod chart;
mod engine;
mod error;

pub use chart::{Bar, ChartConfig};
pub use engine::ScriptSandbox;
pub use error::{Error, Result};
