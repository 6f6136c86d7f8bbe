//! In-memory tabular dataset and the restricted query surface over it.
//!
//! This crate owns the fixed five-column iris dataset and answers a
//! deliberately narrow slice of SQL: the only verb is SELECT, and the only
//! structured query is a grouped-mean aggregation over the species column.
//! Everything else a SELECT could mean falls back to dumping the full
//! dataset as CSV. That fallback is intended behavior, not a stub to be
//! replaced with a query planner.

mod engine;
mod error;
mod record;

pub use engine::QueryEngine;
pub use error::{Error, Result};
pub use record::{Dataset, Record};
