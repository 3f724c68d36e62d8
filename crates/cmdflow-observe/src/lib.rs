//! Observability helpers for cmdflow.
//!
//! - `attrs` -- span and field names shared by the core and infra crates
//! - `tracing_setup` -- subscriber initialization for host applications

pub mod attrs;
pub mod tracing_setup;
