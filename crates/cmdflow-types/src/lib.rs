//! Shared value types for cmdflow.
//!
//! This crate contains the types used across the cmdflow workspace: the error
//! taxonomy for every pipeline phase, qualified markup element names, and the
//! configuration structs loaded by `cmdflow-infra`.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod config;
pub mod element;
pub mod error;
