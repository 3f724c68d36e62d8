//! Command model and catalog pipeline for cmdflow.
//!
//! This crate defines the executable command tree, the named catalog that
//! owns it, and the Build -> Link -> Init pipeline that assembles it. Markup
//! parsing and concrete resources live in `cmdflow-infra`; this crate only
//! defines the contracts they implement (`BindingHandler`, `Resource`,
//! `ResourceResolver`).

pub mod builder;
pub mod catalog;
pub mod command;
pub mod expression;
pub mod factory;
pub mod property;
pub mod resource;
