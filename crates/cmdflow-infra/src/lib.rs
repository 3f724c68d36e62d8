//! Infrastructure layer for cmdflow.
//!
//! Concrete implementations of the contracts defined in `cmdflow-core`:
//! filesystem, embedded and remote resources with the default scheme-based
//! resolver chain, the streaming markup binding handler with its element
//! processors and the v1 dialect, and the `cmdflow.toml` loader.

pub mod binding;
pub mod config;
pub mod resource;

pub use binding::dialect::{XmlBindingFactory, build_xml_catalog, top_level_namespace};
pub use binding::handler::XmlBindingHandler;
pub use resource::DefaultResourceResolver;
