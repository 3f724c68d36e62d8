//! The Build -> Link -> Init pipeline.
//!
//! - Build: every registered `BindingHandler` parses its sources and
//!   registers top-level commands into the catalog.
//! - Link (`link`): static references are replaced by their catalog
//!   targets; dynamic references are bound to the catalog.
//! - Init (`init`): initialization contracts run once per reachable command.

use cmdflow_observe::attrs;
use cmdflow_types::error::{BindingError, FlowError, InitError, LinkError};

use crate::catalog::CommandCatalog;

mod init;
mod link;

pub use init::initialize_catalog;
pub use link::link_catalog;

/// A source of top-level commands, typically a markup document parser.
///
/// `build` may run more than once against the same catalog; entries it
/// registers again simply overwrite the previous ones.
pub trait BindingHandler<C> {
    fn build(&mut self, catalog: &CommandCatalog<C>) -> Result<(), BindingError>;
}

/// Runs the pipeline over a set of binding handlers and one catalog.
pub struct CommandBuilder<C> {
    handlers: Vec<Box<dyn BindingHandler<C>>>,
    catalog: CommandCatalog<C>,
}

impl<C: 'static> Default for CommandBuilder<C> {
    fn default() -> Self {
        Self::new(CommandCatalog::new())
    }
}

impl<C: 'static> CommandBuilder<C> {
    pub fn new(catalog: CommandCatalog<C>) -> Self {
        Self {
            handlers: Vec::new(),
            catalog,
        }
    }

    pub fn add_binding_handler(&mut self, handler: impl BindingHandler<C> + 'static) -> &mut Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn catalog(&self) -> &CommandCatalog<C> {
        &self.catalog
    }

    pub fn set_catalog(&mut self, catalog: CommandCatalog<C>) {
        self.catalog = catalog;
    }

    /// Run every handler against the catalog, in registration order.
    pub fn build(&mut self) -> Result<(), BindingError> {
        let span = tracing::info_span!(attrs::SPAN_BUILD, handlers = self.handlers.len());
        let _enter = span.enter();

        for handler in &mut self.handlers {
            handler.build(&self.catalog)?;
        }
        tracing::info!({ attrs::CATALOG_SIZE } = self.catalog.len(), "build complete");
        Ok(())
    }

    pub fn link(&self) -> Result<(), LinkError> {
        link_catalog(&self.catalog)
    }

    pub fn init(&self) -> Result<(), InitError> {
        initialize_catalog(&self.catalog)
    }

    /// Remove every catalog entry.
    pub fn clean(&self) {
        tracing::debug!({ attrs::CATALOG_SIZE } = self.catalog.len(), "clearing catalog");
        self.catalog.clear();
    }

    /// Build, Link and Init.
    pub fn make(&mut self) -> Result<(), FlowError> {
        self.build()?;
        self.link()?;
        self.init()?;
        Ok(())
    }
}
