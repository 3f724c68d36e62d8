//! Init phase: run initialization contracts over every reachable command.

use std::collections::HashSet;

use cmdflow_observe::attrs;
use cmdflow_types::error::InitError;

use crate::catalog::CommandCatalog;
use crate::command::{SharedCommand, identity};

/// Initialize every command reachable from the catalog, each instance once.
pub fn initialize_catalog<C: 'static>(catalog: &CommandCatalog<C>) -> Result<(), InitError> {
    let span = tracing::info_span!(attrs::SPAN_INIT, { attrs::CATALOG_SIZE } = catalog.len());
    let _enter = span.enter();

    let entries = catalog.snapshot();
    let mut names: Vec<&String> = entries.keys().collect();
    names.sort();

    let mut visited = HashSet::new();
    let mut initialized = 0usize;
    for name in names {
        initialize_tree(&entries[name], &mut visited, &mut initialized)?;
    }

    tracing::info!(initialized, visited = visited.len(), "init complete");
    Ok(())
}

fn initialize_tree<C: 'static>(
    command: &SharedCommand<C>,
    visited: &mut HashSet<usize>,
    initialized: &mut usize,
) -> Result<(), InitError> {
    if !visited.insert(identity(command)) {
        return Ok(());
    }
    if let Some(initializable) = command.as_initializable() {
        initializable.initialize()?;
        *initialized += 1;
    }
    if let Some(composite) = command.as_composite() {
        for child in composite.children().snapshot() {
            initialize_tree(&child, visited, initialized)?;
        }
    }
    Ok(())
}
