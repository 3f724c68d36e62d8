//! Link phase: rewrite static references into direct command pointers.
//!
//! Two passes over a snapshot of the catalog:
//!
//! 1. Build a `DiGraph` of catalog names with an edge for every static
//!    reference reachable from an entry, and run `toposort` on it. Unknown
//!    names and cycles (including self-references and alias chains) fail
//!    here, before anything is rewritten.
//! 2. Walk every entry depth-first. A static reference is replaced in its
//!    parent slot by the entry it names, following alias entries down to the
//!    first command that is not a static reference. Dynamic references are
//!    bound to the catalog and left in place.

use std::collections::{HashMap, HashSet};

use cmdflow_observe::attrs;
use cmdflow_types::error::LinkError;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::catalog::{CommandCatalog, CommandMap};
use crate::command::{SharedCommand, identity};

/// Link every entry of `catalog` in place.
pub fn link_catalog<C: 'static>(catalog: &CommandCatalog<C>) -> Result<(), LinkError> {
    let span = tracing::info_span!(attrs::SPAN_LINK, { attrs::CATALOG_SIZE } = catalog.len());
    let _enter = span.enter();

    let entries = catalog.snapshot();
    check_reference_graph(&entries)?;

    let mut visited = HashSet::new();
    let mut linked = CommandMap::with_capacity(entries.len());
    let mut aliases = 0usize;
    let mut rewritten = 0usize;

    for (name, command) in entries.iter() {
        let command = match command.as_reference() {
            Some(reference) if !reference.is_dynamic() => {
                aliases += 1;
                resolve_static(&entries, reference.name(), name)?
            }
            Some(reference) => {
                reference.bind(catalog);
                command.clone()
            }
            None => command.clone(),
        };
        rewritten += link_tree(&command, &entries, catalog, &mut visited)?;
        linked.insert(name.clone(), command);
    }

    if aliases > 0 {
        catalog.set_commands(linked);
    }

    tracing::info!(rewritten, aliases, "link complete");
    Ok(())
}

// ---------------------------------------------------------------------------
// Reference graph validation
// ---------------------------------------------------------------------------

fn check_reference_graph<C: 'static>(entries: &CommandMap<C>) -> Result<(), LinkError> {
    let mut graph = DiGraph::<&str, ()>::new();
    let nodes: HashMap<&str, NodeIndex> = entries
        .keys()
        .map(|name| (name.as_str(), graph.add_node(name.as_str())))
        .collect();

    for (name, command) in entries.iter() {
        let mut targets = Vec::new();
        collect_static_targets(command, &mut HashSet::new(), &mut targets);

        let from = nodes[name.as_str()];
        for target in targets {
            let to = nodes
                .get(target.as_str())
                .ok_or_else(|| LinkError::MissingReference {
                    name: target.clone(),
                    referenced_from: name.clone(),
                })?;
            graph.add_edge(from, *to, ());
        }
    }

    toposort(&graph, None)
        .map_err(|cycle| LinkError::CircularReference(graph[cycle.node_id()].to_string()))?;
    Ok(())
}

/// Names of static references reachable from `command` without crossing
/// into another reference.
fn collect_static_targets<C: 'static>(
    command: &SharedCommand<C>,
    visited: &mut HashSet<usize>,
    targets: &mut Vec<String>,
) {
    if let Some(reference) = command.as_reference() {
        if !reference.is_dynamic() {
            targets.push(reference.name().to_string());
        }
        return;
    }
    let Some(composite) = command.as_composite() else {
        return;
    };
    if !visited.insert(identity(command)) {
        return;
    }
    for child in composite.children().snapshot() {
        collect_static_targets(&child, visited, targets);
    }
}

// ---------------------------------------------------------------------------
// Rewrite
// ---------------------------------------------------------------------------

/// Follow static alias entries from `name` to the first command that is not
/// a static reference. Terminates because the reference graph is acyclic.
fn resolve_static<C: 'static>(
    entries: &CommandMap<C>,
    name: &str,
    referenced_from: &str,
) -> Result<SharedCommand<C>, LinkError> {
    let mut current = name;
    loop {
        let target = entries
            .get(current)
            .ok_or_else(|| LinkError::MissingReference {
                name: current.to_string(),
                referenced_from: referenced_from.to_string(),
            })?;
        match target.as_reference() {
            Some(next) if !next.is_dynamic() => current = next.name(),
            _ => return Ok(target.clone()),
        }
    }
}

fn link_tree<C: 'static>(
    command: &SharedCommand<C>,
    entries: &CommandMap<C>,
    catalog: &CommandCatalog<C>,
    visited: &mut HashSet<usize>,
) -> Result<usize, LinkError> {
    if let Some(reference) = command.as_reference() {
        if reference.is_dynamic() {
            reference.bind(catalog);
        }
        return Ok(0);
    }
    let Some(composite) = command.as_composite() else {
        return Ok(0);
    };
    if !visited.insert(identity(command)) {
        return Ok(0);
    }

    let children = composite.children();
    let mut rewritten = 0;
    for index in 0..children.len() {
        let Some(child) = children.get(index) else {
            continue;
        };
        match child.as_reference() {
            Some(reference) if !reference.is_dynamic() => {
                let target = resolve_static(entries, reference.name(), command.kind())?;
                tracing::trace!(
                    { attrs::REFERENCE_NAME } = reference.name(),
                    index,
                    "replacing static reference"
                );
                children.replace(index, target);
                rewritten += 1;
            }
            Some(reference) => reference.bind(catalog),
            None => rewritten += link_tree(&child, entries, catalog, visited)?,
        }
    }
    Ok(rewritten)
}
