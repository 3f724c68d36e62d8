//! The named command registry.
//!
//! The catalog is the only mutable entity at execution time. Its backing map
//! is an immutable snapshot behind an `Arc`: writers copy the current map,
//! modify the copy and swap it in, so `execute` callers only hold the read
//! lock long enough to clone the snapshot pointer and never observe a
//! half-updated map.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use cmdflow_observe::attrs;
use cmdflow_types::error::ExecutionError;
use parking_lot::{Mutex, RwLock};

use crate::command::SharedCommand;

/// Name -> command map held by a catalog snapshot.
pub type CommandMap<C> = HashMap<String, SharedCommand<C>>;

struct CatalogInner<C> {
    current: RwLock<Arc<CommandMap<C>>>,
    /// Serializes copy-on-write updates so concurrent writers never lose
    /// each other's changes.
    writer: Mutex<()>,
}

/// Thread-safe registry of named top-level commands.
///
/// Cloning the catalog clones the handle; all clones share one registry.
pub struct CommandCatalog<C> {
    inner: Arc<CatalogInner<C>>,
}

impl<C> Clone for CommandCatalog<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C> Default for CommandCatalog<C> {
    fn default() -> Self {
        Self {
            inner: Arc::new(CatalogInner {
                current: RwLock::new(Arc::new(HashMap::new())),
                writer: Mutex::new(()),
            }),
        }
    }
}

impl<C> fmt::Debug for CommandCatalog<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCatalog")
            .field("names", &self.names())
            .finish()
    }
}

impl<C> CommandCatalog<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `command` under `name`, replacing and returning any prior
    /// entry with the same name.
    pub fn add_command(
        &self,
        name: impl Into<String>,
        command: SharedCommand<C>,
    ) -> Option<SharedCommand<C>> {
        let name = name.into();
        let previous = self.update(|map| map.insert(name.clone(), command));
        tracing::debug!(
            { attrs::COMMAND_NAME } = %name,
            replaced = previous.is_some(),
            "registered command"
        );
        previous
    }

    pub fn remove_command(&self, name: &str) -> Option<SharedCommand<C>> {
        self.update(|map| map.remove(name))
    }

    pub fn get(&self, name: &str) -> Option<SharedCommand<C>> {
        self.snapshot().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.snapshot().contains_key(name)
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let _guard = self.inner.writer.lock();
        *self.inner.current.write() = Arc::new(HashMap::new());
    }

    /// The current immutable map. Later updates do not affect it.
    pub fn snapshot(&self) -> Arc<CommandMap<C>> {
        self.inner.current.read().clone()
    }

    /// Copy of the current entries.
    pub fn commands(&self) -> CommandMap<C> {
        self.snapshot().as_ref().clone()
    }

    /// Replace all entries with `commands` in one swap.
    pub fn set_commands(&self, commands: CommandMap<C>) {
        let _guard = self.inner.writer.lock();
        *self.inner.current.write() = Arc::new(commands);
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Non-owning handle, used by dynamic references so a catalog and the
    /// trees it owns do not keep each other alive.
    pub fn downgrade(&self) -> WeakCatalog<C> {
        WeakCatalog {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether two handles share one registry.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn update<R>(&self, change: impl FnOnce(&mut CommandMap<C>) -> R) -> R {
        let _guard = self.inner.writer.lock();
        let mut next = self.snapshot().as_ref().clone();
        let result = change(&mut next);
        *self.inner.current.write() = Arc::new(next);
        result
    }
}

impl<C: 'static> CommandCatalog<C> {
    /// Execute the command registered under `name`.
    pub fn execute(&self, name: &str, context: &mut C) -> Result<bool, ExecutionError> {
        let command = self
            .get(name)
            .ok_or_else(|| ExecutionError::CommandNotFound(name.to_string()))?;
        command.execute(context)
    }
}

/// Weak handle to a `CommandCatalog`.
pub struct WeakCatalog<C> {
    inner: Weak<CatalogInner<C>>,
}

impl<C> Clone for WeakCatalog<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C> WeakCatalog<C> {
    pub fn upgrade(&self) -> Option<CommandCatalog<C>> {
        self.inner.upgrade().map(|inner| CommandCatalog { inner })
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::command::{AlwaysFalse, AlwaysTrue};

    #[test]
    fn test_add_get_remove() {
        let catalog: CommandCatalog<()> = CommandCatalog::new();
        assert!(catalog.is_empty());

        assert!(catalog.add_command("yes", Arc::new(AlwaysTrue)).is_none());
        assert!(catalog.contains("yes"));
        assert!(catalog.execute("yes", &mut ()).unwrap());

        assert!(catalog.add_command("yes", Arc::new(AlwaysFalse)).is_some());
        assert!(!catalog.execute("yes", &mut ()).unwrap());
        assert_eq!(catalog.len(), 1);

        assert!(catalog.remove_command("yes").is_some());
        assert!(catalog.get("yes").is_none());
    }

    #[test]
    fn test_names_are_case_sensitive_and_sorted() {
        let catalog: CommandCatalog<()> = CommandCatalog::new();
        catalog.add_command("b", Arc::new(AlwaysTrue));
        catalog.add_command("B", Arc::new(AlwaysTrue));
        catalog.add_command("a", Arc::new(AlwaysTrue));
        assert_eq!(catalog.names(), vec!["B", "a", "b"]);
    }

    #[test]
    fn test_execute_unknown_name_is_an_error() {
        let catalog: CommandCatalog<()> = CommandCatalog::new();
        let err = catalog.execute("missing", &mut ()).unwrap_err();
        assert!(matches!(err, ExecutionError::CommandNotFound(ref name) if name == "missing"));
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let catalog: CommandCatalog<()> = CommandCatalog::new();
        catalog.add_command("one", Arc::new(AlwaysTrue));
        let before = catalog.snapshot();

        catalog.add_command("two", Arc::new(AlwaysTrue));
        catalog.clear();

        assert_eq!(before.len(), 1);
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_set_commands_swaps_whole_map() {
        let catalog: CommandCatalog<()> = CommandCatalog::new();
        catalog.add_command("old", Arc::new(AlwaysTrue));

        let mut replacement = CommandMap::new();
        replacement.insert("new".to_string(), Arc::new(AlwaysFalse) as SharedCommand<()>);
        catalog.set_commands(replacement);

        assert_eq!(catalog.names(), vec!["new"]);
    }

    #[test]
    fn test_clones_share_one_registry() {
        let catalog: CommandCatalog<()> = CommandCatalog::new();
        let other = catalog.clone();
        other.add_command("shared", Arc::new(AlwaysTrue));
        assert!(catalog.contains("shared"));
        assert!(catalog.ptr_eq(&other));
        assert!(!catalog.ptr_eq(&CommandCatalog::new()));
    }

    #[test]
    fn test_weak_handle_does_not_keep_catalog_alive() {
        let catalog: CommandCatalog<()> = CommandCatalog::new();
        let weak = catalog.downgrade();
        assert!(weak.upgrade().is_some());
        drop(catalog);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_concurrent_writers_do_not_lose_entries() {
        let catalog: CommandCatalog<u32> = CommandCatalog::new();
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let catalog = catalog.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        catalog.add_command(format!("w{worker}-{i}"), Arc::new(AlwaysTrue));
                        let mut context = 0;
                        catalog.execute(&format!("w{worker}-{i}"), &mut context).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(catalog.len(), 400);
    }
}
