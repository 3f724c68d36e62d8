use std::fmt;

use cmdflow_types::error::ExecutionError;
use parking_lot::RwLock;

use super::Command;
use crate::catalog::{CommandCatalog, WeakCatalog};

/// A named pointer to a catalog entry.
///
/// A *static* reference is a placeholder: Link replaces it, in its parent's
/// slot, with the catalog entry it names, and executing one that was never
/// replaced is an error. A *dynamic* reference stays in the tree and looks
/// its target up on every execution, so it always reflects the catalog's
/// current contents.
pub struct CommandReference<C> {
    name: String,
    dynamic: bool,
    catalog: RwLock<Option<WeakCatalog<C>>>,
}

impl<C> CommandReference<C> {
    pub fn new(name: impl Into<String>, dynamic: bool) -> Self {
        Self {
            name: name.into(),
            dynamic,
            catalog: RwLock::new(None),
        }
    }

    pub fn new_static(name: impl Into<String>) -> Self {
        Self::new(name, false)
    }

    pub fn new_dynamic(name: impl Into<String>) -> Self {
        Self::new(name, true)
    }

    /// Name of the referenced catalog entry.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Point this reference at `catalog` for execution-time lookups.
    pub fn bind(&self, catalog: &CommandCatalog<C>) {
        *self.catalog.write() = Some(catalog.downgrade());
    }

    pub fn is_bound(&self) -> bool {
        self.catalog
            .read()
            .as_ref()
            .is_some_and(|weak| weak.upgrade().is_some())
    }
}

impl<C> fmt::Debug for CommandReference<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandReference")
            .field("name", &self.name)
            .field("dynamic", &self.dynamic)
            .finish()
    }
}

impl<C: 'static> Command<C> for CommandReference<C> {
    fn execute(&self, context: &mut C) -> Result<bool, ExecutionError> {
        if !self.dynamic {
            return Err(ExecutionError::UnlinkedStaticReference(self.name.clone()));
        }
        let catalog = self
            .catalog
            .read()
            .as_ref()
            .and_then(WeakCatalog::upgrade)
            .ok_or_else(|| ExecutionError::UnboundReference(self.name.clone()))?;
        let target = catalog
            .get(&self.name)
            .ok_or_else(|| ExecutionError::UnresolvedReference(self.name.clone()))?;
        target.execute(context)
    }

    fn kind(&self) -> &'static str {
        if self.dynamic {
            "DynamicReference"
        } else {
            "StaticReference"
        }
    }

    fn as_reference(&self) -> Option<&CommandReference<C>> {
        Some(self)
    }
}
