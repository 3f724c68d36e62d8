use std::sync::Arc;

use cmdflow_types::error::{ExecutionError, InitError};
use parking_lot::{RwLock, RwLockReadGuard};

use super::{SequenceCommand, SharedCommand};

/// Ordered, index-addressable child slots of a composite command.
///
/// Slots are only written while a tree is assembled (Build adds, Link
/// replaces by index, Init coerces arity). Execution takes a recursive read
/// lock so a tree that re-enters itself through a dynamic reference never
/// blocks on its own guard.
pub struct Children<C> {
    slots: RwLock<Vec<SharedCommand<C>>>,
}

impl<C> Default for Children<C> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }
}

impl<C> Children<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(commands: Vec<SharedCommand<C>>) -> Self {
        Self {
            slots: RwLock::new(commands),
        }
    }

    pub fn push(&self, command: SharedCommand<C>) {
        self.slots.write().push(command);
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<SharedCommand<C>> {
        self.slots.read().get(index).cloned()
    }

    /// Copy of the current slots.
    pub fn snapshot(&self) -> Vec<SharedCommand<C>> {
        self.slots.read().clone()
    }

    /// Replace the command at `index`, returning the previous occupant.
    pub fn replace(&self, index: usize, command: SharedCommand<C>) -> Option<SharedCommand<C>> {
        let mut slots = self.slots.write();
        slots
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, command))
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Vec<SharedCommand<C>>> {
        self.slots.read_recursive()
    }

    /// Require exactly `required` children, without coercion.
    pub fn require_exactly(&self, command: &str, required: usize) -> Result<(), InitError> {
        let actual = self.len();
        if actual != required {
            return Err(InitError::WrongArity {
                command: command.to_string(),
                min: required,
                max: Some(required),
                actual,
            });
        }
        Ok(())
    }
}

impl<C: 'static> Children<C> {
    /// Bring the slots to exactly `required` entries.
    ///
    /// Fewer children than `required` is an error. Children beyond the first
    /// `required - 1` are collected, in order, into one new `SequenceCommand`
    /// occupying the last slot.
    pub fn coerce_arity(&self, command: &str, required: usize) -> Result<(), InitError> {
        let mut slots = self.slots.write();
        let actual = slots.len();
        if actual < required {
            return Err(InitError::WrongArity {
                command: command.to_string(),
                min: required,
                max: None,
                actual,
            });
        }
        if actual > required {
            let extra = slots.split_off(required.saturating_sub(1));
            tracing::debug!(
                command,
                collected = extra.len(),
                "collecting extra child commands into a sequence"
            );
            slots.push(Arc::new(SequenceCommand::with_children(extra)));
        }
        Ok(())
    }
}

/// Error for executing a fixed-arity composite whose slots were never
/// brought into shape by the Init phase.
pub(crate) fn not_initialized(command: &str, expected: usize, actual: usize) -> ExecutionError {
    ExecutionError::NotInitialized {
        command: command.to_string(),
        expected,
        actual,
    }
}
