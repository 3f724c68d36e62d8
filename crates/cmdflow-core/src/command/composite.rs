//! Boolean combinators over an ordered list of children.

use cmdflow_types::error::{ExecutionError, InitError};

use super::children::not_initialized;
use super::{Children, Command, CommandInitialization, CompositeCommand, SharedCommand};

// ---------------------------------------------------------------------------
// Sequence
// ---------------------------------------------------------------------------

/// Executes every child in order regardless of status.
///
/// Returns the status of the last child, or `false` when empty.
pub struct SequenceCommand<C> {
    children: Children<C>,
}

impl<C> Default for SequenceCommand<C> {
    fn default() -> Self {
        Self {
            children: Children::new(),
        }
    }
}

impl<C> SequenceCommand<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(commands: Vec<SharedCommand<C>>) -> Self {
        Self {
            children: Children::with(commands),
        }
    }
}

impl<C: 'static> Command<C> for SequenceCommand<C> {
    fn execute(&self, context: &mut C) -> Result<bool, ExecutionError> {
        let mut status = false;
        for child in self.children.read().iter() {
            status = child.execute(context)?;
        }
        Ok(status)
    }

    fn kind(&self) -> &'static str {
        "Sequence"
    }

    fn as_composite(&self) -> Option<&dyn CompositeCommand<C>> {
        Some(self)
    }
}

impl<C> CompositeCommand<C> for SequenceCommand<C> {
    fn children(&self) -> &Children<C> {
        &self.children
    }
}

// ---------------------------------------------------------------------------
// And
// ---------------------------------------------------------------------------

/// Stops at the first child answering `false`.
///
/// Returns `false` when empty or short-circuited, otherwise `true`.
pub struct AndCommand<C> {
    children: Children<C>,
}

impl<C> Default for AndCommand<C> {
    fn default() -> Self {
        Self {
            children: Children::new(),
        }
    }
}

impl<C> AndCommand<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(commands: Vec<SharedCommand<C>>) -> Self {
        Self {
            children: Children::with(commands),
        }
    }
}

impl<C: 'static> Command<C> for AndCommand<C> {
    fn execute(&self, context: &mut C) -> Result<bool, ExecutionError> {
        let children = self.children.read();
        if children.is_empty() {
            return Ok(false);
        }
        for child in children.iter() {
            if !child.execute(context)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn kind(&self) -> &'static str {
        "And"
    }

    fn as_composite(&self) -> Option<&dyn CompositeCommand<C>> {
        Some(self)
    }
}

impl<C> CompositeCommand<C> for AndCommand<C> {
    fn children(&self) -> &Children<C> {
        &self.children
    }
}

// ---------------------------------------------------------------------------
// Or
// ---------------------------------------------------------------------------

/// Stops at the first child answering `true`.
pub struct OrCommand<C> {
    children: Children<C>,
}

impl<C> Default for OrCommand<C> {
    fn default() -> Self {
        Self {
            children: Children::new(),
        }
    }
}

impl<C> OrCommand<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(commands: Vec<SharedCommand<C>>) -> Self {
        Self {
            children: Children::with(commands),
        }
    }
}

impl<C: 'static> Command<C> for OrCommand<C> {
    fn execute(&self, context: &mut C) -> Result<bool, ExecutionError> {
        for child in self.children.read().iter() {
            if child.execute(context)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn kind(&self) -> &'static str {
        "Or"
    }

    fn as_composite(&self) -> Option<&dyn CompositeCommand<C>> {
        Some(self)
    }
}

impl<C> CompositeCommand<C> for OrCommand<C> {
    fn children(&self) -> &Children<C> {
        &self.children
    }
}

// ---------------------------------------------------------------------------
// Not
// ---------------------------------------------------------------------------

/// Negates the status of its single child.
pub struct NotCommand<C> {
    children: Children<C>,
}

impl<C> Default for NotCommand<C> {
    fn default() -> Self {
        Self {
            children: Children::new(),
        }
    }
}

impl<C> NotCommand<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wrapping(command: SharedCommand<C>) -> Self {
        Self {
            children: Children::with(vec![command]),
        }
    }
}

impl<C: 'static> Command<C> for NotCommand<C> {
    fn execute(&self, context: &mut C) -> Result<bool, ExecutionError> {
        let children = self.children.read();
        let [wrapped] = children.as_slice() else {
            return Err(not_initialized("Not", 1, children.len()));
        };
        Ok(!wrapped.execute(context)?)
    }

    fn kind(&self) -> &'static str {
        "Not"
    }

    fn as_composite(&self) -> Option<&dyn CompositeCommand<C>> {
        Some(self)
    }

    fn as_initializable(&self) -> Option<&dyn CommandInitialization> {
        Some(self)
    }
}

impl<C> CompositeCommand<C> for NotCommand<C> {
    fn children(&self) -> &Children<C> {
        &self.children
    }
}

impl<C> CommandInitialization for NotCommand<C> {
    fn initialize(&self) -> Result<(), InitError> {
        self.children.require_exactly("Not", 1)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::command::testing::{Counter, counted};
    use crate::command::{AlwaysFalse, AlwaysTrue};

    #[test]
    fn test_and_empty_is_false() {
        assert!(!AndCommand::<()>::new().execute(&mut ()).unwrap());
    }

    #[test]
    fn test_and_short_circuits_on_first_false() {
        let (first, first_count) = Counter::new(true);
        let (second, second_count) = Counter::new(false);
        let (third, third_count) = Counter::new(true);
        let and = AndCommand::<()>::with_children(vec![
            Arc::new(first),
            Arc::new(second),
            Arc::new(third),
        ]);

        assert!(!and.execute(&mut ()).unwrap());
        assert_eq!(counted(&first_count), 1);
        assert_eq!(counted(&second_count), 1);
        assert_eq!(counted(&third_count), 0);
    }

    #[test]
    fn test_and_all_true() {
        let and = AndCommand::<()>::with_children(vec![Arc::new(AlwaysTrue), Arc::new(AlwaysTrue)]);
        assert!(and.execute(&mut ()).unwrap());
    }

    #[test]
    fn test_or_executes_all_when_every_child_is_false() {
        let (first, first_count) = Counter::new(false);
        let (second, second_count) = Counter::new(false);
        let or = OrCommand::<()>::with_children(vec![Arc::new(first), Arc::new(second)]);

        assert!(!or.execute(&mut ()).unwrap());
        assert_eq!(counted(&first_count), 1);
        assert_eq!(counted(&second_count), 1);
    }

    #[test]
    fn test_or_short_circuits_on_first_true() {
        let (first, first_count) = Counter::new(false);
        let (second, second_count) = Counter::new(true);
        let (third, third_count) = Counter::new(false);
        let or = OrCommand::<()>::with_children(vec![
            Arc::new(first),
            Arc::new(second),
            Arc::new(third),
        ]);

        assert!(or.execute(&mut ()).unwrap());
        assert_eq!(counted(&first_count), 1);
        assert_eq!(counted(&second_count), 1);
        assert_eq!(counted(&third_count), 0);
    }

    #[test]
    fn test_or_empty_is_false() {
        assert!(!OrCommand::<()>::new().execute(&mut ()).unwrap());
    }

    #[test]
    fn test_sequence_returns_last_status_and_runs_every_child() {
        assert!(!SequenceCommand::<()>::new().execute(&mut ()).unwrap());

        let (first, first_count) = Counter::new(true);
        let (second, second_count) = Counter::new(false);
        let seq = SequenceCommand::<()>::with_children(vec![Arc::new(first), Arc::new(second)]);
        assert!(!seq.execute(&mut ()).unwrap());
        assert_eq!(counted(&first_count), 1);
        assert_eq!(counted(&second_count), 1);

        let seq = SequenceCommand::<()>::with_children(vec![Arc::new(AlwaysFalse), Arc::new(AlwaysTrue)]);
        assert!(seq.execute(&mut ()).unwrap());
    }

    #[test]
    fn test_not_negates_wrapped_status() {
        let not = NotCommand::<()>::wrapping(Arc::new(AlwaysTrue));
        not.initialize().unwrap();
        assert!(!not.execute(&mut ()).unwrap());

        let not = NotCommand::<()>::wrapping(Arc::new(AlwaysFalse));
        assert!(not.execute(&mut ()).unwrap());
    }

    #[test]
    fn test_not_requires_exactly_one_child() {
        let not = NotCommand::<()>::new();
        let err = not.initialize().unwrap_err();
        assert_eq!(err.to_string(), "Not expects exactly 1 child commands, has 0");
        assert!(matches!(
            not.execute(&mut ()),
            Err(ExecutionError::NotInitialized { expected: 1, actual: 0, .. })
        ));

        not.add(Arc::new(AlwaysTrue));
        not.add(Arc::new(AlwaysTrue));
        assert!(not.initialize().is_err());
    }

    #[test]
    fn test_composites_nest() {
        let inner = OrCommand::<()>::with_children(vec![Arc::new(AlwaysFalse), Arc::new(AlwaysTrue)]);
        let outer = AndCommand::<()>::with_children(vec![Arc::new(inner), Arc::new(AlwaysTrue)]);
        assert!(outer.execute(&mut ()).unwrap());
    }
}
