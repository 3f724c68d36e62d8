//! Branching and looping composites.
//!
//! Each type has a fixed number of slots: a condition followed by one or two
//! actions. Extra children are collected into a sequence during Init, so a
//! document can list several actions without wrapping them itself.

use cmdflow_types::error::{ExecutionError, InitError};

use super::children::not_initialized;
use super::{Children, Command, CommandInitialization, CompositeCommand, SharedCommand};

macro_rules! fixed_arity_composite {
    ($name:ident, $label:literal, $slots:literal) => {
        impl<C> Default for $name<C> {
            fn default() -> Self {
                Self {
                    children: Children::new(),
                }
            }
        }

        impl<C> $name<C> {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn with_children(commands: Vec<SharedCommand<C>>) -> Self {
                Self {
                    children: Children::with(commands),
                }
            }
        }

        impl<C> CompositeCommand<C> for $name<C> {
            fn children(&self) -> &Children<C> {
                &self.children
            }
        }

        impl<C: 'static> CommandInitialization for $name<C> {
            fn initialize(&self) -> Result<(), InitError> {
                self.children.coerce_arity($label, $slots)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// If
// ---------------------------------------------------------------------------

/// Runs the action when the condition holds. Returns the condition status.
pub struct IfCommand<C> {
    children: Children<C>,
}

fixed_arity_composite!(IfCommand, "If", 2);

impl<C: 'static> Command<C> for IfCommand<C> {
    fn execute(&self, context: &mut C) -> Result<bool, ExecutionError> {
        let slots = self.children.read();
        let [condition, action] = slots.as_slice() else {
            return Err(not_initialized("If", 2, slots.len()));
        };
        if condition.execute(context)? {
            action.execute(context)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn kind(&self) -> &'static str {
        "If"
    }

    fn as_composite(&self) -> Option<&dyn CompositeCommand<C>> {
        Some(self)
    }

    fn as_initializable(&self) -> Option<&dyn CommandInitialization> {
        Some(self)
    }
}

// ---------------------------------------------------------------------------
// IfElse
// ---------------------------------------------------------------------------

/// Runs the action when the condition holds and the else-action otherwise.
/// Returns the condition status.
pub struct IfElseCommand<C> {
    children: Children<C>,
}

fixed_arity_composite!(IfElseCommand, "IfElse", 3);

impl<C: 'static> Command<C> for IfElseCommand<C> {
    fn execute(&self, context: &mut C) -> Result<bool, ExecutionError> {
        let slots = self.children.read();
        let [condition, action, otherwise] = slots.as_slice() else {
            return Err(not_initialized("IfElse", 3, slots.len()));
        };
        let status = condition.execute(context)?;
        if status {
            action.execute(context)?;
        } else {
            otherwise.execute(context)?;
        }
        Ok(status)
    }

    fn kind(&self) -> &'static str {
        "IfElse"
    }

    fn as_composite(&self) -> Option<&dyn CompositeCommand<C>> {
        Some(self)
    }

    fn as_initializable(&self) -> Option<&dyn CommandInitialization> {
        Some(self)
    }
}

// ---------------------------------------------------------------------------
// While
// ---------------------------------------------------------------------------

/// Re-checks the condition before every iteration.
///
/// Returns the last action status, or `false` when the action never ran.
pub struct WhileCommand<C> {
    children: Children<C>,
}

fixed_arity_composite!(WhileCommand, "While", 2);

impl<C: 'static> Command<C> for WhileCommand<C> {
    fn execute(&self, context: &mut C) -> Result<bool, ExecutionError> {
        let slots = self.children.read();
        let [condition, action] = slots.as_slice() else {
            return Err(not_initialized("While", 2, slots.len()));
        };
        let mut status = false;
        while condition.execute(context)? {
            status = action.execute(context)?;
        }
        Ok(status)
    }

    fn kind(&self) -> &'static str {
        "While"
    }

    fn as_composite(&self) -> Option<&dyn CompositeCommand<C>> {
        Some(self)
    }

    fn as_initializable(&self) -> Option<&dyn CommandInitialization> {
        Some(self)
    }
}

// ---------------------------------------------------------------------------
// DoWhile
// ---------------------------------------------------------------------------

/// Runs the action, then checks the condition after every iteration.
///
/// Returns the last action status.
pub struct DoWhileCommand<C> {
    children: Children<C>,
}

fixed_arity_composite!(DoWhileCommand, "DoWhile", 2);

impl<C: 'static> Command<C> for DoWhileCommand<C> {
    fn execute(&self, context: &mut C) -> Result<bool, ExecutionError> {
        let slots = self.children.read();
        let [condition, action] = slots.as_slice() else {
            return Err(not_initialized("DoWhile", 2, slots.len()));
        };
        loop {
            let status = action.execute(context)?;
            if !condition.execute(context)? {
                return Ok(status);
            }
        }
    }

    fn kind(&self) -> &'static str {
        "DoWhile"
    }

    fn as_composite(&self) -> Option<&dyn CompositeCommand<C>> {
        Some(self)
    }

    fn as_initializable(&self) -> Option<&dyn CommandInitialization> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::command::testing::{Counter, TrueTimes, counted};
    use crate::command::{AlwaysFalse, AlwaysTrue};

    #[test]
    fn test_if_runs_action_only_when_condition_holds() {
        let (action, count) = Counter::new(true);
        let cmd = IfCommand::<()>::with_children(vec![Arc::new(AlwaysFalse), Arc::new(action)]);
        cmd.initialize().unwrap();
        assert!(!cmd.execute(&mut ()).unwrap());
        assert_eq!(counted(&count), 0);

        // The action's own status does not leak into the result.
        let (action, count) = Counter::new(false);
        let cmd = IfCommand::<()>::with_children(vec![Arc::new(AlwaysTrue), Arc::new(action)]);
        cmd.initialize().unwrap();
        assert!(cmd.execute(&mut ()).unwrap());
        assert_eq!(counted(&count), 1);
    }

    #[test]
    fn test_if_coerces_extra_actions_into_sequence() {
        let (first, first_count) = Counter::new(true);
        let (second, second_count) = Counter::new(true);
        let cmd = IfCommand::<()>::with_children(vec![
            Arc::new(AlwaysTrue),
            Arc::new(first),
            Arc::new(second),
        ]);
        cmd.initialize().unwrap();
        assert_eq!(cmd.children().len(), 2);

        cmd.execute(&mut ()).unwrap();
        assert_eq!(counted(&first_count), 1);
        assert_eq!(counted(&second_count), 1);
    }

    #[test]
    fn test_if_with_single_child_fails_init() {
        let cmd = IfCommand::<()>::with_children(vec![Arc::new(AlwaysTrue)]);
        let err = cmd.initialize().unwrap_err();
        assert_eq!(err.to_string(), "If expects at least 2 child commands, has 1");
    }

    #[test]
    fn test_uninitialized_if_reports_instead_of_panicking() {
        let cmd = IfCommand::<()>::with_children(vec![
            Arc::new(AlwaysTrue),
            Arc::new(AlwaysTrue),
            Arc::new(AlwaysTrue),
        ]);
        assert!(matches!(
            cmd.execute(&mut ()),
            Err(ExecutionError::NotInitialized { expected: 2, actual: 3, .. })
        ));
    }

    #[test]
    fn test_if_else_picks_branch_by_condition() {
        for condition_status in [true, false] {
            let (action, action_count) = Counter::new(true);
            let (otherwise, otherwise_count) = Counter::new(true);
            let condition: SharedCommand<()> = if condition_status {
                Arc::new(AlwaysTrue)
            } else {
                Arc::new(AlwaysFalse)
            };
            let cmd = IfElseCommand::<()>::with_children(vec![
                condition,
                Arc::new(action),
                Arc::new(otherwise),
            ]);
            cmd.initialize().unwrap();

            assert_eq!(cmd.execute(&mut ()).unwrap(), condition_status);
            assert_eq!(counted(&action_count), usize::from(condition_status));
            assert_eq!(counted(&otherwise_count), usize::from(!condition_status));
        }
    }

    #[test]
    fn test_while_runs_action_while_condition_holds() {
        let (action, count) = Counter::new(true);
        let cmd = WhileCommand::<()>::with_children(vec![Arc::new(TrueTimes::new(2)), Arc::new(action)]);
        cmd.initialize().unwrap();

        assert!(cmd.execute(&mut ()).unwrap());
        assert_eq!(counted(&count), 2);
    }

    #[test]
    fn test_while_never_entered_is_false() {
        let (action, count) = Counter::new(true);
        let cmd = WhileCommand::<()>::with_children(vec![Arc::new(TrueTimes::new(0)), Arc::new(action)]);
        cmd.initialize().unwrap();

        assert!(!cmd.execute(&mut ()).unwrap());
        assert_eq!(counted(&count), 0);
    }

    #[test]
    fn test_while_returns_last_action_status() {
        let (action, count) = Counter::new(false);
        let cmd = WhileCommand::<()>::with_children(vec![Arc::new(TrueTimes::new(10)), Arc::new(action)]);
        cmd.initialize().unwrap();

        assert!(!cmd.execute(&mut ()).unwrap());
        assert_eq!(counted(&count), 10);
    }

    #[test]
    fn test_do_while_runs_action_before_condition() {
        let (action, count) = Counter::new(false);
        let cmd = DoWhileCommand::<()>::with_children(vec![Arc::new(TrueTimes::new(0)), Arc::new(action)]);
        cmd.initialize().unwrap();

        assert!(!cmd.execute(&mut ()).unwrap());
        assert_eq!(counted(&count), 1);
    }

    #[test]
    fn test_do_while_repeats_until_condition_fails() {
        let (action, count) = Counter::new(true);
        let cmd = DoWhileCommand::<()>::with_children(vec![Arc::new(TrueTimes::new(3)), Arc::new(action)]);
        cmd.initialize().unwrap();

        assert!(cmd.execute(&mut ()).unwrap());
        assert_eq!(counted(&count), 4);
    }

    #[test]
    fn test_condition_sees_context_changes_made_by_action() {
        struct Decrement;
        impl Command<u32> for Decrement {
            fn execute(&self, context: &mut u32) -> Result<bool, ExecutionError> {
                *context -= 1;
                Ok(true)
            }
        }
        struct Positive;
        impl Command<u32> for Positive {
            fn execute(&self, context: &mut u32) -> Result<bool, ExecutionError> {
                Ok(*context > 0)
            }
        }

        let cmd = WhileCommand::<u32>::with_children(vec![Arc::new(Positive), Arc::new(Decrement)]);
        cmd.initialize().unwrap();
        let mut remaining = 5;
        assert!(cmd.execute(&mut remaining).unwrap());
        assert_eq!(remaining, 0);
    }
}
