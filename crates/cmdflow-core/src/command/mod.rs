//! The command execution model.
//!
//! - `Command` -- the stateless unit of work, `execute(context) -> status`
//! - `composite` -- Sequence, And, Or, Not
//! - `conditional` -- If, IfElse, While, DoWhile
//! - `constant` -- AlwaysTrue / AlwaysFalse sentinels
//! - `reference` -- static and dynamic named references into the catalog
//! - `script` -- predicate-script adapter over a `PredicateEvaluator`

use std::any::TypeId;
use std::sync::Arc;

use cmdflow_types::error::{ExecutionError, InitError};

use crate::property::Configurable;

mod children;
pub mod composite;
pub mod conditional;
pub mod constant;
pub mod reference;
pub mod script;

pub use children::Children;
pub use composite::{AndCommand, NotCommand, OrCommand, SequenceCommand};
pub use conditional::{DoWhileCommand, IfCommand, IfElseCommand, WhileCommand};
pub use constant::{AlwaysFalse, AlwaysTrue};
pub use reference::CommandReference;
pub use script::ScriptCommand;

/// A command shared between the catalog and the trees that reference it.
pub type SharedCommand<C> = Arc<dyn Command<C>>;

/// A stateless unit of work executed against a caller-supplied context.
///
/// The returned `bool` is the command status and is the only channel used
/// for branching. Commands must not keep execution-affecting state of their
/// own: everything lives in `C`, so one tree can serve any number of
/// concurrent callers.
///
/// The `as_*` methods expose optional capabilities. A command opts into a
/// capability by overriding the matching method.
pub trait Command<C>: Send + Sync + 'static {
    fn execute(&self, context: &mut C) -> Result<bool, ExecutionError>;

    /// Short label used in diagnostics.
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Identity of the concrete command type.
    fn type_key(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    fn as_composite(&self) -> Option<&dyn CompositeCommand<C>> {
        None
    }

    fn as_reference(&self) -> Option<&CommandReference<C>> {
        None
    }

    fn as_initializable(&self) -> Option<&dyn CommandInitialization> {
        None
    }

    fn as_configurable_mut(&mut self) -> Option<&mut dyn Configurable> {
        None
    }
}

/// Capability of a command that owns an ordered list of child commands.
pub trait CompositeCommand<C> {
    fn children(&self) -> &Children<C>;

    fn add(&self, command: SharedCommand<C>) {
        self.children().push(command);
    }
}

/// Validation hook run once per command instance during the Init phase.
pub trait CommandInitialization {
    fn initialize(&self) -> Result<(), InitError>;
}

/// Wrap a command for use as a child or catalog entry.
pub fn shared<C, T: Command<C>>(command: T) -> SharedCommand<C> {
    Arc::new(command)
}

/// Address of a shared command, used to visit each instance once.
pub(crate) fn identity<C>(command: &SharedCommand<C>) -> usize {
    Arc::as_ptr(command) as *const () as usize
}
