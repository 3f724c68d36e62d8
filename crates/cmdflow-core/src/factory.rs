//! Registry of command constructors keyed by type identifier.
//!
//! Markup names a command implementation by string (`class="..."`). Instead
//! of loading types by name, hosts register a constructor per identifier up
//! front, so the set of constructible commands is closed and auditable.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cmdflow_types::error::BindingError;

use crate::command::{
    AlwaysFalse, AlwaysTrue, AndCommand, Command, DoWhileCommand, IfCommand, IfElseCommand,
    NotCommand, OrCommand, SequenceCommand, WhileCommand,
};

/// Constructor for a fresh, unconfigured command.
pub type CommandFactory<C> = Arc<dyn Fn() -> Box<dyn Command<C>> + Send + Sync>;

/// Identifier -> constructor map.
pub struct CommandFactories<C> {
    factories: HashMap<String, CommandFactory<C>>,
}

impl<C> Clone for CommandFactories<C> {
    fn clone(&self) -> Self {
        Self {
            factories: self.factories.clone(),
        }
    }
}

impl<C> fmt::Debug for CommandFactories<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandFactories")
            .field("names", &self.names())
            .finish()
    }
}

impl<C: 'static> Default for CommandFactories<C> {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl<C> CommandFactories<C> {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register `factory` under `name`, replacing any previous constructor.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Command<C>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Construct a new command registered as `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn Command<C>>, BindingError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| BindingError::UnknownCommandType(name.to_string()))?;
        Ok(factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered identifiers, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<C: 'static> CommandFactories<C> {
    /// A registry pre-populated with the built-in control-flow commands.
    pub fn with_builtins() -> Self {
        let mut factories = Self::empty();
        factories
            .register("sequence", || Box::new(SequenceCommand::<C>::new()))
            .register("and", || Box::new(AndCommand::<C>::new()))
            .register("or", || Box::new(OrCommand::<C>::new()))
            .register("not", || Box::new(NotCommand::<C>::new()))
            .register("if", || Box::new(IfCommand::<C>::new()))
            .register("if-else", || Box::new(IfElseCommand::<C>::new()))
            .register("while", || Box::new(WhileCommand::<C>::new()))
            .register("do-while", || Box::new(DoWhileCommand::<C>::new()))
            .register("true", || Box::new(AlwaysTrue))
            .register("false", || Box::new(AlwaysFalse));
        factories
    }
}

#[cfg(test)]
mod tests {
    use cmdflow_types::error::ExecutionError;

    use super::*;
    use crate::command::CompositeCommand;

    struct Greeting;

    impl Command<Vec<String>> for Greeting {
        fn execute(&self, context: &mut Vec<String>) -> Result<bool, ExecutionError> {
            context.push("hello".to_string());
            Ok(true)
        }
    }

    #[test]
    fn test_builtins_are_registered() {
        let factories = CommandFactories::<()>::with_builtins();
        assert_eq!(
            factories.names(),
            vec!["and", "do-while", "false", "if", "if-else", "not", "or", "sequence", "true", "while"]
        );
        assert!(factories.create("true").unwrap().execute(&mut ()).unwrap());
        assert!(factories.create("sequence").unwrap().as_composite().is_some());
    }

    #[test]
    fn test_each_create_returns_a_fresh_instance() {
        let factories = CommandFactories::<()>::with_builtins();
        let first = factories.create("sequence").unwrap();
        let second = factories.create("sequence").unwrap();
        first.as_composite().unwrap().add(Arc::new(AlwaysTrue));
        assert_eq!(second.as_composite().unwrap().children().len(), 0);
    }

    #[test]
    fn test_host_commands_can_be_registered() {
        let mut factories = CommandFactories::<Vec<String>>::empty();
        factories.register("greeting", || Box::new(Greeting));

        let mut context = Vec::new();
        factories.create("greeting").unwrap().execute(&mut context).unwrap();
        assert_eq!(context, vec!["hello"]);
    }

    #[test]
    fn test_unknown_identifier_is_a_binding_error() {
        let factories = CommandFactories::<()>::empty();
        let err = factories.create("com.example.Missing").err().unwrap();
        assert!(matches!(err, BindingError::UnknownCommandType(ref name) if name == "com.example.Missing"));
    }
}
