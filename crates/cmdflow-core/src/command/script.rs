use std::fmt;
use std::sync::Arc;

use cmdflow_types::config::DEFAULT_CONTEXT_BINDING;
use cmdflow_types::error::{ExecutionError, ExpressionError};
use serde_json::Value;

use super::Command;
use crate::expression::PredicateEvaluator;
use crate::property::{Configurable, PropertyError, PropertySpec, PropertyType, PropertyValue};

/// Property name for the context binding.
pub const CONTEXT_BINDING_PROPERTY: &str = "contextBindingName";

/// Answers the boolean result of a predicate expression.
///
/// The context is handed to the evaluator under `context_binding` (default
/// `c`). Any result other than a JSON boolean is an execution error.
pub struct ScriptCommand<C> {
    expression: String,
    evaluator: Arc<dyn PredicateEvaluator<C>>,
    context_binding: String,
}

impl<C> ScriptCommand<C> {
    /// Create a script command, rejecting evaluators that cannot be shared
    /// and expressions the evaluator refuses to compile.
    pub fn new(
        expression: impl Into<String>,
        evaluator: Arc<dyn PredicateEvaluator<C>>,
    ) -> Result<Self, ExpressionError> {
        if !evaluator.threading().allows_concurrent_reuse() {
            return Err(ExpressionError::NotThreadSafe);
        }
        let expression = expression.into();
        evaluator.compile(&expression)?;
        Ok(Self {
            expression,
            evaluator,
            context_binding: DEFAULT_CONTEXT_BINDING.to_string(),
        })
    }

    pub fn with_context_binding(mut self, binding: impl Into<String>) -> Self {
        self.context_binding = binding.into();
        self
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn context_binding(&self) -> &str {
        &self.context_binding
    }
}

impl<C> fmt::Debug for ScriptCommand<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptCommand")
            .field("expression", &self.expression)
            .field("context_binding", &self.context_binding)
            .finish()
    }
}

impl<C: 'static> Command<C> for ScriptCommand<C> {
    fn execute(&self, context: &mut C) -> Result<bool, ExecutionError> {
        let predicate_error = |source| ExecutionError::Predicate {
            expression: self.expression.clone(),
            source,
        };
        match self
            .evaluator
            .evaluate(&self.expression, &self.context_binding, context)
            .map_err(predicate_error)?
        {
            Value::Bool(status) => Ok(status),
            result => Err(predicate_error(ExpressionError::NotBoolean { result })),
        }
    }

    fn kind(&self) -> &'static str {
        "Script"
    }

    fn as_configurable_mut(&mut self) -> Option<&mut dyn Configurable> {
        Some(self)
    }
}

impl<C> Configurable for ScriptCommand<C> {
    fn properties(&self) -> Vec<PropertySpec> {
        vec![PropertySpec::new(CONTEXT_BINDING_PROPERTY, PropertyType::Text)]
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
        match (name, value) {
            (CONTEXT_BINDING_PROPERTY, PropertyValue::Text(binding)) if !binding.trim().is_empty() => {
                self.context_binding = binding.trim().to_string();
                Ok(())
            }
            (CONTEXT_BINDING_PROPERTY, PropertyValue::Text(_)) => Err(PropertyError::Invalid {
                property: name.to_string(),
                message: "binding name must not be empty".to_string(),
            }),
            (CONTEXT_BINDING_PROPERTY, other) => Err(PropertyError::TypeMismatch {
                property: name.to_string(),
                expected: PropertyType::Text,
                actual: other.property_type(),
            }),
            (other, _) => Err(PropertyError::Unknown(other.to_string())),
        }
    }
}

/// Strip the `#{ ... }` wrapper used to mark inline predicates in markup.
pub fn extract_script(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("#{")
        .and_then(|rest| rest.strip_suffix('}'))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Boolean literal fast path: `true` / `false`, trimmed, any case.
pub fn literal_status(script: &str) -> Option<bool> {
    let script = script.trim();
    if script.eq_ignore_ascii_case("true") {
        Some(true)
    } else if script.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::expression::{JexlEvaluator, Threading};

    fn jexl<C: serde::Serialize + 'static>() -> Arc<dyn PredicateEvaluator<C>> {
        Arc::new(JexlEvaluator)
    }

    #[test]
    fn test_script_reads_context() {
        let script = ScriptCommand::new("c|length == 4", jexl::<String>()).unwrap();
        assert!(script.execute(&mut "test".to_string()).unwrap());
        assert!(!script.execute(&mut "nottest".to_string()).unwrap());
    }

    #[test]
    fn test_literal_expression_needs_no_context() {
        let script = ScriptCommand::new("true", jexl::<()>()).unwrap();
        assert!(script.execute(&mut ()).unwrap());
    }

    #[test]
    fn test_non_boolean_result_is_an_error() {
        let script = ScriptCommand::new("c.count", jexl::<Value>()).unwrap();
        let err = script.execute(&mut json!({ "count": 3 })).unwrap_err();
        match err {
            ExecutionError::Predicate { expression, source } => {
                assert_eq!(expression, "c.count");
                assert!(matches!(source, ExpressionError::NotBoolean { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_context_binding_property() {
        let mut script = ScriptCommand::new("order.total > 10", jexl::<Value>()).unwrap();
        script
            .set_property(CONTEXT_BINDING_PROPERTY, PropertyValue::Text("order".to_string()))
            .unwrap();
        assert_eq!(script.context_binding(), "order");
        assert!(script.execute(&mut json!({ "total": 12 })).unwrap());

        assert!(matches!(
            script.set_property(CONTEXT_BINDING_PROPERTY, PropertyValue::Int(1)),
            Err(PropertyError::TypeMismatch { .. })
        ));
        assert!(script
            .set_property(CONTEXT_BINDING_PROPERTY, PropertyValue::Text(" ".to_string()))
            .is_err());
    }

    struct Unshareable;

    impl PredicateEvaluator<()> for Unshareable {
        fn evaluate(&self, _: &str, _: &str, _: &()) -> Result<Value, ExpressionError> {
            Ok(Value::Bool(true))
        }

        fn threading(&self) -> Threading {
            Threading::Unsafe
        }
    }

    #[test]
    fn test_unsafe_evaluator_is_rejected() {
        let err = ScriptCommand::<()>::new("true", Arc::new(Unshareable)).unwrap_err();
        assert!(matches!(err, ExpressionError::NotThreadSafe));
    }

    struct Recording {
        calls: AtomicUsize,
    }

    impl PredicateEvaluator<u32> for Recording {
        fn evaluate(&self, expression: &str, binding: &str, context: &u32) -> Result<Value, ExpressionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(expression, "is_even");
            assert_eq!(binding, "c");
            Ok(Value::Bool(context % 2 == 0))
        }
    }

    #[test]
    fn test_host_evaluator_receives_expression_binding_and_context() {
        let evaluator = Arc::new(Recording {
            calls: AtomicUsize::new(0),
        });
        let script = ScriptCommand::<u32>::new("is_even", evaluator.clone()).unwrap();
        assert!(script.execute(&mut 4).unwrap());
        assert!(!script.execute(&mut 5).unwrap());
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_extract_script_strips_marker() {
        assert_eq!(extract_script("#{ c.ok }"), "c.ok");
        assert_eq!(extract_script("  c.ok  "), "c.ok");
        assert_eq!(extract_script("#{c.ok"), "#{c.ok");
    }

    #[test]
    fn test_literal_status() {
        assert_eq!(literal_status(" TRUE "), Some(true));
        assert_eq!(literal_status("False"), Some(false));
        assert_eq!(literal_status("c.ok"), None);
    }
}
