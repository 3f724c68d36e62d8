//! Predicate evaluation for script commands.
//!
//! `PredicateEvaluator` is the seam to whatever expression language a host
//! wants. `JexlEvaluator` is the bundled implementation: it serializes the
//! context with serde and evaluates JEXL against `{ <binding>: <context> }`.
//!
//! Contexts are always passed as data, never interpolated into expression
//! strings.

use cmdflow_types::error::ExpressionError;
use serde::Serialize;
use serde_json::{Map, Value, json};

// ---------------------------------------------------------------------------
// Evaluator contract
// ---------------------------------------------------------------------------

/// How an evaluator may be shared between threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threading {
    /// One instance may serve any number of threads at once.
    Multithreaded,
    /// Safe as long as every thread uses its own evaluation scope.
    ThreadIsolated,
    /// Keeps no state between evaluations.
    Stateless,
    /// Must not be shared. Script commands refuse such evaluators.
    Unsafe,
}

impl Threading {
    pub fn allows_concurrent_reuse(self) -> bool {
        !matches!(self, Self::Unsafe)
    }
}

/// Evaluates an expression against a context bound under a name.
pub trait PredicateEvaluator<C>: Send + Sync {
    fn evaluate(&self, expression: &str, binding: &str, context: &C) -> Result<Value, ExpressionError>;

    fn threading(&self) -> Threading {
        Threading::Multithreaded
    }

    /// Validate `expression` ahead of the first evaluation.
    fn compile(&self, _expression: &str) -> Result<(), ExpressionError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JexlEvaluator
// ---------------------------------------------------------------------------

/// JEXL predicate evaluator with the standard transforms registered.
///
/// `jexl_eval::Evaluator` is not `Sync`, so a fresh one is assembled for
/// each evaluation and this type itself holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct JexlEvaluator;

impl JexlEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn engine() -> jexl_eval::Evaluator<'static> {
        jexl_eval::Evaluator::new()
            .with_transform("lower", |args: &[Value]| {
                Ok(json!(str_arg(args, 0).to_lowercase()))
            })
            .with_transform("upper", |args: &[Value]| {
                Ok(json!(str_arg(args, 0).to_uppercase()))
            })
            .with_transform("trim", |args: &[Value]| Ok(json!(str_arg(args, 0).trim())))
            .with_transform("split", |args: &[Value]| {
                let delimiter = args.get(1).and_then(Value::as_str).unwrap_or(",");
                let parts: Vec<&str> = str_arg(args, 0).split(delimiter).collect();
                Ok(json!(parts))
            })
            .with_transform("not", |args: &[Value]| {
                Ok(json!(!truthy(args.first().unwrap_or(&Value::Null))))
            })
            .with_transform("contains", |args: &[Value]| {
                Ok(json!(str_arg(args, 0).contains(str_arg(args, 1))))
            })
            .with_transform("startsWith", |args: &[Value]| {
                Ok(json!(str_arg(args, 0).starts_with(str_arg(args, 1))))
            })
            .with_transform("endsWith", |args: &[Value]| {
                Ok(json!(str_arg(args, 0).ends_with(str_arg(args, 1))))
            })
            .with_transform("length", |args: &[Value]| {
                let len = match args.first() {
                    Some(Value::String(s)) => s.chars().count(),
                    Some(Value::Array(a)) => a.len(),
                    Some(Value::Object(o)) => o.len(),
                    _ => 0,
                };
                Ok(json!(len as f64))
            })
    }

    /// Evaluate `expression` against a JSON object scope.
    pub fn evaluate_in(&self, expression: &str, scope: &Value) -> Result<Value, ExpressionError> {
        if !scope.is_object() {
            return Err(ExpressionError::InvalidContext(
                "scope must be a JSON object".to_string(),
            ));
        }
        Self::engine()
            .eval_in_context(expression, scope)
            .map_err(|e| ExpressionError::EvalFailed(e.to_string()))
    }
}

impl<C: Serialize> PredicateEvaluator<C> for JexlEvaluator {
    fn evaluate(&self, expression: &str, binding: &str, context: &C) -> Result<Value, ExpressionError> {
        let value =
            serde_json::to_value(context).map_err(|e| ExpressionError::InvalidContext(e.to_string()))?;
        let mut scope = Map::new();
        scope.insert(binding.to_string(), value);
        self.evaluate_in(expression, &Value::Object(scope))
    }

    fn threading(&self) -> Threading {
        Threading::Stateless
    }

    fn compile(&self, expression: &str) -> Result<(), ExpressionError> {
        if expression.trim().is_empty() {
            return Err(ExpressionError::EvalFailed("empty expression".to_string()));
        }
        Ok(())
    }
}

fn str_arg(args: &[Value], index: usize) -> &str {
    args.get(index).and_then(Value::as_str).unwrap_or("")
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
