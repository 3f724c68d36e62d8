//! Element processors used by the markup dialects.

use std::sync::Arc;

use cmdflow_core::catalog::CommandCatalog;
use cmdflow_core::command::script::{extract_script, literal_status};
use cmdflow_core::command::{AlwaysFalse, AlwaysTrue, Command, CommandReference, ScriptCommand};
use cmdflow_observe::attrs;
use cmdflow_types::error::BindingError;

use super::handler::XmlBindingHandler;
use super::{ElementProcessor, ElementStart};

pub const CLASS_ATTRIBUTE: &str = "class";
pub const REF_ATTRIBUTE: &str = "ref";
pub const DYNAMIC_REF_ATTRIBUTE: &str = "dynamicRef";
pub const VALUE_ATTRIBUTE: &str = "value";
pub const NAME_ATTRIBUTE: &str = "name";
pub const RESOURCE_ATTRIBUTE: &str = "resource";

/// Structural elements: produces nothing, children are processed as usual.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreProcessor;

impl<C> ElementProcessor<C> for IgnoreProcessor {
    fn start(
        &self,
        _element: &ElementStart<'_>,
        _handler: &mut XmlBindingHandler<C>,
        _catalog: &CommandCatalog<C>,
    ) -> Result<Option<Box<dyn Command<C>>>, BindingError> {
        Ok(None)
    }
}

/// Always produces a fresh command from one registered factory.
#[derive(Debug, Clone)]
pub struct FixedProcessor {
    factory: String,
}

impl FixedProcessor {
    pub fn new(factory: impl Into<String>) -> Self {
        Self {
            factory: factory.into(),
        }
    }
}

impl<C: 'static> ElementProcessor<C> for FixedProcessor {
    fn start(
        &self,
        _element: &ElementStart<'_>,
        handler: &mut XmlBindingHandler<C>,
        _catalog: &CommandCatalog<C>,
    ) -> Result<Option<Box<dyn Command<C>>>, BindingError> {
        handler.factories().create(&self.factory).map(Some)
    }
}

/// Builds a command from `class`, `ref` or `value`, in that priority.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandProcessor;

impl<C: 'static> ElementProcessor<C> for CommandProcessor {
    fn start(
        &self,
        element: &ElementStart<'_>,
        handler: &mut XmlBindingHandler<C>,
        _catalog: &CommandCatalog<C>,
    ) -> Result<Option<Box<dyn Command<C>>>, BindingError> {
        match command_from_attributes(element, handler)? {
            Some(command) => Ok(Some(command)),
            None => Err(BindingError::InvalidCommand {
                element: element.name.to_string(),
                attributes: element.describe_attributes(),
            }),
        }
    }
}

/// A conditional composite whose condition is either given by attributes
/// (as for `CommandProcessor`) or is the first child element.
#[derive(Debug, Clone)]
pub struct ConditionalProcessor {
    factory: String,
}

impl ConditionalProcessor {
    pub fn new(factory: impl Into<String>) -> Self {
        Self {
            factory: factory.into(),
        }
    }
}

impl<C: 'static> ElementProcessor<C> for ConditionalProcessor {
    fn start(
        &self,
        element: &ElementStart<'_>,
        handler: &mut XmlBindingHandler<C>,
        _catalog: &CommandCatalog<C>,
    ) -> Result<Option<Box<dyn Command<C>>>, BindingError> {
        let command = handler.factories().create(&self.factory)?;
        if let Some(condition) = command_from_attributes(element, handler)? {
            let composite = command
                .as_composite()
                .ok_or_else(|| BindingError::NotComposite {
                    parent: element.name.to_string(),
                    child: "condition".to_string(),
                })?;
            composite.add(Arc::from(condition));
        }
        Ok(Some(command))
    }
}

/// Sets a named property on the command of the enclosing element.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyProcessor;

impl<C: 'static> ElementProcessor<C> for PropertyProcessor {
    fn start(
        &self,
        element: &ElementStart<'_>,
        handler: &mut XmlBindingHandler<C>,
        _catalog: &CommandCatalog<C>,
    ) -> Result<Option<Box<dyn Command<C>>>, BindingError> {
        let name = element.require(NAME_ATTRIBUTE)?;
        let value = element.require(VALUE_ATTRIBUTE)?;
        let properties = handler.property_configurator().clone();
        let target = handler
            .top_command_mut()
            .ok_or_else(|| BindingError::NoPropertyTarget {
                property: name.to_string(),
            })?;
        properties.configure(target, name, value)?;
        Ok(None)
    }
}

/// Parses another document into the same catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportProcessor;

impl<C: 'static> ElementProcessor<C> for ImportProcessor {
    fn start(
        &self,
        element: &ElementStart<'_>,
        handler: &mut XmlBindingHandler<C>,
        catalog: &CommandCatalog<C>,
    ) -> Result<Option<Box<dyn Command<C>>>, BindingError> {
        let resource = element.require(RESOURCE_ATTRIBUTE)?;
        handler.import(resource.trim(), catalog)?;
        Ok(None)
    }
}

/// Command named by the `class`, `ref` or `value` attribute, or `None` when
/// none of them is present.
pub fn command_from_attributes<C: 'static>(
    element: &ElementStart<'_>,
    handler: &XmlBindingHandler<C>,
) -> Result<Option<Box<dyn Command<C>>>, BindingError> {
    let class = element.attribute(CLASS_ATTRIBUTE);
    let reference = element.attribute(REF_ATTRIBUTE);
    let value = element.attribute(VALUE_ATTRIBUTE);

    let present: Vec<&str> = [
        (CLASS_ATTRIBUTE, class),
        (REF_ATTRIBUTE, reference),
        (VALUE_ATTRIBUTE, value),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|_| name))
    .collect();
    if present.len() > 1 {
        tracing::warn!(
            { attrs::ELEMENT_NAME } = %element.name,
            used = present[0],
            ignored = ?&present[1..],
            "several command attributes present, using the highest priority one"
        );
    }

    if let Some(class) = class {
        return handler.factories().create(class.trim()).map(Some);
    }
    if let Some(reference) = reference {
        let dynamic = match element.attribute(DYNAMIC_REF_ATTRIBUTE) {
            Some(flag) => literal_status(flag).ok_or_else(|| BindingError::PropertyCoercion {
                property: DYNAMIC_REF_ATTRIBUTE.to_string(),
                value: flag.to_string(),
                message: "expected true or false".to_string(),
            })?,
            None => false,
        };
        return Ok(Some(Box::new(CommandReference::<C>::new(
            reference.trim(),
            dynamic,
        ))));
    }
    if let Some(value) = value {
        return script_command(value, handler).map(Some);
    }
    Ok(None)
}

fn script_command<C: 'static>(
    text: &str,
    handler: &XmlBindingHandler<C>,
) -> Result<Box<dyn Command<C>>, BindingError> {
    let script = extract_script(text);
    if let Some(status) = literal_status(script) {
        let command: Box<dyn Command<C>> = if status {
            Box::new(AlwaysTrue)
        } else {
            Box::new(AlwaysFalse)
        };
        return Ok(command);
    }

    let evaluator = handler
        .evaluator()
        .cloned()
        .ok_or_else(|| BindingError::NoEvaluator {
            expression: script.to_string(),
        })?;
    let command = ScriptCommand::new(script, evaluator)
        .map_err(|source| BindingError::Expression {
            expression: script.to_string(),
            source,
        })?
        .with_context_binding(handler.context_binding());
    Ok(Box::new(command))
}

#[cfg(test)]
mod tests {
    use cmdflow_core::expression::{JexlEvaluator, PredicateEvaluator, Threading};
    use cmdflow_types::element::QualifiedName;
    use cmdflow_types::error::ExpressionError;
    use serde_json::{Value, json};

    use super::*;
    use crate::binding::Attributes;
    use crate::resource::{DefaultResourceResolver, EmbeddedStore};

    fn handler() -> XmlBindingHandler<Value> {
        XmlBindingHandler::new(Arc::new(DefaultResourceResolver::local(EmbeddedStore::new())))
    }

    fn attributes(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn build(handler: &XmlBindingHandler<Value>, pairs: &[(&str, &str)]) -> Result<Option<Box<dyn Command<Value>>>, BindingError> {
        let name = QualifiedName::local("command");
        let attrs = attributes(pairs);
        command_from_attributes(
            &ElementStart {
                name: &name,
                attributes: &attrs,
            },
            handler,
        )
    }

    struct Unshareable;

    impl PredicateEvaluator<Value> for Unshareable {
        fn evaluate(&self, _: &str, _: &str, _: &Value) -> Result<Value, ExpressionError> {
            Ok(Value::Bool(true))
        }

        fn threading(&self) -> Threading {
            Threading::Unsafe
        }
    }

    #[test]
    fn test_class_takes_priority_over_value() {
        let handler = handler();
        let command = build(&handler, &[("class", "false"), ("value", "true")])
            .unwrap()
            .unwrap();
        assert!(!command.execute(&mut Value::Null).unwrap());
    }

    #[test]
    fn test_ref_takes_priority_over_value() {
        let handler = handler();
        let command = build(&handler, &[("ref", " target "), ("value", "true")])
            .unwrap()
            .unwrap();
        let reference = command.as_reference().unwrap();
        assert_eq!(reference.name(), "target");
        assert!(!reference.is_dynamic());
    }

    #[test]
    fn test_dynamic_ref_flag() {
        let handler = handler();
        let command = build(&handler, &[("ref", "loop"), ("dynamicRef", "TRUE")])
            .unwrap()
            .unwrap();
        assert!(command.as_reference().unwrap().is_dynamic());

        let err = build(&handler, &[("ref", "loop"), ("dynamicRef", "yes")]).err().unwrap();
        assert!(matches!(err, BindingError::PropertyCoercion { .. }));
    }

    #[test]
    fn test_unknown_class_is_rejected() {
        let handler = handler();
        let err = build(&handler, &[("class", "launch")]).err().unwrap();
        assert!(matches!(err, BindingError::UnknownCommandType(name) if name == "launch"));
    }

    #[test]
    fn test_literal_value_needs_no_evaluator() {
        let handler = handler();
        let yes = build(&handler, &[("value", "#{ True }")]).unwrap().unwrap();
        let no = build(&handler, &[("value", " false ")]).unwrap().unwrap();
        assert!(yes.execute(&mut Value::Null).unwrap());
        assert!(!no.execute(&mut Value::Null).unwrap());
    }

    #[test]
    fn test_script_requires_evaluator() {
        let handler = handler();
        let err = build(&handler, &[("value", "#{ c.ready }")]).err().unwrap();
        assert_eq!(
            err.to_string(),
            "no predicate evaluator configured for expression 'c.ready'"
        );
    }

    #[test]
    fn test_script_uses_context_binding() {
        let mut handler = handler();
        handler
            .set_evaluator(Some(Arc::new(JexlEvaluator)))
            .set_context_binding("ctx");
        let command = build(&handler, &[("value", "#{ ctx.ready == true }")])
            .unwrap()
            .unwrap();
        assert!(command.execute(&mut json!({"ready": true})).unwrap());
        assert!(!command.execute(&mut json!({"ready": false})).unwrap());
    }

    #[test]
    fn test_unsafe_evaluator_is_rejected() {
        let mut handler = handler();
        handler.set_evaluator(Some(Arc::new(Unshareable)));
        let err = build(&handler, &[("value", "c.ready")]).err().unwrap();
        assert!(matches!(
            err,
            BindingError::Expression {
                source: ExpressionError::NotThreadSafe,
                ..
            }
        ));
    }

    #[test]
    fn test_no_command_attributes_yields_none() {
        let handler = handler();
        assert!(build(&handler, &[("name", "x")]).unwrap().is_none());
    }

    #[test]
    fn test_command_processor_describes_missing_attributes() {
        let mut handler = handler();
        let name = QualifiedName::new("urn:x", "command");
        let attrs = attributes(&[("name", "x")]);
        let element = ElementStart {
            name: &name,
            attributes: &attrs,
        };
        let err = CommandProcessor
            .start(&element, &mut handler, &CommandCatalog::new())
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "cannot build command with element '{urn:x}command' and attributes {name=x}"
        );
    }

    #[test]
    fn test_property_outside_command_has_no_target() {
        let mut handler = handler();
        let name = QualifiedName::local("property");
        let attrs = attributes(&[("name", "contextBindingName"), ("value", "x")]);
        let element = ElementStart {
            name: &name,
            attributes: &attrs,
        };
        let err = PropertyProcessor
            .start(&element, &mut handler, &CommandCatalog::new())
            .err()
            .unwrap();
        assert!(matches!(err, BindingError::NoPropertyTarget { .. }));
    }
}
