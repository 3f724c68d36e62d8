//! Streaming markup binding.
//!
//! A document is read start-tag by start-tag. Each element is handed to the
//! `ElementProcessor` bound to its qualified name, which may produce a
//! command (pushed onto the handler's stack until the element closes),
//! configure the command on top of the stack, or act on the catalog
//! directly (imports).

use std::collections::BTreeMap;

use cmdflow_core::catalog::CommandCatalog;
use cmdflow_core::command::Command;
use cmdflow_types::element::QualifiedName;
use cmdflow_types::error::BindingError;

use handler::XmlBindingHandler;

pub mod dialect;
pub mod handler;
pub mod processors;

/// Element attributes keyed by local name. Namespace declarations are not
/// included.
pub type Attributes = BTreeMap<String, String>;

/// A start tag as seen by a processor.
#[derive(Debug, Clone, Copy)]
pub struct ElementStart<'a> {
    pub name: &'a QualifiedName,
    pub attributes: &'a Attributes,
}

impl ElementStart<'_> {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn require(&self, name: &str) -> Result<&str, BindingError> {
        self.attribute(name)
            .ok_or_else(|| BindingError::MissingAttribute {
                element: self.name.to_string(),
                attribute: name.to_string(),
            })
    }

    /// `{a=1, b=2}` rendering for error messages.
    pub fn describe_attributes(&self) -> String {
        let pairs: Vec<String> = self
            .attributes
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("{{{}}}", pairs.join(", "))
    }
}

/// Handles one kind of element.
///
/// Returning a command pushes it onto the handler's stack; it is attached to
/// its parent (or registered in the catalog when top level) once the element
/// closes. Returning `None` pushes nothing.
pub trait ElementProcessor<C>: Send + Sync {
    fn start(
        &self,
        element: &ElementStart<'_>,
        handler: &mut XmlBindingHandler<C>,
        catalog: &CommandCatalog<C>,
    ) -> Result<Option<Box<dyn Command<C>>>, BindingError>;
}

/// Picks the catalog name of a top-level command element.
pub trait NameLookup: Send + Sync {
    fn command_name(&self, element: &ElementStart<'_>) -> Option<String>;
}

/// Name taken from an attribute, `name` by default.
#[derive(Debug, Clone)]
pub struct AttributeNameLookup {
    attribute: String,
}

impl AttributeNameLookup {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }
}

impl Default for AttributeNameLookup {
    fn default() -> Self {
        Self::new("name")
    }
}

impl NameLookup for AttributeNameLookup {
    fn command_name(&self, element: &ElementStart<'_>) -> Option<String> {
        element
            .attribute(&self.attribute)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

/// Name taken from the element's local name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementNameLookup;

impl NameLookup for ElementNameLookup {
    fn command_name(&self, element: &ElementStart<'_>) -> Option<String> {
        Some(element.name.local.clone())
    }
}
