use std::collections::HashMap;
use std::fmt;
use std::io::BufReader;
use std::sync::Arc;

use cmdflow_core::builder::BindingHandler;
use cmdflow_core::catalog::CommandCatalog;
use cmdflow_core::command::{Command, SharedCommand};
use cmdflow_core::expression::PredicateEvaluator;
use cmdflow_core::factory::CommandFactories;
use cmdflow_core::property::PropertyConfigurator;
use cmdflow_core::resource::{Resource, ResourceResolver, parse_absolute};
use cmdflow_observe::attrs;
use cmdflow_types::config::DEFAULT_CONTEXT_BINDING;
use cmdflow_types::element::QualifiedName;
use cmdflow_types::error::{BindingError, ResourceError};
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;

use super::{AttributeNameLookup, Attributes, ElementProcessor, ElementStart, NameLookup};

/// A command under construction, waiting for its element to close.
struct Frame<C> {
    command: Box<dyn Command<C>>,
    /// Catalog name; set only for top-level frames.
    name: Option<String>,
    element: QualifiedName,
}

/// Stack-based streaming builder turning markup documents into commands.
///
/// Element names are dispatched to the processors bound with `bind`.
/// Imports run in a copy of this handler (`clone_for_import`) that shares
/// the processor bindings and carries the chain of documents leading to it,
/// so a document importing itself through any path is rejected while a
/// document reached by two different paths is not.
pub struct XmlBindingHandler<C> {
    resources: Vec<Arc<dyn Resource>>,
    processors: HashMap<QualifiedName, Arc<dyn ElementProcessor<C>>>,
    resolver: Arc<dyn ResourceResolver>,
    factories: CommandFactories<C>,
    evaluator: Option<Arc<dyn PredicateEvaluator<C>>>,
    context_binding: String,
    name_lookup: Arc<dyn NameLookup>,
    properties: Arc<PropertyConfigurator>,
    lineage: Vec<Arc<dyn Resource>>,
    frames: Vec<Frame<C>>,
    pushed: Vec<bool>,
}

impl<C> fmt::Debug for XmlBindingHandler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resources: Vec<&str> = self.resources.iter().map(|r| r.uri().as_str()).collect();
        f.debug_struct("XmlBindingHandler")
            .field("resources", &resources)
            .field("processors", &self.processors.len())
            .field("context_binding", &self.context_binding)
            .field("depth", &self.lineage.len())
            .finish()
    }
}

impl<C: 'static> XmlBindingHandler<C> {
    /// Handler with no element bindings, the built-in command factories and
    /// no predicate evaluator.
    pub fn new(resolver: Arc<dyn ResourceResolver>) -> Self {
        Self {
            resources: Vec::new(),
            processors: HashMap::new(),
            resolver,
            factories: CommandFactories::with_builtins(),
            evaluator: None,
            context_binding: DEFAULT_CONTEXT_BINDING.to_string(),
            name_lookup: Arc::new(AttributeNameLookup::default()),
            properties: Arc::new(PropertyConfigurator::new()),
            lineage: Vec::new(),
            frames: Vec::new(),
            pushed: Vec::new(),
        }
    }

    // -- configuration ----------------------------------------------------

    pub fn add_resource(&mut self, resource: Arc<dyn Resource>) -> &mut Self {
        self.resources.push(resource);
        self
    }

    /// Resolve `uri` with this handler's resolver and add it.
    pub fn add_resource_uri(&mut self, uri: &str) -> Result<&mut Self, BindingError> {
        let resource = self
            .resolver
            .resolve(&parse_absolute(uri)?)?
            .ok_or_else(|| ResourceError::NotFound(uri.to_string()))?;
        Ok(self.add_resource(resource))
    }

    pub fn resources(&self) -> &[Arc<dyn Resource>] {
        &self.resources
    }

    /// Bind `processor` to elements named `name`, replacing any previous
    /// binding.
    pub fn bind(
        &mut self,
        name: QualifiedName,
        processor: Arc<dyn ElementProcessor<C>>,
    ) -> &mut Self {
        self.processors.insert(name, processor);
        self
    }

    pub fn is_bound(&self, name: &QualifiedName) -> bool {
        self.processors.contains_key(name)
    }

    pub fn clear_bindings(&mut self) {
        self.processors.clear();
    }

    pub fn set_factories(&mut self, factories: CommandFactories<C>) -> &mut Self {
        self.factories = factories;
        self
    }

    pub fn factories_mut(&mut self) -> &mut CommandFactories<C> {
        &mut self.factories
    }

    pub fn set_evaluator(&mut self, evaluator: Option<Arc<dyn PredicateEvaluator<C>>>) -> &mut Self {
        self.evaluator = evaluator;
        self
    }

    pub fn set_context_binding(&mut self, binding: impl Into<String>) -> &mut Self {
        self.context_binding = binding.into();
        self
    }

    pub fn set_name_lookup(&mut self, lookup: Arc<dyn NameLookup>) -> &mut Self {
        self.name_lookup = lookup;
        self
    }

    pub fn set_property_configurator(&mut self, properties: Arc<PropertyConfigurator>) -> &mut Self {
        self.properties = properties;
        self
    }

    // -- accessors used by processors --------------------------------------

    pub fn factories(&self) -> &CommandFactories<C> {
        &self.factories
    }

    pub fn evaluator(&self) -> Option<&Arc<dyn PredicateEvaluator<C>>> {
        self.evaluator.as_ref()
    }

    pub fn context_binding(&self) -> &str {
        &self.context_binding
    }

    pub fn property_configurator(&self) -> &Arc<PropertyConfigurator> {
        &self.properties
    }

    /// Document currently being parsed.
    pub fn current_resource(&self) -> Option<&Arc<dyn Resource>> {
        self.lineage.last()
    }

    /// Command of the innermost open element that produced one.
    pub fn top_command_mut(&mut self) -> Option<&mut dyn Command<C>> {
        match self.frames.last_mut() {
            Some(frame) => Some(&mut *frame.command),
            None => None,
        }
    }

    /// Copy sharing bindings and collaborators, with no resources and an
    /// empty stack. The import lineage is carried over.
    pub fn clone_for_import(&self) -> Self {
        Self {
            resources: Vec::new(),
            processors: self.processors.clone(),
            resolver: self.resolver.clone(),
            factories: self.factories.clone(),
            evaluator: self.evaluator.clone(),
            context_binding: self.context_binding.clone(),
            name_lookup: self.name_lookup.clone(),
            properties: self.properties.clone(),
            lineage: self.lineage.clone(),
            frames: Vec::new(),
            pushed: Vec::new(),
        }
    }

    /// Parse the document `reference` points at into `catalog`.
    ///
    /// Absolute URIs go through the resolver; anything else is taken
    /// relative to the current document.
    pub fn import(&self, reference: &str, catalog: &CommandCatalog<C>) -> Result<(), BindingError> {
        let resource = self.resolve_import(reference)?;
        tracing::debug!(
            { attrs::RESOURCE_URI } = %resource.uri(),
            depth = self.lineage.len(),
            "importing document"
        );
        self.clone_for_import().process(resource, catalog)
    }

    // -- parsing -----------------------------------------------------------

    fn resolve_import(&self, reference: &str) -> Result<Arc<dyn Resource>, BindingError> {
        let from = self
            .current_resource()
            .map(|r| r.uri().to_string())
            .unwrap_or_else(|| "<root>".to_string());
        let not_found = || BindingError::ImportNotFound {
            resource: reference.to_string(),
            from: from.clone(),
        };

        let resolved = match parse_absolute(reference) {
            Ok(uri) => self.resolver.resolve(&uri)?,
            Err(ResourceError::NotAbsolute(_)) => match self.current_resource() {
                Some(current) => Some(current.resolve_relative(reference)?),
                None => None,
            },
            Err(err) => return Err(err.into()),
        };
        match resolved {
            Some(resource) if resource.exists() => Ok(resource),
            _ => Err(not_found()),
        }
    }

    fn process(
        &mut self,
        resource: Arc<dyn Resource>,
        catalog: &CommandCatalog<C>,
    ) -> Result<(), BindingError> {
        if self.lineage.iter().any(|seen| **seen == *resource) {
            let mut chain: Vec<String> = self.lineage.iter().map(|r| r.uri().to_string()).collect();
            chain.push(resource.uri().to_string());
            return Err(BindingError::CircularImport {
                chain: chain.join(" -> "),
            });
        }

        let span = tracing::info_span!(attrs::SPAN_DOCUMENT, { attrs::RESOURCE_URI } = %resource.uri());
        let _enter = span.enter();

        self.lineage.push(resource.clone());
        let result = self.parse(resource.as_ref(), catalog);
        self.lineage.pop();
        self.frames.clear();
        self.pushed.clear();
        result
    }

    fn parse(&mut self, resource: &dyn Resource, catalog: &CommandCatalog<C>) -> Result<(), BindingError> {
        let uri = resource.uri().to_string();
        let mut reader = NsReader::from_reader(BufReader::new(resource.open()?));
        let mut buf = Vec::new();

        loop {
            {
                let (ns, event) = reader
                    .read_resolved_event_into(&mut buf)
                    .map_err(|e| parse_error(&uri, e))?;
                match event {
                    Event::Start(start) => {
                        let name = qualified_name(ns, &start, &uri)?;
                        let attributes = read_attributes(&start, &uri)?;
                        self.start_element(name, attributes, catalog)?;
                    }
                    Event::Empty(start) => {
                        let name = qualified_name(ns, &start, &uri)?;
                        let attributes = read_attributes(&start, &uri)?;
                        self.start_element(name, attributes, catalog)?;
                        self.end_element(catalog);
                    }
                    Event::End(_) => self.end_element(catalog),
                    Event::Eof if !self.pushed.is_empty() => {
                        return Err(parse_error(
                            &uri,
                            format!(
                                "unexpected end of document: {} unclosed elements",
                                self.pushed.len()
                            ),
                        ));
                    }
                    Event::Eof => break,
                    _ => {}
                }
            }
            buf.clear();
        }
        Ok(())
    }

    fn start_element(
        &mut self,
        name: QualifiedName,
        attributes: Attributes,
        catalog: &CommandCatalog<C>,
    ) -> Result<(), BindingError> {
        let processor = self
            .processors
            .get(&name)
            .cloned()
            .ok_or_else(|| BindingError::UnknownElement(name.to_string()))?;
        let element = ElementStart {
            name: &name,
            attributes: &attributes,
        };

        match processor.start(&element, self, catalog)? {
            Some(command) => {
                self.push(command, &element)?;
                self.pushed.push(true);
            }
            None => self.pushed.push(false),
        }
        Ok(())
    }

    fn push(&mut self, command: Box<dyn Command<C>>, element: &ElementStart<'_>) -> Result<(), BindingError> {
        let name = match self.frames.last() {
            None => Some(self.name_lookup.command_name(element).ok_or_else(|| {
                BindingError::MissingCommandName {
                    element: element.name.to_string(),
                }
            })?),
            Some(parent) if parent.command.as_composite().is_none() => {
                return Err(BindingError::NotComposite {
                    parent: parent.element.to_string(),
                    child: element.name.to_string(),
                });
            }
            Some(_) => None,
        };
        self.frames.push(Frame {
            command,
            name,
            element: element.name.clone(),
        });
        Ok(())
    }

    fn end_element(&mut self, catalog: &CommandCatalog<C>) {
        if !self.pushed.pop().unwrap_or(false) {
            return;
        }
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let command: SharedCommand<C> = Arc::from(frame.command);

        match (self.frames.last(), frame.name) {
            (Some(parent), _) => {
                if let Some(composite) = parent.command.as_composite() {
                    composite.add(command);
                }
            }
            (None, Some(name)) => {
                tracing::debug!(
                    { attrs::COMMAND_NAME } = %name,
                    { attrs::ELEMENT_NAME } = %frame.element,
                    "registered top-level command"
                );
                catalog.add_command(name, command);
            }
            (None, None) => {}
        }
    }
}

impl<C: 'static> BindingHandler<C> for XmlBindingHandler<C> {
    fn build(&mut self, catalog: &CommandCatalog<C>) -> Result<(), BindingError> {
        if self.resources.is_empty() {
            return Err(BindingError::NoResources);
        }
        for resource in self.resources.clone() {
            self.process(resource, catalog)?;
        }
        Ok(())
    }
}

pub(crate) fn parse_error(uri: &str, err: impl fmt::Display) -> BindingError {
    BindingError::Parse {
        resource: uri.to_string(),
        message: err.to_string(),
    }
}

pub(crate) fn qualified_name(
    ns: ResolveResult<'_>,
    start: &BytesStart<'_>,
    uri: &str,
) -> Result<QualifiedName, BindingError> {
    let local_name = start.local_name();
    let local = std::str::from_utf8(local_name.as_ref()).map_err(|e| parse_error(uri, e))?;
    match ns {
        ResolveResult::Bound(namespace) => {
            let namespace =
                std::str::from_utf8(namespace.into_inner()).map_err(|e| parse_error(uri, e))?;
            Ok(QualifiedName::new(namespace, local))
        }
        ResolveResult::Unbound => Ok(QualifiedName::local(local)),
        ResolveResult::Unknown(prefix) => Err(parse_error(
            uri,
            format!(
                "unknown namespace prefix '{}'",
                String::from_utf8_lossy(&prefix)
            ),
        )),
    }
}

fn read_attributes(start: &BytesStart<'_>, uri: &str) -> Result<Attributes, BindingError> {
    let mut attributes = Attributes::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| parse_error(uri, e))?;
        if attribute.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = std::str::from_utf8(attribute.key.local_name().as_ref())
            .map_err(|e| parse_error(uri, e))?
            .to_string();
        let value = attribute
            .unescape_value()
            .map_err(|e| parse_error(uri, e))?
            .into_owned();
        attributes.insert(key, value);
    }
    Ok(attributes)
}
