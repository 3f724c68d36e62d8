//! Markup dialects keyed by namespace, and the one-call catalog builder.

use std::collections::HashMap;
use std::io::BufReader;
use std::sync::Arc;

use cmdflow_core::builder::CommandBuilder;
use cmdflow_core::catalog::CommandCatalog;
use cmdflow_core::expression::PredicateEvaluator;
use cmdflow_core::factory::CommandFactories;
use cmdflow_core::resource::{Resource, ResourceResolver};
use cmdflow_observe::attrs;
use cmdflow_types::config::{DEFAULT_NAMESPACE, FlowConfig, MarkupSettings};
use cmdflow_types::element::QualifiedName;
use cmdflow_types::error::{BindingError, FlowError};
use quick_xml::NsReader;
use quick_xml::events::Event;

use super::handler::{XmlBindingHandler, parse_error, qualified_name};
use super::processors::{
    CommandProcessor, ConditionalProcessor, FixedProcessor, IgnoreProcessor, ImportProcessor,
    PropertyProcessor,
};
use crate::resource::DefaultResourceResolver;

/// Namespace of the v1 dialect.
pub const V1_NAMESPACE: &str = DEFAULT_NAMESPACE;

/// Binds the v1 element set in `namespace`.
pub fn configure_v1<C: 'static>(handler: &mut XmlBindingHandler<C>, namespace: &str) {
    let name = |local: &str| QualifiedName::new(namespace, local);
    handler
        .bind(name("commands"), Arc::new(IgnoreProcessor))
        .bind(name("import"), Arc::new(ImportProcessor))
        .bind(name("command"), Arc::new(CommandProcessor))
        .bind(name("property"), Arc::new(PropertyProcessor))
        .bind(name("sequence"), Arc::new(FixedProcessor::new("sequence")))
        .bind(name("and"), Arc::new(FixedProcessor::new("and")))
        .bind(name("or"), Arc::new(FixedProcessor::new("or")))
        .bind(name("not"), Arc::new(FixedProcessor::new("not")))
        .bind(name("if"), Arc::new(ConditionalProcessor::new("if")))
        .bind(name("ifElse"), Arc::new(ConditionalProcessor::new("if-else")))
        .bind(name("while"), Arc::new(ConditionalProcessor::new("while")))
        .bind(name("doWhile"), Arc::new(ConditionalProcessor::new("do-while")));
}

/// Installs a dialect's element bindings on a fresh handler.
pub type DialectConfigurer<C> = Arc<dyn Fn(&mut XmlBindingHandler<C>) + Send + Sync>;

/// Creates binding handlers for documents, choosing the dialect from the
/// namespace of the document's root element.
pub struct XmlBindingFactory<C> {
    dialects: HashMap<String, DialectConfigurer<C>>,
    markup: MarkupSettings,
    factories: CommandFactories<C>,
    resolver: Arc<dyn ResourceResolver>,
}

impl<C: 'static> Default for XmlBindingFactory<C> {
    fn default() -> Self {
        Self::from_config(&FlowConfig::default())
    }
}

impl<C: 'static> XmlBindingFactory<C> {
    pub fn from_config(config: &FlowConfig) -> Self {
        let mut factory = Self {
            dialects: HashMap::new(),
            markup: config.markup.clone(),
            factories: CommandFactories::with_builtins(),
            resolver: Arc::new(DefaultResourceResolver::from_config(&config.resources)),
        };
        factory.register_dialect(
            V1_NAMESPACE,
            Arc::new(|handler: &mut XmlBindingHandler<C>| configure_v1(handler, V1_NAMESPACE)),
        );
        factory
    }

    pub fn register_dialect(&mut self, namespace: impl Into<String>, configurer: DialectConfigurer<C>) -> &mut Self {
        self.dialects.insert(namespace.into(), configurer);
        self
    }

    pub fn namespaces(&self) -> Vec<&str> {
        let mut namespaces: Vec<&str> = self.dialects.keys().map(String::as_str).collect();
        namespaces.sort_unstable();
        namespaces
    }

    /// Dialect assumed for documents whose root carries no namespace.
    pub fn default_namespace(&self) -> &str {
        &self.markup.namespace
    }

    pub fn set_resolver(&mut self, resolver: Arc<dyn ResourceResolver>) -> &mut Self {
        self.resolver = resolver;
        self
    }

    pub fn factories_mut(&mut self) -> &mut CommandFactories<C> {
        &mut self.factories
    }

    /// Handler for the dialect registered under `namespace`, or under the
    /// default namespace when `None`.
    pub fn create_handler(&self, namespace: Option<&str>) -> Result<XmlBindingHandler<C>, BindingError> {
        let namespace = namespace.unwrap_or(&self.markup.namespace);
        let configure = self
            .dialects
            .get(namespace)
            .ok_or_else(|| BindingError::UnknownNamespace(namespace.to_string()))?;

        let mut handler = XmlBindingHandler::new(self.resolver.clone());
        handler
            .set_factories(self.factories.clone())
            .set_context_binding(self.markup.context_binding.clone());
        configure(&mut handler);
        Ok(handler)
    }

    /// Build, link and initialize a catalog from `resources`. The dialect is
    /// picked from the first resource and used for all of them.
    pub fn build_catalog(
        &self,
        resources: &[Arc<dyn Resource>],
        evaluator: Option<Arc<dyn PredicateEvaluator<C>>>,
    ) -> Result<CommandCatalog<C>, FlowError> {
        let first = resources.first().ok_or(BindingError::NoResources)?;
        let namespace = top_level_namespace(first.as_ref())?;
        tracing::debug!(
            { attrs::RESOURCE_URI } = %first.uri(),
            namespace = namespace.as_deref().unwrap_or(self.default_namespace()),
            resources = resources.len(),
            "building catalog from markup"
        );

        let mut handler = self.create_handler(namespace.as_deref())?;
        handler.set_evaluator(evaluator);
        for resource in resources {
            handler.add_resource(resource.clone());
        }

        let mut builder = CommandBuilder::new(CommandCatalog::new());
        builder.add_binding_handler(handler);
        builder.make()?;
        Ok(builder.catalog().clone())
    }
}

/// Namespace of the first element in `resource`, if it has one.
pub fn top_level_namespace(resource: &dyn Resource) -> Result<Option<String>, BindingError> {
    let uri = resource.uri().to_string();
    let mut reader = NsReader::from_reader(BufReader::new(resource.open()?));
    let mut buf = Vec::new();

    loop {
        {
            let (ns, event) = reader
                .read_resolved_event_into(&mut buf)
                .map_err(|e| parse_error(&uri, e))?;
            match event {
                Event::Start(start) | Event::Empty(start) => {
                    return Ok(qualified_name(ns, &start, &uri)?.namespace);
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
        buf.clear();
    }
}

/// Build a catalog from markup `resources` with default settings and the
/// built-in command factories.
pub fn build_xml_catalog<C: 'static>(
    resources: &[Arc<dyn Resource>],
    evaluator: Option<Arc<dyn PredicateEvaluator<C>>>,
) -> Result<CommandCatalog<C>, FlowError> {
    XmlBindingFactory::default().build_catalog(resources, evaluator)
}
