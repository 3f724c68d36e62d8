use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cmdflow_core::resource::{Resource, ResourceResolver, parse_absolute};
use cmdflow_types::config::ResourceSettings;
use cmdflow_types::error::ResourceError;
use url::Url;

use super::embedded::{EMBEDDED_SCHEME, EmbeddedResolver, EmbeddedStore};
use super::file::FileResolver;
use super::remote::UrlResolver;

/// Scheme-dispatching resolver: `file` and `classpath` are handled
/// locally, anything else goes to the fallback (a URL fetch by default).
pub struct DefaultResourceResolver {
    schemes: HashMap<String, Arc<dyn ResourceResolver>>,
    fallback: Option<Arc<dyn ResourceResolver>>,
    embedded: EmbeddedStore,
}

impl Default for DefaultResourceResolver {
    fn default() -> Self {
        Self::from_config(&ResourceSettings::default())
    }
}

impl DefaultResourceResolver {
    /// Resolver with only the `file` and `classpath` schemes and no fallback.
    pub fn local(embedded: EmbeddedStore) -> Self {
        let mut resolver = Self {
            schemes: HashMap::new(),
            fallback: None,
            embedded: embedded.clone(),
        };
        resolver
            .register("file", Arc::new(FileResolver))
            .register(EMBEDDED_SCHEME, Arc::new(EmbeddedResolver::new(embedded)));
        resolver
    }

    pub fn from_config(settings: &ResourceSettings) -> Self {
        let mut resolver = Self::local(EmbeddedStore::with_roots(settings.classpath_roots.clone()));
        if settings.allow_remote {
            resolver.set_fallback(Some(Arc::new(UrlResolver::new(Duration::from_secs(
                settings.fetch_timeout_secs,
            )))));
        }
        tracing::debug!(
            classpath_roots = settings.classpath_roots.len(),
            allow_remote = settings.allow_remote,
            "resource resolver configured"
        );
        resolver
    }

    /// Route `scheme` to `resolver`, replacing any previous route.
    pub fn register(&mut self, scheme: &str, resolver: Arc<dyn ResourceResolver>) -> &mut Self {
        self.schemes.insert(scheme.to_ascii_lowercase(), resolver);
        self
    }

    pub fn set_fallback(&mut self, fallback: Option<Arc<dyn ResourceResolver>>) {
        self.fallback = fallback;
    }

    /// Store behind the `classpath` scheme, for registering documents.
    pub fn embedded(&self) -> &EmbeddedStore {
        &self.embedded
    }

    /// Parse and resolve `uri`. A URI without a scheme is an error.
    pub fn resolve_str(&self, uri: &str) -> Result<Option<Arc<dyn Resource>>, ResourceError> {
        self.resolve(&parse_absolute(uri)?)
    }
}

impl ResourceResolver for DefaultResourceResolver {
    fn resolve(&self, uri: &Url) -> Result<Option<Arc<dyn Resource>>, ResourceError> {
        if let Some(resolver) = self.schemes.get(uri.scheme()) {
            return resolver.resolve(uri);
        }
        match &self.fallback {
            Some(fallback) => fallback.resolve(uri),
            None => {
                tracing::debug!(%uri, "no resolver for uri scheme");
                Ok(None)
            }
        }
    }
}
