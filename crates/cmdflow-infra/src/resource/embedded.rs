use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

use cmdflow_core::resource::{Resource, ResourceResolver, join_uri};
use cmdflow_types::error::ResourceError;
use dashmap::DashMap;
use percent_encoding::percent_decode_str;
use url::Url;

/// URI scheme for host-bundled documents.
pub const EMBEDDED_SCHEME: &str = "classpath";

/// Documents registered by the host, plus directories searched for paths
/// that were never registered.
///
/// Cheap to clone; clones share the same documents. Registering a path
/// again replaces its content for every later `open`.
#[derive(Clone, Default)]
pub struct EmbeddedStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    documents: DashMap<String, Arc<[u8]>>,
    roots: Vec<PathBuf>,
}

impl fmt::Debug for EmbeddedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedStore")
            .field("documents", &self.inner.documents.len())
            .field("roots", &self.inner.roots)
            .finish()
    }
}

impl EmbeddedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                documents: DashMap::new(),
                roots,
            }),
        }
    }

    /// Register `content` under `path`, replacing any previous document.
    pub fn insert(&self, path: &str, content: impl Into<Vec<u8>>) {
        let bytes: Vec<u8> = content.into();
        self.inner
            .documents
            .insert(normalize(path).to_string(), Arc::from(bytes));
    }

    pub fn remove(&self, path: &str) -> bool {
        self.inner.documents.remove(normalize(path)).is_some()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.inner.documents.contains_key(normalize(path))
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.inner.roots
    }

    /// `classpath:` URI for `path`.
    pub fn uri_for(&self, path: &str) -> Result<Url, ResourceError> {
        embedded_uri(normalize(path))
    }

    /// Resource for `path` in this store.
    pub fn resource(&self, path: &str) -> Result<EmbeddedResource, ResourceError> {
        Ok(EmbeddedResource {
            uri: self.uri_for(path)?,
            path: normalize(path).to_string(),
            store: self.clone(),
        })
    }

    fn document(&self, path: &str) -> Option<Arc<[u8]>> {
        self.inner.documents.get(path).map(|entry| entry.value().clone())
    }

    fn root_file(&self, path: &str) -> Option<PathBuf> {
        self.inner
            .roots
            .iter()
            .map(|root| root.join(path))
            .find(|candidate| candidate.is_file())
    }
}

/// A document addressed by a `classpath:` URI.
#[derive(Debug, Clone)]
pub struct EmbeddedResource {
    uri: Url,
    path: String,
    store: EmbeddedStore,
}

impl EmbeddedResource {
    pub fn from_uri(uri: &Url, store: EmbeddedStore) -> Result<Self, ResourceError> {
        let path = percent_decode_str(uri.path())
            .decode_utf8()
            .map_err(|e| ResourceError::InvalidUri {
                uri: uri.to_string(),
                message: e.to_string(),
            })?;
        store.resource(&path)
    }

    /// Store-relative path, without a leading `/`.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Resource for EmbeddedResource {
    fn uri(&self) -> &Url {
        &self.uri
    }

    fn exists(&self) -> bool {
        self.store.contains(&self.path) || self.store.root_file(&self.path).is_some()
    }

    fn open(&self) -> Result<Box<dyn Read + Send>, ResourceError> {
        if let Some(bytes) = self.store.document(&self.path) {
            return Ok(Box::new(Cursor::new(bytes)));
        }
        let file = self
            .store
            .root_file(&self.path)
            .ok_or_else(|| ResourceError::NotFound(self.uri.to_string()))?;
        let file = File::open(&file).map_err(|source| ResourceError::Io {
            uri: self.uri.to_string(),
            source,
        })?;
        Ok(Box::new(file))
    }

    fn resolve_relative(&self, relative: &str) -> Result<Arc<dyn Resource>, ResourceError> {
        let joined = join_uri(&self.uri, relative)?;
        Ok(Arc::new(Self::from_uri(&joined, self.store.clone())?))
    }
}

/// Resolver for the `classpath` scheme, backed by one `EmbeddedStore`.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedResolver {
    store: EmbeddedStore,
}

impl EmbeddedResolver {
    pub fn new(store: EmbeddedStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &EmbeddedStore {
        &self.store
    }
}

impl ResourceResolver for EmbeddedResolver {
    fn resolve(&self, uri: &Url) -> Result<Option<Arc<dyn Resource>>, ResourceError> {
        Ok(Some(Arc::new(EmbeddedResource::from_uri(
            uri,
            self.store.clone(),
        )?)))
    }
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}

fn embedded_uri(path: &str) -> Result<Url, ResourceError> {
    let uri = format!("{EMBEDDED_SCHEME}:/{path}");
    Url::parse(&uri).map_err(|e| ResourceError::InvalidUri {
        uri,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_registered_document_is_readable() {
        let store = EmbeddedStore::new();
        store.insert("flows/main.xml", "<commands/>");

        let resource = store.resource("/flows/main.xml").unwrap();
        assert_eq!(resource.uri().as_str(), "classpath:/flows/main.xml");
        assert!(resource.exists());
        assert_eq!(resource.read_to_end().unwrap(), b"<commands/>");
    }

    #[test]
    fn test_reregistered_document_replaces_content() {
        let store = EmbeddedStore::new();
        store.insert("a.xml", "one");
        let resource = store.resource("a.xml").unwrap();
        assert_eq!(resource.read_to_end().unwrap(), b"one");

        store.insert("/a.xml", "two");
        assert_eq!(resource.read_to_end().unwrap(), b"two");

        assert!(store.remove("a.xml"));
        assert!(!resource.exists());
        assert!(matches!(resource.open(), Err(ResourceError::NotFound(_))));
    }

    #[test]
    fn test_falls_back_to_search_roots() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::create_dir(second.path().join("flows")).unwrap();
        std::fs::write(second.path().join("flows/common.xml"), "from-root").unwrap();

        let store =
            EmbeddedStore::with_roots(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        let resource = store.resource("flows/common.xml").unwrap();
        assert!(resource.exists());
        assert_eq!(resource.read_to_end().unwrap(), b"from-root");

        // Registered documents take precedence over roots.
        store.insert("flows/common.xml", "registered");
        assert_eq!(resource.read_to_end().unwrap(), b"registered");
    }

    #[test]
    fn test_relative_resolution_stays_embedded() {
        let store = EmbeddedStore::new();
        store.insert("flows/shared/common.xml", "x");
        let main = store.resource("flows/main.xml").unwrap();

        let common = main.resolve_relative("shared/common.xml").unwrap();
        assert_eq!(common.uri().as_str(), "classpath:/flows/shared/common.xml");
        assert!(common.exists());

        let up = main.resolve_relative("../top.xml").unwrap();
        assert_eq!(up.uri().as_str(), "classpath:/top.xml");
    }

    #[test]
    fn test_resolver_accepts_classpath_uris() {
        let store = EmbeddedStore::new();
        store.insert("a.xml", "x");
        let resolver = EmbeddedResolver::new(store);

        let uri = Url::parse("classpath:/a.xml").unwrap();
        let resource = resolver.resolve(&uri).unwrap().unwrap();
        assert!(resource.exists());

        let unrooted = Url::parse("classpath:a.xml").unwrap();
        let resource = resolver.resolve(&unrooted).unwrap().unwrap();
        assert_eq!(resource.uri().as_str(), "classpath:/a.xml");
    }

    #[test]
    fn test_encoded_uri_finds_registered_name() {
        let store = EmbeddedStore::new();
        store.insert("flows/común paso.xml", "x");
        let resolver = EmbeddedResolver::new(store);

        let uri = Url::parse("classpath:/flows/com%C3%BAn%20paso.xml").unwrap();
        let resource = resolver.resolve(&uri).unwrap().unwrap();
        assert!(resource.exists());
        assert_eq!(resource.read_to_end().unwrap(), b"x");
    }
}
