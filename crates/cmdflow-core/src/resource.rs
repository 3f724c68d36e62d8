//! Resource contracts: URI-identified, re-readable byte sources.
//!
//! Concrete resources (filesystem, embedded store, remote URL) and the
//! default scheme-based resolver chain live in `cmdflow-infra`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::sync::Arc;

use cmdflow_types::error::ResourceError;
use url::Url;

/// A named document source.
///
/// Equality and hashing are by URI. `open` returns a fresh stream on every
/// call, reflecting the latest content of a mutable backing store.
pub trait Resource: Send + Sync + fmt::Debug {
    fn uri(&self) -> &Url;

    /// Whether the resource can currently be read.
    fn exists(&self) -> bool;

    fn open(&self) -> Result<Box<dyn Read + Send>, ResourceError>;

    /// A resource of the same kind at `relative`, resolved against this
    /// resource's URI.
    fn resolve_relative(&self, relative: &str) -> Result<Arc<dyn Resource>, ResourceError>;

    /// Read the whole resource into memory.
    fn read_to_end(&self) -> Result<Vec<u8>, ResourceError> {
        let mut bytes = Vec::new();
        self.open()?
            .read_to_end(&mut bytes)
            .map_err(|source| ResourceError::Io {
                uri: self.uri().to_string(),
                source,
            })?;
        Ok(bytes)
    }
}

impl PartialEq for dyn Resource {
    fn eq(&self, other: &Self) -> bool {
        self.uri() == other.uri()
    }
}

impl Eq for dyn Resource {}

impl Hash for dyn Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri().hash(state);
    }
}

/// Maps an absolute URI to a resource.
///
/// `Ok(None)` means the resolver declines the URI (no handler for its
/// scheme); it says nothing about whether the document exists.
pub trait ResourceResolver: Send + Sync {
    fn resolve(&self, uri: &Url) -> Result<Option<Arc<dyn Resource>>, ResourceError>;
}

/// Parse `uri`, requiring it to carry a scheme.
pub fn parse_absolute(uri: &str) -> Result<Url, ResourceError> {
    Url::parse(uri).map_err(|e| match e {
        url::ParseError::RelativeUrlWithoutBase => ResourceError::NotAbsolute(uri.to_string()),
        other => ResourceError::InvalidUri {
            uri: uri.to_string(),
            message: other.to_string(),
        },
    })
}

/// Resolve `relative` against `base`.
pub fn join_uri(base: &Url, relative: &str) -> Result<Url, ResourceError> {
    base.join(relative).map_err(|e| ResourceError::InvalidUri {
        uri: relative.to_string(),
        message: e.to_string(),
    })
}
