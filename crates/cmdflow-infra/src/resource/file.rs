use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cmdflow_core::resource::{Resource, ResourceResolver, join_uri};
use cmdflow_types::error::ResourceError;
use url::Url;

/// A document on the local filesystem.
///
/// Exists only while the path is a readable regular file. Every `open`
/// reopens the file, so edits made after resolution are visible.
#[derive(Debug, Clone)]
pub struct FileResource {
    uri: Url,
    path: PathBuf,
}

impl FileResource {
    /// Resource for `path`. Relative paths are taken from the current
    /// working directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|source| ResourceError::Io {
                    uri: path.display().to_string(),
                    source,
                })?
                .join(path)
        };
        let uri = Url::from_file_path(&absolute).map_err(|()| ResourceError::InvalidUri {
            uri: absolute.display().to_string(),
            message: "not a valid file path".to_string(),
        })?;
        Ok(Self {
            uri,
            path: absolute,
        })
    }

    pub fn from_uri(uri: Url) -> Result<Self, ResourceError> {
        let path = uri.to_file_path().map_err(|()| ResourceError::InvalidUri {
            uri: uri.to_string(),
            message: "not a local file uri".to_string(),
        })?;
        Ok(Self { uri, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Resource for FileResource {
    fn uri(&self) -> &Url {
        &self.uri
    }

    fn exists(&self) -> bool {
        self.path.is_file() && File::open(&self.path).is_ok()
    }

    fn open(&self) -> Result<Box<dyn Read + Send>, ResourceError> {
        match File::open(&self.path) {
            Ok(file) => Ok(Box::new(file)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(ResourceError::NotFound(self.uri.to_string()))
            }
            Err(source) => Err(ResourceError::Io {
                uri: self.uri.to_string(),
                source,
            }),
        }
    }

    fn resolve_relative(&self, relative: &str) -> Result<Arc<dyn Resource>, ResourceError> {
        Ok(Arc::new(Self::from_uri(join_uri(&self.uri, relative)?)?))
    }
}

/// Resolver for the `file` scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileResolver;

impl ResourceResolver for FileResolver {
    fn resolve(&self, uri: &Url) -> Result<Option<Arc<dyn Resource>>, ResourceError> {
        Ok(Some(Arc::new(FileResource::from_uri(uri.clone())?)))
    }
}
