use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use cmdflow_core::resource::{Resource, ResourceResolver, join_uri};
use cmdflow_types::error::ResourceError;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use url::Url;

/// A document fetched over the network.
///
/// `open` issues a fresh GET on every call. `exists` is a HEAD request,
/// repeated as a GET when the server rejects HEAD; any failure reports
/// `false`.
#[derive(Debug, Clone)]
pub struct UrlResource {
    uri: Url,
    client: Client,
}

impl UrlResource {
    pub fn new(uri: Url, client: Client) -> Self {
        Self { uri, client }
    }

    fn fetch_error(&self, err: reqwest::Error) -> ResourceError {
        ResourceError::Fetch {
            uri: self.uri.to_string(),
            message: err.to_string(),
        }
    }
}

impl Resource for UrlResource {
    fn uri(&self) -> &Url {
        &self.uri
    }

    fn exists(&self) -> bool {
        let head = match self.client.head(self.uri.clone()).send() {
            Ok(response) => response.status(),
            Err(err) => {
                tracing::debug!(uri = %self.uri, error = %err, "remote resource check failed");
                return false;
            }
        };
        if !head_unsupported(head) {
            return head.is_success();
        }
        tracing::debug!(uri = %self.uri, status = %head, "HEAD not supported, retrying with GET");
        match self.client.get(self.uri.clone()).send() {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::debug!(uri = %self.uri, error = %err, "remote resource check failed");
                false
            }
        }
    }

    fn open(&self) -> Result<Box<dyn Read + Send>, ResourceError> {
        let response = self
            .client
            .get(self.uri.clone())
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| self.fetch_error(e))?;
        Ok(Box::new(response))
    }

    fn resolve_relative(&self, relative: &str) -> Result<Arc<dyn Resource>, ResourceError> {
        Ok(Arc::new(Self::new(
            join_uri(&self.uri, relative)?,
            self.client.clone(),
        )))
    }
}

/// Servers answering these to HEAD may still serve the document on GET.
fn head_unsupported(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
    )
}

/// Fallback resolver handing any URI to a blocking HTTP client.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    timeout: Duration,
}

impl Default for UrlResolver {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl UrlResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn client(&self, uri: &Url) -> Result<Client, ResourceError> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ResourceError::Fetch {
                uri: uri.to_string(),
                message: e.to_string(),
            })
    }
}

impl ResourceResolver for UrlResolver {
    fn resolve(&self, uri: &Url) -> Result<Option<Arc<dyn Resource>>, ResourceError> {
        Ok(Some(Arc::new(UrlResource::new(
            uri.clone(),
            self.client(uri)?,
        ))))
    }
}
