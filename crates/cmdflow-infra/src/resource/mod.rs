//! Concrete resources and the default resolver chain.
//!
//! - `file` -- filesystem documents (`file:` scheme)
//! - `embedded` -- host-registered documents and search roots (`classpath:` scheme)
//! - `remote` -- generic URL fetch, the fallback for any other scheme
//! - `resolver` -- `DefaultResourceResolver`, the scheme -> resolver chain

pub mod embedded;
pub mod file;
pub mod remote;
pub mod resolver;

pub use embedded::{EMBEDDED_SCHEME, EmbeddedResolver, EmbeddedResource, EmbeddedStore};
pub use file::{FileResolver, FileResource};
pub use remote::{UrlResolver, UrlResource};
pub use resolver::DefaultResourceResolver;
