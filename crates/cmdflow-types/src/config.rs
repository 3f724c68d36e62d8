//! Configuration types for cmdflow.
//!
//! `FlowConfig` represents the optional `cmdflow.toml` that controls the
//! default markup dialect, the script context binding name, and how the
//! default resource resolver chain is assembled.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Namespace of the v1 command markup dialect.
pub const DEFAULT_NAMESPACE: &str = "urn:cmdflow:commands:1";

/// Name the execution context is bound to inside script predicates.
pub const DEFAULT_CONTEXT_BINDING: &str = "c";

/// Top-level configuration. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default)]
    pub markup: MarkupSettings,

    #[serde(default)]
    pub resources: ResourceSettings,
}

/// Settings for markup binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkupSettings {
    /// Dialect assumed when a document's root element carries no namespace.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Binding name for the context object in script predicates.
    #[serde(default = "default_context_binding")]
    pub context_binding: String,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_context_binding() -> String {
    DEFAULT_CONTEXT_BINDING.to_string()
}

impl Default for MarkupSettings {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            context_binding: default_context_binding(),
        }
    }
}

/// Settings for the default resource resolver chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSettings {
    /// Directories searched, in order, for `classpath:` resources that were
    /// not registered as embedded documents.
    #[serde(default)]
    pub classpath_roots: Vec<PathBuf>,

    /// Whether unknown schemes fall back to a remote URL fetch.
    #[serde(default = "default_allow_remote")]
    pub allow_remote: bool,

    /// Timeout for remote fetches, in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_allow_remote() -> bool {
    true
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            classpath_roots: Vec::new(),
            allow_remote: default_allow_remote(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_config_default_values() {
        let config = FlowConfig::default();
        assert_eq!(config.markup.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.markup.context_binding, "c");
        assert!(config.resources.classpath_roots.is_empty());
        assert!(config.resources.allow_remote);
        assert_eq!(config.resources.fetch_timeout_secs, 30);
    }

    #[test]
    fn test_flow_config_deserialize_with_defaults() {
        let config: FlowConfig = toml::from_str("").unwrap();
        assert_eq!(config.markup.namespace, DEFAULT_NAMESPACE);
        assert!(config.resources.allow_remote);
    }

    #[test]
    fn test_flow_config_deserialize_with_values() {
        let toml_str = r#"
[markup]
context_binding = "ctx"

[resources]
classpath_roots = ["/opt/flows", "conf/flows"]
allow_remote = false
fetch_timeout_secs = 5
"#;
        let config: FlowConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.markup.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.markup.context_binding, "ctx");
        assert_eq!(config.resources.classpath_roots.len(), 2);
        assert_eq!(config.resources.classpath_roots[0], PathBuf::from("/opt/flows"));
        assert!(!config.resources.allow_remote);
        assert_eq!(config.resources.fetch_timeout_secs, 5);
    }
}
