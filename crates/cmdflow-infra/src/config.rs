//! Configuration loader for cmdflow.
//!
//! Reads `cmdflow.toml` from a configuration directory (`~/.cmdflow/` by
//! default) and deserializes it into [`FlowConfig`]. Falls back to defaults
//! when the file is missing or malformed.

use std::path::{Path, PathBuf};

use cmdflow_types::config::FlowConfig;

/// File name looked up inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "cmdflow.toml";

/// Load configuration from `{dir}/cmdflow.toml`.
///
/// - Missing file: [`FlowConfig::default()`].
/// - Unreadable or malformed file: logs a warning and returns the default.
pub fn load_flow_config(dir: &Path) -> FlowConfig {
    let config_path = dir.join(CONFIG_FILE_NAME);

    let content = match std::fs::read_to_string(&config_path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {CONFIG_FILE_NAME} found at {}, using defaults", config_path.display());
            return FlowConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return FlowConfig::default();
        }
    };

    match toml::from_str::<FlowConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            FlowConfig::default()
        }
    }
}

/// Resolve the configuration directory.
///
/// Priority:
/// 1. `CMDFLOW_HOME` environment variable
/// 2. `~/.cmdflow`
/// 3. `.cmdflow` in the current directory
pub fn resolve_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CMDFLOW_HOME") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".cmdflow");
    }

    PathBuf::from(".cmdflow")
}

/// Load `cmdflow.toml` from [`resolve_config_dir`].
pub fn load_default_flow_config() -> FlowConfig {
    load_flow_config(&resolve_config_dir())
}

#[cfg(test)]
mod tests {
    use cmdflow_types::config::DEFAULT_NAMESPACE;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn load_flow_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_flow_config(tmp.path());
        assert_eq!(config.markup.namespace, DEFAULT_NAMESPACE);
        assert!(config.resources.allow_remote);
    }

    #[test]
    fn load_flow_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r#"
[markup]
context_binding = "ctx"

[resources]
classpath_roots = ["flows"]
allow_remote = false
"#,
        )
        .unwrap();

        let config = load_flow_config(tmp.path());
        assert_eq!(config.markup.context_binding, "ctx");
        assert_eq!(config.resources.classpath_roots, vec![PathBuf::from("flows")]);
        assert!(!config.resources.allow_remote);
        assert_eq!(config.resources.fetch_timeout_secs, 30);
    }

    #[test]
    fn load_flow_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "this is not { valid toml !!!").unwrap();

        let config = load_flow_config(tmp.path());
        assert_eq!(config.markup.context_binding, "c");
        assert!(config.resources.classpath_roots.is_empty());
    }

    #[test]
    fn resolve_config_dir_is_never_empty() {
        assert!(!resolve_config_dir().as_os_str().is_empty());
    }
}
