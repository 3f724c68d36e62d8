//! Span and field names used when instrumenting the command pipeline.
//!
//! Spans are named after the pipeline phase (`"cmdflow.build"`,
//! `"cmdflow.link"`, `"cmdflow.init"`); fields carry the command, resource
//! and element being processed. Field names are passed to the `tracing`
//! macros as `{ attrs::COMMAND_NAME } = value`.

// --- Span names ---

/// Build phase: binding handlers parse their documents.
pub const SPAN_BUILD: &str = "cmdflow.build";

/// Link phase: static references are rewritten to their targets.
pub const SPAN_LINK: &str = "cmdflow.link";

/// Init phase: initialization contracts run on every reachable command.
pub const SPAN_INIT: &str = "cmdflow.init";

/// Parsing of a single markup document.
pub const SPAN_DOCUMENT: &str = "cmdflow.document";

// --- Field names ---

/// Name of a catalog entry.
pub const COMMAND_NAME: &str = "cmdflow.command.name";

/// Name a reference points at.
pub const REFERENCE_NAME: &str = "cmdflow.reference.name";

/// URI of the resource being processed.
pub const RESOURCE_URI: &str = "cmdflow.resource.uri";

/// Qualified element name being processed.
pub const ELEMENT_NAME: &str = "cmdflow.element.name";

/// Number of catalog entries after a phase completes.
pub const CATALOG_SIZE: &str = "cmdflow.catalog.size";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_names_share_prefix() {
        for name in [SPAN_BUILD, SPAN_LINK, SPAN_INIT, SPAN_DOCUMENT] {
            assert!(name.starts_with("cmdflow."));
        }
    }

    #[test]
    fn field_names_are_distinct_from_spans() {
        let fields = [COMMAND_NAME, REFERENCE_NAME, RESOURCE_URI, ELEMENT_NAME, CATALOG_SIZE];
        for field in fields {
            assert!(field.starts_with("cmdflow."));
            assert!(![SPAN_BUILD, SPAN_LINK, SPAN_INIT, SPAN_DOCUMENT].contains(&field));
        }
        let mut unique = fields.to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), fields.len());
    }
}
