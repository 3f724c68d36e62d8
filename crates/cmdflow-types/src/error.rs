use serde_json::Value;
use thiserror::Error;

/// Errors raised while a command tree executes.
///
/// These surface from `Command::execute` and `CommandCatalog::execute`. The
/// boolean command status is never used to report them.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("cannot execute static command reference '{0}' before linking")]
    UnlinkedStaticReference(String),

    #[error("no command catalog is bound to dynamic command reference '{0}'")]
    UnboundReference(String),

    #[error("cannot resolve dynamic command reference '{0}'")]
    UnresolvedReference(String),

    #[error("command '{0}' not found in catalog")]
    CommandNotFound(String),

    #[error("predicate '{expression}' failed: {source}")]
    Predicate {
        expression: String,
        #[source]
        source: ExpressionError,
    },

    #[error("{command} is not initialized: expects {expected} child commands, has {actual}")]
    NotInitialized {
        command: String,
        expected: usize,
        actual: usize,
    },

    /// Failure reported by a host-provided command.
    #[error("command failed: {0}")]
    Failed(String),
}

/// Errors produced by a predicate evaluator.
#[derive(Debug, Error)]
pub enum ExpressionError {
    #[error("expression evaluation failed: {0}")]
    EvalFailed(String),

    #[error("expression did not evaluate to a boolean: got {result}")]
    NotBoolean { result: Value },

    #[error("invalid context: {0}")]
    InvalidContext(String),

    #[error("the provided predicate evaluator is not safe for concurrent use")]
    NotThreadSafe,
}

/// Errors raised while locating or reading a resource.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource uri '{0}' must be absolute")]
    NotAbsolute(String),

    #[error("invalid resource uri '{uri}': {message}")]
    InvalidUri { uri: String, message: String },

    #[error("resource '{0}' not found")]
    NotFound(String),

    #[error("failed to read resource '{uri}': {source}")]
    Io {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch resource '{uri}': {message}")]
    Fetch { uri: String, message: String },
}

/// Errors raised during the Build phase: malformed documents, unknown
/// elements, bad attribute combinations, failed property coercion and import
/// failures.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("cannot find processor for element {0}")]
    UnknownElement(String),

    #[error("command name must be specified for top level element {element}")]
    MissingCommandName { element: String },

    #[error("cannot add command {child} to non-composite command {parent}")]
    NotComposite { parent: String, child: String },

    #[error("cannot build command with element '{element}' and attributes {attributes}")]
    InvalidCommand { element: String, attributes: String },

    #[error("no command factory registered for '{0}'")]
    UnknownCommandType(String),

    #[error("element {element} requires attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },

    #[error("property '{property}' has no enclosing command to configure")]
    NoPropertyTarget { property: String },

    #[error("could not find matching property '{property}' on command {command}")]
    PropertyNotFound { property: String, command: String },

    #[error("failed to configure property '{property}' with value '{value}': {message}")]
    PropertyCoercion {
        property: String,
        value: String,
        message: String,
    },

    #[error("no predicate evaluator configured for expression '{expression}'")]
    NoEvaluator { expression: String },

    #[error("invalid predicate '{expression}': {source}")]
    Expression {
        expression: String,
        #[source]
        source: ExpressionError,
    },

    #[error("circular import detected: {chain}")]
    CircularImport { chain: String },

    #[error("could not find import resource '{resource}' referenced from {from}")]
    ImportNotFound { resource: String, from: String },

    #[error("failed to parse {resource}: {message}")]
    Parse { resource: String, message: String },

    #[error("no binding dialect registered for namespace '{0}'")]
    UnknownNamespace(String),

    #[error("at least one resource must be specified")]
    NoResources,

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Errors raised during the Link phase.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("required command '{name}' referenced from '{referenced_from}' does not exist")]
    MissingReference {
        name: String,
        referenced_from: String,
    },

    #[error("circular static reference detected involving command '{0}'")]
    CircularReference(String),
}

/// Errors raised during the Init phase.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("{command} expects {} child commands, has {actual}", describe_range(.min, .max))]
    WrongArity {
        command: String,
        min: usize,
        max: Option<usize>,
        actual: usize,
    },
}

fn describe_range(min: &usize, max: &Option<usize>) -> String {
    match *max {
        Some(max) if max == *min => format!("exactly {min}"),
        Some(max) => format!("between {min} and {max}"),
        None => format!("at least {min}"),
    }
}

/// Umbrella error for the whole Build / Link / Init pipeline.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("build failed: {0}")]
    Binding(#[from] BindingError),

    #[error("link failed: {0}")]
    Link(#[from] LinkError),

    #[error("init failed: {0}")]
    Init(#[from] InitError),

    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionError),
}
