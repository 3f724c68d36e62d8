//! Named property configuration for commands.
//!
//! Commands opt into configuration by implementing `Configurable`, which
//! lists typed property slots and accepts typed values. `PropertyConfigurator`
//! is the single adapter that turns markup text into those values: it caches
//! each command type's property list and runs the coercion chain.
//!
//! Coercion order for a textual value:
//! 1. parse-from-string (`bool`, integers, floats, `char`)
//! 2. string construction (`Text`, `Path`)
//! 3. compiled regular expression (`Pattern`)
//! 4. host-registered `ValueCoercer` fallbacks, in registration order

use std::any::{Any, TypeId};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use cmdflow_types::error::BindingError;
use dashmap::DashMap;
use regex::Regex;

use crate::command::Command;

// ---------------------------------------------------------------------------
// Types and values
// ---------------------------------------------------------------------------

/// Declared type of a property slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Text,
    Bool,
    Int,
    UInt,
    Float,
    Char,
    Path,
    Pattern,
    /// Host-defined type, produced only by a `ValueCoercer`.
    Custom(&'static str),
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::UInt => f.write_str("uint"),
            Self::Float => f.write_str("float"),
            Self::Char => f.write_str("char"),
            Self::Path => f.write_str("path"),
            Self::Pattern => f.write_str("pattern"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// A coerced property value.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    Text(String),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Path(PathBuf),
    Pattern(Regex),
    Custom(Arc<dyn Any + Send + Sync>),
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::Text(_) => PropertyType::Text,
            Self::Bool(_) => PropertyType::Bool,
            Self::Int(_) => PropertyType::Int,
            Self::UInt(_) => PropertyType::UInt,
            Self::Float(_) => PropertyType::Float,
            Self::Char(_) => PropertyType::Char,
            Self::Path(_) => PropertyType::Path,
            Self::Pattern(_) => PropertyType::Pattern,
            Self::Custom(_) => PropertyType::Custom("custom"),
        }
    }

    /// Downcast a `Custom` value.
    pub fn downcast_custom<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Self::Custom(value) => value.clone().downcast::<T>().ok(),
            _ => None,
        }
    }
}

/// A named, typed property slot on a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySpec {
    pub name: &'static str,
    pub ty: PropertyType,
}

impl PropertySpec {
    pub const fn new(name: &'static str, ty: PropertyType) -> Self {
        Self { name, ty }
    }
}

/// Errors a command reports when it rejects a property assignment.
#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    #[error("unknown property '{0}'")]
    Unknown(String),

    #[error("property '{property}' expects a {expected} value, got {actual}")]
    TypeMismatch {
        property: String,
        expected: PropertyType,
        actual: PropertyType,
    },

    #[error("invalid value for property '{property}': {message}")]
    Invalid { property: String, message: String },
}

/// Capability of a command whose behaviour can be tuned by named properties.
///
/// `properties` must return the same list for every instance of a type; the
/// configurator caches it per concrete type.
pub trait Configurable {
    fn properties(&self) -> Vec<PropertySpec>;

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError>;
}

/// Last-resort conversion from text, for types the built-in chain does not
/// know about. Returns `None` to decline.
pub trait ValueCoercer: Send + Sync {
    fn coerce(&self, ty: PropertyType, text: &str) -> Option<Result<PropertyValue, String>>;
}

// ---------------------------------------------------------------------------
// Coercion chain
// ---------------------------------------------------------------------------

fn parse<T: FromStr>(text: &str, wrap: fn(T) -> PropertyValue) -> Result<PropertyValue, String>
where
    T::Err: fmt::Display,
{
    text.trim().parse::<T>().map(wrap).map_err(|e| e.to_string())
}

/// Stage 1: types with a parse-from-string factory.
fn from_str_stage(ty: PropertyType, text: &str) -> Option<Result<PropertyValue, String>> {
    let result = match ty {
        PropertyType::Bool => parse::<bool>(text, PropertyValue::Bool),
        PropertyType::Int => parse::<i64>(text, PropertyValue::Int),
        PropertyType::UInt => parse::<u64>(text, PropertyValue::UInt),
        PropertyType::Float => parse::<f64>(text, PropertyValue::Float),
        PropertyType::Char => parse::<char>(text, PropertyValue::Char),
        _ => return None,
    };
    Some(result)
}

/// Stage 2: types constructed directly from the string.
fn from_string_stage(ty: PropertyType, text: &str) -> Option<PropertyValue> {
    match ty {
        PropertyType::Text => Some(PropertyValue::Text(text.to_string())),
        PropertyType::Path => Some(PropertyValue::Path(PathBuf::from(text))),
        _ => None,
    }
}

/// Stage 3: compiled patterns.
fn pattern_stage(ty: PropertyType, text: &str) -> Option<Result<PropertyValue, String>> {
    (ty == PropertyType::Pattern)
        .then(|| Regex::new(text).map(PropertyValue::Pattern).map_err(|e| e.to_string()))
}

// ---------------------------------------------------------------------------
// PropertyConfigurator
// ---------------------------------------------------------------------------

/// Applies textual property assignments to commands.
#[derive(Default)]
pub struct PropertyConfigurator {
    accessors: DashMap<TypeId, Arc<[PropertySpec]>>,
    fallbacks: Vec<Arc<dyn ValueCoercer>>,
}

impl PropertyConfigurator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fallback coercer, tried after the built-in stages.
    pub fn with_fallback(mut self, coercer: Arc<dyn ValueCoercer>) -> Self {
        self.fallbacks.push(coercer);
        self
    }

    pub fn add_fallback(&mut self, coercer: Arc<dyn ValueCoercer>) {
        self.fallbacks.push(coercer);
    }

    /// Convert `text` to a value of type `ty`.
    pub fn coerce(&self, property: &str, ty: PropertyType, text: &str) -> Result<PropertyValue, BindingError> {
        let mut failure = None;

        match from_str_stage(ty, text) {
            Some(Ok(value)) => return Ok(value),
            Some(Err(message)) => failure = Some(message),
            None => {}
        }
        if let Some(value) = from_string_stage(ty, text) {
            return Ok(value);
        }
        match pattern_stage(ty, text) {
            Some(Ok(value)) => return Ok(value),
            Some(Err(message)) => failure = Some(message),
            None => {}
        }
        for coercer in &self.fallbacks {
            match coercer.coerce(ty, text) {
                Some(Ok(value)) => return Ok(value),
                Some(Err(message)) => failure = Some(message),
                None => {}
            }
        }

        Err(BindingError::PropertyCoercion {
            property: property.to_string(),
            value: text.to_string(),
            message: failure.unwrap_or_else(|| format!("no conversion to {ty} available")),
        })
    }

    /// Set property `name` on `command` from its textual `value`.
    pub fn configure<C: 'static>(
        &self,
        command: &mut dyn Command<C>,
        name: &str,
        value: &str,
    ) -> Result<(), BindingError> {
        let type_key = command.type_key();
        let kind = command.kind();
        let not_found = || BindingError::PropertyNotFound {
            property: name.to_string(),
            command: kind.to_string(),
        };

        let target = command.as_configurable_mut().ok_or_else(not_found)?;
        let accessors = self
            .accessors
            .entry(type_key)
            .or_insert_with(|| target.properties().into())
            .clone();
        let spec = accessors
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(not_found)?;

        let coerced = self.coerce(name, spec.ty, value)?;
        target
            .set_property(name, coerced)
            .map_err(|e| BindingError::PropertyCoercion {
                property: name.to_string(),
                value: value.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!(command = kind, property = name, value, "configured property");
        Ok(())
    }

    /// Number of command types whose property lists are cached.
    pub fn cached_types(&self) -> usize {
        self.accessors.len()
    }
}
