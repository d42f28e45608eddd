//! Typed property bag for collector adapters.
//!
//! Every adapter exposes a fixed set of named properties. A property holds a
//! string, integer, or boolean slot; `None` inside the slot means "unset".
//! Required properties must be set before the adapter can be configured.

use std::collections::BTreeMap;
use std::fmt;

use strum_macros::{AsRefStr, Display};

use super::CollectorError;

/// Declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum PropertyKind {
    /// Free-form string.
    String,
    /// Signed decimal integer.
    Int,
    /// `True` or `False`.
    Bool,
}

/// A property value. The inner `None` marks a property that is not set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Str(Option<String>),
    Int(Option<i64>),
    Bool(Option<bool>),
}

impl PropertyValue {
    /// Type of this value.
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Str(_) => PropertyKind::String,
            Self::Int(_) => PropertyKind::Int,
            Self::Bool(_) => PropertyKind::Bool,
        }
    }

    /// Whether the slot holds a value.
    pub fn is_set(&self) -> bool {
        match self {
            Self::Str(v) => v.is_some(),
            Self::Int(v) => v.is_some(),
            Self::Bool(v) => v.is_some(),
        }
    }

    /// Coerce a raw protocol string into a value of the given kind.
    ///
    /// Booleans accept exactly `True` and `False`.
    pub fn coerce(kind: PropertyKind, raw: &str) -> Option<Self> {
        match kind {
            PropertyKind::String => Some(Self::Str(Some(raw.to_string()))),
            PropertyKind::Int => raw.trim().parse().ok().map(|v| Self::Int(Some(v))),
            PropertyKind::Bool => match raw {
                "True" => Some(Self::Bool(Some(true))),
                "False" => Some(Self::Bool(Some(false))),
                _ => None,
            },
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(Some(v)) => f.write_str(v),
            Self::Int(Some(v)) => write!(f, "{v}"),
            Self::Bool(Some(true)) => f.write_str("True"),
            Self::Bool(Some(false)) => f.write_str("False"),
            _ => f.write_str("<unset>"),
        }
    }
}

#[derive(Debug, Clone)]
struct Property {
    value: PropertyValue,
    required: bool,
}

/// Named properties of one collector adapter.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    entries: BTreeMap<&'static str, Property>,
}

impl Properties {
    /// Create an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required string property.
    pub fn required_str(&mut self, name: &'static str) -> &mut Self {
        self.declare(name, PropertyValue::Str(None), true)
    }

    /// Declare an optional string property with an optional default.
    pub fn optional_str(&mut self, name: &'static str, default: Option<&str>) -> &mut Self {
        self.declare(name, PropertyValue::Str(default.map(str::to_string)), false)
    }

    /// Declare an optional integer property with an optional default.
    pub fn optional_int(&mut self, name: &'static str, default: Option<i64>) -> &mut Self {
        self.declare(name, PropertyValue::Int(default), false)
    }

    /// Declare an optional boolean property.
    pub fn optional_bool(&mut self, name: &'static str, default: bool) -> &mut Self {
        self.declare(name, PropertyValue::Bool(Some(default)), false)
    }

    fn declare(&mut self, name: &'static str, value: PropertyValue, required: bool) -> &mut Self {
        self.entries.insert(name, Property { value, required });
        self
    }

    /// Whether a property with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Set a property from its raw string form, coercing to the declared type.
    ///
    /// # Errors
    /// `UnknownProperty` if the name is not declared, `PropertyTypeError` if
    /// the value does not coerce.
    pub fn set(&mut self, name: &str, raw: &str) -> Result<(), CollectorError> {
        let property = self
            .entries
            .get_mut(name)
            .ok_or_else(|| CollectorError::UnknownProperty(name.to_string()))?;

        let kind = property.value.kind();
        property.value =
            PropertyValue::coerce(kind, raw).ok_or_else(|| CollectorError::PropertyTypeError {
                property: name.to_string(),
                expected: kind,
                value: raw.to_string(),
            })?;
        Ok(())
    }

    /// Current value of a property.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries.get(name).map(|p| &p.value)
    }

    /// String value of a property, `None` if unset or not a string.
    pub fn str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(PropertyValue::Str(Some(v))) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Integer value of a property, `None` if unset or not an integer.
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(PropertyValue::Int(v)) => *v,
            _ => None,
        }
    }

    /// Boolean value of a property, `None` if unset or not a boolean.
    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(PropertyValue::Bool(v)) => *v,
            _ => None,
        }
    }

    /// First required property that is still unset.
    pub fn missing_required(&self) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, p)| p.required && !p.value.is_set())
            .map(|(name, _)| *name)
    }

    /// Iterate over property names and values.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &PropertyValue)> {
        self.entries.iter().map(|(name, p)| (*name, &p.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Properties {
        let mut props = Properties::new();
        props
            .required_str("outdir")
            .optional_int("count", None)
            .optional_bool("fallible", false);
        props
    }

    #[test]
    fn test_bool_round_trip() {
        let mut props = sample();
        props.set("fallible", "True").unwrap();
        assert_eq!(props.bool("fallible"), Some(true));
        assert_eq!(props.get("fallible").unwrap().to_string(), "True");

        props.set("fallible", "False").unwrap();
        assert_eq!(props.bool("fallible"), Some(false));
        assert_eq!(props.get("fallible").unwrap().to_string(), "False");
    }

    #[test]
    fn test_bool_rejects_other_spellings() {
        let mut props = sample();
        for raw in ["true", "yes", "1", "TRUE", ""] {
            let err = props.set("fallible", raw).unwrap_err();
            match err {
                CollectorError::PropertyTypeError { expected, .. } => {
                    assert_eq!(expected, PropertyKind::Bool)
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(props.bool("fallible"), Some(false));
    }

    #[test]
    fn test_int_coercion() {
        let mut props = sample();
        props.set("count", "42").unwrap();
        assert_eq!(props.int("count"), Some(42));

        let err = props.set("count", "4x2").unwrap_err();
        assert!(err.to_string().contains("expected int"));
    }

    #[test]
    fn test_unknown_property() {
        let mut props = sample();
        let err = props.set("colour", "red").unwrap_err();
        assert!(matches!(err, CollectorError::UnknownProperty(name) if name == "colour"));
    }

    #[test]
    fn test_missing_required() {
        let mut props = sample();
        assert_eq!(props.missing_required(), Some("outdir"));
        props.set("outdir", "/tmp/out").unwrap();
        assert_eq!(props.missing_required(), None);
        assert_eq!(props.str("outdir"), Some("/tmp/out"));
    }

    #[test]
    fn test_unset_display() {
        let props = sample();
        assert_eq!(props.get("count").unwrap().to_string(), "<unset>");
        assert!(!props.get("outdir").unwrap().is_set());
    }
}
