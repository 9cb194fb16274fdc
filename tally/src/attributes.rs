//! Attribute primitives used to identify metric series.

use std::borrow::Cow;
use std::fmt;
use std::hash;
use std::sync::Arc;

/// Backing storage for attribute strings.
///
/// Equality, ordering and hashing go through [`StrRepr::as_str`] so that the
/// same text compares equal regardless of which variant holds it.
#[derive(Clone, Debug)]
enum StrRepr {
    Static(&'static str),
    Owned(Box<str>),
    RefCounted(Arc<str>),
}

impl StrRepr {
    fn as_str(&self) -> &str {
        match self {
            StrRepr::Static(s) => s,
            StrRepr::Owned(s) => s,
            StrRepr::RefCounted(s) => s,
        }
    }
}

impl PartialEq for StrRepr {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for StrRepr {}

impl PartialOrd for StrRepr {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StrRepr {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl hash::Hash for StrRepr {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

impl fmt::Display for StrRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The key part of attribute key-value pairs.
///
/// Keys with the same text are interchangeable no matter how they were
/// constructed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(StrRepr);

impl Key {
    /// Create a new `Key`.
    pub fn new(value: impl Into<Key>) -> Self {
        value.into()
    }

    /// Create a new constant `Key`.
    pub const fn from_static_str(value: &'static str) -> Self {
        Key(StrRepr::Static(value))
    }

    /// Returns a reference to the underlying key name.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&'static str> for Key {
    fn from(value: &'static str) -> Self {
        Key(StrRepr::Static(value))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key(StrRepr::Owned(value.into_boxed_str()))
    }
}

impl From<Arc<str>> for Key {
    fn from(value: Arc<str>) -> Self {
        Key(StrRepr::RefCounted(value))
    }
}

impl From<Cow<'static, str>> for Key {
    fn from(value: Cow<'static, str>) -> Self {
        match value {
            Cow::Borrowed(s) => Key(StrRepr::Static(s)),
            Cow::Owned(s) => Key(StrRepr::Owned(s.into_boxed_str())),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A string attribute value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StringValue(StrRepr);

impl StringValue {
    /// Returns a reference to the underlying string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&'static str> for StringValue {
    fn from(value: &'static str) -> Self {
        StringValue(StrRepr::Static(value))
    }
}

impl From<String> for StringValue {
    fn from(value: String) -> Self {
        StringValue(StrRepr::Owned(value.into_boxed_str()))
    }
}

impl From<Arc<str>> for StringValue {
    fn from(value: Arc<str>) -> Self {
        StringValue(StrRepr::RefCounted(value))
    }
}

impl From<Cow<'static, str>> for StringValue {
    fn from(value: Cow<'static, str>) -> Self {
        match value {
            Cow::Borrowed(s) => StringValue(StrRepr::Static(s)),
            Cow::Owned(s) => StringValue(StrRepr::Owned(s.into_boxed_str())),
        }
    }
}

impl fmt::Display for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The value part of attribute key-value pairs.
#[derive(Clone, Debug)]
pub enum Value {
    /// bool values
    Bool(bool),
    /// i64 values
    I64(i64),
    /// f64 values
    F64(f64),
    /// String values
    String(StringValue),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            // Bitwise comparison keeps NaN values usable as series
            // identifiers.
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl hash::Hash for Value {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        match self {
            Value::Bool(b) => {
                state.write_u8(0);
                b.hash(state);
            }
            Value::I64(i) => {
                state.write_u8(1);
                i.hash(state);
            }
            Value::F64(f) => {
                state.write_u8(2);
                f.to_bits().hash(state);
            }
            Value::String(s) => {
                state.write_u8(3);
                s.hash(state);
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<&'static str> for Value {
    fn from(value: &'static str) -> Self {
        Value::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value.into())
    }
}

impl From<StringValue> for Value {
    fn from(value: StringValue) -> Self {
        Value::String(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => v.fmt(f),
            Value::I64(v) => v.fmt(f),
            Value::F64(v) => v.fmt(f),
            Value::String(v) => v.fmt(f),
        }
    }
}

/// A key-value pair describing a single attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyValue {
    /// The attribute name
    pub key: Key,
    /// The attribute value
    pub value: Value,
}

impl KeyValue {
    /// Create a new `KeyValue` pair.
    pub fn new(key: impl Into<Key>, value: impl Into<Value>) -> Self {
        KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(value: &impl Hash) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn keys_compare_by_content_across_representations() {
        let static_key = Key::from_static_str("service.name");
        let owned_key = Key::from(String::from("service.name"));
        let shared_key = Key::from(Arc::from("service.name"));

        assert_eq!(static_key, owned_key);
        assert_eq!(owned_key, shared_key);
        assert_eq!(hash_of(&static_key), hash_of(&owned_key));
        assert_eq!(hash_of(&owned_key), hash_of(&shared_key));
    }

    #[test]
    fn keys_order_by_content() {
        let mut keys = vec![
            Key::from(String::from("b")),
            Key::from_static_str("c"),
            Key::from_static_str("a"),
        ];
        keys.sort();
        let names: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn float_values_compare_bitwise() {
        assert_eq!(Value::F64(f64::NAN), Value::F64(f64::NAN));
        assert_ne!(Value::F64(0.1), Value::F64(0.2));
        assert_eq!(
            hash_of(&Value::F64(f64::NAN)),
            hash_of(&Value::F64(f64::NAN))
        );
    }

    #[test]
    fn values_of_different_types_are_not_equal() {
        assert_ne!(Value::I64(1), Value::Bool(true));
        assert_ne!(Value::I64(1), Value::F64(1.0));
        assert_ne!(Value::String("1".into()), Value::I64(1));
    }

    #[test]
    fn key_value_equality_covers_both_parts() {
        assert_eq!(KeyValue::new("k", "v"), KeyValue::new("k", "v"));
        assert_ne!(KeyValue::new("k", "v"), KeyValue::new("k", "w"));
        assert_ne!(KeyValue::new("k", "v"), KeyValue::new("j", "v"));
    }
}
