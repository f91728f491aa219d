//! Discriminator values and their declared value types.

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// -----------------------------------------------------------------------------
// TagValue

/// One discriminator value.
///
/// Tag values are what the [`values`](crate::DiscriminatorMeta::values) table
/// of a cache entry is keyed by. Plain strings and integers cover the common
/// cases; structured values ([`Seq`](TagValue::Seq) / [`Map`](TagValue::Map))
/// are legal so that a record can be qualified by a compound value such as a
/// color triple.
///
/// The type is totally ordered, which keeps the persisted pair-list form of
/// a cache deterministic.
///
/// # Example
///
/// ```
/// use poly_json::TagValue;
///
/// let gold = TagValue::from("Gold");
/// let id = TagValue::from(101);
/// assert!(matches!(gold, TagValue::Str(_)));
/// assert!(id < gold); // integers order before strings
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Seq(Vec<TagValue>),
    Map(BTreeMap<String, TagValue>),
}

impl TagValue {
    /// Converts a JSON node into a tag value.
    ///
    /// Returns `None` for nodes that cannot serve as discriminator values:
    /// `null`, and numbers with no exact `i64` representation.
    pub fn from_json(node: &Value) -> Option<TagValue> {
        match node {
            Value::Null => None,
            Value::Bool(b) => Some(TagValue::Bool(*b)),
            Value::Number(n) => n.as_i64().map(TagValue::Int),
            Value::String(s) => Some(TagValue::Str(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(TagValue::from_json)
                .collect::<Option<Vec<_>>>()
                .map(TagValue::Seq),
            Value::Object(fields) => fields
                .iter()
                .map(|(key, value)| TagValue::from_json(value).map(|v| (key.clone(), v)))
                .collect::<Option<BTreeMap<_, _>>>()
                .map(TagValue::Map),
        }
    }

    /// The string payload, when this is a [`Str`](TagValue::Str) value.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for TagValue {
    #[inline]
    fn from(value: &str) -> Self {
        TagValue::Str(value.to_owned())
    }
}

impl From<String> for TagValue {
    #[inline]
    fn from(value: String) -> Self {
        TagValue::Str(value)
    }
}

impl From<i64> for TagValue {
    #[inline]
    fn from(value: i64) -> Self {
        TagValue::Int(value)
    }
}

impl From<i32> for TagValue {
    #[inline]
    fn from(value: i32) -> Self {
        TagValue::Int(value.into())
    }
}

impl From<bool> for TagValue {
    #[inline]
    fn from(value: bool) -> Self {
        TagValue::Bool(value)
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Bool(b) => write!(f, "{b}"),
            TagValue::Int(i) => write!(f, "{i}"),
            TagValue::Str(s) => write!(f, "\"{s}\""),
            TagValue::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            TagValue::Map(fields) => {
                f.write_str("{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "\"{key}\": {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

// -----------------------------------------------------------------------------
// TagType / TagKind

/// The declared value type of a discriminator property.
///
/// A declaring root names the value type once; every wire token seen for
/// that discriminator is converted through the type's [`TagKind`] before the
/// value lookup. The cache persists only the name, so a loaded cache resolves
/// the kind again from the live registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagType {
    name: &'static str,
    kind: TagKind,
}

/// How wire tokens convert into [`TagValue`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    /// Exact string comparison.
    Str,
    /// Signed integer.
    Int,
    /// Boolean.
    Bool,
    /// A closed set of named variants. Strings match case-insensitively and
    /// normalize to the canonical variant; integer indexes are accepted.
    Enum {
        variants: &'static [&'static str],
    },
    /// Any JSON structure, compared by value.
    Raw,
}

impl TagType {
    /// Exact string values. Registered under the built-in name `string`.
    #[inline]
    pub const fn string() -> Self {
        TagType { name: "string", kind: TagKind::Str }
    }

    /// Signed integer values. Registered under the built-in name `int`.
    #[inline]
    pub const fn int() -> Self {
        TagType { name: "int", kind: TagKind::Int }
    }

    /// Boolean values. Registered under the built-in name `bool`.
    #[inline]
    pub const fn bool() -> Self {
        TagType { name: "bool", kind: TagKind::Bool }
    }

    /// Arbitrary JSON values. Registered under the built-in name `json`.
    #[inline]
    pub const fn raw() -> Self {
        TagType { name: "json", kind: TagKind::Raw }
    }

    /// An enumeration with the given canonical variant names.
    #[inline]
    pub const fn enumeration(name: &'static str, variants: &'static [&'static str]) -> Self {
        TagType { name, kind: TagKind::Enum { variants } }
    }

    /// A named structured value type, compared by value.
    #[inline]
    pub const fn structured(name: &'static str) -> Self {
        TagType { name, kind: TagKind::Raw }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn kind(&self) -> TagKind {
        self.kind
    }
}

impl TagKind {
    /// Converts a wire token into the tag value used for the cache lookup.
    ///
    /// `None` means the token does not convert; the caller treats this the
    /// same as an unregistered value.
    pub fn parse(&self, node: &Value) -> Option<TagValue> {
        match self {
            TagKind::Str => node.as_str().map(TagValue::from),
            TagKind::Int => node.as_i64().map(TagValue::Int),
            TagKind::Bool => node.as_bool().map(TagValue::Bool),
            TagKind::Enum { variants } => match node {
                Value::String(s) => variants
                    .iter()
                    .find(|variant| variant.eq_ignore_ascii_case(s))
                    .map(|variant| TagValue::from(*variant)),
                Value::Number(n) => n
                    .as_u64()
                    .and_then(|index| variants.get(index as usize))
                    .map(|variant| TagValue::from(*variant)),
                _ => None,
            },
            TagKind::Raw => TagValue::from_json(node),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
