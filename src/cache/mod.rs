//! The built discriminator-resolution table.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::descriptor::TypeRef;
use crate::tag::TagValue;

mod builder;
mod persist;

pub use builder::CacheBuilder;
pub use persist::{BlobStore, FileStore, MemoryStore};

// -----------------------------------------------------------------------------
// UnknownPolicy

/// Behavior when a discriminator value has no registered concrete type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Raise [`DecodeError::UnresolvedDiscriminator`](crate::DecodeError::UnresolvedDiscriminator).
    #[default]
    Throw,
    /// Decode this object to null; siblings in a collection still decode.
    ReturnNull,
}

// -----------------------------------------------------------------------------
// DiscriminatorCache

/// The discriminator-resolution table: one entry per declaring root.
///
/// Built once by [`CacheBuilder`], then read-only; concurrent decode
/// sessions share a cache freely without locking. A cache can be persisted
/// with [`to_blob`](DiscriminatorCache::to_blob) and reloaded in a later
/// process with [`from_blob`](DiscriminatorCache::from_blob); entries are
/// keyed by stable type name so nothing live has to cross the persistence
/// boundary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiscriminatorCache {
    entries: HashMap<TypeRef, DiscriminatorMeta>,
}

impl DiscriminatorCache {
    pub(crate) fn from_entries(entries: HashMap<TypeRef, DiscriminatorMeta>) -> Self {
        DiscriminatorCache { entries }
    }

    /// The metadata registered for the given base type, if any.
    #[inline]
    pub fn get(&self, base: &str) -> Option<&DiscriminatorMeta> {
        self.entries.get(base)
    }

    /// Whether the given base type has metadata.
    #[inline]
    pub fn contains(&self, base: &str) -> bool {
        self.entries.contains_key(base)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in unspecified order.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&TypeRef, &DiscriminatorMeta)> {
        self.entries.iter()
    }
}

// -----------------------------------------------------------------------------
// DiscriminatorMeta

/// Resolution metadata owned by one declaring root.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscriminatorMeta {
    value_type: TypeRef,
    field_name: String,
    wire_name: String,
    policy: Option<UnknownPolicy>,
    values: HashMap<TagValue, TypeRef>,
    composed: Vec<ComposedField>,
}

impl DiscriminatorMeta {
    pub(crate) fn new(
        value_type: TypeRef,
        field_name: impl Into<String>,
        wire_name: impl Into<String>,
        policy: Option<UnknownPolicy>,
    ) -> Self {
        DiscriminatorMeta {
            value_type,
            field_name: field_name.into(),
            wire_name: wire_name.into(),
            policy,
            values: HashMap::new(),
            composed: Vec::new(),
        }
    }

    /// Registers a value mapping, returning the previous target when the
    /// value was already mapped (last registration wins).
    pub(crate) fn insert_value(&mut self, value: TagValue, target: TypeRef) -> Option<TypeRef> {
        self.values.insert(value, target)
    }

    pub(crate) fn push_composed(&mut self, field: ComposedField) {
        self.composed.push(field);
    }

    /// The discriminator's declared value type.
    #[inline]
    pub fn value_type(&self) -> &TypeRef {
        &self.value_type
    }

    /// The declared property name.
    #[inline]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// The on-wire child name the tag is extracted from.
    #[inline]
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    /// The per-root unknown-value policy, when one was declared.
    #[inline]
    pub fn policy(&self) -> Option<UnknownPolicy> {
        self.policy
    }

    /// The concrete type a discriminator value maps to.
    #[inline]
    pub fn target_for(&self, value: &TagValue) -> Option<&TypeRef> {
        self.values.get(value)
    }

    /// Iterates registered (value, target) pairs in unspecified order.
    #[inline]
    pub fn values(&self) -> impl ExactSizeIterator<Item = (&TagValue, &TypeRef)> {
        self.values.iter()
    }

    /// The composed fields tagged by this discriminator, in declaration
    /// order.
    #[inline]
    pub fn composed(&self) -> &[ComposedField] {
        &self.composed
    }
}

// -----------------------------------------------------------------------------
// ComposedField

/// A field holding an independently polymorphic value that inherits its
/// container's discriminator tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedField {
    field_name: String,
    wire_name: String,
    value_type: TypeRef,
}

impl ComposedField {
    pub(crate) fn new(
        field_name: impl Into<String>,
        wire_name: impl Into<String>,
        value_type: TypeRef,
    ) -> Self {
        ComposedField {
            field_name: field_name.into(),
            wire_name: wire_name.into(),
            value_type,
        }
    }

    #[inline]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    #[inline]
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    /// The field's declared base type.
    #[inline]
    pub fn value_type(&self) -> &TypeRef {
        &self.value_type
    }
}
