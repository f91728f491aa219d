use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::UnknownPolicy;
use crate::error::DecodeError;
use crate::poly::PolyValue;
use crate::resolve::DecodeSession;
use crate::tag::{TagType, TagValue};

// -----------------------------------------------------------------------------
// DecodeFn

/// Materializes one JSON node into an erased value.
///
/// Resolution has already happened when a decode function runs; the session
/// is handed in so that container types can decode their own polymorphic
/// fields through [`DecodeSession::decode_child`].
pub type DecodeFn =
    fn(&mut DecodeSession<'_>, &Value) -> Result<Box<dyn PolyValue>, DecodeError>;

fn decode_with_serde<T>(
    _session: &mut DecodeSession<'_>,
    node: &Value,
) -> Result<Box<dyn PolyValue>, DecodeError>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let value: T = serde_json::from_value(node.clone())?;
    Ok(Box::new(value))
}

// -----------------------------------------------------------------------------
// TypeDecl

/// Declarative metadata for one type in the universe.
///
/// A declaration carries everything the cache builder needs: the stable type
/// name, the parent link forming the inheritance chain, whether the type can
/// be materialized, and its property declarations. Concrete declarations
/// additionally carry the decode function used once resolution has settled on
/// them.
///
/// Discriminator values are supplied directly by each declaration instead of
/// being read off a constructed instance, so registration is the only
/// integration point a participating type needs.
///
/// # Example
///
/// ```
/// use poly_json::{PropertyDecl, TagType, TypeDecl};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct GoldReward {}
///
/// let _base = TypeDecl::abstract_type("Reward").property(PropertyDecl::discriminator(
///     "RewardType",
///     TagType::enumeration("RewardType", &["Currency", "Badge"]),
/// ));
/// let _gold = TypeDecl::concrete::<GoldReward>("GoldReward")
///     .extends("Reward")
///     .property(PropertyDecl::discriminator_value("RewardType", "Currency"));
/// ```
#[derive(Clone, Debug)]
pub struct TypeDecl {
    name: &'static str,
    parent: Option<&'static str>,
    is_abstract: bool,
    properties: Vec<PropertyDecl>,
    decode: Option<DecodeFn>,
}

impl TypeDecl {
    /// Declares an abstract type or trait-like base.
    ///
    /// Abstract types are never materialized themselves; they exist to
    /// introduce discriminator properties and to stand mid-hierarchy between
    /// a root and its concrete leaves.
    pub fn abstract_type(name: &'static str) -> Self {
        TypeDecl {
            name,
            parent: None,
            is_abstract: true,
            properties: Vec::new(),
            decode: None,
        }
    }

    /// Declares a concrete type decoded with its `serde::Deserialize` impl.
    pub fn concrete<T>(name: &'static str) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        Self::concrete_with(name, decode_with_serde::<T>)
    }

    /// Declares a concrete type with a hand-written decode function, for
    /// containers whose fields are themselves polymorphic.
    pub fn concrete_with(name: &'static str, decode: DecodeFn) -> Self {
        TypeDecl {
            name,
            parent: None,
            is_abstract: false,
            properties: Vec::new(),
            decode: Some(decode),
        }
    }

    /// Names the parent type, forming the inheritance chain.
    pub fn extends(mut self, parent: &'static str) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Adds a property declaration.
    pub fn property(mut self, property: PropertyDecl) -> Self {
        self.properties.push(property);
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<&'static str> {
        self.parent
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    #[inline]
    pub fn properties(&self) -> &[PropertyDecl] {
        &self.properties
    }

    #[inline]
    pub fn decode_fn(&self) -> Option<DecodeFn> {
        self.decode
    }

    /// The declaration of the named discriminator property, if this type
    /// declares one.
    pub fn discriminator(&self, name: &str) -> Option<&PropertyDecl> {
        self.properties
            .iter()
            .find(|p| p.name() == name && matches!(p.marker(), Marker::Discriminator { .. }))
    }
}

// -----------------------------------------------------------------------------
// PropertyDecl

/// One declared property, carrying its polymorphism marker.
#[derive(Clone, Debug)]
pub struct PropertyDecl {
    name: &'static str,
    wire_name: Option<&'static str>,
    marker: Marker,
}

/// The polymorphism role of a declared property.
#[derive(Clone, Debug)]
pub(crate) enum Marker {
    Discriminator {
        tag_type: Option<TagType>,
        root: Option<&'static str>,
        value: Option<TagValue>,
        policy: Option<UnknownPolicy>,
    },
    Composed {
        declared_type: &'static str,
    },
}

impl PropertyDecl {
    /// Declares a discriminator property, introducing it on its declaring
    /// root together with its value type.
    pub fn discriminator(name: &'static str, tag_type: TagType) -> Self {
        PropertyDecl {
            name,
            wire_name: None,
            marker: Marker::Discriminator {
                tag_type: Some(tag_type),
                root: None,
                value: None,
                policy: None,
            },
        }
    }

    /// Declares a discriminator property that assigns a value to a property
    /// introduced higher in the hierarchy.
    pub fn discriminator_value(name: &'static str, value: impl Into<TagValue>) -> Self {
        PropertyDecl {
            name,
            wire_name: None,
            marker: Marker::Discriminator {
                tag_type: None,
                root: None,
                value: Some(value.into()),
                policy: None,
            },
        }
    }

    /// Declares a discriminator property whose value is deferred: the
    /// declaration participates in an inherited property without assigning a
    /// value of its own. Only meaningful on abstract types, which inherit
    /// their value from a concrete descendant during cache construction.
    pub fn discriminator_deferred(name: &'static str) -> Self {
        PropertyDecl {
            name,
            wire_name: None,
            marker: Marker::Discriminator {
                tag_type: None,
                root: None,
                value: None,
                policy: None,
            },
        }
    }

    /// Declares a composed field: a field holding an independently
    /// polymorphic value (declared as `declared_type`) that inherits the
    /// enclosing type's discriminator tag rather than carrying its own.
    pub fn composed(name: &'static str, declared_type: &'static str) -> Self {
        PropertyDecl {
            name,
            wire_name: None,
            marker: Marker::Composed { declared_type },
        }
    }

    /// Sets the on-wire name. Defaults to the property name.
    pub fn wire_name(mut self, wire_name: &'static str) -> Self {
        self.wire_name = Some(wire_name);
        self
    }

    /// Overrides the declaring root, for bases the parent-chain walk cannot
    /// reach (interface-style hierarchies).
    pub fn root(mut self, root: &'static str) -> Self {
        if let Marker::Discriminator { root: slot, .. } = &mut self.marker {
            *slot = Some(root);
        }
        self
    }

    /// Supplies the discriminator value this declaration maps to.
    pub fn value(mut self, value: impl Into<TagValue>) -> Self {
        if let Marker::Discriminator { value: slot, .. } = &mut self.marker {
            *slot = Some(value.into());
        }
        self
    }

    /// Sets the unknown-value policy for this discriminator. Only meaningful
    /// on the declaring root; overrides the resolver-level default.
    pub fn policy(mut self, policy: UnknownPolicy) -> Self {
        if let Marker::Discriminator { policy: slot, .. } = &mut self.marker {
            *slot = Some(policy);
        }
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The on-wire name, falling back to the property name.
    #[inline]
    pub fn wire(&self) -> &'static str {
        self.wire_name.unwrap_or(self.name)
    }

    #[inline]
    pub(crate) fn marker(&self) -> &Marker {
        &self.marker
    }

    pub(crate) fn tag_type(&self) -> Option<TagType> {
        match self.marker {
            Marker::Discriminator { tag_type, .. } => tag_type,
            Marker::Composed { .. } => None,
        }
    }

    pub(crate) fn policy_decl(&self) -> Option<UnknownPolicy> {
        match self.marker {
            Marker::Discriminator { policy, .. } => policy,
            Marker::Composed { .. } => None,
        }
    }

    pub(crate) fn assigned_value(&self) -> Option<&TagValue> {
        match &self.marker {
            Marker::Discriminator { value, .. } => value.as_ref(),
            Marker::Composed { .. } => None,
        }
    }
}
