//! Tag-driven resolution of JSON nodes into registered types.
//!
//! A [`Resolver`] walks one JSON tree top-down. At each node whose requested
//! type holds a cache entry, the discriminator tag is extracted from the
//! wire, mapped to a target type, and the node is decoded as that target.
//! Abstract targets with entries of their own are resolved again, so a
//! hierarchy can refine through several discriminators before a concrete
//! type is materialized.

use std::any::Any;
use std::borrow::Cow;

use hashbrown::HashSet;
use log::trace;
use serde_json::Value;

use crate::cache::{DiscriminatorCache, DiscriminatorMeta, UnknownPolicy};
use crate::descriptor::TypeRef;
use crate::error::DecodeError;
use crate::inject::ProviderRegistry;
use crate::poly::PolyValue;
use crate::registry::{TypeDecl, TypeRegistry};

// -----------------------------------------------------------------------------
// Resolver

/// Decodes JSON nodes into registered types, consulting the discriminator
/// cache whenever the requested type is polymorphic.
///
/// Resolvers are cheap views borrowed from a
/// [`PolyContext`](crate::PolyContext); they carry no state of their own and
/// can be created freely on any thread.
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'c> {
    registry: &'c TypeRegistry,
    cache: &'c DiscriminatorCache,
    providers: Option<&'c ProviderRegistry>,
    default_policy: UnknownPolicy,
}

impl<'c> Resolver<'c> {
    pub(crate) fn new(
        registry: &'c TypeRegistry,
        cache: &'c DiscriminatorCache,
        default_policy: UnknownPolicy,
    ) -> Self {
        Resolver { registry, cache, providers: None, default_policy }
    }

    pub(crate) fn with_providers(mut self, providers: &'c ProviderRegistry) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Decodes `node` as the named type, resolving discriminators as needed.
    ///
    /// `Ok(None)` means the node was JSON `null`, or an unknown discriminator
    /// value was answered by [`UnknownPolicy::ReturnNull`].
    pub fn decode(
        &self,
        requested: &str,
        node: &Value,
    ) -> Result<Option<Box<dyn PolyValue>>, DecodeError> {
        let mut session = DecodeSession { resolver: *self, committed: HashSet::new() };
        session.decode_as(requested, node)
    }

    /// Parses `json` and decodes it as the named type.
    pub fn decode_str(
        &self,
        requested: &str,
        json: &str,
    ) -> Result<Option<Box<dyn PolyValue>>, DecodeError> {
        let node: Value = serde_json::from_str(json)?;
        self.decode(requested, &node)
    }

    /// Decodes `node` as the named type and downcasts the result to `T`.
    ///
    /// Fails when resolution lands on a type other than `T`, which callers
    /// use when they know the concrete outcome up front.
    pub fn decode_typed<T: Any>(
        &self,
        requested: &str,
        node: &Value,
    ) -> Result<Option<Box<T>>, DecodeError> {
        match self.decode(requested, node)? {
            None => Ok(None),
            Some(value) => {
                let type_name = value.type_name();
                value.downcast::<T>().map(Some).map_err(|_| {
                    DecodeError::Message(format!(
                        "`{requested}` resolved to {type_name}, not the requested downcast type",
                    ))
                })
            }
        }
    }

    /// The policy applied when a root declares none of its own.
    #[inline]
    pub fn default_policy(&self) -> UnknownPolicy {
        self.default_policy
    }
}

// -----------------------------------------------------------------------------
// DecodeSession

/// Per-decode state threaded through one resolution walk.
///
/// Custom decode functions receive the session so that container types can
/// hand their polymorphic children back through
/// [`decode_child`](Self::decode_child).
pub struct DecodeSession<'c> {
    resolver: Resolver<'c>,
    // Targets already resolved to within the current object scope. Guards
    // multi-hop refinement against mapping cycles.
    committed: HashSet<TypeRef>,
}

enum Selection<'m> {
    Target(&'m str),
    Null,
}

impl DecodeSession<'_> {
    /// Decodes a child node as its declared type.
    ///
    /// Each child opens a fresh resolution scope: discriminator hierarchies
    /// committed to while decoding the parent do not constrain the child.
    pub fn decode_child(
        &mut self,
        declared: &str,
        node: &Value,
    ) -> Result<Option<Box<dyn PolyValue>>, DecodeError> {
        let saved = core::mem::take(&mut self.committed);
        let result = self.decode_as(declared, node);
        self.committed = saved;
        result
    }

    /// Resolves an injected field from its wire identifier through the
    /// context's [`ProviderRegistry`](crate::ProviderRegistry).
    ///
    /// A `null` identifier injects null without consulting any provider.
    pub fn inject(
        &mut self,
        model: &str,
        identifier: &Value,
    ) -> Result<Option<Box<dyn PolyValue>>, DecodeError> {
        if identifier.is_null() {
            return Ok(None);
        }
        let provider = self
            .resolver
            .providers
            .and_then(|providers| providers.provider(model))
            .ok_or_else(|| DecodeError::MissingProvider(model.to_owned()))?;
        provider.resolve(identifier)
    }

    fn decode_as(
        &mut self,
        requested: &str,
        node: &Value,
    ) -> Result<Option<Box<dyn PolyValue>>, DecodeError> {
        if node.is_null() {
            return Ok(None);
        }
        let decl = self
            .resolver
            .registry
            .decl(requested)
            .ok_or_else(|| DecodeError::UnknownType(requested.to_owned()))?;

        let Some(meta) = self.resolver.cache.get(requested) else {
            return self.materialize(decl, node).map(Some);
        };

        let target = match self.select(decl, meta, node)? {
            Selection::Target(target) => target,
            Selection::Null => return Ok(None),
        };
        trace!("`{requested}` resolved to `{target}` via `{}`", meta.wire_name());

        let node = match inject_composed(meta, node) {
            Some(injected) => Cow::Owned(injected),
            None => Cow::Borrowed(node),
        };

        // Abstract targets holding entries of their own refine further; the
        // committed set stops a value mapping from looping back on itself.
        if target != requested
            && decl.is_abstract()
            && self.resolver.cache.get(target).is_some()
            && self.committed.insert(TypeRef::new(target))
        {
            return self.decode_as(target, &node);
        }

        let target_decl = self
            .resolver
            .registry
            .decl(target)
            .ok_or_else(|| DecodeError::UnknownType(target.to_owned()))?;
        self.materialize(target_decl, &node).map(Some)
    }

    /// Picks the target type for one node, or answers an unknown tag.
    fn select<'m>(
        &self,
        decl: &TypeDecl,
        meta: &'m DiscriminatorMeta,
        node: &Value,
    ) -> Result<Selection<'m>, DecodeError> {
        let kind = self.resolver.registry.tag_kind(meta.value_type().name());
        let tag = node.get(meta.wire_name()).and_then(|token| kind.parse(token));

        if let Some(tag) = &tag
            && let Some(target) = meta.target_for(tag)
        {
            return Ok(Selection::Target(target.name()));
        }

        // A tag the container cannot use may still govern its composed
        // children, so a type carrying composed fields keeps itself and
        // defers resolution to each child.
        if !meta.composed().is_empty() {
            return Ok(Selection::Target(decl.name()));
        }

        let policy = meta.policy().unwrap_or(self.resolver.default_policy);
        match policy {
            UnknownPolicy::ReturnNull => Ok(Selection::Null),
            UnknownPolicy::Throw => Err(DecodeError::UnresolvedDiscriminator {
                requested: decl.name().to_owned(),
                wire_name: meta.wire_name().to_owned(),
                token: node
                    .get(meta.wire_name())
                    .map_or_else(|| "<missing>".to_owned(), Value::to_string),
            }),
        }
    }

    fn materialize(
        &mut self,
        decl: &TypeDecl,
        node: &Value,
    ) -> Result<Box<dyn PolyValue>, DecodeError> {
        let decode = decl
            .decode_fn()
            .ok_or_else(|| DecodeError::NotConcrete(decl.name().to_owned()))?;
        decode(self, node)
    }
}

// -----------------------------------------------------------------------------
// Composed-field tag injection

/// Copies the raw discriminator token into composed children that do not
/// already carry one. Object children receive it directly; array children
/// receive it element by element. Returns `None` when the node is left
/// untouched.
fn inject_composed(meta: &DiscriminatorMeta, node: &Value) -> Option<Value> {
    if meta.composed().is_empty() {
        return None;
    }
    let token = node.get(meta.wire_name())?.clone();

    let mut owned = node.clone();
    let object = owned.as_object_mut()?;
    let mut touched = false;
    for field in meta.composed() {
        let Some(child) = object.get_mut(field.wire_name()) else {
            continue;
        };
        match child {
            Value::Object(map) => {
                map.entry(meta.wire_name()).or_insert_with(|| token.clone());
                touched = true;
            }
            Value::Array(items) => {
                for item in items {
                    if let Value::Object(map) = item {
                        map.entry(meta.wire_name()).or_insert_with(|| token.clone());
                        touched = true;
                    }
                }
            }
            _ => {}
        }
    }
    touched.then_some(owned)
}

// -----------------------------------------------------------------------------
// Tests
