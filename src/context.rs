//! The top-level entry point tying registry, cache, and resolver together.

use log::{info, warn};

use crate::cache::{BlobStore, CacheBuilder, DiscriminatorCache, UnknownPolicy};
use crate::error::{ConfigError, ContextError, PersistError};
use crate::inject::ProviderRegistry;
use crate::registry::TypeRegistry;
use crate::resolve::Resolver;

// -----------------------------------------------------------------------------
// PolyContext

/// An immutable bundle of a registered type universe and its built
/// discriminator cache.
///
/// A context is constructed once, up front, and then shared; every
/// configuration error surfaces at construction rather than mid-decode.
/// [`resolver`](Self::resolver) hands out cheap per-use views for the actual
/// decoding.
///
/// # Example
///
/// ```
/// use poly_json::{PolyContext, PropertyDecl, TagType, TypeDecl, TypeRegistry};
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Debug, Deserialize)]
/// struct Circle {
///     radius: f64,
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.register(
///     TypeDecl::abstract_type("Shape")
///         .property(PropertyDecl::discriminator("kind", TagType::string())),
/// );
/// registry.register(
///     TypeDecl::concrete::<Circle>("Circle")
///         .extends("Shape")
///         .property(PropertyDecl::discriminator_value("kind", "circle")),
/// );
///
/// let context = PolyContext::build(registry)?;
/// let shape = context
///     .resolver()
///     .decode("Shape", &json!({"kind": "circle", "radius": 2.0}))?
///     .unwrap();
/// assert!(shape.is::<Circle>());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct PolyContext {
    registry: TypeRegistry,
    cache: DiscriminatorCache,
    providers: ProviderRegistry,
    default_policy: UnknownPolicy,
}

impl PolyContext {
    /// Builds the discriminator cache for `registry` and wraps both.
    pub fn build(registry: TypeRegistry) -> Result<Self, ConfigError> {
        let cache = CacheBuilder::build(&registry)?;
        Ok(PolyContext {
            registry,
            cache,
            providers: ProviderRegistry::new(),
            default_policy: UnknownPolicy::default(),
        })
    }

    /// Builds a context from every declaration submitted through
    /// [`submit!`](crate::submit).
    #[cfg(feature = "auto_register")]
    pub fn auto() -> Result<Self, ConfigError> {
        let mut registry = TypeRegistry::new();
        let gathered = registry.auto_register();
        info!("auto-registered {gathered} type declarations");
        Self::build(registry)
    }

    /// Wraps `registry` around a cache loaded from `store`, skipping the
    /// build entirely.
    ///
    /// The caller vouches that the blob was produced from an equivalent
    /// registry; a stale blob decodes, but resolves against stale mappings.
    pub fn load(registry: TypeRegistry, store: &dyn BlobStore) -> Result<Self, PersistError> {
        let cache = DiscriminatorCache::load(store)?;
        Ok(PolyContext {
            registry,
            cache,
            providers: ProviderRegistry::new(),
            default_policy: UnknownPolicy::default(),
        })
    }

    /// Loads the cache from `store` when a usable blob exists, otherwise
    /// builds it from `registry` and writes the result back.
    ///
    /// A corrupt blob is logged and rebuilt; a failed write-back is logged
    /// and otherwise ignored, since the freshly built context is complete
    /// without it.
    pub fn load_or_build(
        registry: TypeRegistry,
        store: &dyn BlobStore,
    ) -> Result<Self, ContextError> {
        match DiscriminatorCache::load(store) {
            Ok(cache) => {
                info!("discriminator cache loaded ({} roots)", cache.len());
                return Ok(PolyContext {
                    registry,
                    cache,
                    providers: ProviderRegistry::new(),
                    default_policy: UnknownPolicy::default(),
                });
            }
            Err(PersistError::Unavailable(_)) => {}
            Err(err) => warn!("stored discriminator cache unusable, rebuilding: {err}"),
        }

        let context = Self::build(registry)?;
        if let Err(err) = context.cache.store(store) {
            warn!("failed to persist rebuilt discriminator cache: {err}");
        }
        Ok(context)
    }

    /// Sets the policy applied to unknown discriminator values on roots that
    /// declare none of their own. Defaults to [`UnknownPolicy::Throw`].
    pub fn with_policy(mut self, policy: UnknownPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Supplies the injection providers consulted by
    /// [`DecodeSession::inject`](crate::DecodeSession::inject). Defaults to
    /// an empty registry.
    pub fn with_providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    /// A resolver view over this context.
    #[inline]
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.registry, &self.cache, self.default_policy)
            .with_providers(&self.providers)
    }

    #[inline]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    #[inline]
    pub fn cache(&self) -> &DiscriminatorCache {
        &self.cache
    }
}

// -----------------------------------------------------------------------------
// Tests
