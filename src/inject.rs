//! Identifier-based value injection during decoding.
//!
//! Some wire fields carry an identifier rather than the value itself: a
//! record naming `"sword_01"` where the decoded object needs the full weapon
//! definition. A [`ProviderRegistry`] maps each model name to an
//! [`InjectionProvider`] that resolves identifiers to live values; decode
//! functions pull injected fields through
//! [`DecodeSession::inject`](crate::DecodeSession::inject).

use core::fmt;
use core::marker::PhantomData;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ConfigError, DecodeError};
use crate::poly::PolyValue;

// -----------------------------------------------------------------------------
// InjectionProvider

/// Resolves an injected value from its wire identifier.
///
/// A provider owns whatever lookup data its model needs (a definition table,
/// an asset index). Resolution happens at decode time, so the decoded object
/// holds the value itself, never the identifier.
pub trait InjectionProvider: Send + Sync {
    /// Resolves `identifier` to a model value.
    ///
    /// `Ok(None)` means the identifier has no value; the injected field
    /// decodes to null. Errors are reserved for identifiers the provider
    /// cannot even interpret.
    fn resolve(&self, identifier: &Value) -> Result<Option<Box<dyn PolyValue>>, DecodeError>;
}

/// An [`InjectionProvider`] backed by a closure over a typed identifier.
///
/// # Example
///
/// ```
/// use poly_json::{FnProvider, InjectionProvider};
/// use serde_json::json;
///
/// #[derive(Debug, PartialEq)]
/// struct Weapon {
///     damage: u32,
/// }
///
/// let provider = FnProvider::new(|id: String| {
///     (id == "sword_01").then_some(Weapon { damage: 7 })
/// });
/// let value = provider.resolve(&json!("sword_01")).unwrap().unwrap();
/// assert_eq!(value.downcast_ref::<Weapon>(), Some(&Weapon { damage: 7 }));
/// ```
pub struct FnProvider<K, V, F> {
    resolve: F,
    _marker: PhantomData<fn(K) -> V>,
}

impl<K, V, F> FnProvider<K, V, F>
where
    K: DeserializeOwned,
    V: Send + Sync + 'static,
    F: Fn(K) -> Option<V> + Send + Sync,
{
    pub fn new(resolve: F) -> Self {
        FnProvider { resolve, _marker: PhantomData }
    }
}

impl<K, V, F> InjectionProvider for FnProvider<K, V, F>
where
    K: DeserializeOwned + Send + Sync,
    V: Send + Sync + 'static,
    F: Fn(K) -> Option<V> + Send + Sync,
{
    fn resolve(&self, identifier: &Value) -> Result<Option<Box<dyn PolyValue>>, DecodeError> {
        let key: K = serde_json::from_value(identifier.clone())?;
        Ok((self.resolve)(key).map(|value| Box::new(value) as Box<dyn PolyValue>))
    }
}

// -----------------------------------------------------------------------------
// ProviderRegistry

/// One provider per model name.
///
/// Built up front alongside the type registry and handed to
/// [`PolyContext::with_providers`](crate::PolyContext::with_providers);
/// read-only afterwards, so concurrent decode sessions share it freely.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Box<dyn InjectionProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the provider for a model name.
    ///
    /// A second provider for the same model is a configuration defect, not a
    /// replacement.
    pub fn register(
        &mut self,
        model: &'static str,
        provider: impl InjectionProvider + 'static,
    ) -> Result<(), ConfigError> {
        match self.providers.entry(model) {
            Entry::Occupied(_) => Err(ConfigError::DuplicateProvider {
                model: model.to_owned(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(Box::new(provider));
                Ok(())
            }
        }
    }

    /// Whether a provider is registered for the model name.
    #[inline]
    pub fn contains(&self, model: &str) -> bool {
        self.providers.contains_key(model)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    #[inline]
    pub(crate) fn provider(&self, model: &str) -> Option<&dyn InjectionProvider> {
        self.providers.get(model).map(Box::as_ref)
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.providers.keys()).finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{FnProvider, ProviderRegistry};
    use crate::context::PolyContext;
    use crate::error::{ConfigError, DecodeError};
    use crate::poly::PolyValue;
    use crate::registry::{TypeDecl, TypeRegistry};
    use crate::resolve::DecodeSession;

    #[derive(Debug, PartialEq)]
    struct Weapon {
        damage: u32,
    }

    fn weapon_providers() -> ProviderRegistry {
        let mut providers = ProviderRegistry::new();
        providers
            .register(
                "Weapon",
                FnProvider::new(|id: String| (id == "sword_01").then_some(Weapon { damage: 7 })),
            )
            .unwrap();
        providers
    }

    #[test]
    fn second_provider_for_a_model_is_a_config_error() {
        let mut providers = weapon_providers();
        let err = providers
            .register("Weapon", FnProvider::new(|_: String| None::<Weapon>))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateProvider { model } if model == "Weapon"));
        assert_eq!(providers.len(), 1);
    }

    #[derive(Debug)]
    struct Loadout {
        weapon: Option<Box<dyn PolyValue>>,
    }

    fn decode_loadout(
        session: &mut DecodeSession<'_>,
        node: &Value,
    ) -> Result<Box<dyn PolyValue>, DecodeError> {
        let weapon = match node.get("weapon") {
            Some(identifier) => session.inject("Weapon", identifier)?,
            None => None,
        };
        Ok(Box::new(Loadout { weapon }))
    }

    fn loadout_context(providers: ProviderRegistry) -> PolyContext {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDecl::concrete_with("Loadout", decode_loadout));
        PolyContext::build(registry).unwrap().with_providers(providers)
    }

    #[test]
    fn injected_field_resolves_through_its_provider() {
        let context = loadout_context(weapon_providers());
        let value = context
            .resolver()
            .decode("Loadout", &json!({"weapon": "sword_01"}))
            .unwrap()
            .unwrap();

        let loadout = value.downcast_ref::<Loadout>().unwrap();
        let weapon = loadout.weapon.as_deref().unwrap();
        assert_eq!(weapon.downcast_ref::<Weapon>(), Some(&Weapon { damage: 7 }));
    }

    #[test]
    fn unknown_identifier_injects_null() {
        let context = loadout_context(weapon_providers());
        let value = context
            .resolver()
            .decode("Loadout", &json!({"weapon": "axe_99"}))
            .unwrap()
            .unwrap();
        assert!(value.downcast_ref::<Loadout>().unwrap().weapon.is_none());
    }

    #[test]
    fn null_identifier_injects_null_without_consulting_the_provider() {
        let mut providers = ProviderRegistry::new();
        providers
            .register(
                "Weapon",
                FnProvider::new(|_: String| -> Option<Weapon> {
                    panic!("provider consulted for a null identifier")
                }),
            )
            .unwrap();

        let context = loadout_context(providers);
        let value = context
            .resolver()
            .decode("Loadout", &json!({"weapon": null}))
            .unwrap()
            .unwrap();
        assert!(value.downcast_ref::<Loadout>().unwrap().weapon.is_none());
    }

    #[test]
    fn missing_provider_is_a_decode_error() {
        let context = loadout_context(ProviderRegistry::new());
        let err = context
            .resolver()
            .decode("Loadout", &json!({"weapon": "sword_01"}))
            .unwrap_err();
        assert!(matches!(err, DecodeError::MissingProvider(model) if model == "Weapon"));
    }
}
