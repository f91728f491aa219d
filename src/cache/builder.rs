//! Cache construction: one scan pass and two merge passes.

use hashbrown::HashMap;
use log::{debug, warn};

use super::{ComposedField, DiscriminatorCache, DiscriminatorMeta};
use crate::descriptor::TypeRef;
use crate::error::ConfigError;
use crate::registry::{TypeDecl, TypeRegistry};
use crate::scan::{DiscriminatorScan, MetadataScanner, ScannedProperty};
use crate::tag::TagValue;

// -----------------------------------------------------------------------------
// CacheBuilder

/// Builds a [`DiscriminatorCache`] from a registered type universe.
///
/// Construction runs in three passes:
///
/// 1. **Scan**: every declared property of every type, in registration
///    order. Direct value mappings are recorded immediately; abstract value
///    assignments with no explicit value and composed fields are deferred.
/// 2. **Abstract resolution**: each deferred abstract type inherits its
///    value from the first registered concrete descendant whose chain
///    declares one, and becomes the resolution target for that value.
/// 3. **Composition merge**: deferred composed fields attach to their
///    enclosing type's entry, or the nearest ancestor holding one.
///
/// Any configuration error in the scan pass aborts the whole build; the
/// merge passes silently skip entries with no matching root, which are inert
/// rather than erroneous.
///
/// The builder exists only inside [`build`](CacheBuilder::build); its
/// accumulation state cannot outlive one construction, so a second build
/// always starts from scratch and yields an identical cache.
pub struct CacheBuilder<'r> {
    registry: &'r TypeRegistry,
    entries: HashMap<TypeRef, DiscriminatorMeta>,
    deferred_abstract: Vec<DeferredAbstract<'r>>,
    deferred_composed: Vec<(TypeRef, ComposedField)>,
}

/// An abstract value assignment waiting for a concrete descendant.
struct DeferredAbstract<'r> {
    abstract_name: &'r str,
    root_name: &'r str,
    property: &'r str,
}

impl<'r> CacheBuilder<'r> {
    /// Builds the cache for every type registered in `registry`.
    pub fn build(registry: &'r TypeRegistry) -> Result<DiscriminatorCache, ConfigError> {
        let mut builder = CacheBuilder {
            registry,
            entries: HashMap::new(),
            deferred_abstract: Vec::new(),
            deferred_composed: Vec::new(),
        };

        builder.scan_universe()?;
        builder.resolve_abstract();
        builder.merge_composed();

        debug!(
            "discriminator cache built: {} roots from {} declarations",
            builder.entries.len(),
            registry.len(),
        );
        Ok(DiscriminatorCache::from_entries(builder.entries))
    }

    // Pass 1.
    fn scan_universe(&mut self) -> Result<(), ConfigError> {
        let scanner = MetadataScanner::new(self.registry);
        for decl in self.registry.iter() {
            if let Some(parent) = decl.parent()
                && !self.registry.contains(parent)
            {
                return Err(ConfigError::UnknownParent {
                    type_name: decl.name().to_owned(),
                    parent: parent.to_owned(),
                });
            }

            for property in decl.properties() {
                match scanner.scan(decl, property)? {
                    ScannedProperty::Discriminator(scan) => {
                        self.record_discriminator(decl, scan)?;
                    }
                    ScannedProperty::Composed { field_name, wire_name, declared_type } => {
                        self.deferred_composed.push((
                            TypeRef::new(decl.name()),
                            ComposedField::new(field_name, wire_name, TypeRef::new(declared_type)),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn record_discriminator(
        &mut self,
        decl: &'r TypeDecl,
        scan: DiscriminatorScan<'r>,
    ) -> Result<(), ConfigError> {
        let root_name = scan.root.name();
        let root_property = scan.root_property;
        let meta = self
            .entries
            .entry(TypeRef::new(root_name))
            .or_insert_with(|| {
                let value_type = root_property
                    .tag_type()
                    .map_or_else(|| TypeRef::new("json"), |t| TypeRef::new(t.name()));
                DiscriminatorMeta::new(
                    value_type,
                    root_property.name(),
                    root_property.wire(),
                    root_property.policy_decl(),
                )
            });

        match scan.property.assigned_value() {
            Some(value) => {
                if let Some(old) = meta.insert_value(value.clone(), TypeRef::new(decl.name())) {
                    warn!(
                        "discriminator value {value} of `{root_name}` remapped from `{old}` \
                         to `{}` (last registration wins)",
                        decl.name(),
                    );
                }
            }
            None if decl.is_abstract() && decl.name() != root_name => {
                // Cannot be materialized and assigns no value itself: its
                // value is inherited from a concrete descendant in pass 2.
                self.deferred_abstract.push(DeferredAbstract {
                    abstract_name: decl.name(),
                    root_name,
                    property: scan.property.name(),
                });
            }
            None if decl.is_abstract() => {
                // The root's own introducing declaration maps nothing.
            }
            None => {
                return Err(ConfigError::MissingValue {
                    type_name: decl.name().to_owned(),
                    property: scan.property.name().to_owned(),
                });
            }
        }
        Ok(())
    }

    // Pass 2.
    fn resolve_abstract(&mut self) {
        let deferred = core::mem::take(&mut self.deferred_abstract);
        for entry in deferred {
            if !self.entries.contains_key(entry.root_name) {
                continue; // inert: the root never registered
            }

            // First concrete descendant in scan order whose chain assigns a
            // value to the property, seen as the abstract type would see it.
            let inherited = self
                .registry
                .iter()
                .filter(|decl| {
                    !decl.is_abstract()
                        && self.registry.is_descendant(decl.name(), entry.abstract_name)
                })
                .find_map(|decl| self.chain_value(decl, entry.property));

            let Some(value) = inherited else {
                continue; // inert: no descendant carries a value
            };

            if let Some(meta) = self.entries.get_mut(entry.root_name)
                && let Some(old) =
                    meta.insert_value(value.clone(), TypeRef::new(entry.abstract_name))
            {
                // The abstract type takes over the value; its own
                // discriminator refines the choice on the next hop.
                debug!(
                    "discriminator value {value} of `{}` now resolves to abstract `{}` \
                     (was `{old}`)",
                    entry.root_name, entry.abstract_name,
                );
            }
        }
    }

    /// The value `decl` assigns to `property`, directly or through its
    /// ancestors (nearest declaration wins, mirroring virtual dispatch).
    fn chain_value(&self, decl: &TypeDecl, property: &str) -> Option<TagValue> {
        core::iter::once(decl)
            .chain(self.registry.ancestors(decl.name()))
            .find_map(|link| {
                link.discriminator(property)
                    .and_then(|p| p.assigned_value())
                    .cloned()
            })
    }

    // Pass 3.
    fn merge_composed(&mut self) {
        let deferred = core::mem::take(&mut self.deferred_composed);
        for (enclosing, field) in deferred {
            let target = if self.entries.contains_key(enclosing.name()) {
                Some(enclosing)
            } else {
                self.registry
                    .ancestors(enclosing.name())
                    .find(|ancestor| self.entries.contains_key(ancestor.name()))
                    .map(|ancestor| TypeRef::new(ancestor.name()))
            };

            let Some(target) = target else {
                continue; // inert: no root anywhere in the chain
            };
            if let Some(meta) = self.entries.get_mut(target.name()) {
                meta.push_composed(field);
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::CacheBuilder;
    use crate::cache::UnknownPolicy;
    use crate::error::ConfigError;
    use crate::registry::{PropertyDecl, TypeDecl, TypeRegistry};
    use crate::tag::{TagType, TagValue};

    /// Shapes: an abstract root, an abstract mid-level type with no explicit
    /// value, and concrete leaves refining it.
    fn shapes() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeDecl::abstract_type("Shape")
                .property(PropertyDecl::discriminator("Kind", TagType::string())),
        );
        registry.register(
            TypeDecl::concrete::<()>("Circle")
                .extends("Shape")
                .property(PropertyDecl::discriminator_value("Kind", "circle")),
        );
        registry.register(
            TypeDecl::abstract_type("Polygon")
                .extends("Shape")
                // No value: inherited from a concrete descendant in pass 2.
                .property(PropertyDecl::discriminator_deferred("Kind"))
                .property(
                    PropertyDecl::discriminator("Sides", TagType::int()),
                ),
        );
        registry.register(
            TypeDecl::concrete::<()>("Triangle")
                .extends("Polygon")
                .property(PropertyDecl::discriminator_value("Kind", "polygon"))
                .property(PropertyDecl::discriminator_value("Sides", 3)),
        );
        registry.register(
            TypeDecl::concrete::<()>("Square")
                .extends("Polygon")
                .property(PropertyDecl::discriminator_value("Sides", 4)),
        );
        registry
    }

    #[test]
    fn direct_values_map_to_their_declaring_types() {
        let cache = CacheBuilder::build(&shapes()).unwrap();
        let meta = cache.get("Shape").unwrap();

        assert_eq!(meta.wire_name(), "Kind");
        assert_eq!(
            meta.target_for(&TagValue::from("circle")).unwrap().name(),
            "Circle",
        );

        let sides = cache.get("Polygon").unwrap();
        assert_eq!(sides.target_for(&TagValue::Int(3)).unwrap().name(), "Triangle");
        assert_eq!(sides.target_for(&TagValue::Int(4)).unwrap().name(), "Square");
    }

    #[test]
    fn abstract_type_inherits_its_value_from_a_descendant() {
        let cache = CacheBuilder::build(&shapes()).unwrap();
        let meta = cache.get("Shape").unwrap();

        // Triangle registered "polygon" directly; the deferred Polygon entry
        // takes the value over so resolution lands on the abstract type and
        // refines through `Sides`.
        assert_eq!(
            meta.target_for(&TagValue::from("polygon")).unwrap().name(),
            "Polygon",
        );
    }

    #[test]
    fn value_collisions_keep_the_last_registration() {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeDecl::abstract_type("Reward")
                .property(PropertyDecl::discriminator("RewardType", TagType::string())),
        );
        registry.register(
            TypeDecl::concrete::<()>("First")
                .extends("Reward")
                .property(PropertyDecl::discriminator_value("RewardType", "dupe")),
        );
        registry.register(
            TypeDecl::concrete::<()>("Second")
                .extends("Reward")
                .property(PropertyDecl::discriminator_value("RewardType", "dupe")),
        );

        let cache = CacheBuilder::build(&registry).unwrap();
        let meta = cache.get("Reward").unwrap();
        assert_eq!(meta.target_for(&TagValue::from("dupe")).unwrap().name(), "Second");
        assert_eq!(meta.values().len(), 1);
    }

    #[test]
    fn composed_fields_attach_to_the_nearest_root() {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeDecl::abstract_type("Quest")
                .property(
                    PropertyDecl::discriminator(
                        "QuestType",
                        TagType::enumeration("QuestType", &["Daily", "Special"]),
                    )
                    .policy(UnknownPolicy::ReturnNull),
                )
                .property(PropertyDecl::composed("Progress", "QuestProgress")),
        );
        registry.register(
            TypeDecl::concrete::<()>("SpecialQuest")
                .extends("Quest")
                .property(PropertyDecl::discriminator_value("QuestType", "Special"))
                // Declared on a subtype: merges upward to Quest's entry.
                .property(PropertyDecl::composed("Bonus", "QuestProgress").wire_name("bonus")),
        );

        let cache = CacheBuilder::build(&registry).unwrap();
        let meta = cache.get("Quest").unwrap();
        assert_eq!(meta.policy(), Some(UnknownPolicy::ReturnNull));

        let names: Vec<_> = meta.composed().iter().map(|f| f.wire_name()).collect();
        assert_eq!(names, ["Progress", "bonus"]);
        assert!(cache.get("SpecialQuest").is_none());
    }

    #[test]
    fn concrete_discriminator_without_value_is_a_config_error() {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeDecl::abstract_type("Reward")
                .property(PropertyDecl::discriminator("RewardType", TagType::string())),
        );
        registry.register(
            TypeDecl::concrete::<()>("Unvalued")
                .extends("Reward")
                .property(PropertyDecl::discriminator_deferred("RewardType")),
        );

        assert!(matches!(
            CacheBuilder::build(&registry),
            Err(ConfigError::MissingValue { .. })
        ));
    }

    #[test]
    fn unknown_parent_is_a_config_error() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDecl::concrete::<()>("Stray").extends("Nowhere"));

        assert!(matches!(
            CacheBuilder::build(&registry),
            Err(ConfigError::UnknownParent { .. })
        ));
    }

    #[test]
    fn building_twice_yields_an_identical_cache() {
        let registry = shapes();
        let first = CacheBuilder::build(&registry).unwrap();
        let second = CacheBuilder::build(&registry).unwrap();
        assert_eq!(first, second);
    }
}
