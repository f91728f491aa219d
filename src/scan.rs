//! Property classification for cache construction.

use crate::error::ConfigError;
use crate::registry::{Marker, PropertyDecl, TypeDecl, TypeRegistry};

// -----------------------------------------------------------------------------
// MetadataScanner

/// Classifies one declared property of one type.
///
/// The scanner is the leaf of cache construction: it decides whether a
/// property participates in polymorphic resolution at all, and for
/// discriminators it determines the *declaring root*: the highest type in
/// the inheritance chain that introduces the property, or an explicitly
/// configured root for interface-style hierarchies.
///
/// All failures here are [`ConfigError`]s: they describe defects in the
/// declared hierarchy and abort the whole build.
pub struct MetadataScanner<'r> {
    registry: &'r TypeRegistry,
}

/// The classification of one declared property.
#[derive(Debug)]
pub enum ScannedProperty<'r> {
    /// A discriminator declaration together with its resolved declaring root.
    Discriminator(DiscriminatorScan<'r>),
    /// A composed field, recorded against the enclosing type and merged once
    /// scanning completes.
    Composed {
        field_name: &'static str,
        wire_name: &'static str,
        declared_type: &'static str,
    },
}

/// A resolved discriminator declaration.
#[derive(Debug)]
pub struct DiscriminatorScan<'r> {
    /// The declaring root.
    pub root: &'r TypeDecl,
    /// The root's own declaration of the property. Authoritative for the
    /// wire name, value type, and unknown-value policy.
    pub root_property: &'r PropertyDecl,
    /// The declaration being scanned.
    pub property: &'r PropertyDecl,
}

impl<'r> MetadataScanner<'r> {
    #[inline]
    pub fn new(registry: &'r TypeRegistry) -> Self {
        MetadataScanner { registry }
    }

    /// Classifies `property` as declared by `decl`.
    pub fn scan(
        &self,
        decl: &'r TypeDecl,
        property: &'r PropertyDecl,
    ) -> Result<ScannedProperty<'r>, ConfigError> {
        self.check_conflict(decl, property)?;

        match property.marker() {
            Marker::Composed { declared_type } => Ok(ScannedProperty::Composed {
                field_name: property.name(),
                wire_name: property.wire(),
                declared_type,
            }),
            Marker::Discriminator { root, .. } => {
                let scan = self.resolve_root(decl, property, *root)?;
                Ok(ScannedProperty::Discriminator(scan))
            }
        }
    }

    /// A property name carrying both marker kinds on one type is a
    /// configuration error, checked before any classification.
    fn check_conflict(&self, decl: &TypeDecl, property: &PropertyDecl) -> Result<(), ConfigError> {
        let conflicting = decl.properties().iter().any(|other| {
            other.name() == property.name()
                && core::mem::discriminant(other.marker()) != core::mem::discriminant(property.marker())
        });
        if conflicting {
            return Err(ConfigError::ConflictingMarkers {
                type_name: decl.name().to_owned(),
                property: property.name().to_owned(),
            });
        }
        Ok(())
    }

    fn resolve_root(
        &self,
        decl: &'r TypeDecl,
        property: &'r PropertyDecl,
        explicit: Option<&'static str>,
    ) -> Result<DiscriminatorScan<'r>, ConfigError> {
        let root = match explicit {
            // A manually configured root wins over the chain walk.
            Some(name) => self.registry.decl(name).ok_or_else(|| {
                ConfigError::RootWithoutMarker {
                    root: name.to_owned(),
                    property: property.name().to_owned(),
                    type_name: decl.name().to_owned(),
                }
            })?,
            None => {
                // The highest ancestor still declaring a discriminator with
                // this name; the scanned type itself when nothing above does.
                let mut root = decl;
                for ancestor in self.registry.ancestors(decl.name()) {
                    if ancestor.discriminator(property.name()).is_some() {
                        root = ancestor;
                    }
                }
                root
            }
        };

        let root_property = root.discriminator(property.name()).ok_or_else(|| {
            ConfigError::RootWithoutMarker {
                root: root.name().to_owned(),
                property: property.name().to_owned(),
                type_name: decl.name().to_owned(),
            }
        })?;

        // A value assignment that resolved back to itself has nothing
        // introducing the property: the declaring root is the declaration
        // that names the value type.
        if core::ptr::eq(root, decl) && root_property.tag_type().is_none() {
            return Err(ConfigError::MissingRoot {
                type_name: decl.name().to_owned(),
                property: property.name().to_owned(),
            });
        }

        Ok(DiscriminatorScan { root, root_property, property })
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{MetadataScanner, ScannedProperty};
    use crate::error::ConfigError;
    use crate::registry::{PropertyDecl, TypeDecl, TypeRegistry};
    use crate::tag::TagType;

    fn scan_first(
        registry: &TypeRegistry,
        type_name: &str,
    ) -> Result<&'static str, ConfigError> {
        let scanner = MetadataScanner::new(registry);
        let decl = registry.decl(type_name).unwrap();
        let property = &decl.properties()[0];
        match scanner.scan(decl, property)? {
            ScannedProperty::Discriminator(scan) => Ok(scan.root.name()),
            ScannedProperty::Composed { .. } => panic!("expected a discriminator"),
        }
    }

    #[test]
    fn root_walk_picks_the_highest_declaring_ancestor() {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeDecl::abstract_type("Reward")
                .property(PropertyDecl::discriminator("RewardType", TagType::string())),
        );
        registry.register(
            TypeDecl::abstract_type("CurrencyReward")
                .extends("Reward")
                .property(PropertyDecl::discriminator_value("RewardType", "Currency")),
        );
        registry.register(
            TypeDecl::concrete::<()>("GoldReward")
                .extends("CurrencyReward")
                .property(PropertyDecl::discriminator_value("RewardType", "Currency")),
        );

        assert_eq!(scan_first(&registry, "Reward").unwrap(), "Reward");
        assert_eq!(scan_first(&registry, "CurrencyReward").unwrap(), "Reward");
        assert_eq!(scan_first(&registry, "GoldReward").unwrap(), "Reward");
    }

    #[test]
    fn explicit_root_override_wins() {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeDecl::abstract_type("IAnimal")
                .property(PropertyDecl::discriminator("AnimalType", TagType::string())),
        );
        // No parent link: interface-style membership via explicit root.
        registry.register(
            TypeDecl::concrete::<()>("Mammal").property(
                PropertyDecl::discriminator_value("AnimalType", "Mammal").root("IAnimal"),
            ),
        );

        assert_eq!(scan_first(&registry, "Mammal").unwrap(), "IAnimal");
    }

    #[test]
    fn explicit_root_without_marker_fails() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDecl::abstract_type("IAnimal"));
        registry.register(
            TypeDecl::concrete::<()>("Mammal").property(
                PropertyDecl::discriminator_value("AnimalType", "Mammal").root("IAnimal"),
            ),
        );

        assert!(matches!(
            scan_first(&registry, "Mammal"),
            Err(ConfigError::RootWithoutMarker { .. })
        ));
    }

    #[test]
    fn value_assignment_with_no_declaring_root_fails() {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeDecl::concrete::<()>("Orphan")
                .property(PropertyDecl::discriminator_value("Kind", "orphan")),
        );

        assert!(matches!(
            scan_first(&registry, "Orphan"),
            Err(ConfigError::MissingRoot { .. })
        ));
    }

    #[test]
    fn both_markers_on_one_property_fail_fast() {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeDecl::abstract_type("Quest")
                .property(PropertyDecl::discriminator("Progress", TagType::string()))
                .property(PropertyDecl::composed("Progress", "QuestProgress")),
        );

        assert!(matches!(
            scan_first(&registry, "Quest"),
            Err(ConfigError::ConflictingMarkers { .. })
        ));
    }
}
