//! Distributed registration collected through `inventory`.

use super::TypeDecl;

// -----------------------------------------------------------------------------
// Registration

/// A deferred type declaration submitted for collection.
///
/// Submit one from anywhere in the dependency graph with
/// [`submit!`](crate::submit); gather them all with
/// [`TypeRegistry::auto_register`](super::TypeRegistry::auto_register).
pub struct Registration {
    decl: fn() -> TypeDecl,
}

impl Registration {
    #[inline]
    pub const fn new(decl: fn() -> TypeDecl) -> Self {
        Registration { decl }
    }

    /// Builds the submitted declaration.
    #[inline]
    pub fn decl(&self) -> TypeDecl {
        (self.decl)()
    }
}

inventory::collect!(Registration);

/// Submits a [`TypeDecl`] for [`TypeRegistry::auto_register`].
///
/// ```
/// use poly_json::{PropertyDecl, TagType, TypeDecl, TypeRegistry};
///
/// poly_json::submit! {
///     TypeDecl::abstract_type("Vehicle")
///         .property(PropertyDecl::discriminator("VehicleType", TagType::string()))
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.auto_register();
/// assert!(registry.contains("Vehicle"));
/// ```
///
/// [`TypeDecl`]: crate::TypeDecl
/// [`TypeRegistry::auto_register`]: crate::TypeRegistry::auto_register
#[macro_export]
macro_rules! submit {
    ($decl:expr) => {
        $crate::__inventory::submit! {
            $crate::registry::Registration::new(|| $decl)
        }
    };
}

// -----------------------------------------------------------------------------
// Tests
