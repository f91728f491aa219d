use core::borrow::Borrow;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::registry::{TypeDecl, TypeRegistry};

// -----------------------------------------------------------------------------
// TypeRef

/// A name-keyed reference to a registered type.
///
/// Two references are equal iff they carry the same stable name. The live
/// declaration is looked up on demand with [`resolve`](TypeRef::resolve),
/// because a reference loaded from a persisted cache outlives the registry it
/// was originally built from; a live handle cannot cross the persistence
/// boundary, but a name can.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef {
    name: String,
}

impl TypeRef {
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        TypeRef { name: name.into() }
    }

    /// The stable type name this reference is keyed by.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks the declaration up in a live registry.
    ///
    /// Returns `None` when no type with this name is registered there.
    #[inline]
    pub fn resolve<'r>(&self, registry: &'r TypeRegistry) -> Option<&'r TypeDecl> {
        registry.decl(&self.name)
    }
}

impl From<&str> for TypeRef {
    #[inline]
    fn from(name: &str) -> Self {
        TypeRef::new(name)
    }
}

impl From<String> for TypeRef {
    #[inline]
    fn from(name: String) -> Self {
        TypeRef { name }
    }
}

impl Borrow<str> for TypeRef {
    #[inline]
    fn borrow(&self) -> &str {
        &self.name
    }
}

impl PartialEq<&str> for TypeRef {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.name == *other
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// -----------------------------------------------------------------------------
// Tests
