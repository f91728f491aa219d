//! The explicit registration table forming the type universe.

use hashbrown::HashMap;

use crate::tag::TagKind;

mod decl;

// A plain `mod` item rather than the `cfg::auto_register!` wrapper: the
// `submit!` export inside must not be macro-expanded, or absolute-path
// invocations of it are rejected.
#[cfg(feature = "auto_register")]
mod auto;

#[cfg(feature = "auto_register")]
pub use self::auto::Registration;

pub use decl::{DecodeFn, PropertyDecl, TypeDecl};
pub(crate) use decl::Marker;

// -----------------------------------------------------------------------------
// TypeRegistry

/// The universe of declared types.
///
/// Declarations are kept in registration order, and cache construction scans
/// them in exactly this order, which is what makes builds deterministic. A
/// name can only be registered once; later registrations of the same name
/// are ignored.
///
/// The registry also collects the tag codecs named by discriminator
/// declarations, so a cache loaded from a blob can convert wire tokens again
/// without re-scanning.
///
/// # Example
///
/// ```
/// use poly_json::{PropertyDecl, TagType, TypeDecl, TypeRegistry};
///
/// let mut registry = TypeRegistry::new();
/// registry.register(
///     TypeDecl::abstract_type("Shape")
///         .property(PropertyDecl::discriminator("Kind", TagType::string())),
/// );
/// assert!(registry.contains("Shape"));
/// assert!(!registry.register(TypeDecl::abstract_type("Shape")));
/// ```
#[derive(Debug, Default)]
pub struct TypeRegistry {
    decls: Vec<TypeDecl>,
    by_name: HashMap<&'static str, usize>,
    tag_kinds: HashMap<&'static str, TagKind>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        TypeRegistry {
            decls: Vec::new(),
            by_name: HashMap::new(),
            tag_kinds: HashMap::new(),
        }
    }

    /// Registers a declaration.
    ///
    /// The first registration of a name wins; returns whether this one was
    /// inserted.
    pub fn register(&mut self, decl: TypeDecl) -> bool {
        if self.by_name.contains_key(decl.name()) {
            return false;
        }
        for property in decl.properties() {
            if let Some(tag_type) = property.tag_type() {
                self.tag_kinds.entry(tag_type.name()).or_insert(tag_type.kind());
            }
        }
        self.by_name.insert(decl.name(), self.decls.len());
        self.decls.push(decl);
        true
    }

    /// Registers every declaration submitted with [`submit!`](crate::submit)
    /// across the dependency graph.
    ///
    /// Repeated calls are cheap and insert no duplicates. Returns how many
    /// declarations were newly registered.
    #[cfg(feature = "auto_register")]
    pub fn auto_register(&mut self) -> usize {
        let mut inserted = 0;
        for registration in inventory::iter::<Registration> {
            if self.register(registration.decl()) {
                inserted += 1;
            }
        }
        inserted
    }

    /// Whether a type with the given name is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The declaration with the given name.
    #[inline]
    pub fn decl(&self, name: &str) -> Option<&TypeDecl> {
        self.by_name.get(name).map(|&index| &self.decls[index])
    }

    /// Iterates declarations in registration order.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &TypeDecl> {
        self.decls.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// The tag codec registered under the given value-type name.
    ///
    /// Falls back to the built-in scalar codecs, and finally to raw JSON
    /// comparison for names nothing registered, so a loaded cache naming a
    /// value type the live registry does not know still resolves exact
    /// matches that way.
    pub fn tag_kind(&self, name: &str) -> TagKind {
        if let Some(kind) = self.tag_kinds.get(name) {
            return *kind;
        }
        match name {
            "string" => TagKind::Str,
            "int" => TagKind::Int,
            "bool" => TagKind::Bool,
            _ => TagKind::Raw,
        }
    }

    /// Walks the inheritance chain upward, starting at `name`'s parent.
    pub fn ancestors<'r>(&'r self, name: &str) -> Ancestors<'r> {
        Ancestors {
            registry: self,
            next: self.decl(name).and_then(TypeDecl::parent),
            // Guards cyclic parent declarations.
            remaining: self.decls.len(),
        }
    }

    /// Whether `child` transitively extends `ancestor`.
    pub fn is_descendant(&self, child: &str, ancestor: &str) -> bool {
        self.ancestors(child).any(|decl| decl.name() == ancestor)
    }
}

// -----------------------------------------------------------------------------
// Ancestors

/// Iterator over the declarations in a type's inheritance chain, nearest
/// parent first.
pub struct Ancestors<'r> {
    registry: &'r TypeRegistry,
    next: Option<&'static str>,
    remaining: usize,
}

impl<'r> Iterator for Ancestors<'r> {
    type Item = &'r TypeDecl;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let name = self.next.take()?;
        let decl = self.registry.decl(name)?;
        self.next = decl.parent();
        Some(decl)
    }
}

// -----------------------------------------------------------------------------
// Tests
