#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Compilation config

/// Some macros used for compilation control.
pub mod cfg {
    /// Wraps items compiled only when the `auto_register` feature is on.
    #[doc(hidden)]
    #[macro_export]
    macro_rules! __cfg_auto_register {
        ($($item:item)*) => {
            $(#[cfg(feature = "auto_register")] $item)*
        };
    }

    pub use crate::__cfg_auto_register as auto_register;
}

crate::cfg::auto_register! {
    #[doc(hidden)]
    pub use inventory as __inventory;
}

// -----------------------------------------------------------------------------
// Modules

mod context;
mod descriptor;
mod inject;
mod poly;
mod resolve;
mod tag;

pub mod cache;
pub mod error;
pub mod registry;
pub mod scan;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use cache::{
    BlobStore, CacheBuilder, ComposedField, DiscriminatorCache, DiscriminatorMeta, FileStore,
    MemoryStore, UnknownPolicy,
};
pub use context::PolyContext;
pub use descriptor::TypeRef;
pub use inject::{FnProvider, InjectionProvider, ProviderRegistry};
pub use error::{ConfigError, ContextError, DecodeError, PersistError};
pub use poly::PolyValue;
pub use registry::{DecodeFn, PropertyDecl, TypeDecl, TypeRegistry};
pub use resolve::{DecodeSession, Resolver};
pub use tag::{TagKind, TagType, TagValue};

crate::cfg::auto_register! {
    pub use crate::registry::Registration;
}
