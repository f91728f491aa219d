use thiserror::Error;

// -----------------------------------------------------------------------------
// ConfigError

/// A structural defect in the declared type universe.
///
/// Any of these aborts cache construction entirely. A cache is never built
/// from a partially valid universe, so a `ConfigError` always points at a
/// declaration that has to be fixed, not at bad input data.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A property is declared both as a discriminator and as a composed field.
    #[error("`{type_name}.{property}` is declared both discriminator and composed")]
    ConflictingMarkers {
        type_name: String,
        property: String,
    },

    /// A discriminator value assignment has no declaring root: no ancestor
    /// introduces a discriminator property with this name.
    #[error("no declaring root introduces discriminator `{property}` (assigned by `{type_name}`)")]
    MissingRoot {
        type_name: String,
        property: String,
    },

    /// An explicitly configured root does not declare the property as a
    /// discriminator.
    #[error("`{root}` declares no discriminator named `{property}` (referenced from `{type_name}`)")]
    RootWithoutMarker {
        root: String,
        property: String,
        type_name: String,
    },

    /// A concrete type declares a discriminator without supplying its value.
    #[error("concrete type `{type_name}` declares discriminator `{property}` without a value")]
    MissingValue {
        type_name: String,
        property: String,
    },

    /// A declaration names a parent that is not registered.
    #[error("`{type_name}` extends unknown type `{parent}`")]
    UnknownParent {
        type_name: String,
        parent: String,
    },

    /// A second injection provider was registered for one model name.
    #[error("an injection provider for model `{model}` is already registered")]
    DuplicateProvider {
        model: String,
    },
}

// -----------------------------------------------------------------------------
// DecodeError

/// A failure while resolving or materializing one decoded object.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A discriminator value with no registered mapping and no composed
    /// fallback, under the [`Throw`](crate::UnknownPolicy::Throw) policy.
    #[error(
        "cannot resolve `{requested}`: discriminator `{wire_name}` = {token} \
         matches no registered type"
    )]
    UnresolvedDiscriminator {
        requested: String,
        wire_name: String,
        /// The raw wire token, or `<missing>` when the child was absent.
        token: String,
    },

    /// Resolution produced a type name that is not registered.
    #[error("type `{0}` is not registered")]
    UnknownType(String),

    /// Resolution settled on a type with no decode function (an abstract
    /// type or trait-like base).
    #[error("type `{0}` cannot be materialized directly")]
    NotConcrete(String),

    /// An injected field names a model with no registered provider.
    #[error("no injection provider registered for model `{0}`")]
    MissingProvider(String),

    /// The generic node-to-value conversion failed.
    #[error(transparent)]
    Tree(#[from] serde_json::Error),

    /// A failure raised by a custom decode function.
    #[error("{0}")]
    Message(String),
}

// -----------------------------------------------------------------------------
// PersistError

/// A failure on the cache persistence channel.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The persisted blob is missing or unreadable where a cache was
    /// expected to be loaded rather than freshly built.
    #[error("cache blob unavailable: {0}")]
    Unavailable(std::io::Error),

    /// The blob could not be encoded, or its contents do not parse back
    /// into a cache.
    #[error("cache blob is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The blob could not be written.
    #[error("cache blob could not be written: {0}")]
    Write(std::io::Error),
}

// -----------------------------------------------------------------------------
// ContextError

/// Either phase of [`PolyContext::load_or_build`](crate::PolyContext::load_or_build)
/// failing.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}
