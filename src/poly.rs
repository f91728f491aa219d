use core::any::Any;
use core::fmt;

// -----------------------------------------------------------------------------
// PolyValue

/// An erased decoded value.
///
/// Every polymorphic decode produces a `Box<dyn PolyValue>`; callers recover
/// the concrete type with [`downcast`](trait@PolyValue#method.downcast) once
/// resolution has picked it. The trait is implemented for every `'static`
/// type that is `Send + Sync`, so decoded values can be handed across
/// concurrent decode sessions freely.
///
/// # Example
///
/// ```
/// use poly_json::PolyValue;
///
/// let value: Box<dyn PolyValue> = Box::new(42_i64);
/// assert_eq!(value.downcast_ref::<i64>(), Some(&42));
/// ```
pub trait PolyValue: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// The Rust type name of the underlying value, for diagnostics.
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> PolyValue for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    #[inline]
    fn type_name(&self) -> &'static str {
        core::any::type_name::<T>()
    }
}

impl dyn PolyValue {
    /// Whether the underlying value is a `T`.
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Borrows the underlying value as a `T`, if it is one.
    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Mutably borrows the underlying value as a `T`, if it is one.
    #[inline]
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }

    /// Takes the underlying value as a `T`, handing the box back on a
    /// type mismatch.
    #[inline]
    pub fn downcast<T: Any>(self: Box<Self>) -> Result<Box<T>, Box<dyn Any>> {
        self.into_any().downcast()
    }
}

impl fmt::Debug for dyn PolyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PolyValue({})", self.type_name())
    }
}

// -----------------------------------------------------------------------------
// Tests
