//! Traits for conversions between types.

/// Simple and safe type conversions that may fail in a controlled way under
/// some circumstances, but shouldn't. It is the reciprocal of [`UnwrapInto`].
pub trait UnwrapFrom<T>: Sized {
    /// Performs the conversion.
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn unwrap_from(value: T) -> Self;
}

impl <T, U> UnwrapFrom<U> for T
where
    T: core::convert::TryFrom<U>,
    T::Error: core::fmt::Debug,
{
    fn unwrap_from(value: U) -> Self {
        Self::try_from(value).unwrap()
    }
}

/// An attempted conversion that consumes `self`.
pub trait UnwrapInto<T>: Sized {
    /// Performs the conversion.
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn unwrap_into(self) -> T;
}

impl <T, U> UnwrapInto<U> for T
where
    U: UnwrapFrom<T>
{
    fn unwrap_into(self) -> U {
        U::unwrap_from(self)
    }
}
