use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars when evaluating compiled expressions.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Lifts an `f64` constant into the scalar type.
/// `f64` and `Dual` always succeed; anything else degrades to NaN.
pub fn constant<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// A scalar field φ: Rⁿ → R.
pub trait ScalarField<T: Scalar> {
    /// Number of coordinates the field takes.
    fn dimension(&self) -> usize;

    /// Evaluates the field at `point` (length `dimension()`).
    fn value(&self, point: &[T]) -> T;
}
