use num_traits::{Float, NumCast, PrimInt, Signed};

/// Bound on the floating-point scalar type particle data is stored in.
///
/// Implemented for `f32` and `f64`. Kept as a single trait alias so the
/// rest of the crate can stay generic over the scalar without repeating
/// the same bound list everywhere.
pub trait Scalar: Float + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Scalar for T where T: Float + Send + Sync + std::fmt::Debug + 'static {}

/// Bound on the signed integer type used to index particles and bins.
///
/// `NumCast` lets the builder widen through `i128` to check bin-grid
/// overflow before it happens, rather than relying on wrapping
/// arithmetic to detect it after the fact.
pub trait IndexInt: PrimInt + Signed + NumCast + Send + Sync + std::fmt::Debug + 'static {}

impl<I> IndexInt for I where I: PrimInt + Signed + NumCast + Send + Sync + std::fmt::Debug + 'static {}

/// Cast a `usize` into an `IndexInt`, panicking only if the crate's own
/// invariants are violated (i.e. `N` itself doesn't fit `I`, which the
/// public API checks before this is ever called).
pub(crate) fn index_from_usize<I: IndexInt>(value: usize) -> I {
    I::from(value).expect("index exceeds the range of the chosen index type")
}

pub(crate) fn usize_from_index<I: IndexInt>(value: I) -> usize {
    value.to_usize().expect("negative index escaped the builder")
}
