//! Vector primitives over grid functions.
//!
//! Whole-vector variants use Rayon parallel iterators when the `rayon` feature is enabled.
//! The `_range` variants are serial and touch only `range`; team threads call them on their
//! own partition and combine partial results through [`Comm::all_reduce`].
//!
//! Sums are not bit-reproducible across partitionings: floating-point addition is
//! reassociated differently for different thread counts.
//!
//! [`Comm::all_reduce`]: crate::parallel::Comm::all_reduce

use num_traits::Float;
use std::ops::Range;

/// Computes `Σ a[i]·b[i]` over the full slices.
pub fn dot<T: Float + Send + Sync>(a: &[T], b: &[T]) -> T {
    assert_eq!(a.len(), b.len(), "Vectors must have the same length");
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        a.par_iter()
            .zip(b.par_iter())
            .map(|(ai, bi)| *ai * *bi)
            .reduce(|| T::zero(), |acc, v| acc + v)
    }
    #[cfg(not(feature = "rayon"))]
    {
        dot_range(a, b, 0..a.len())
    }
}

/// Partial dot product over `range`.
pub fn dot_range<T: Float>(a: &[T], b: &[T], range: Range<usize>) -> T {
    a[range.clone()]
        .iter()
        .zip(&b[range])
        .fold(T::zero(), |acc, (&ai, &bi)| acc + ai * bi)
}

pub fn norm_squared<T: Float + Send + Sync>(a: &[T]) -> T {
    dot(a, a)
}

pub fn norm_squared_range<T: Float>(a: &[T], range: Range<usize>) -> T {
    dot_range(a, a, range)
}

/// `y[i] += a·x[i]` for every `i`.
pub fn axpy_in_place<T: Float + Send + Sync>(y: &mut [T], a: T, x: &[T]) {
    assert_eq!(x.len(), y.len(), "Vectors must have the same length");
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        y.par_iter_mut().zip(x.par_iter()).for_each(|(yi, xi)| *yi = *yi + a * *xi);
    }
    #[cfg(not(feature = "rayon"))]
    {
        let n = y.len();
        axpy_in_place_range(y, a, x, 0..n);
    }
}

/// `y[i] += a·x[i]` for `i` in `range`.
pub fn axpy_in_place_range<T: Float>(y: &mut [T], a: T, x: &[T], range: Range<usize>) {
    for (yi, &xi) in y[range.clone()].iter_mut().zip(&x[range]) {
        *yi = *yi + a * xi;
    }
}
