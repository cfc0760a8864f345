//! Core operator traits for stencil-cg.

use crate::core::vector::GridVector;
use crate::error::StencilError;
use crate::grid::Grid;
use std::ops::Range;

/// Implicit matrix–vector product `y ← A x` over a structured grid.
///
/// Implementations hold no mutable state while applying, so cooperating threads may call
/// [`apply_range`](LinearOperator::apply_range) concurrently on disjoint ranges.
pub trait LinearOperator: Sync {
    fn grid(&self) -> &Grid;

    /// Compute `(A x)[i]` for every `i` in `range`, writing it to `y[i - range.start]`.
    ///
    /// `x` is a padded buffer of `size3d + 2·pad` values with `pad ≥ size2d`, holding cell
    /// `i` at `x[pad + i]` and zeros in the ghost cells (see [`GridVector::padded`]).
    fn apply_range(&self, x: &[f64], y: &mut [f64], range: Range<usize>);

    /// Compute `y = A x` over the whole grid.
    fn apply(&self, x: &GridVector, y: &mut [f64]) -> Result<(), StencilError> {
        let n = self.grid().size3d();
        if x.grid() != self.grid() {
            return Err(StencilError::GridMismatch { expected: *self.grid(), found: *x.grid() });
        }
        if y.len() != n {
            return Err(StencilError::DimensionMismatch { expected: n, found: y.len() });
        }
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            let chunk = n.div_ceil(rayon::current_num_threads()).max(1);
            y.par_chunks_mut(chunk).enumerate().for_each(|(k, part)| {
                let start = k * chunk;
                self.apply_range(x.padded(), part, start..start + part.len());
            });
        }
        #[cfg(not(feature = "rayon"))]
        {
            self.apply_range(x.padded(), y, 0..n);
        }
        Ok(())
    }
}

/// An operator whose coefficients depend on a state field.
pub trait NonlinearOperator: LinearOperator {
    /// Recompute the coefficients from `state` in place. Must not run concurrently with
    /// [`LinearOperator::apply_range`]; `&mut self` enforces this.
    fn set_state(&mut self, state: &GridVector) -> Result<(), StencilError>;
}
