//! State-dependent diffusivity.

use super::coefficients::{StencilCoefficients, harmonic_mean};
use super::transform::StateTransform;
use crate::config::StencilOptions;
use crate::core::traits::{LinearOperator, NonlinearOperator};
use crate::core::vector::{GridVector, try_zeroed};
use crate::error::StencilError;
use crate::grid::Grid;
use crate::parallel::par_fill;
use std::ops::Range;

/// Diffusion operator whose diffusivity is `F(s)` for the current state `s`.
///
/// [`set_state`](NonlinearOperator::set_state) evaluates the transform once per cell into an
/// owned scratch field, then refreshes the harmonic-mean coefficients in place. The
/// operator keeps no reference to the state it was given.
#[derive(Debug, Clone)]
pub struct NonlinearStencil<F> {
    transform: F,
    factor: f64,
    epsilon: f64,
    diffusivity: Vec<f64>,
    coeffs: StencilCoefficients,
}

impl<F: StateTransform> NonlinearStencil<F> {
    pub fn new(
        transform: F,
        state: &GridVector,
        opts: &StencilOptions,
    ) -> Result<Self, StencilError> {
        opts.validate()?;
        let grid = *state.grid();
        let mut op = Self {
            transform,
            factor: opts.factor(),
            epsilon: opts.epsilon,
            diffusivity: try_zeroed(grid.size3d())?,
            coeffs: StencilCoefficients::zeros(grid)?,
        };
        op.set_state(state)?;
        Ok(op)
    }

    pub fn transform(&self) -> &F {
        &self.transform
    }

    /// Diffusivity `F(s)` of the current state.
    pub fn diffusivity(&self) -> &[f64] {
        &self.diffusivity
    }

    pub fn coefficients(&self) -> &StencilCoefficients {
        &self.coeffs
    }
}

impl<F: StateTransform> LinearOperator for NonlinearStencil<F> {
    fn grid(&self) -> &Grid {
        self.coeffs.grid()
    }

    fn apply_range(&self, x: &[f64], y: &mut [f64], range: Range<usize>) {
        self.coeffs.apply_range(x, y, range);
    }
}

impl<F: StateTransform> NonlinearOperator for NonlinearStencil<F> {
    fn set_state(&mut self, state: &GridVector) -> Result<(), StencilError> {
        if state.grid() != self.coeffs.grid() {
            return Err(StencilError::GridMismatch {
                expected: *self.coeffs.grid(),
                found: *state.grid(),
            });
        }
        let Self { transform, factor, epsilon, diffusivity, coeffs } = self;
        let (transform, s) = (&*transform, state.interior());
        par_fill(diffusivity, |i| transform.apply(s[i]));
        let (d, factor, eps) = (&*diffusivity, *factor, *epsilon);
        coeffs.refresh(|i, j| factor * harmonic_mean(d[i], d[j], eps));
        Ok(())
    }
}
