//! Spatially varying diffusivity.

use super::coefficients::{StencilCoefficients, harmonic_mean};
use crate::config::StencilOptions;
use crate::core::traits::LinearOperator;
use crate::error::StencilError;
use crate::grid::Grid;
use std::ops::Range;

/// Diffusion operator with a per-cell diffusivity field `c`.
///
/// The interface between neighbours `i` and `j` carries `τ/h² · 2 c_i c_j / (c_i + c_j)`.
#[derive(Debug, Clone)]
pub struct VaryingStencil {
    coeffs: StencilCoefficients,
}

impl VaryingStencil {
    pub fn new(grid: Grid, field: &[f64], opts: &StencilOptions) -> Result<Self, StencilError> {
        opts.validate()?;
        if field.len() != grid.size3d() {
            return Err(StencilError::DimensionMismatch {
                expected: grid.size3d(),
                found: field.len(),
            });
        }
        let (factor, eps) = (opts.factor(), opts.epsilon);
        let coeffs = StencilCoefficients::from_interfaces(grid, |i, j| {
            factor * harmonic_mean(field[i], field[j], eps)
        })?;
        Ok(Self { coeffs })
    }

    pub fn coefficients(&self) -> &StencilCoefficients {
        &self.coeffs
    }
}

impl LinearOperator for VaryingStencil {
    fn grid(&self) -> &Grid {
        self.coeffs.grid()
    }

    fn apply_range(&self, x: &[f64], y: &mut [f64], range: Range<usize>) {
        self.coeffs.apply_range(x, y, range);
    }
}
