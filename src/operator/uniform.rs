//! Constant-diffusivity stencil.

use super::coefficients::StencilCoefficients;
use crate::config::StencilOptions;
use crate::core::traits::LinearOperator;
use crate::error::StencilError;
use crate::grid::Grid;
use std::ops::Range;

/// Backward-Euler diffusion operator `I - τ c Δ_h` with one scalar diffusivity `c`.
///
/// Every interior interface carries the coefficient `c·τ/h²`.
#[derive(Debug, Clone)]
pub struct UniformStencil {
    factor: f64,
    coeffs: StencilCoefficients,
}

impl UniformStencil {
    pub fn new(grid: Grid, c: f64, opts: &StencilOptions) -> Result<Self, StencilError> {
        opts.validate()?;
        if !(c >= 0.0 && c.is_finite()) {
            return Err(StencilError::InvalidOption("diffusivity must be non-negative and finite"));
        }
        let factor = c * opts.factor();
        let coeffs = StencilCoefficients::from_interfaces(grid, |_, _| factor)?;
        Ok(Self { factor, coeffs })
    }

    /// Neighbour coefficient `c·τ/h²`.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn coefficients(&self) -> &StencilCoefficients {
        &self.coeffs
    }
}

impl LinearOperator for UniformStencil {
    fn grid(&self) -> &Grid {
        self.coeffs.grid()
    }

    fn apply_range(&self, x: &[f64], y: &mut [f64], range: Range<usize>) {
        self.coeffs.apply_range(x, y, range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vector::GridVector;
    use crate::grid::Direction;

    #[test]
    fn corner_and_centre_rows() {
        let g = Grid::cube(3).unwrap();
        let op = UniformStencil::new(g, 2.0, &StencilOptions { h: 2.0, ..Default::default() })
            .unwrap();
        assert_eq!(op.factor(), 0.5);
        let c = op.coefficients();
        assert_eq!(c.diagonal()[0], 1.0 + 3.0 * 0.5);
        assert_eq!(c.diagonal()[g.index(1, 1, 1)], 1.0 + 6.0 * 0.5);
        assert_eq!(c.coefficient(0, Direction::ColLower), 0.0);
        assert_eq!(c.coefficient(0, Direction::LevelUpper), 0.5);
    }

    #[test]
    fn constant_field_is_preserved() {
        // rows sum to one, so constants are fixed points
        let g = Grid::new(4, 5, 3).unwrap();
        let op = UniformStencil::new(g, 1.3, &StencilOptions::default()).unwrap();
        let x = GridVector::from_fn(g, |_| 2.5).unwrap();
        let mut y = vec![0.0; g.size3d()];
        op.apply(&x, &mut y).unwrap();
        for v in y {
            approx::assert_abs_diff_eq!(v, 2.5, epsilon = 1e-13);
        }
    }

    #[test]
    fn rejects_negative_diffusivity() {
        let g = Grid::cube(2).unwrap();
        assert!(UniformStencil::new(g, -1.0, &StencilOptions::default()).is_err());
    }
}
