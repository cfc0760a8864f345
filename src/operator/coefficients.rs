//! Precomputed 7-point stencil coefficients.
//!
//! Each neighbour direction owns its own coefficient array of `size3d` entries; the upper
//! arrays are not aliased onto the lower ones. A coefficient is zero wherever the neighbour
//! lies outside the grid, and the diagonal is `1 + Σ neighbour coefficients`. This encodes
//! the no-flux boundary so that [`StencilCoefficients::apply_range`] runs without branches.

use crate::core::vector::try_zeroed;
use crate::error::StencilError;
use crate::grid::{Axis, Direction, Grid};
use crate::parallel::par_fill;
use std::ops::Range;

/// Effective interface conductivity `2ab/(a+b)`.
///
/// Returns zero when `a + b <= epsilon`, so two non-conducting cells never divide by zero.
pub fn harmonic_mean(a: f64, b: f64, epsilon: f64) -> f64 {
    let sum = a + b;
    if sum <= epsilon { 0.0 } else { 2.0 * a * b / sum }
}

/// One assembled row of the implicit matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct StencilRow {
    pub diagonal: f64,
    /// `(column, coefficient)` pairs in ascending column order; entries enter the matrix
    /// with a negative sign.
    pub neighbors: Vec<(usize, f64)>,
}

#[derive(Debug, Clone)]
pub struct StencilCoefficients {
    grid: Grid,
    diag: Vec<f64>,
    lower: [Vec<f64>; 3],
    upper: [Vec<f64>; 3],
}

impl StencilCoefficients {
    /// All-zero coefficients (the zero operator).
    pub fn zeros(grid: Grid) -> Result<Self, StencilError> {
        let n = grid.size3d();
        Ok(Self {
            grid,
            diag: try_zeroed(n)?,
            lower: [try_zeroed(n)?, try_zeroed(n)?, try_zeroed(n)?],
            upper: [try_zeroed(n)?, try_zeroed(n)?, try_zeroed(n)?],
        })
    }

    /// Build coefficients from an interface rule: `face(i, j)` is the coefficient coupling
    /// cell `i` with its upper neighbour `j`.
    pub fn from_interfaces<F>(grid: Grid, face: F) -> Result<Self, StencilError>
    where
        F: Fn(usize, usize) -> f64 + Sync + Send,
    {
        let mut coeffs = Self::zeros(grid)?;
        coeffs.refresh(face);
        Ok(coeffs)
    }

    /// Recompute every coefficient in place from `face`; nothing is reallocated.
    pub fn refresh<F>(&mut self, face: F)
    where
        F: Fn(usize, usize) -> f64 + Sync + Send,
    {
        let Self { grid, diag, lower, upper } = self;
        let grid = *grid;
        for axis in Axis::ALL {
            par_fill(&mut lower[axis.index()], |i| {
                grid.neighbor(i, axis.lower()).map_or(0.0, |j| face(j, i))
            });
            par_fill(&mut upper[axis.index()], |i| {
                grid.neighbor(i, axis.upper()).map_or(0.0, |j| face(i, j))
            });
        }
        let (lower, upper) = (&*lower, &*upper);
        par_fill(diag, |i| {
            1.0 + lower.iter().chain(upper.iter()).map(|c| c[i]).sum::<f64>()
        });
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn diagonal(&self) -> &[f64] {
        &self.diag
    }

    pub fn lower(&self, axis: Axis) -> &[f64] {
        &self.lower[axis.index()]
    }

    pub fn upper(&self, axis: Axis) -> &[f64] {
        &self.upper[axis.index()]
    }

    /// Coefficient coupling cell `i` to its neighbour in `dir` (zero across the boundary).
    pub fn coefficient(&self, i: usize, dir: Direction) -> f64 {
        let axis = dir.axis();
        if dir.is_upper() { self.upper[axis.index()][i] } else { self.lower[axis.index()][i] }
    }

    pub fn row(&self, i: usize) -> StencilRow {
        StencilRow {
            diagonal: self.diag[i],
            neighbors: self
                .grid
                .neighbors(i)
                .map(|(dir, j)| (j, self.coefficient(i, dir)))
                .collect(),
        }
    }

    /// `y[i - range.start] = diag[i]·x[i] - Σ_d coeff_d[i]·x[i + offset_d]` over `range`.
    ///
    /// `x` is padded as described in [`LinearOperator::apply_range`].
    ///
    /// [`LinearOperator::apply_range`]: crate::core::traits::LinearOperator::apply_range
    pub fn apply_range(&self, x: &[f64], y: &mut [f64], range: Range<usize>) {
        let n = self.grid.size3d();
        let s1 = self.grid.size1d();
        let s2 = self.grid.size2d();
        debug_assert!(x.len() >= n + 2 * s2, "state vector lacks ghost layers");
        debug_assert_eq!(y.len(), range.len());
        let pad = (x.len() - n) / 2;
        let [cl, rl, ll] = &self.lower;
        let [cu, ru, lu] = &self.upper;
        for (yk, i) in y.iter_mut().zip(range) {
            let c = pad + i;
            *yk = self.diag[i] * x[c]
                - ll[i] * x[c - s2]
                - rl[i] * x[c - s1]
                - cl[i] * x[c - 1]
                - cu[i] * x[c + 1]
                - ru[i] * x[c + s1]
                - lu[i] * x[c + s2];
        }
    }
}
