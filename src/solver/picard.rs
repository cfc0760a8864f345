//! Picard (fixed-point) driver for one implicit step of a nonlinear diffusion problem.
//!
//! Given the previous state `y`, the driver looks for `x` with `A(x) x = y`:
//!
//! ```text
//! A ← A(y);  solve A x₁ = y from x₀ = y
//! A ← A(x₁); res = ‖A x₁ - y‖²
//! while steps < max_steps && res ≥ tol:
//!     solve A x_{k+1} = y from x_k
//!     A ← A(x_{k+1}); res = ‖A x_{k+1} - y‖²
//! ```
//!
//! The residual is measured with the operator refreshed to the iterate it is evaluated at,
//! so it is the true nonlinear residual of that iterate.

use crate::core::primitives::{axpy_in_place, norm_squared};
use crate::core::traits::NonlinearOperator;
use crate::core::vector::{GridVector, try_zeroed};
use crate::error::StencilError;
use crate::solver::LinearSolver;
use crate::utils::convergence::StepStats;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PicardDriver {
    /// Tolerance on the squared nonlinear residual
    pub tol: f64,
    /// Fixed-point refreshes allowed after the first solve
    pub max_steps: usize,
}

impl Default for PicardDriver {
    fn default() -> Self {
        Self { tol: 1e-10, max_steps: 50 }
    }
}

impl PicardDriver {
    pub fn new(tol: f64, max_steps: usize) -> Self {
        Self { tol, max_steps }
    }

    /// Advance the state `y` by one implicit step, writing the new state to `x`.
    ///
    /// On return the operator's coefficients correspond to `x`.
    pub fn advance<S, A>(
        &self,
        solver: &mut S,
        op: &mut A,
        y: &GridVector,
        x: &mut GridVector,
    ) -> Result<StepStats, StencilError>
    where
        A: NonlinearOperator,
        S: LinearSolver<A, Error = StencilError>,
    {
        let grid = *op.grid();
        for v in [y, &*x] {
            if v.grid() != &grid {
                return Err(StencilError::GridMismatch { expected: grid, found: *v.grid() });
            }
        }
        let mut scratch = try_zeroed(grid.size3d())?;
        let mut prev = GridVector::zeros(grid)?;
        let mut next = GridVector::zeros(grid)?;

        op.set_state(y)?;
        let mut solver_iterations = solver.solve(op, y, y, &mut next)?.iterations;
        op.set_state(&next)?;
        let mut res = nonlinear_residual(op, &next, y, &mut scratch)?;
        debug!("Picard step 0: ||A(x)x - y||^2 = {res:.6e}");

        let mut steps = 0;
        while steps < self.max_steps && !(res < self.tol) {
            std::mem::swap(&mut prev, &mut next);
            solver_iterations += solver.solve(op, &prev, y, &mut next)?.iterations;
            op.set_state(&next)?;
            res = nonlinear_residual(op, &next, y, &mut scratch)?;
            steps += 1;
            debug!("Picard step {steps}: ||A(x)x - y||^2 = {res:.6e}");
        }

        let converged = res < self.tol;
        if !converged {
            warn!("Picard: step limit {} reached, ||A(x)x - y||^2 = {res:.6e}", self.max_steps);
        }
        x.copy_from(&next)?;
        Ok(StepStats { steps, solver_iterations, residual_sq: res, converged })
    }
}

/// `‖A x - y‖²`, using `z` as scratch.
fn nonlinear_residual<A: NonlinearOperator>(
    op: &A,
    x: &GridVector,
    y: &GridVector,
    z: &mut [f64],
) -> Result<f64, StencilError> {
    op.apply(x, z)?;
    axpy_in_place(z, -1.0, y.interior());
    Ok(norm_squared(z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::LinearOperator;
    use crate::config::StencilOptions;
    use crate::grid::Grid;
    use crate::operator::NonlinearStencil;
    use crate::operator::transform::{PowerLaw, Scale};
    use crate::solver::CgSolver;

    #[test]
    fn zero_state_is_its_own_fixed_point() {
        // zero state, zero diffusivity: the operator is the identity and y is the fixed point
        let g = Grid::cube(4).unwrap();
        let y = GridVector::zeros(g).unwrap();
        let mut op = NonlinearStencil::new(Scale(1.0), &y, &StencilOptions::default()).unwrap();
        let mut x = GridVector::zeros(g).unwrap();
        let mut cg = CgSolver::new(1e-24, 200).with_threads(2);
        let stats = PicardDriver::new(1e-20, 10).advance(&mut cg, &mut op, &y, &mut x).unwrap();
        assert_eq!(stats.steps, 0);
        assert_eq!(stats.solver_iterations, 0);
        assert!(stats.converged);
    }

    #[test]
    fn quadratic_law_reaches_fixed_point() {
        let g = Grid::cube(5).unwrap();
        let y = GridVector::from_fn(g, |i| 0.2 + 0.1 * ((i % 5) as f64)).unwrap();
        let opts = StencilOptions { tau: 0.1, ..Default::default() };
        let mut op = NonlinearStencil::new(PowerLaw(2.0), &y, &opts).unwrap();
        let mut x = GridVector::zeros(g).unwrap();
        let mut cg = CgSolver::new(1e-26, 1000).with_threads(2);
        let driver = PicardDriver::new(1e-18, 100);
        let stats = driver.advance(&mut cg, &mut op, &y, &mut x).unwrap();
        assert!(stats.converged, "Picard did not converge: {stats:?}");
        assert!(stats.steps > 0);

        // the operator is left at A(x), so A(x)x = y holds to tolerance
        let mut z = vec![0.0; g.size3d()];
        op.apply(&x, &mut z).unwrap();
        let res: f64 = z.iter().zip(y.interior()).map(|(a, b)| (a - b) * (a - b)).sum();
        assert!(res < 1e-18);
        approx::assert_abs_diff_eq!(res, stats.residual_sq, epsilon = 1e-20);
    }

    #[test]
    fn step_limit_reports_non_convergence() {
        let g = Grid::cube(4).unwrap();
        let y = GridVector::from_fn(g, |i| 1.0 + (i % 3) as f64).unwrap();
        let opts = StencilOptions { tau: 0.5, ..Default::default() };
        let mut op = NonlinearStencil::new(PowerLaw(3.0), &y, &opts).unwrap();
        let mut x = GridVector::zeros(g).unwrap();
        let mut cg = CgSolver::new(1e-24, 500).with_threads(1);
        let stats = PicardDriver::new(1e-40, 2).advance(&mut cg, &mut op, &y, &mut x).unwrap();
        assert_eq!(stats.steps, 2);
        assert!(!stats.converged);
    }
}
