//! Convergence tracking & tolerance checks for iterative solvers.

/// How the squared residual `α = ‖r‖²` is compared with the tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoppingRule {
    /// `α < tol`
    #[default]
    Absolute,
    /// `α < tol·α₀`, or `α == 0`
    Relative,
}

/// Stopping criteria.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Convergence {
    pub tol: f64,
    pub max_iters: usize,
    pub rule: StoppingRule,
}

impl Convergence {
    /// Returns whether `res_sq` satisfies the criterion, given the initial `res0_sq`.
    pub fn is_converged(&self, res_sq: f64, res0_sq: f64) -> bool {
        match self.rule {
            StoppingRule::Absolute => res_sq < self.tol,
            StoppingRule::Relative => res_sq == 0.0 || res_sq < self.tol * res0_sq,
        }
    }
}

/// Outcome of one linear solve.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveStats {
    /// Completed iterations; equals the limit when the solve ran out of iterations
    pub iterations: usize,
    /// Squared residual norm at exit
    pub residual_sq: f64,
    pub initial_residual_sq: f64,
    pub converged: bool,
    /// Barrier waits per team member
    pub barriers: usize,
}

/// Outcome of one nonlinear time step.
#[derive(Clone, Debug, PartialEq)]
pub struct StepStats {
    /// Fixed-point refreshes after the initial linear solve
    pub steps: usize,
    /// Inner CG iterations summed over all linear solves
    pub solver_iterations: usize,
    /// Squared nonlinear residual `‖A(x)x - y‖²` at exit
    pub residual_sq: f64,
    pub converged: bool,
}
