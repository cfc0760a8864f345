//! API options for stencil operators and the CG solver.
//!
//! `StencilOptions` fixes the discretisation (mesh width `h`, time step `tau`) and the
//! harmonic-mean guard `epsilon`. `CgOptions` bundles the solver knobs: squared residual
//! tolerance, iteration limit, team size, reduction strategy and stopping rule.

use crate::error::StencilError;
use crate::parallel::Reduction;
use crate::utils::convergence::StoppingRule;

/// Discretisation parameters shared by all stencil operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StencilOptions {
    /// Mesh width h
    pub h: f64,

    /// Time step τ
    pub tau: f64,

    /// Harmonic-mean guard: interfaces with `c_i + c_j <= epsilon` get a zero coefficient
    pub epsilon: f64,
}

impl Default for StencilOptions {
    fn default() -> Self {
        Self { h: 1.0, tau: 1.0, epsilon: 1e-15 }
    }
}

impl StencilOptions {
    /// Scale `τ/h²` applied to every neighbour coefficient.
    pub fn factor(&self) -> f64 {
        self.tau / (self.h * self.h)
    }

    pub fn validate(&self) -> Result<(), StencilError> {
        if !(self.h > 0.0 && self.h.is_finite()) {
            return Err(StencilError::InvalidOption("h must be positive and finite"));
        }
        if !(self.tau > 0.0 && self.tau.is_finite()) {
            return Err(StencilError::InvalidOption("tau must be positive and finite"));
        }
        if !(self.epsilon >= 0.0) {
            return Err(StencilError::InvalidOption("epsilon must be non-negative"));
        }
        Ok(())
    }
}

/// Conjugate gradient parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CgOptions {
    /// Tolerance compared against the squared residual norm
    pub tol: f64,

    /// Iteration limit
    pub max_iters: usize,

    /// Threads in the solver team
    pub threads: usize,

    /// How the team combines dot products
    pub reduction: Reduction,

    /// Absolute or relative stopping test
    pub rule: StoppingRule,
}

impl Default for CgOptions {
    fn default() -> Self {
        Self {
            tol: 1e-15,
            max_iters: 1_000_000,
            threads: num_cpus::get(),
            reduction: Reduction::Tree,
            rule: StoppingRule::Absolute,
        }
    }
}
