//! Iterative solver interfaces.

use crate::core::vector::GridVector;
use crate::utils::convergence::SolveStats;

/// Common interface for iterative solvers of `A x = b` over an operator `A`.
pub trait LinearSolver<A: ?Sized> {
    type Error;
    /// Solve `A·x1 = b` starting from `x0`, writing the result into `x1`.
    /// Returns iteration stats (including convergence info).
    fn solve(
        &mut self,
        a: &A,
        x0: &GridVector,
        b: &GridVector,
        x1: &mut GridVector,
    ) -> Result<SolveStats, Self::Error>;
}

pub mod cg;
pub use cg::CgSolver;

pub mod picard;
pub use picard::PicardDriver;
