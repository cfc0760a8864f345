//! stencil-cg: matrix-free conjugate gradient for 3D stencil diffusion operators
//!
//! The crate solves the sparse systems produced by a backward-Euler step of a diffusion
//! equation on a structured grid. Operators are never assembled; they apply precomputed
//! per-direction coefficients to ghost-padded vectors. The CG solver runs on a
//! barrier-synchronised thread team, with tree or atomic reductions, and a Picard driver
//! handles state-dependent diffusivities.

pub mod parallel;

pub mod config;
pub mod core;
pub mod error;
pub mod grid;
pub mod matrix;
pub mod operator;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use crate::core::{GridVector, LinearOperator, NonlinearOperator};
pub use config::{CgOptions, StencilOptions};
pub use error::StencilError;
pub use grid::{Axis, Direction, Faces, Grid};
pub use matrix::{CsrMatrix, SparseMatrix};
pub use operator::{
    Exponential, Identity, NonlinearStencil, PowerLaw, Scale, StateTransform,
    StencilCoefficients, UniformStencil, VaryingStencil,
};
pub use parallel::{Comm, Reduction, Team, ThreadComm};
pub use solver::{CgSolver, LinearSolver, PicardDriver};

// Re-export the stats types at the crate root for convenience
pub use utils::convergence::{SolveStats, StepStats, StoppingRule};
