//! Option structs for operators and solvers.

pub mod options;
pub use options::{CgOptions, StencilOptions};
