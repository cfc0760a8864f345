//! Matrix module: assembled sparse form of stencil operators.

pub mod sparse;
pub use sparse::{CsrMatrix, SparseMatrix};
