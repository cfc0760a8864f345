use crate::grid::Grid;
use thiserror::Error;

// Unified error type for stencil-cg

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StencilError {
    #[error("invalid grid {cols}x{rows}x{levels}: every dimension must be at least 2")]
    InvalidGrid { cols: usize, rows: usize, levels: usize },
    #[error("dimension mismatch: expected {expected} values, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("grid mismatch: expected {expected}, found {found}")]
    GridMismatch { expected: Grid, found: Grid },
    #[error("ghost padding too small: need at least {required} cells, found {found}")]
    BufferTooSmall { required: usize, found: usize },
    #[error("degenerate CG step at iteration {iteration} (p^T A p is zero or not finite)")]
    DegenerateStep { iteration: usize },
    #[error("allocation failed: {0}")]
    Allocation(String),
    #[error("invalid option: {0}")]
    InvalidOption(&'static str),
}
