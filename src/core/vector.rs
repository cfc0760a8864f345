//! Padded grid functions.
//!
//! A [`GridVector`] stores `size3d` cell values framed by `pad` zero-valued ghost cells on
//! each side. With `pad >= size2d` every stencil access `i ± size2d` stays in bounds, so
//! the operator hot loop needs no boundary branches. Ghost cells are never exposed mutably.

use crate::error::StencilError;
use crate::grid::Grid;

/// Length of a buffer holding `grid` with `pad` ghost cells per side.
pub(crate) fn padded_len(grid: &Grid, pad: usize) -> Result<usize, StencilError> {
    pad.checked_mul(2)
        .and_then(|ghosts| ghosts.checked_add(grid.size3d()))
        .ok_or_else(|| {
            StencilError::Allocation(format!("{grid} grid with {pad} ghost cells overflows usize"))
        })
}

/// Allocate `len` zeros, reporting allocation failure instead of aborting.
pub(crate) fn try_zeroed(len: usize) -> Result<Vec<f64>, StencilError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|e| StencilError::Allocation(format!("{len} values: {e}")))?;
    v.resize(len, 0.0);
    Ok(v)
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridVector {
    grid: Grid,
    pad: usize,
    data: Vec<f64>,
}

impl GridVector {
    /// All-zero vector with the minimal ghost layer (`size2d` cells per side).
    pub fn zeros(grid: Grid) -> Result<Self, StencilError> {
        Self::with_padding(grid, grid.size2d())
    }

    /// All-zero vector with `pad` ghost cells per side; `pad` must be at least `size2d`.
    pub fn with_padding(grid: Grid, pad: usize) -> Result<Self, StencilError> {
        if pad < grid.size2d() {
            return Err(StencilError::BufferTooSmall { required: grid.size2d(), found: pad });
        }
        let data = try_zeroed(padded_len(&grid, pad)?)?;
        Ok(Self { grid, pad, data })
    }

    /// Wrap interior values (length `size3d`) with a minimal ghost layer.
    pub fn from_interior(grid: Grid, values: &[f64]) -> Result<Self, StencilError> {
        if values.len() != grid.size3d() {
            return Err(StencilError::DimensionMismatch {
                expected: grid.size3d(),
                found: values.len(),
            });
        }
        let mut v = Self::zeros(grid)?;
        v.interior_mut().copy_from_slice(values);
        Ok(v)
    }

    /// Fill cell `i` with `f(i)`.
    pub fn from_fn(grid: Grid, f: impl FnMut(usize) -> f64) -> Result<Self, StencilError> {
        let mut v = Self::zeros(grid)?;
        v.interior_mut()
            .iter_mut()
            .zip((0..grid.size3d()).map(f))
            .for_each(|(dst, val)| *dst = val);
        Ok(v)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Ghost cells on each side of the interior.
    pub fn pad(&self) -> usize {
        self.pad
    }

    pub fn len(&self) -> usize {
        self.grid.size3d()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn interior(&self) -> &[f64] {
        &self.data[self.pad..self.pad + self.grid.size3d()]
    }

    pub fn interior_mut(&mut self) -> &mut [f64] {
        let n = self.grid.size3d();
        &mut self.data[self.pad..self.pad + n]
    }

    /// Interior plus ghost layers, as consumed by [`LinearOperator::apply_range`].
    ///
    /// [`LinearOperator::apply_range`]: crate::core::traits::LinearOperator::apply_range
    pub fn padded(&self) -> &[f64] {
        &self.data
    }

    /// Copy the interior of `other`; ghost widths may differ.
    pub fn copy_from(&mut self, other: &GridVector) -> Result<(), StencilError> {
        if other.grid != self.grid {
            return Err(StencilError::GridMismatch { expected: self.grid, found: other.grid });
        }
        self.interior_mut().copy_from_slice(other.interior());
        Ok(())
    }

    pub fn fill(&mut self, value: f64) {
        self.interior_mut().fill(value);
    }

    pub fn into_interior(self) -> Vec<f64> {
        let n = self.grid.size3d();
        let mut data = self.data;
        data.truncate(self.pad + n);
        data.drain(..self.pad);
        data
    }
}

impl AsRef<[f64]> for GridVector {
    fn as_ref(&self) -> &[f64] {
        self.interior()
    }
}

impl AsMut<[f64]> for GridVector {
    fn as_mut(&mut self) -> &mut [f64] {
        self.interior_mut()
    }
}
