// SparseMatrix trait and the assembled CSR form of a stencil operator

use crate::core::traits::LinearOperator;
use crate::error::StencilError;
use crate::operator::StencilCoefficients;
use faer::Mat;

/// A read-only sparse matrix supporting y = A * x.
pub trait SparseMatrix<T> {
    /// Number of rows.
    fn nrows(&self) -> usize;
    /// Number of columns.
    fn ncols(&self) -> usize;
    /// Compute y = A * x.  `x.len() == ncols()`, `y.len() == nrows()`.
    fn spmv(&self, x: &[T], y: &mut [T]);
}

/// Explicitly assembled stencil matrix.
///
/// Operators never need this; it exists to cross-check the implicit apply and to hand
/// small problems to a dense reference solver.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    n: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Assemble `A` from precomputed coefficients. Columns within a row are sorted and
    /// zero neighbour couplings are dropped.
    pub fn from_stencil(coeffs: &StencilCoefficients) -> Self {
        let n = coeffs.grid().size3d();
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::with_capacity(7 * n);
        let mut values = Vec::with_capacity(7 * n);
        row_ptr.push(0);
        for i in 0..n {
            let row = coeffs.row(i);
            let mut entries: Vec<(usize, f64)> = row
                .neighbors
                .iter()
                .filter(|&&(_, c)| c != 0.0)
                .map(|&(j, c)| (j, -c))
                .collect();
            entries.push((i, row.diagonal));
            entries.sort_unstable_by_key(|&(j, _)| j);
            for (j, v) in entries {
                col_idx.push(j);
                values.push(v);
            }
            row_ptr.push(col_idx.len());
        }
        Self { n, row_ptr, col_idx, values }
    }

    /// Assemble by probing `op` with unit vectors. Quadratic in the grid size; meant for
    /// tests on small grids and for operators that do not expose their coefficients.
    pub fn from_operator<A: LinearOperator + ?Sized>(op: &A) -> Result<Self, StencilError> {
        let grid = *op.grid();
        let n = grid.size3d();
        let mut e = crate::core::vector::GridVector::zeros(grid)?;
        let mut column = vec![0.0; n];
        let mut triplets: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for j in 0..n {
            e.interior_mut()[j] = 1.0;
            op.apply(&e, &mut column)?;
            e.interior_mut()[j] = 0.0;
            for (i, &v) in column.iter().enumerate() {
                if v != 0.0 {
                    triplets[i].push((j, v));
                }
            }
        }
        let mut row_ptr = Vec::with_capacity(n + 1);
        let (mut col_idx, mut values) = (Vec::new(), Vec::new());
        row_ptr.push(0);
        for row in triplets {
            for (j, v) in row {
                col_idx.push(j);
                values.push(v);
            }
            row_ptr.push(col_idx.len());
        }
        Ok(Self { n, row_ptr, col_idx, values })
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Entry `(i, j)`, zero if not stored.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let (start, end) = (self.row_ptr[i], self.row_ptr[i + 1]);
        match self.col_idx[start..end].binary_search(&j) {
            Ok(k) => self.values[start + k],
            Err(_) => 0.0,
        }
    }

    /// Sum of row `i`.
    pub fn row_sum(&self, i: usize) -> f64 {
        self.values[self.row_ptr[i]..self.row_ptr[i + 1]].iter().sum()
    }

    fn row_dot(&self, i: usize, x: &[f64]) -> f64 {
        let (start, end) = (self.row_ptr[i], self.row_ptr[i + 1]);
        self.col_idx[start..end]
            .iter()
            .zip(&self.values[start..end])
            .map(|(&j, &v)| v * x[j])
            .sum()
    }

    /// Dense copy for reference solves.
    pub fn to_dense(&self) -> Mat<f64> {
        Mat::from_fn(self.n, self.n, |i, j| self.get(i, j))
    }
}

impl SparseMatrix<f64> for CsrMatrix {
    fn nrows(&self) -> usize {
        self.n
    }
    fn ncols(&self) -> usize {
        self.n
    }
    fn spmv(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.ncols());
        assert_eq!(y.len(), self.nrows());
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = self.row_dot(i, x);
        }
    }
}

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "rayon")]
impl CsrMatrix {
    /// Parallel SpMV using Rayon
    pub fn spmv_parallel(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.ncols());
        assert_eq!(y.len(), self.nrows());
        y.par_iter_mut().enumerate().for_each(|(i, yi)| *yi = self.row_dot(i, x));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StencilOptions;
    use crate::grid::Grid;
    use crate::operator::UniformStencil;

    #[test]
    fn corner_row_of_unit_cube() {
        // 2×2×2: every cell is a corner with three neighbours
        let g = Grid::cube(2).unwrap();
        let op = UniformStencil::new(g, 1.0, &StencilOptions::default()).unwrap();
        let m = CsrMatrix::from_stencil(op.coefficients());
        assert_eq!(m.nnz(), 8 * 4);
        assert_eq!(m.row_ptr()[1], 4);
        assert_eq!(&m.col_idx()[..4], &[0, 1, 2, 4]);
        assert_eq!(&m.values()[..4], &[4.0, -1.0, -1.0, -1.0]);
        assert_eq!(m.get(0, 7), 0.0);
        assert_eq!(m.row_sum(0), 1.0);
    }

    #[test]
    fn probing_matches_assembly() {
        let g = Grid::new(3, 2, 2).unwrap();
        let op = UniformStencil::new(g, 0.4, &StencilOptions::default()).unwrap();
        assert_eq!(
            CsrMatrix::from_operator(&op).unwrap(),
            CsrMatrix::from_stencil(op.coefficients())
        );
    }

    #[test]
    fn simple_spmv() {
        let g = Grid::cube(3).unwrap();
        let op = UniformStencil::new(g, 1.0, &StencilOptions::default()).unwrap();
        let m = CsrMatrix::from_stencil(op.coefficients());
        let x = vec![1.0; 27];
        let mut y = vec![0.0; 27];
        m.spmv(&x, &mut y);
        assert!(y.iter().all(|&v| (v - 1.0).abs() < 1e-14));
    }
}
