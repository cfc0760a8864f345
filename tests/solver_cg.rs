//! Tests for the team CG solver against dense direct solves and across reduction strategies.

use approx::assert_abs_diff_eq;
use faer::linalg::solvers::SolveCore;
use rand::Rng;
use stencil_cg::solver::{CgSolver, LinearSolver};
use stencil_cg::{
    CgOptions, CsrMatrix, Grid, GridVector, LinearOperator, Reduction, StencilError,
    StencilOptions, StoppingRule, UniformStencil, VaryingStencil,
};
use std::ops::Range;

/// Diagonal operator `y = d ⊙ x`, used to force degenerate steps.
struct Diagonal {
    grid: Grid,
    d: Vec<f64>,
}

impl LinearOperator for Diagonal {
    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn apply_range(&self, x: &[f64], y: &mut [f64], range: Range<usize>) {
        let pad = (x.len() - self.d.len()) / 2;
        for (yk, i) in y.iter_mut().zip(range) {
            *yk = self.d[i] * x[pad + i];
        }
    }
}

fn random_rhs(grid: Grid) -> GridVector {
    let mut rng = rand::thread_rng();
    GridVector::from_fn(grid, |_| rng.r#gen()).unwrap()
}

fn residual_sq<A: LinearOperator>(a: &A, x: &GridVector, b: &GridVector) -> f64 {
    let mut ax = vec![0.0; b.len()];
    a.apply(x, &mut ax).unwrap();
    ax.iter().zip(b.interior()).map(|(p, q)| (p - q) * (p - q)).sum()
}

/// Direct LU reference solution of the assembled operator.
fn direct_solve(m: &CsrMatrix, b: &GridVector) -> Vec<f64> {
    let n = b.len();
    let a = m.to_dense();
    let mut x = b.interior().to_vec();
    let lu = faer::linalg::solvers::FullPivLu::new(a.as_ref());
    let x_mat = faer::MatMut::from_column_major_slice_mut(&mut x, n, 1);
    lu.solve_in_place_with_conj(faer::Conj::No, x_mat);
    x
}

/// Test that CG on a 5×5×5 uniform grid matches a dense LU solve.
#[test]
fn cg_vs_direct_on_uniform_grid() {
    let g = Grid::cube(5).unwrap();
    let op = UniformStencil::new(g, 1.0, &StencilOptions::default()).unwrap();
    let b = random_rhs(g);
    let x0 = GridVector::zeros(g).unwrap();
    let mut x1 = GridVector::zeros(g).unwrap();
    let mut solver = CgSolver::new(1e-20, 200).with_threads(4);
    let stats = solver.solve(&op, &x0, &b, &mut x1).unwrap();
    assert!(stats.converged);
    assert!(stats.iterations <= 125);
    assert!(residual_sq(&op, &x1, &b) < 1e-18);

    let x_direct = direct_solve(&CsrMatrix::from_stencil(op.coefficients()), &b);
    for (u, v) in x1.interior().iter().zip(&x_direct) {
        assert_abs_diff_eq!(u, v, epsilon = 1e-7);
    }
}

/// Test that CG on a heterogeneous field matches a dense LU solve.
#[test]
fn cg_vs_direct_on_varying_grid() {
    let g = Grid::new(6, 5, 4).unwrap();
    let mut rng = rand::thread_rng();
    let field: Vec<f64> = (0..g.size3d()).map(|_| rng.gen_range(0.01..10.0)).collect();
    let opts = StencilOptions { h: 0.5, tau: 0.2, ..Default::default() };
    let op = VaryingStencil::new(g, &field, &opts).unwrap();
    let b = random_rhs(g);
    let x0 = random_rhs(g);
    let mut x1 = GridVector::zeros(g).unwrap();
    let opts = CgOptions { tol: 1e-22, max_iters: 2000, threads: 3, ..Default::default() };
    let mut solver = CgSolver::from_options(&opts);
    let stats = solver.solve(&op, &x0, &b, &mut x1).unwrap();
    assert!(stats.converged, "CG did not converge: {stats:?}");

    let x_direct = direct_solve(&CsrMatrix::from_stencil(op.coefficients()), &b);
    for (u, v) in x1.interior().iter().zip(&x_direct) {
        assert_abs_diff_eq!(u, v, epsilon = 1e-7);
    }
}

/// Test that starting at the exact solution takes zero iterations and leaves it untouched.
#[test]
fn exact_initial_guess_is_fixed_point() {
    let g = Grid::cube(6).unwrap();
    let op = UniformStencil::new(g, 0.5, &StencilOptions::default()).unwrap();
    let x_star = random_rhs(g);
    let mut b = GridVector::zeros(g).unwrap();
    op.apply(&x_star, b.interior_mut()).unwrap();
    for reduction in [Reduction::Tree, Reduction::Atomic] {
        let mut x1 = GridVector::zeros(g).unwrap();
        let stats = CgSolver::new(1e-14, 100)
            .with_threads(3)
            .with_reduction(reduction)
            .solve(&op, &x_star, &b, &mut x1)
            .unwrap();
        assert_eq!(stats.iterations, 0);
        assert!(stats.converged);
        assert_eq!(x1.interior(), x_star.interior());
    }
}

/// Test that tree and atomic reductions agree on iterations and solution.
#[test]
fn reduction_strategies_agree() {
    let g = Grid::new(9, 8, 7).unwrap();
    let op = UniformStencil::new(g, 3.0, &StencilOptions::default()).unwrap();
    let b = random_rhs(g);
    let x0 = GridVector::zeros(g).unwrap();
    let run = |reduction| {
        let mut x1 = GridVector::zeros(g).unwrap();
        let stats = CgSolver::new(1e-18, 1000)
            .with_threads(4)
            .with_reduction(reduction)
            .solve(&op, &x0, &b, &mut x1)
            .unwrap();
        (stats, x1)
    };
    let (tree, x_tree) = run(Reduction::Tree);
    let (atomic, x_atomic) = run(Reduction::Atomic);
    assert!(tree.converged && atomic.converged);
    assert_eq!(tree.iterations, atomic.iterations);
    assert_eq!(tree.barriers, 2 + tree.iterations * 5);
    assert_eq!(atomic.barriers, 1 + atomic.iterations * 3);
    for (u, v) in x_tree.interior().iter().zip(x_atomic.interior()) {
        assert_abs_diff_eq!(u, v, epsilon = 1e-7);
    }
}

/// Test that the solution does not depend on the team size beyond reassociation error.
#[test]
fn thread_count_does_not_change_solution() {
    let g = Grid::new(7, 6, 5).unwrap();
    let op = UniformStencil::new(g, 1.0, &StencilOptions::default()).unwrap();
    let b = random_rhs(g);
    let x0 = GridVector::zeros(g).unwrap();
    let mut reference = GridVector::zeros(g).unwrap();
    CgSolver::new(1e-20, 500).with_threads(1).solve(&op, &x0, &b, &mut reference).unwrap();
    for threads in [2, 3, 5, 8] {
        let mut x1 = GridVector::zeros(g).unwrap();
        let stats = CgSolver::new(1e-20, 500)
            .with_threads(threads)
            .with_reduction(Reduction::Atomic)
            .solve(&op, &x0, &b, &mut x1)
            .unwrap();
        assert!(stats.converged);
        for (u, v) in x1.interior().iter().zip(reference.interior()) {
            assert_abs_diff_eq!(u, v, epsilon = 1e-9);
        }
    }
}

/// Test that a vanishing curvature `pᵀAp = 0` surfaces as a degenerate step.
#[test]
fn indefinite_operator_reports_degenerate_step() {
    let g = Grid::cube(2).unwrap();
    let d = vec![1.0, -1.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0];
    let op = Diagonal { grid: g, d };
    // p = r = b = e0 + e1 gives pᵀAp = 1 - 1 = 0
    let b = GridVector::from_interior(g, &[1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
    let x0 = GridVector::zeros(g).unwrap();
    for reduction in [Reduction::Tree, Reduction::Atomic] {
        let mut x1 = GridVector::zeros(g).unwrap();
        let err = CgSolver::new(1e-12, 50)
            .with_threads(2)
            .with_reduction(reduction)
            .solve(&op, &x0, &b, &mut x1)
            .unwrap_err();
        assert_eq!(err, StencilError::DegenerateStep { iteration: 0 });
    }
}

/// Test that non-finite input is reported instead of returning NaN-poisoned output.
#[test]
fn nan_rhs_reports_degenerate_step() {
    let g = Grid::cube(3).unwrap();
    let op = UniformStencil::new(g, 1.0, &StencilOptions::default()).unwrap();
    let mut b = GridVector::zeros(g).unwrap();
    b.interior_mut()[13] = f64::NAN;
    let x0 = GridVector::zeros(g).unwrap();
    let mut x1 = GridVector::zeros(g).unwrap();
    let err = CgSolver::new(1e-12, 50).with_threads(2).solve(&op, &x0, &b, &mut x1);
    assert!(matches!(err, Err(StencilError::DegenerateStep { iteration: 0 })));
}

/// Test that running out of iterations is a normal outcome.
#[test]
fn iteration_limit_is_reported_not_raised() {
    let g = Grid::cube(8).unwrap();
    let op = UniformStencil::new(g, 10.0, &StencilOptions::default()).unwrap();
    let b = random_rhs(g);
    let x0 = GridVector::zeros(g).unwrap();
    let mut x1 = GridVector::zeros(g).unwrap();
    let stats = CgSolver::new(1e-30, 5).with_threads(4).solve(&op, &x0, &b, &mut x1).unwrap();
    assert_eq!(stats.iterations, 5);
    assert!(!stats.converged);
}

/// Test that the relative rule stops on residual reduction regardless of scale.
#[test]
fn relative_rule_is_scale_invariant() {
    let g = Grid::cube(5).unwrap();
    let op = UniformStencil::new(g, 1.0, &StencilOptions::default()).unwrap();
    let b = random_rhs(g);
    let big = GridVector::from_fn(g, |i| 1e6 * b.interior()[i]).unwrap();
    let x0 = GridVector::zeros(g).unwrap();
    let solve = |rhs: &GridVector| {
        let mut x1 = GridVector::zeros(g).unwrap();
        CgSolver::new(1e-16, 500)
            .with_threads(2)
            .with_rule(StoppingRule::Relative)
            .solve(&op, &x0, rhs, &mut x1)
            .unwrap()
    };
    let (small, large) = (solve(&b), solve(&big));
    assert!(small.converged && large.converged);
    assert!((small.iterations as i64 - large.iterations as i64).abs() <= 1);
}
