//! Conjugate Gradient (unpreconditioned) on a barrier-synchronised thread team.
//!
//! Every team member owns the contiguous partition `comm.range(n)` of each vector and runs
//! the same iteration:
//!
//! ```text
//! r = b - A x0;  p = r;  x1 = x0;  α = ‖r‖²                      reduction
//! while k < max_iters && !converged(α):
//!     v = A p            (own rows; reads all of p)
//!     σ = (v, p)                                                   reduction
//!     σ == 0 or not finite → DegenerateStep
//!     λ = α / σ
//!     x1 += λ p;  r -= λ v;  α' = ‖r‖²                             reduction
//!     p = r + (α'/α) p                                             barrier
//!     α = α'
//! ```
//!
//! Each member reduces only the part of `v` it computed itself, so no barrier is needed
//! between the product and the first reduction. The barrier after the `p` update
//! publishes the new search direction before the next product reads neighbouring
//! partitions. Per iteration that is `2·reduction + 1` barriers: 5 with
//! [`Reduction::Tree`], 3 with [`Reduction::Atomic`].

use crate::config::CgOptions;
use crate::core::primitives::{axpy_in_place_range, dot_range, norm_squared_range};
use crate::core::traits::LinearOperator;
use crate::core::vector::{GridVector, padded_len, try_zeroed};
use crate::error::StencilError;
use crate::parallel::{Comm, Reduction, SharedBuf, Team, ThreadComm};
use crate::solver::LinearSolver;
use crate::utils::convergence::{Convergence, SolveStats, StoppingRule};
use tracing::{debug, trace, warn};

pub struct CgSolver {
    pub conv: Convergence,
    pub threads: usize,
    pub reduction: Reduction,
}

impl CgSolver {
    /// `tol` bounds the squared residual norm.
    pub fn new(tol: f64, max_iters: usize) -> Self {
        Self {
            conv: Convergence { tol, max_iters, rule: StoppingRule::Absolute },
            threads: num_cpus::get(),
            reduction: Reduction::Tree,
        }
    }

    pub fn from_options(opts: &CgOptions) -> Self {
        Self {
            conv: Convergence { tol: opts.tol, max_iters: opts.max_iters, rule: opts.rule },
            threads: opts.threads,
            reduction: opts.reduction,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn with_rule(mut self, rule: StoppingRule) -> Self {
        self.conv.rule = rule;
        self
    }
}

/// Scratch vectors shared by the team. `p` carries ghost layers of width `pad`.
struct Workspace<'a> {
    pad: usize,
    p: SharedBuf<'a>,
    v: SharedBuf<'a>,
    r: SharedBuf<'a>,
    x: SharedBuf<'a>,
}

struct MemberOutcome {
    iterations: usize,
    alpha: f64,
    alpha0: f64,
    barriers: usize,
}

fn run_member<A: LinearOperator + ?Sized>(
    comm: &ThreadComm<'_>,
    a: &A,
    x0: &GridVector,
    b: &[f64],
    ws: &Workspace<'_>,
    conv: Convergence,
) -> Result<MemberOutcome, StencilError> {
    let n = b.len();
    let range = comm.range(n);
    let len = range.len();
    let own_p = ws.pad + range.start..ws.pad + range.end;

    // SAFETY (all blocks below): between two barriers a member writes only its own
    // partition, and whole-buffer reads of `p` happen only in the product phase, in which
    // nobody writes `p`.
    let mut alpha = {
        let r = unsafe { ws.r.slice_mut(range.clone()) };
        let x = unsafe { ws.x.slice_mut(range.clone()) };
        let p = unsafe { ws.p.slice_mut(own_p.clone()) };
        a.apply_range(x0.padded(), r, range.clone());
        x.copy_from_slice(&x0.interior()[range.clone()]);
        for ((ri, pi), &bi) in r.iter_mut().zip(p.iter_mut()).zip(&b[range.clone()]) {
            *ri = bi - *ri;
            *pi = *ri;
        }
        comm.all_reduce(norm_squared_range(r, 0..len))
    };
    let alpha0 = alpha;

    let mut k = 0;
    while k < conv.max_iters {
        if conv.is_converged(alpha, alpha0) {
            break;
        }

        let sigma = {
            let p_all = unsafe { ws.p.read() };
            let v = unsafe { ws.v.slice_mut(range.clone()) };
            a.apply_range(p_all, v, range.clone());
            comm.all_reduce(dot_range(v, &p_all[own_p.clone()], 0..len))
        };
        if sigma == 0.0 || !sigma.is_finite() {
            return Err(StencilError::DegenerateStep { iteration: k });
        }
        let lambda = alpha / sigma;

        let alpha_next = {
            let p = unsafe { ws.p.read() };
            let v = unsafe { ws.v.slice_mut(range.clone()) };
            let x = unsafe { ws.x.slice_mut(range.clone()) };
            let r = unsafe { ws.r.slice_mut(range.clone()) };
            axpy_in_place_range(x, lambda, &p[own_p.clone()], 0..len);
            axpy_in_place_range(r, -lambda, v, 0..len);
            comm.all_reduce(norm_squared_range(r, 0..len))
        };

        {
            let beta = alpha_next / alpha;
            let p = unsafe { ws.p.slice_mut(own_p.clone()) };
            let r = unsafe { ws.r.slice_mut(range.clone()) };
            for (pi, &ri) in p.iter_mut().zip(r.iter()) {
                *pi = ri + beta * *pi;
            }
        }
        comm.barrier();

        alpha = alpha_next;
        k += 1;
        if comm.rank() == 0 {
            trace!("CG iter {k}: ||r||^2 = {alpha:.6e}");
        }
    }

    Ok(MemberOutcome { iterations: k, alpha, alpha0, barriers: comm.barriers() })
}

impl<A: LinearOperator + ?Sized> LinearSolver<A> for CgSolver {
    type Error = StencilError;

    fn solve(
        &mut self,
        a: &A,
        x0: &GridVector,
        b: &GridVector,
        x1: &mut GridVector,
    ) -> Result<SolveStats, StencilError> {
        let grid = *a.grid();
        let n = grid.size3d();
        for v in [x0, b, &*x1] {
            if v.grid() != &grid {
                return Err(StencilError::GridMismatch { expected: grid, found: *v.grid() });
            }
        }
        let team = Team::new(self.threads, self.reduction)?;
        let pad = grid.size2d();
        let mut p = try_zeroed(padded_len(&grid, pad)?)?;
        let mut v = try_zeroed(n)?;
        let mut r = try_zeroed(n)?;
        let conv = self.conv;

        debug!(
            "CG: n={}, threads={}, reduction={:?}, tol={:.2e}, max_iter={}",
            n, self.threads, self.reduction, conv.tol, conv.max_iters,
        );

        let outcomes = {
            let ws = Workspace {
                pad,
                p: SharedBuf::new(&mut p),
                v: SharedBuf::new(&mut v),
                r: SharedBuf::new(&mut r),
                x: SharedBuf::new(x1.interior_mut()),
            };
            team.run(|comm| run_member(comm, a, x0, b.interior(), &ws, conv))
        };

        // every member agrees; rank 0 speaks for the team
        let Some(first) = outcomes.into_iter().next() else {
            return Err(StencilError::InvalidOption("a team needs at least one thread"));
        };
        let out = first.inspect_err(|e| warn!("CG: {e}"))?;
        let converged = conv.is_converged(out.alpha, out.alpha0);
        if converged {
            debug!("CG converged at iteration {}: ||r||^2 = {:.6e}", out.iterations, out.alpha);
        } else {
            warn!(
                "CG: iteration limit {} reached, ||r||^2 = {:.6e}",
                conv.max_iters, out.alpha,
            );
        }
        Ok(SolveStats {
            iterations: out.iterations,
            residual_sq: out.alpha,
            initial_residual_sq: out.alpha0,
            converged,
            barriers: out.barriers,
        })
    }
}
