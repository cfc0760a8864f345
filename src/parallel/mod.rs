//! Shared-memory parallelism.
//!
//! Solver passes run on a [`Team`]: a fixed set of scoped threads executing the same
//! closure over static, contiguous index partitions and synchronising only at barriers.
//! Precomputation passes outside a team (operator construction, `set_state`) use Rayon
//! when the `rayon` feature is enabled.

use std::ops::Range;

pub mod shared;
pub mod team;

pub(crate) use shared::SharedBuf;
pub use team::{Reduction, Team, ThreadComm};

/// Collective operations available to one member of a thread team.
pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    /// Block until every member has arrived. All writes issued before the barrier by any
    /// member are visible to every member after it.
    fn barrier(&self);
    /// Sum `x` over all members; every member receives the same value.
    fn all_reduce(&self, x: f64) -> f64;
    /// This member's share of `0..n`: `n·rank/size .. n·(rank+1)/size`.
    fn range(&self, n: usize) -> Range<usize> {
        let (rank, size) = (self.rank(), self.size());
        n * rank / size..n * (rank + 1) / size
    }
}

/// `out[i] = f(i)` for every cell.
pub(crate) fn par_fill<F>(out: &mut [f64], f: F)
where
    F: Fn(usize) -> f64 + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        out.par_iter_mut().enumerate().for_each(|(i, o)| *o = f(i));
    }
    #[cfg(not(feature = "rayon"))]
    {
        out.iter_mut().enumerate().for_each(|(i, o)| *o = f(i));
    }
}
