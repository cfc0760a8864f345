//! Barrier-synchronised SPMD thread team.
//!
//! [`Team::run`] executes one closure on `threads` scoped threads; the calling thread takes
//! rank 0. Each member receives a [`ThreadComm`] for partitioning, barriers and scalar
//! reductions. Two reduction strategies are available:
//!
//! - [`Reduction::Tree`]: every member stores its partial in its own slot, barrier, rank 0
//!   sums the slots pairwise and commits the total, barrier, everyone reads the committed
//!   value. Two barriers per reduction, one writer of the shared scalar.
//! - [`Reduction::Atomic`]: every member adds its partial into a shared accumulator with a
//!   compare-exchange loop, barrier, everyone reads. One barrier per reduction. Three
//!   accumulators rotate: the one used by reduction `g - 1` is cleared by rank 0 after the
//!   barrier of reduction `g`, when every member has finished reading it and before any
//!   member can reach reduction `g + 2`, its next use.
//!
//! Either way all members of one reduction observe the same value, so data-dependent
//! branches taken after a reduction agree across the team.
//!
//! A member that unwinds poisons the team barrier. Members blocked on it, or arriving
//! later, panic instead of waiting for a peer that will never come, and [`Team::run`]
//! re-raises the original panic on the caller.

use super::Comm;
use crate::error::StencilError;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// How a team combines per-thread partial sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Reduction {
    /// Barrier-protected tree reduction committed by rank 0
    #[default]
    Tree,
    /// Atomic accumulation into a shared scalar
    Atomic,
}

impl Reduction {
    pub fn barriers_per_reduction(self) -> usize {
        match self {
            Reduction::Tree => 2,
            Reduction::Atomic => 1,
        }
    }
}

#[inline]
fn atomic_add(atomic: &AtomicU64, val: f64) {
    let mut old = atomic.load(Ordering::Relaxed);
    loop {
        let new = (f64::from_bits(old) + val).to_bits();
        match atomic.compare_exchange_weak(old, new, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(x) => old = x,
        }
    }
}

/// Pairwise sum of the slot values, splitting at the midpoint.
fn tree_sum(slots: &[AtomicU64]) -> f64 {
    match slots.len() {
        0 => 0.0,
        1 => f64::from_bits(slots[0].load(Ordering::Relaxed)),
        n => {
            let (lo, hi) = slots.split_at(n / 2);
            tree_sum(lo) + tree_sum(hi)
        }
    }
}

/// Panic payload of members released from a poisoned barrier.
struct PeerPanicked;

#[derive(Default)]
struct BarrierState {
    arrived: usize,
    generation: usize,
}

/// Reusable barrier that releases its waiters by panicking once a member has unwound.
struct TeamBarrier {
    size: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
    poisoned: AtomicBool,
}

impl TeamBarrier {
    fn new(size: usize) -> Self {
        Self {
            size,
            state: Mutex::new(BarrierState::default()),
            cvar: Condvar::new(),
            poisoned: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait(&self) {
        let mut st = self.lock();
        if self.poisoned.load(Ordering::Relaxed) {
            drop(st);
            panic::panic_any(PeerPanicked);
        }
        let generation = st.generation;
        st.arrived += 1;
        if st.arrived == self.size {
            st.arrived = 0;
            st.generation = generation.wrapping_add(1);
            self.cvar.notify_all();
            return;
        }
        while st.generation == generation && !self.poisoned.load(Ordering::Relaxed) {
            st = self.cvar.wait(st).unwrap_or_else(PoisonError::into_inner);
        }
        if st.generation == generation {
            drop(st);
            panic::panic_any(PeerPanicked);
        }
    }

    fn poison(&self) {
        let _st = self.lock();
        self.poisoned.store(true, Ordering::Relaxed);
        self.cvar.notify_all();
    }
}

/// Poisons the barrier if its member unwinds.
struct UnwindGuard<'a>(&'a TeamBarrier);

impl Drop for UnwindGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.poison();
        }
    }
}

/// State shared by all members of one [`Team::run`].
struct TeamState {
    size: usize,
    reduction: Reduction,
    barrier: TeamBarrier,
    slots: Vec<AtomicU64>,
    committed: AtomicU64,
    accumulators: [AtomicU64; 3],
}

impl TeamState {
    fn new(size: usize, reduction: Reduction) -> Self {
        Self {
            size,
            reduction,
            barrier: TeamBarrier::new(size),
            slots: (0..size).map(|_| AtomicU64::new(0)).collect(),
            committed: AtomicU64::new(0),
            accumulators: [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)],
        }
    }
}

/// One member's handle on its team.
pub struct ThreadComm<'a> {
    rank: usize,
    state: &'a TeamState,
    generation: Cell<usize>,
    barriers: Cell<usize>,
}

impl<'a> ThreadComm<'a> {
    fn new(rank: usize, state: &'a TeamState) -> Self {
        Self { rank, state, generation: Cell::new(0), barriers: Cell::new(0) }
    }

    /// Barriers this member has waited on so far.
    pub fn barriers(&self) -> usize {
        self.barriers.get()
    }

    pub fn reduction(&self) -> Reduction {
        self.state.reduction
    }

    fn reduce_tree(&self, x: f64) -> f64 {
        let state = self.state;
        state.slots[self.rank].store(x.to_bits(), Ordering::Relaxed);
        self.barrier();
        if self.rank == 0 {
            state.committed.store(tree_sum(&state.slots).to_bits(), Ordering::Relaxed);
        }
        self.barrier();
        f64::from_bits(state.committed.load(Ordering::Relaxed))
    }

    fn reduce_atomic(&self, x: f64) -> f64 {
        let state = self.state;
        let g = self.generation.get();
        self.generation.set(g + 1);
        let acc = &state.accumulators[g % 3];
        atomic_add(acc, x);
        self.barrier();
        let total = f64::from_bits(acc.load(Ordering::Relaxed));
        if self.rank == 0 {
            state.accumulators[(g + 2) % 3].store(0f64.to_bits(), Ordering::Relaxed);
        }
        total
    }
}

impl Comm for ThreadComm<'_> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.state.size
    }

    fn barrier(&self) {
        self.barriers.set(self.barriers.get() + 1);
        self.state.barrier.wait();
    }

    fn all_reduce(&self, x: f64) -> f64 {
        match self.state.reduction {
            Reduction::Tree => self.reduce_tree(x),
            Reduction::Atomic => self.reduce_atomic(x),
        }
    }
}

/// A fixed-size SPMD thread team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Team {
    threads: usize,
    reduction: Reduction,
}

impl Team {
    pub fn new(threads: usize, reduction: Reduction) -> Result<Self, StencilError> {
        if threads == 0 {
            return Err(StencilError::InvalidOption("a team needs at least one thread"));
        }
        Ok(Self { threads, reduction })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    /// Run `f` once on every member and return the results in rank order.
    ///
    /// Every member must perform the same sequence of barriers and reductions. If a member
    /// panics, the others are released from the barrier and the first member's panic is
    /// re-raised on the caller once every thread has joined.
    pub fn run<R, F>(&self, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(&ThreadComm<'_>) -> R + Sync,
    {
        let state = TeamState::new(self.threads, self.reduction);
        let member = |rank| {
            let _guard = UnwindGuard(&state.barrier);
            f(&ThreadComm::new(rank, &state))
        };
        let outcomes: Vec<Result<R, Box<dyn Any + Send>>> = std::thread::scope(|s| {
            let handles: Vec<_> = (1..self.threads)
                .map(|rank| {
                    let member = &member;
                    s.spawn(move || member(rank))
                })
                .collect();
            let first = panic::catch_unwind(AssertUnwindSafe(|| member(0)));
            std::iter::once(first).chain(handles.into_iter().map(|h| h.join())).collect()
        });

        let mut results = Vec::with_capacity(outcomes.len());
        let mut released = None;
        for outcome in outcomes {
            match outcome {
                Ok(r) => results.push(r),
                Err(e) if e.is::<PeerPanicked>() => released = Some(e),
                Err(e) => panic::resume_unwind(e),
            }
        }
        if let Some(e) = released {
            panic::resume_unwind(e);
        }
        results
    }
}
