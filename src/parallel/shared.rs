//! Mutable buffers shared by a thread team.
//!
//! Within one phase (the stretch between two barriers) a member writes only cells of its
//! own partition and reads whole buffers only if no member writes them in that phase.
//! [`Team`](super::Team) barriers order the phases, so every access below is race-free
//! as long as callers keep to that discipline.

use std::marker::PhantomData;
use std::ops::Range;

pub(crate) struct SharedBuf<'a> {
    ptr: *mut f64,
    len: usize,
    _marker: PhantomData<&'a mut [f64]>,
}

// SAFETY: access is coordinated by the phase discipline documented above.
unsafe impl Send for SharedBuf<'_> {}
unsafe impl Sync for SharedBuf<'_> {}

impl<'a> SharedBuf<'a> {
    pub(crate) fn new(data: &'a mut [f64]) -> Self {
        Self { ptr: data.as_mut_ptr(), len: data.len(), _marker: PhantomData }
    }

    /// View the whole buffer.
    ///
    /// # Safety
    /// No member may write any cell of the buffer while the returned slice is alive.
    pub(crate) unsafe fn read(&self) -> &[f64] {
        // SAFETY: ptr/len come from a live `&'a mut [f64]`; writers are excluded by the caller.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    /// Exclusive view of `range`.
    ///
    /// # Safety
    /// No other member may read or write any cell of `range` while the returned slice is
    /// alive, and the caller must not hold another view overlapping it.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn slice_mut(&self, range: Range<usize>) -> &mut [f64] {
        assert!(range.start <= range.end && range.end <= self.len, "range out of bounds");
        // SAFETY: bounds checked above; exclusivity guaranteed by the caller.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(range.start), range.len()) }
    }
}
