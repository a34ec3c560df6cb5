//! Allocation errors shared by every collector.

use core::alloc::Layout;

/// Result type for allocations
pub type AllocResult<T> = Result<T, AllocError>;

/// Allocation error
///
/// Running out of memory is the only failure a collector reports. It is fatal for the operation
/// that triggered it, but the collector itself is left in the state it had before the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("out of memory: failed to acquire {requested} bytes")]
    OutOfMemory { requested: usize },
}

impl AllocError {
    #[inline]
    pub fn oom(requested: usize) -> AllocError {
        AllocError::OutOfMemory { requested }
    }

    #[inline]
    pub(crate) fn oom_for(layout: Layout) -> AllocError {
        AllocError::oom(layout.size())
    }
}

/// Align a value up to the given power of two alignment, returning `None` on overflow.
#[inline]
pub(crate) fn checked_align_up(value: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    Some(value.checked_add(align - 1)? & !(align - 1))
}
