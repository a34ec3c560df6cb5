//! A fixed-size block of raw memory that objects are bump-allocated into.

use core::{alloc::Layout, ptr::NonNull};

use crate::{AllocError, AllocResult};

use super::slot::ObjHeader;

/// Alignment of every arena and of every slot offset within it
pub(crate) const ARENA_ALIGN: usize = 16;

pub(crate) struct Arena {
    ptr: NonNull<u8>,
    size: usize,
}

impl Arena {
    /// Acquire a new arena of `size` bytes. `size` must be a non-zero multiple of
    /// [`ARENA_ALIGN`].
    pub(crate) fn new(size: usize) -> AllocResult<Arena> {
        debug_assert!(size > 0 && size % ARENA_ALIGN == 0);

        let layout =
            Layout::from_size_align(size, ARENA_ALIGN).map_err(|_| AllocError::oom(size))?;
        let ptr = unsafe { alloc::alloc::alloc(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(|| AllocError::oom_for(layout))?;

        Ok(Arena { ptr, size })
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Start of the slot at `offset`
    #[inline]
    pub(crate) fn slot_ptr(&self, offset: usize) -> *mut u8 {
        debug_assert!(offset < self.size);
        unsafe { self.ptr.as_ptr().add(offset) }
    }

    /// Header of the slot at `offset`
    #[inline]
    pub(crate) fn header(&self, offset: usize) -> *mut ObjHeader {
        self.slot_ptr(offset).cast()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe {
            let layout = Layout::from_size_align_unchecked(self.size, ARENA_ALIGN);
            alloc::alloc::dealloc(self.ptr.as_ptr(), layout);
        }
    }
}
