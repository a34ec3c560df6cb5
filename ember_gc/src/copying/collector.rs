//! EvacuatingCollector - semi-space copying collection
//!
//! Design:
//! - Two arenas of equal size. Objects are bump-allocated into the active one (from-space)
//! - Collection evacuates everything reachable from the root table into the other arena
//!   (to-space), destroys whatever was left behind and swaps the roles
//! - When a collection does not free enough room, both arenas are replaced by ones of twice the
//!   size until the allocation fits

use core::{
    any::TypeId,
    mem,
    sync::atomic::{AtomicUsize, Ordering},
};

use alloc::vec::Vec;
use log::debug;

use crate::{error::checked_align_up, AllocError, AllocResult};

use super::{
    arena::{Arena, ARENA_ALIGN},
    handle::{Handle, RootId},
    relocator::{Evacuate, Relocator},
    slot::{Slot, SlotState, MIN_OBJECT_SIZE},
};

/// Initial size of each arena
pub const DEFAULT_SPACE_SIZE: usize = 64 * 1024;

/// Source of the ids stamped into every handle
static NEXT_COLLECTOR_ID: AtomicUsize = AtomicUsize::new(0);

/// Counters describing the collector's state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvacuationStats {
    /// Number of completed collections, including the ones forced by arena growth
    pub collections: u64,
    /// Bytes evacuated by the most recent collection
    pub last_bytes_copied: usize,
    /// Objects destroyed by the most recent collection
    pub last_objects_destroyed: usize,
    /// Current size of each arena
    pub space_size: usize,
    /// Bytes allocated in the active arena
    pub bytes_in_use: usize,
}

/// A semi-space copying collector owning every object allocated through it.
pub struct EvacuatingCollector {
    /// Active arena that objects are allocated into
    from: Arena,

    /// Empty arena that the next collection evacuates into
    to: Arena,

    /// Allocation cursor in the active arena
    free: usize,

    /// Unique per collector, so handles from another collector are rejected
    id: usize,

    /// Incremented by every collection, invalidating handles from earlier epochs
    epoch: u64,

    /// Offsets of the root objects in the active arena, `None` for cleared entries
    roots: Vec<Option<usize>>,

    stats: EvacuationStats,
}

impl EvacuatingCollector {
    /// Create a collector with arenas of [`DEFAULT_SPACE_SIZE`] bytes.
    pub fn new() -> AllocResult<EvacuatingCollector> {
        Self::with_space_size(DEFAULT_SPACE_SIZE)
    }

    /// Create a collector whose arenas start at `space_size` bytes, rounded up to hold at least
    /// one minimal object.
    pub fn with_space_size(space_size: usize) -> AllocResult<EvacuatingCollector> {
        let space_size = checked_align_up(space_size.max(MIN_OBJECT_SIZE), ARENA_ALIGN)
            .ok_or(AllocError::oom(space_size))?;

        let from = Arena::new(space_size)?;
        let to = Arena::new(space_size)?;

        Ok(EvacuatingCollector {
            from,
            to,
            free: 0,
            id: NEXT_COLLECTOR_ID.fetch_add(1, Ordering::Relaxed),
            epoch: 0,
            roots: Vec::new(),
            stats: EvacuationStats {
                space_size,
                ..EvacuationStats::default()
            },
        })
    }

    #[inline]
    pub fn space_size(&self) -> usize {
        self.from.size()
    }

    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn stats(&self) -> EvacuationStats {
        EvacuationStats {
            space_size: self.from.size(),
            bytes_in_use: self.free,
            ..self.stats
        }
    }

    /// Number of objects in the active arena, reachable or not
    pub fn object_count(&self) -> usize {
        let mut count = 0;
        let mut offset = 0;
        while offset < self.free {
            offset += unsafe { (*self.from.header(offset)).instance_size };
            count += 1;
        }
        count
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Move `value` into the active arena.
    ///
    /// Collects if the object does not fit, then doubles the arenas until it does. Either can
    /// move every object, so all handles not read back from the root table afterwards are
    /// stale, including handles stored in `value` itself.
    pub fn alloc<T: Evacuate>(&mut self, value: T) -> AllocResult<Handle<T>> {
        let size = Slot::<T>::SIZE;

        if !self.fits(size) {
            self.collect();

            while !self.fits(size) {
                let new_size = self
                    .from
                    .size()
                    .checked_mul(2)
                    .ok_or(AllocError::oom(usize::MAX))?;
                self.grow(new_size)?;
            }
        }

        let offset = self.free;
        unsafe {
            self.from
                .slot_ptr(offset)
                .cast::<Slot<T>>()
                .write(Slot::new(value));
        }
        self.free += size;

        Ok(Handle::new(self.id, offset, self.epoch))
    }

    #[inline]
    fn fits(&self, size: usize) -> bool {
        self.free
            .checked_add(size)
            .map_or(false, |end| end <= self.from.size())
    }

    /// Replace both arenas with ones of `new_size` bytes.
    ///
    /// The live objects are evacuated into the first new arena, which takes over as the active
    /// one. Both arenas are acquired before anything is released, so a failure leaves the
    /// collector as it was.
    fn grow(&mut self, new_size: usize) -> AllocResult<()> {
        let bigger = Arena::new(new_size)?;
        let spare = Arena::new(new_size)?;

        self.to = bigger;
        self.collect();
        self.to = spare;

        debug!("copying: grew arenas to {} bytes", new_size);

        Ok(())
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// Borrow the object behind `handle`.
    ///
    /// # Panics
    /// If the handle belongs to another collector, is from an earlier epoch or points to an
    /// object of another type.
    pub fn get<T: Evacuate>(&self, handle: Handle<T>) -> &T {
        unsafe { &(*self.check(handle)).value }
    }

    /// Mutably borrow the object behind `handle`.
    ///
    /// # Panics
    /// If the handle belongs to another collector, is from an earlier epoch or points to an
    /// object of another type.
    pub fn get_mut<T: Evacuate>(&mut self, handle: Handle<T>) -> &mut T {
        unsafe { &mut (*self.check(handle)).value }
    }

    fn check<T: Evacuate>(&self, handle: Handle<T>) -> *mut Slot<T> {
        assert!(
            handle.collector() == self.id,
            "handle from another collector {:?}",
            handle
        );
        assert!(
            handle.epoch() == self.epoch && handle.offset() < self.free,
            "stale handle {:?} (current epoch={})",
            handle,
            self.epoch
        );

        let header = self.from.header(handle.offset());
        let type_id = unsafe { ((*header).vtable.type_id)() };
        assert!(
            type_id == TypeId::of::<T>(),
            "handle type mismatch at offset {}",
            handle.offset()
        );

        header.cast()
    }

    // ========================================================================
    // Roots
    // ========================================================================

    /// Register a root and return its id in the root table.
    pub fn push_root<T: Evacuate>(&mut self, handle: Handle<T>) -> RootId {
        self.check(handle);
        self.roots.push(Some(handle.offset()));
        RootId(self.roots.len() - 1)
    }

    /// Read a root back as a handle valid for the current epoch.
    ///
    /// Returns `None` if the entry was removed. The type is checked when the handle is used.
    pub fn root<T: Evacuate>(&self, id: RootId) -> Option<Handle<T>> {
        self.roots[id.0].map(|offset| Handle::new(self.id, offset, self.epoch))
    }

    /// Point an existing root table entry at another object.
    pub fn set_root<T: Evacuate>(&mut self, id: RootId, handle: Handle<T>) {
        self.check(handle);
        self.roots[id.0] = Some(handle.offset());
    }

    /// Clear a root table entry. Returns whether it held an object.
    pub fn remove_root(&mut self, id: RootId) -> bool {
        self.roots[id.0].take().is_some()
    }

    // ========================================================================
    // Collection
    // ========================================================================

    /// Evacuate everything reachable from the root table and destroy the rest.
    pub fn collect(&mut self) {
        let end = self.free;

        let mut relocator = Relocator::new(&self.from, &self.to, self.id, self.epoch);
        for root in self.roots.iter_mut().flatten() {
            *root = relocator.evacuate(*root);
        }
        relocator.scan(0);

        let copied = relocator.free();
        let epoch = relocator.to_epoch();

        // Whatever was not forwarded is unreachable
        let mut destroyed = 0;
        let mut offset = 0;
        while offset < end {
            let header = self.from.header(offset);
            unsafe {
                let size = (*header).instance_size;
                if (*header).state == SlotState::Live {
                    ((*header).vtable.drop_in_place)(header.cast());
                    destroyed += 1;
                }
                offset += size;
            }
        }

        mem::swap(&mut self.from, &mut self.to);
        self.free = copied;
        self.epoch = epoch;

        self.stats.collections += 1;
        self.stats.last_bytes_copied = copied;
        self.stats.last_objects_destroyed = destroyed;

        debug!(
            "copying: collection {} evacuated {} of {} bytes, destroyed {} objects",
            self.stats.collections, copied, end, destroyed
        );
    }
}

impl Drop for EvacuatingCollector {
    fn drop(&mut self) {
        let mut offset = 0;
        while offset < self.free {
            let header = self.from.header(offset);
            unsafe {
                offset += (*header).instance_size;
                if (*header).state == SlotState::Live {
                    ((*header).vtable.drop_in_place)(header.cast());
                }
            }
        }
    }
}
