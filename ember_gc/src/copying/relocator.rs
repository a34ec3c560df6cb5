//! Evacuation of objects from one arena into the other.

use core::ptr;

use super::{
    arena::Arena,
    handle::Handle,
    slot::SlotState,
};

/// Implemented by every object an [`EvacuatingCollector`](super::EvacuatingCollector) owns.
pub trait Evacuate: 'static {
    /// Rewrite every handle this object holds by passing it to [`Relocator::visit`].
    ///
    /// Called on the relocated copy, after the collector has moved it into the new arena. The
    /// default does nothing, which is correct for objects that hold no handles.
    fn relocate(&mut self, _relocator: &mut Relocator<'_>) {}
}

/// Moves objects into the new arena during a collection.
///
/// Each object is copied the first time it is reached, and the old slot is tagged with the new
/// offset before any of its children are visited. Later visits of the same object resolve to
/// that forwarding offset, so shared objects are copied once and cycles terminate.
pub struct Relocator<'a> {
    from: &'a Arena,
    to: &'a Arena,
    free: usize,
    collector: usize,
    from_epoch: u64,
    to_epoch: u64,
}

impl<'a> Relocator<'a> {
    pub(crate) fn new(
        from: &'a Arena,
        to: &'a Arena,
        collector: usize,
        from_epoch: u64,
    ) -> Relocator<'a> {
        Relocator {
            from,
            to,
            free: 0,
            collector,
            from_epoch,
            to_epoch: from_epoch + 1,
        }
    }

    /// Bytes copied into the new arena so far
    #[inline]
    pub(crate) fn free(&self) -> usize {
        self.free
    }

    #[inline]
    pub(crate) fn to_epoch(&self) -> u64 {
        self.to_epoch
    }

    /// Relocate the target of `handle` and point the handle at the new copy.
    ///
    /// # Panics
    /// If the handle belongs to another collector or was created before the previous collection.
    pub fn visit<T: Evacuate>(&mut self, handle: &mut Handle<T>) {
        assert_eq!(
            handle.collector(),
            self.collector,
            "handle from another collector {:?} reached during collection",
            handle
        );
        assert_eq!(
            handle.epoch(),
            self.from_epoch,
            "stale handle {:?} reached during collection",
            handle
        );

        let offset = self.evacuate(handle.offset());
        *handle = Handle::new(self.collector, offset, self.to_epoch);
    }

    /// Relocate an optional handle, doing nothing for `None`
    #[inline]
    pub fn visit_opt<T: Evacuate>(&mut self, handle: &mut Option<Handle<T>>) {
        if let Some(handle) = handle {
            self.visit(handle);
        }
    }

    /// Copy the object at `offset` in the old arena unless that already happened, returning its
    /// offset in the new arena.
    pub(crate) fn evacuate(&mut self, offset: usize) -> usize {
        let header = self.from.header(offset);

        let size = unsafe {
            if let SlotState::Forwarded(new_offset) = (*header).state {
                return new_offset;
            }
            (*header).instance_size
        };

        let new_offset = self.free;
        debug_assert!(new_offset + size <= self.to.size());

        unsafe {
            ptr::copy_nonoverlapping(
                self.from.slot_ptr(offset),
                self.to.slot_ptr(new_offset),
                size,
            );
            (*header).state = SlotState::Forwarded(new_offset);
        }
        self.free += size;

        new_offset
    }

    /// Let every copied object rewrite its handles, copying whatever they reach in turn.
    ///
    /// Walks the new arena from `scan` until it catches up with the allocation cursor, so the
    /// whole closure of the objects evacuated so far ends up copied.
    pub(crate) fn scan(&mut self, mut scan: usize) -> usize {
        while scan < self.free {
            let header = self.to.header(scan);
            let (size, vtable) = unsafe { ((*header).instance_size, (*header).vtable) };

            unsafe { (vtable.relocate)(self.to.slot_ptr(scan), self) };
            scan += size;
        }
        scan
    }
}
