//! Handles to objects inside the active arena and ids into the root table.

use core::{fmt, marker::PhantomData};

/// A reference to an object owned by an [`EvacuatingCollector`](super::EvacuatingCollector).
///
/// A handle is an offset into the arena the object lived in when the handle was produced,
/// stamped with the id of the collector that produced it and that collector's epoch at the
/// time. Handles are only accepted by the collector that produced them. Every collection moves objects and starts a
/// new epoch, so a handle is only usable until the next collection. Handles that must survive a
/// collection live in the root table or inside other managed objects, where the collector
/// rewrites them.
pub struct Handle<T> {
    collector: usize,
    offset: usize,
    epoch: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    #[inline]
    pub(crate) const fn new(collector: usize, offset: usize, epoch: u64) -> Handle<T> {
        Handle {
            collector,
            offset,
            epoch,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn collector(&self) -> usize {
        self.collector
    }

    /// Byte offset of the object inside the active arena
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Collector epoch this handle was produced in
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl<T> Clone for Handle<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.collector == other.collector
            && self.offset == other.offset
            && self.epoch == other.epoch
    }
}

impl<T> Eq for Handle<T> {}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}@{}#{})", self.offset, self.epoch, self.collector)
    }
}

/// Index of an entry in the root table. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootId(pub(crate) usize);
