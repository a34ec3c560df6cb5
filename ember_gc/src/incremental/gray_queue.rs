//! Gray Queue for tri-color marking
//!
//! Vec-based stack of objects that have been marked but whose fields have not been enumerated
//! yet.

use alloc::vec::Vec;

use super::pointer::AnyGc;

/// Queue of gray objects to be scanned
pub(crate) struct GrayQueue {
    queue: Vec<AnyGc>,
}

impl GrayQueue {
    /// Create a new empty gray queue
    pub const fn new() -> GrayQueue {
        GrayQueue { queue: Vec::new() }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn push(&mut self, object: AnyGc) {
        self.queue.push(object);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<AnyGc> {
        self.queue.pop()
    }

    /// Remove every object from the queue, yielding them
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = AnyGc> + '_ {
        self.queue.drain(..)
    }
}

impl Default for GrayQueue {
    fn default() -> Self {
        Self::new()
    }
}
