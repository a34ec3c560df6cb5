//! Stop-the-world mark-and-sweep over a flat registry of objects.

use core::{alloc::Layout, ptr::NonNull};

use alloc::{boxed::Box, vec::Vec};
use log::debug;

use crate::{AllocError, AllocResult};

use super::pointer::{GcBox, GcPtr};

/// Implemented by every object a [`TracingCollector`] owns.
pub trait Trace: 'static {
    /// Mark every pointer this object holds by calling [`TracingCollector::mark`] on it.
    ///
    /// Called by the collector right after it has set this object's own mark bit.
    fn trace(&self, gc: &TracingCollector);
}

/// A mark-and-sweep collector owning every object registered with it.
pub struct TracingCollector {
    /// Every object that has not been reclaimed yet
    objects: Vec<NonNull<GcBox<dyn Trace>>>,
}

impl TracingCollector {
    pub const fn new() -> TracingCollector {
        TracingCollector {
            objects: Vec::new(),
        }
    }

    /// Number of objects currently owned by the collector
    #[inline]
    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }

    /// Move `value` into a new allocation and register it with this collector.
    ///
    /// The registry slot is reserved before the object memory is acquired, so a failed
    /// allocation leaves the registry as it was.
    pub fn register<T: Trace>(&mut self, value: T) -> AllocResult<GcPtr<T>> {
        self.objects
            .try_reserve(1)
            .map_err(|_| AllocError::oom(core::mem::size_of::<NonNull<GcBox<dyn Trace>>>()))?;

        let layout = Layout::new::<GcBox<T>>();
        let ptr = unsafe { alloc::alloc::alloc(layout) } as *mut GcBox<T>;
        let ptr = NonNull::new(ptr).ok_or_else(|| AllocError::oom_for(layout))?;

        unsafe { ptr.as_ptr().write(GcBox::new(value)) };

        let erased: NonNull<GcBox<dyn Trace>> = ptr;
        self.objects.push(erased);

        Ok(GcPtr::from_non_null(ptr))
    }

    /// Mark an object and everything reachable from it.
    ///
    /// Does nothing if the object is already marked in this cycle.
    ///
    /// Marking recurses through [`Trace::trace`], so the native stack depth grows with the length
    /// of the longest unmarked path. A linked list of around a hundred thousand nodes can
    /// overflow a default thread stack.
    pub fn mark<T: Trace>(&self, ptr: GcPtr<T>) {
        let gc_box = ptr.gc_box();
        if gc_box.is_marked() {
            return;
        }

        gc_box.set_marked(true);
        gc_box.value.trace(self);
    }

    /// Mark an optional pointer, doing nothing for `None`
    #[inline]
    pub fn mark_opt<T: Trace>(&self, ptr: Option<GcPtr<T>>) {
        if let Some(ptr) = ptr {
            self.mark(ptr);
        }
    }

    /// Whether the object has been marked since the last collection
    #[inline]
    pub fn is_marked<T: Trace>(&self, ptr: GcPtr<T>) -> bool {
        ptr.gc_box().is_marked()
    }

    /// Destroy every unmarked object and clear the mark bit of every survivor.
    ///
    /// Only objects marked since the previous collection survive. Returns the number of objects
    /// destroyed.
    pub fn collect(&mut self) -> usize {
        let num_before = self.objects.len();

        self.objects.retain(|object| unsafe {
            let gc_box = object.as_ref();
            if gc_box.is_marked() {
                gc_box.set_marked(false);
                true
            } else {
                drop(Box::from_raw(object.as_ptr()));
                false
            }
        });

        let num_freed = num_before - self.objects.len();
        debug!(
            "mark-sweep: destroyed {} objects, {} survived",
            num_freed,
            self.objects.len()
        );

        num_freed
    }
}

impl Default for TracingCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TracingCollector {
    fn drop(&mut self) {
        for object in self.objects.drain(..) {
            unsafe { drop(Box::from_raw(object.as_ptr())) };
        }
    }
}
