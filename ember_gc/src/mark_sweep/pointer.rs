//! Pointers to objects owned by a `TracingCollector`.

use core::{
    cell::Cell,
    ops::{Deref, DerefMut},
    ptr::NonNull,
};

use crate::AllocResult;

use super::{Trace, TracingCollector};

/// Allocation owned by the collector: the mark bit followed by the object itself.
#[repr(C)]
pub(crate) struct GcBox<T: ?Sized> {
    marked: Cell<bool>,
    pub(crate) value: T,
}

impl<T> GcBox<T> {
    #[inline]
    pub(crate) fn new(value: T) -> GcBox<T> {
        GcBox {
            marked: Cell::new(false),
            value,
        }
    }
}

impl<T: ?Sized> GcBox<T> {
    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        self.marked.get()
    }

    #[inline]
    pub(crate) fn set_marked(&self, marked: bool) {
        self.marked.set(marked);
    }
}

/// A pointer to an object owned by a [`TracingCollector`].
///
/// The pointer is a plain copyable address. It does not keep its target alive: an object
/// survives a collection only if it was marked beforehand.
///
/// # Safety
/// - Must not be dereferenced after the object has been reclaimed or its collector dropped
/// - `Drop` implementations of managed objects must not dereference other `GcPtr`s, since
///   objects are destroyed in registry order
/// - `DerefMut` hands out `&mut T` through any copy of the pointer, so two copies can produce
///   aliasing mutable references. Callers must not hold a borrow from one copy while borrowing
///   mutably through another
#[repr(transparent)]
pub struct GcPtr<T> {
    ptr: NonNull<GcBox<T>>,
}

impl<T: Trace> GcPtr<T> {
    /// Construct an object and register it with its owning collector.
    #[inline]
    pub fn new(gc: &mut TracingCollector, value: T) -> AllocResult<GcPtr<T>> {
        gc.register(value)
    }
}

impl<T> GcPtr<T> {
    #[inline]
    pub(crate) const fn from_non_null(ptr: NonNull<GcBox<T>>) -> GcPtr<T> {
        GcPtr { ptr }
    }

    #[inline]
    pub(crate) fn gc_box(&self) -> &GcBox<T> {
        unsafe { self.ptr.as_ref() }
    }

    /// Check pointer equality
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }

    /// Get the raw pointer to the object
    #[inline]
    pub fn as_ptr(&self) -> *mut T {
        unsafe { core::ptr::addr_of_mut!((*self.ptr.as_ptr()).value) }
    }
}

impl<T> Clone for GcPtr<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for GcPtr<T> {}

impl<T> PartialEq for GcPtr<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for GcPtr<T> {}

impl<T> Deref for GcPtr<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.gc_box().value
    }
}

impl<T> DerefMut for GcPtr<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut (*self.ptr.as_ptr()).value }
    }
}

impl<T> core::fmt::Debug for GcPtr<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "GcPtr({:p})", self.ptr)
    }
}

impl<T> core::fmt::Pointer for GcPtr<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Pointer::fmt(&self.ptr, f)
    }
}
