//! Pointers to objects owned by an `IncrementalCollector`.
//!
//! `Gc<T>` knows the concrete type of its target. `AnyGc` is the erased form stored in fields,
//! roots and the collector's own bookkeeping.

use core::{
    any::TypeId,
    ops::Deref,
    ptr::NonNull,
};

use super::{
    field::Managed,
    gc_header::{GcBox, GcHeader},
};

/// A pointer to a managed object of a known type.
///
/// # Safety
/// - Must not be dereferenced after the object has been swept or its collector dropped. Only
///   objects reachable from a registered root (or allocated during the current cycle) are kept
///   alive.
///
/// Only shared access is handed out. Reference fields are [`Field`](super::Field)s written
/// through the collector's write barrier, and any other state that changes after allocation
/// needs its own interior mutability.
#[repr(transparent)]
pub struct Gc<T> {
    ptr: NonNull<GcBox<T>>,
}

impl<T> Gc<T> {
    #[inline]
    pub(crate) const fn from_non_null(ptr: NonNull<GcBox<T>>) -> Gc<T> {
        Gc { ptr }
    }

    #[inline]
    fn gc_box(&self) -> &GcBox<T> {
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

impl<T: Managed> Gc<T> {
    /// Forget the concrete type of the target
    #[inline]
    pub fn erase(self) -> AnyGc {
        AnyGc::from_non_null(self.ptr)
    }
}

impl<T> Clone for Gc<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Gc<T> {}

impl<T> PartialEq for Gc<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for Gc<T> {}

impl<T> Deref for Gc<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.gc_box().value
    }
}

impl<T> core::fmt::Debug for Gc<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Gc({:p})", self.ptr)
    }
}

impl<T: Managed> From<Gc<T>> for AnyGc {
    #[inline]
    fn from(ptr: Gc<T>) -> AnyGc {
        ptr.erase()
    }
}

/// A pointer to a managed object of any type.
#[derive(Clone, Copy)]
pub struct AnyGc {
    ptr: NonNull<GcBox<dyn Managed>>,
}

impl AnyGc {
    #[inline]
    pub(crate) fn from_non_null(ptr: NonNull<GcBox<dyn Managed>>) -> AnyGc {
        AnyGc { ptr }
    }

    #[inline]
    pub(crate) fn as_non_null(&self) -> NonNull<GcBox<dyn Managed>> {
        self.ptr
    }

    #[inline]
    pub(crate) fn header(&self) -> &GcHeader {
        unsafe { &self.ptr.as_ref().header }
    }

    /// The managed object itself
    #[inline]
    pub fn object(&self) -> &dyn Managed {
        unsafe { &self.ptr.as_ref().value }
    }

    /// Check pointer equality. Only the address is compared.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.ptr.cast::<u8>() == other.ptr.cast::<u8>()
    }

    /// Whether the target is a `T`
    #[inline]
    pub fn is<T: Managed>(&self) -> bool {
        self.header().type_id() == TypeId::of::<T>()
    }

    /// Recover the typed pointer, or `None` if the target is not a `T`
    #[inline]
    pub fn downcast<T: Managed>(self) -> Option<Gc<T>> {
        if self.is::<T>() {
            Some(Gc::from_non_null(self.ptr.cast::<GcBox<T>>()))
        } else {
            None
        }
    }
}

impl PartialEq for AnyGc {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for AnyGc {}

impl core::fmt::Debug for AnyGc {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "AnyGc({:p})", self.ptr.cast::<u8>())
    }
}
