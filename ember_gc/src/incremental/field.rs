//! Reference-holding fields of incrementally collected objects.

use core::{cell::Cell, fmt};

use super::pointer::{AnyGc, Gc};

/// Implemented by every object an [`IncrementalCollector`](super::IncrementalCollector) owns.
pub trait Managed: 'static {
    /// Every reference-holding field of this object, as one contiguous sequence.
    ///
    /// The collector walks this slice once each time the object is blackened. Objects without
    /// references keep the default empty sequence.
    fn fields(&self) -> &[Field] {
        &[]
    }
}

/// A slot that may hold a pointer to a managed object.
///
/// There is no safe way to store into a field directly. Stores go through
/// [`IncrementalCollector::write_barrier`](super::IncrementalCollector::write_barrier), and new
/// non-empty fields come from [`IncrementalCollector::field`](super::IncrementalCollector::field),
/// so the collector sees every reference that appears while a cycle is in flight. For the same
/// reason fields cannot be cloned.
///
/// Managed objects are only reachable through shared references, so a field inside one cannot
/// be moved out or swapped either:
///
/// ```compile_fail
/// use ember_gc::incremental::{Field, IncrementalCollector, Managed};
///
/// struct Pair {
///     fields: [Field; 2],
/// }
///
/// impl Managed for Pair {
///     fn fields(&self) -> &[Field] {
///         &self.fields
///     }
/// }
///
/// let mut gc = IncrementalCollector::new();
/// let mut pair = gc.alloc(Pair { fields: Default::default() }).unwrap();
/// let taken = core::mem::take(&mut pair.fields[0]);
/// ```
#[repr(transparent)]
pub struct Field {
    value: Cell<Option<AnyGc>>,
}

impl Field {
    /// A field holding no reference
    #[inline]
    pub const fn empty() -> Field {
        Field {
            value: Cell::new(None),
        }
    }

    /// Only called by the collector once the barrier has run.
    #[inline]
    pub(crate) fn barriered(value: Option<AnyGc>) -> Field {
        Field {
            value: Cell::new(value),
        }
    }

    #[inline]
    pub(crate) fn store(&self, value: Option<AnyGc>) {
        self.value.set(value);
    }

    #[inline]
    pub fn get(&self) -> Option<AnyGc> {
        self.value.get()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.get().is_none()
    }

    /// The referenced object if it is a `T`
    #[inline]
    pub fn get_as<T: Managed>(&self) -> Option<Gc<T>> {
        self.get()?.downcast()
    }

    /// Store a reference without running the write barrier.
    ///
    /// # Safety
    /// If a collection cycle is in flight and this field belongs to an object that has already
    /// been blackened, a white `value` stored here is invisible to the marker and will be
    /// destroyed while still referenced.
    #[inline]
    pub unsafe fn set_unbarriered(&self, value: Option<AnyGc>) {
        self.value.set(value);
    }
}

impl Default for Field {
    fn default() -> Self {
        Field::empty()
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(object) => write!(f, "Field({:?})", object),
            None => write!(f, "Field(empty)"),
        }
    }
}
