//! GC Header for tri-color marking
//!
//! Every object owned by the incremental collector is allocated as a `GcBox`: a `GcHeader`
//! followed by the object itself.
//! Layout: | GcHeader | ... object data ... |

use core::{any::TypeId, cell::Cell};

use super::pointer::AnyGc;

/// The three colors used in tri-color marking
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum GcColor {
    /// White: Not yet visited, will be collected if still white when swept
    White = 0,
    /// Gray: Marked but fields not yet enumerated
    Gray = 1,
    /// Black: Marked and all fields enumerated
    Black = 2,
}

impl Default for GcColor {
    fn default() -> Self {
        GcColor::White
    }
}

/// GC phase for incremental collection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GcPhase {
    /// No cycle in progress. The next step grays the roots.
    Scan,
    /// Incrementally enumerating the fields of gray objects
    Mark,
    /// Incrementally destroying white objects
    Sweep,
}

impl Default for GcPhase {
    fn default() -> Self {
        GcPhase::Scan
    }
}

/// Header prepended to every managed object
pub(crate) struct GcHeader {
    /// Current color in tri-color marking
    color: Cell<GcColor>,
    /// Padded size of the whole allocation, header included
    instance_size: usize,
    /// Concrete type of the object, used for checked downcasts of erased pointers
    type_id: TypeId,
    /// Next object in the all-objects list (for sweeping)
    next_object: Cell<Option<AnyGc>>,
}

impl GcHeader {
    #[inline]
    pub fn new(instance_size: usize, type_id: TypeId) -> GcHeader {
        GcHeader {
            color: Cell::new(GcColor::White),
            instance_size,
            type_id,
            next_object: Cell::new(None),
        }
    }

    #[inline]
    pub fn color(&self) -> GcColor {
        self.color.get()
    }

    #[inline]
    pub fn set_color(&self, color: GcColor) {
        self.color.set(color);
    }

    /// Check if this object is marked (gray or black)
    #[inline]
    pub fn is_marked(&self) -> bool {
        self.color() != GcColor::White
    }

    #[inline]
    pub fn instance_size(&self) -> usize {
        self.instance_size
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn next_object(&self) -> Option<AnyGc> {
        self.next_object.get()
    }

    #[inline]
    pub fn set_next_object(&self, next: Option<AnyGc>) {
        self.next_object.set(next);
    }
}

/// A managed allocation: header followed by the object.
#[repr(C)]
pub(crate) struct GcBox<T: ?Sized> {
    pub header: GcHeader,
    pub value: T,
}
