//! Per-object slot layout inside an arena.
//!
//! Every object lives in a slot that starts with an [`ObjHeader`]. The header records how many
//! bytes the slot spans, so the arena can be walked linearly without knowing concrete types, and
//! carries the forwarding state used during evacuation.

use core::{
    any::TypeId,
    mem::{align_of, size_of},
};

use super::{arena::ARENA_ALIGN, relocator::Relocator, Evacuate};

/// Whether a slot still holds its object or has been evacuated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotState {
    Live,
    /// The object was moved to this offset in the other arena
    Forwarded(usize),
}

/// Type-specific operations, looked up through the header of an erased slot
pub(crate) struct ObjectVTable {
    pub(crate) type_id: fn() -> TypeId,
    pub(crate) drop_in_place: unsafe fn(*mut u8),
    pub(crate) relocate: unsafe fn(*mut u8, &mut Relocator<'_>),
}

#[repr(C)]
pub(crate) struct ObjHeader {
    pub(crate) state: SlotState,
    /// Bytes spanned by the whole slot, header included
    pub(crate) instance_size: usize,
    pub(crate) vtable: &'static ObjectVTable,
}

/// Smallest slot ever handed out. The forwarding marker lives in the header, so this is just
/// the header rounded up to the arena alignment.
pub const MIN_OBJECT_SIZE: usize = (size_of::<ObjHeader>() + ARENA_ALIGN - 1) & !(ARENA_ALIGN - 1);

#[repr(C)]
pub(crate) struct Slot<T> {
    pub(crate) header: ObjHeader,
    pub(crate) value: T,
}

impl<T: Evacuate> Slot<T> {
    /// Padded size of a slot holding a `T`
    pub(crate) const SIZE: usize = {
        assert!(
            align_of::<Slot<T>>() <= ARENA_ALIGN,
            "over-aligned types cannot be evacuated"
        );
        let padded = (size_of::<Slot<T>>() + ARENA_ALIGN - 1) & !(ARENA_ALIGN - 1);
        if padded < MIN_OBJECT_SIZE {
            MIN_OBJECT_SIZE
        } else {
            padded
        }
    };

    pub(crate) const VTABLE: &'static ObjectVTable = &ObjectVTable {
        type_id: TypeId::of::<T>,
        drop_in_place: drop_value::<T>,
        relocate: relocate_value::<T>,
    };

    #[inline]
    pub(crate) fn new(value: T) -> Slot<T> {
        Slot {
            header: ObjHeader {
                state: SlotState::Live,
                instance_size: Self::SIZE,
                vtable: Self::VTABLE,
            },
            value,
        }
    }
}

unsafe fn drop_value<T: Evacuate>(slot: *mut u8) {
    core::ptr::drop_in_place(core::ptr::addr_of_mut!((*slot.cast::<Slot<T>>()).value));
}

unsafe fn relocate_value<T: Evacuate>(slot: *mut u8, relocator: &mut Relocator<'_>) {
    (*slot.cast::<Slot<T>>()).value.relocate(relocator);
}
