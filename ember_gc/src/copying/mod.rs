//! Semi-space copying collection.
//!
//! An [`EvacuatingCollector`] owns two equal-size arenas. Objects are bump-allocated into the
//! active one. A collection copies everything reachable from the root table into the other
//! arena, destroys the objects left behind and swaps the two. When even a fresh collection
//! leaves no room for an allocation, both arenas are doubled until it fits.
//!
//! Objects are addressed through [`Handle`]s, which are arena offsets stamped with the epoch
//! they were produced in. Since every collection moves objects, handles only stay valid until
//! the next one. To hold on to an object across collections, keep it in the root table
//! ([`EvacuatingCollector::push_root`]) and read it back with [`EvacuatingCollector::root`], or
//! store its handle in another managed object. The collector rewrites both kinds: the root table
//! directly, and handles inside objects through each object's [`Evacuate`] implementation.
//!
//! # Example
//! ```ignore
//! struct Node {
//!     next: Option<Handle<Node>>,
//! }
//!
//! impl Evacuate for Node {
//!     fn relocate(&mut self, relocator: &mut Relocator<'_>) {
//!         relocator.visit_opt(&mut self.next);
//!     }
//! }
//!
//! let mut gc = EvacuatingCollector::new()?;
//! let head = gc.alloc(Node { next: None })?;
//! let root = gc.push_root(head);
//!
//! let tail = gc.alloc(Node { next: None })?;
//! let head = gc.root::<Node>(root).unwrap();
//! gc.get_mut(head).next = Some(tail);
//!
//! gc.collect();
//! let head = gc.root::<Node>(root).unwrap();
//! assert!(gc.get(head).next.is_some());
//! ```

mod arena;
mod collector;
mod handle;
mod relocator;
mod slot;

pub use collector::{EvacuatingCollector, EvacuationStats, DEFAULT_SPACE_SIZE};
pub use handle::{Handle, RootId};
pub use relocator::{Evacuate, Relocator};
pub use slot::MIN_OBJECT_SIZE;
