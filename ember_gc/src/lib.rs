//! Ember Garbage Collectors
//!
//! Three independent tracing collectors over a managed object graph. They share nothing but
//! the allocation error type:
//!
//! - [`mark_sweep`]: stop-the-world mark-and-sweep. Objects register with their collector on
//!   construction, and the caller marks every root right before each `collect()`.
//! - [`copying`]: semi-space evacuating collector. Bump allocation into an arena, full
//!   evacuation of everything reachable from the root table on each collection, geometric
//!   arena growth under pressure.
//! - [`incremental`]: tri-color incremental mark-and-sweep. Each `collect()` call performs a
//!   bounded quantum of work so the mutator can run in between, guarded by a write barrier.
//!
//! All collectors assume a single mutator thread and do no internal locking.

#![cfg_attr(not(test), no_std)]
extern crate alloc;

mod error;

pub mod copying;
pub mod incremental;
pub mod mark_sweep;

pub use error::{AllocError, AllocResult};
