//! Incremental tri-color mark-and-sweep collection.
//!
//! The collector cycles through three phases: `Scan -> Mark -> Sweep -> Scan`. Each call to
//! [`IncrementalCollector::collect`] performs one bounded quantum of work for the current phase
//! and returns, so the mutator can allocate and write fields between calls while a cycle is in
//! flight.
//!
//! - Scan: gray every registered root.
//! - Mark: blacken up to `mark_step` gray objects, graying their white children. Once the gray
//!   queue is empty the cycle moves on to sweeping.
//! - Sweep: visit up to `sweep_step` objects from a persisted cursor, destroying white objects
//!   and resetting survivors to white.
//!
//! Correctness while a cycle is in flight depends on the tri-color invariant: a black object
//! never points to a white one. Reference fields are therefore typed as [`Field`], which can only
//! be written through [`IncrementalCollector::write_barrier`] (or created through
//! [`IncrementalCollector::field`]). Objects allocated mid-cycle are marked immediately so they
//! cannot be swept before anything had a chance to reach them.
//!
//! # Example
//! ```ignore
//! struct Pair {
//!     fields: [Field; 2],
//! }
//!
//! impl Managed for Pair {
//!     fn fields(&self) -> &[Field] {
//!         &self.fields
//!     }
//! }
//!
//! let mut gc = IncrementalCollector::new();
//! let pair = gc.alloc(Pair { fields: Default::default() })?;
//! let other = gc.alloc(Pair { fields: Default::default() })?;
//! gc.write_barrier(&pair.fields[0], Some(other.erase()));
//! gc.add_root(pair.erase());
//! gc.finish_cycle();
//! ```

mod collector;
mod config;
mod field;
mod gc_header;
mod gray_queue;
mod pointer;

pub use collector::IncrementalCollector;
pub use config::{
    default_step_for_threshold, IncrementalConfig, IncrementalConfigBuilder,
    DEFAULT_BYTES_THRESHOLD,
};
pub use field::{Field, Managed};
pub use gc_header::{GcColor, GcPhase};
pub use pointer::{AnyGc, Gc};

#[cfg(test)]
mod tests;
