//! Non-incremental mark-and-sweep collection.
//!
//! Every object is registered with exactly one [`TracingCollector`] when it is constructed and
//! stays owned by it until it is reclaimed or the collector is dropped.
//!
//! The collector keeps no root set. Before each [`TracingCollector::collect`] the caller marks
//! every root with [`TracingCollector::mark`]. Marking sets the object's mark bit and hands
//! control to the object's [`Trace`] implementation, which marks each pointer it holds. Already
//! marked objects short-circuit, so cycles need no bookkeeping beyond the mark bit.
//!
//! # Example
//! ```ignore
//! struct Node {
//!     children: Vec<GcPtr<Node>>,
//! }
//!
//! impl Trace for Node {
//!     fn trace(&self, gc: &TracingCollector) {
//!         for child in &self.children {
//!             gc.mark(*child);
//!         }
//!     }
//! }
//!
//! let mut gc = TracingCollector::new();
//! let root = GcPtr::new(&mut gc, Node { children: Vec::new() })?;
//! gc.mark(root);
//! gc.collect();
//! ```

mod collector;
mod pointer;

pub use collector::{Trace, TracingCollector};
pub use pointer::GcPtr;
