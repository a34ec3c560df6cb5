//! IncrementalCollector - tri-color mark-sweep in bounded steps
//!
//! Design:
//! - Uses alloc::alloc for memory allocation, one allocation per object
//! - Maintains an intrusive linked list of all objects, appended at the tail
//! - Sweeping resumes from a cursor persisted between steps
//! - Allocation-driven GC: allocating above the byte threshold advances the collector one step

use core::{alloc::Layout, any::TypeId, ptr::NonNull};

use alloc::{boxed::Box, vec::Vec};
use log::{debug, trace};

use crate::{AllocError, AllocResult};

use super::{
    config::IncrementalConfig,
    field::{Field, Managed},
    gc_header::{GcBox, GcColor, GcHeader, GcPhase},
    gray_queue::GrayQueue,
    pointer::{AnyGc, Gc},
};

/// An incremental tri-color collector owning every object allocated through it.
pub struct IncrementalCollector {
    /// Head of the all-objects linked list
    all_objects: Option<AnyGc>,

    /// Tail of the all-objects linked list, where new objects are appended
    last_object: Option<AnyGc>,

    /// Objects that are always live
    roots: Vec<AnyGc>,

    /// Objects marked but whose fields have not been enumerated yet
    gray_queue: GrayQueue,

    /// Current GC phase
    phase: GcPhase,

    /// Whether the sweep cursor below has been initialized for the current cycle
    sweeping: bool,

    /// For incremental sweeping: current position in the all-objects list
    sweep_prev: Option<AnyGc>,
    sweep_current: Option<AnyGc>,

    /// Padded bytes of every object currently owned
    managed_bytes: usize,

    /// Number of objects currently owned
    num_objects: usize,

    /// Stats for current GC cycle
    objects_freed_this_cycle: usize,
    bytes_freed_this_cycle: usize,

    config: IncrementalConfig,

    /// Run a collection step on every allocation, regardless of the threshold
    #[cfg(feature = "gc_stress_test")]
    pub gc_stress_test: bool,
}

impl IncrementalCollector {
    pub fn new() -> IncrementalCollector {
        Self::with_config(IncrementalConfig::default())
    }

    pub fn with_config(config: IncrementalConfig) -> IncrementalCollector {
        IncrementalCollector {
            all_objects: None,
            last_object: None,
            roots: Vec::new(),
            gray_queue: GrayQueue::new(),
            phase: GcPhase::Scan,
            sweeping: false,
            sweep_prev: None,
            sweep_current: None,
            managed_bytes: 0,
            num_objects: 0,
            objects_freed_this_cycle: 0,
            bytes_freed_this_cycle: 0,
            config,

            #[cfg(feature = "gc_stress_test")]
            gc_stress_test: false,
        }
    }

    /// Get current GC phase
    #[inline]
    pub fn phase(&self) -> GcPhase {
        self.phase
    }

    #[inline]
    pub fn config(&self) -> &IncrementalConfig {
        &self.config
    }

    #[inline]
    pub fn set_bytes_threshold(&mut self, bytes_threshold: usize) {
        self.config.bytes_threshold = bytes_threshold;
    }

    #[inline]
    pub fn set_mark_step(&mut self, mark_step: usize) {
        self.config.mark_step = mark_step.max(1);
    }

    #[inline]
    pub fn set_sweep_step(&mut self, sweep_step: usize) {
        self.config.sweep_step = sweep_step.max(1);
    }

    /// Padded bytes of every object currently owned
    #[inline]
    pub fn managed_bytes(&self) -> usize {
        self.managed_bytes
    }

    /// Number of objects currently owned
    #[inline]
    pub fn num_objects(&self) -> usize {
        self.num_objects
    }

    /// Number of objects waiting in the gray queue
    #[inline]
    pub fn num_gray(&self) -> usize {
        self.gray_queue.len()
    }

    /// Whether the object is currently marked (gray or black)
    #[inline]
    pub fn is_marked(&self, object: AnyGc) -> bool {
        object.header().is_marked()
    }

    /// Get the color of an object
    #[inline]
    pub fn color(&self, object: AnyGc) -> GcColor {
        object.header().color()
    }

    // ========================================================================
    // Roots
    // ========================================================================

    /// Register an object that stays live until it is removed from the root set.
    ///
    /// Roots added while a cycle is in flight are marked right away, since the scan that grays
    /// the root set has already run.
    pub fn add_root(&mut self, root: AnyGc) {
        if self.phase != GcPhase::Scan {
            Self::mark_gray(&mut self.gray_queue, root);
        }
        self.roots.push(root);
    }

    /// Unregister one occurrence of a root. Returns whether it was registered.
    ///
    /// A root removed mid-cycle that was already grayed survives the current cycle.
    pub fn remove_root(&mut self, root: AnyGc) -> bool {
        match self.roots.iter().position(|r| r.ptr_eq(&root)) {
            Some(index) => {
                self.roots.swap_remove(index);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn roots(&self) -> &[AnyGc] {
        &self.roots
    }

    // ========================================================================
    // Allocation and barriers
    // ========================================================================

    /// Move `value` into a new managed allocation.
    ///
    /// First advances the collector by one step if the managed bytes exceed the threshold. If a
    /// cycle is in flight the new object is marked immediately, so it survives the current
    /// cycle even if nothing reaches it.
    pub fn alloc<T: Managed>(&mut self, value: T) -> AllocResult<Gc<T>> {
        self.try_collect();

        let layout = Layout::new::<GcBox<T>>();
        let instance_size = layout.pad_to_align().size();

        let ptr = unsafe { alloc::alloc::alloc(layout) } as *mut GcBox<T>;
        let ptr = NonNull::new(ptr).ok_or_else(|| AllocError::oom_for(layout))?;

        unsafe {
            ptr.as_ptr().write(GcBox {
                header: GcHeader::new(instance_size, TypeId::of::<T>()),
                value,
            });
        }

        let object = Gc::from_non_null(ptr);
        let any = object.erase();

        if self.phase != GcPhase::Scan {
            Self::mark_gray(&mut self.gray_queue, any);
        }

        // Link into the tail of the all-objects list
        match self.last_object {
            Some(last) => last.header().set_next_object(Some(any)),
            None => self.all_objects = Some(any),
        }
        self.last_object = Some(any);

        self.managed_bytes += instance_size;
        self.num_objects += 1;

        Ok(object)
    }

    /// Store `value` into `field`, graying it first if it is white.
    ///
    /// Every store into a reference field must go through here. Once an object is black its
    /// fields are never enumerated again in the current cycle, so an unguarded store of a white
    /// object into it would let that object be swept while still referenced.
    #[inline]
    pub fn write_barrier(&mut self, field: &Field, value: Option<AnyGc>) {
        if let Some(object) = value {
            Self::mark_gray(&mut self.gray_queue, object);
        }
        field.store(value);
    }

    /// Create a field holding `value`, applying the same barrier as a store.
    #[inline]
    pub fn field(&mut self, value: Option<AnyGc>) -> Field {
        if let Some(object) = value {
            Self::mark_gray(&mut self.gray_queue, object);
        }
        Field::barriered(value)
    }

    /// Mark an object gray if it is white
    #[inline]
    fn mark_gray(gray_queue: &mut GrayQueue, object: AnyGc) {
        let header = object.header();
        if header.color() == GcColor::White {
            header.set_color(GcColor::Gray);
            gray_queue.push(object);
        }
    }

    // ========================================================================
    // Incremental GC API
    // ========================================================================

    /// Run one step if the managed bytes exceed the threshold.
    fn try_collect(&mut self) {
        #[cfg(feature = "gc_stress_test")]
        let force = self.gc_stress_test;
        #[cfg(not(feature = "gc_stress_test"))]
        let force = false;

        if force || self.managed_bytes > self.config.bytes_threshold {
            self.collect();
        }
    }

    /// Perform one bounded quantum of work for the current phase.
    ///
    /// Returns the phase the collector is in after the step.
    pub fn collect(&mut self) -> GcPhase {
        match self.phase {
            GcPhase::Scan => self.scan_roots(),
            GcPhase::Mark => self.mark_step(),
            GcPhase::Sweep => self.sweep_step(),
        }

        self.phase
    }

    /// Run steps until the current cycle completes, starting a new one if none is in flight.
    ///
    /// Returns the number of steps executed.
    pub fn finish_cycle(&mut self) -> usize {
        let mut steps = 0;
        loop {
            let phase = self.collect();
            steps += 1;
            if phase == GcPhase::Scan {
                break;
            }
        }
        steps
    }

    /// Gray every root and start marking
    fn scan_roots(&mut self) {
        for root in &self.roots {
            Self::mark_gray(&mut self.gray_queue, *root);
        }

        debug!(
            "incremental: scanned {} roots, {} objects gray",
            self.roots.len(),
            self.gray_queue.len()
        );

        self.objects_freed_this_cycle = 0;
        self.bytes_freed_this_cycle = 0;
        self.phase = GcPhase::Mark;
    }

    /// Blacken up to `mark_step` gray objects
    fn mark_step(&mut self) {
        let mut work_done = 0;

        while work_done < self.config.mark_step {
            let object = match self.gray_queue.pop() {
                Some(object) => object,
                None => break,
            };

            object.header().set_color(GcColor::Black);

            for field in object.object().fields() {
                if let Some(child) = field.get() {
                    Self::mark_gray(&mut self.gray_queue, child);
                }
            }

            work_done += 1;
        }

        trace!("incremental: blackened {} objects", work_done);

        if self.gray_queue.is_empty() {
            debug!("incremental: marking complete, sweeping {} objects", self.num_objects);
            self.phase = GcPhase::Sweep;
        }
    }

    /// Visit up to `sweep_step` objects from the sweep cursor
    fn sweep_step(&mut self) {
        if !self.sweeping {
            self.sweep_prev = None;
            self.sweep_current = self.all_objects;
            self.sweeping = true;
        }

        let mut work_done = 0;

        while work_done < self.config.sweep_step {
            let object = match self.sweep_current {
                Some(object) => object,
                None => break,
            };

            let header = object.header();
            let next = header.next_object();

            if header.color() == GcColor::White {
                // Dead object - unlink and free
                match self.sweep_prev {
                    Some(prev) => prev.header().set_next_object(next),
                    None => self.all_objects = next,
                }
                if next.is_none() {
                    self.last_object = self.sweep_prev;
                }

                let instance_size = header.instance_size();
                self.managed_bytes -= instance_size;
                self.num_objects -= 1;
                self.bytes_freed_this_cycle += instance_size;
                self.objects_freed_this_cycle += 1;

                unsafe { drop(Box::from_raw(object.as_non_null().as_ptr())) };
                // Don't update sweep_prev
            } else {
                // Live object - reset to white for next cycle
                header.set_color(GcColor::White);
                self.sweep_prev = Some(object);
            }

            self.sweep_current = next;
            work_done += 1;
        }

        trace!("incremental: swept {} objects", work_done);

        if self.sweep_current.is_none() {
            self.finish_sweep();
        }
    }

    /// Finish sweeping and reset state
    fn finish_sweep(&mut self) {
        // Objects grayed while sweeping are all live. Those the cursor had already passed must
        // start the next cycle white, or they would never have their fields enumerated.
        for object in self.gray_queue.drain() {
            object.header().set_color(GcColor::White);
        }

        debug!(
            "incremental: cycle complete, destroyed {} objects ({} bytes), {} objects live",
            self.objects_freed_this_cycle, self.bytes_freed_this_cycle, self.num_objects
        );

        self.phase = GcPhase::Scan;
        self.sweeping = false;
        self.sweep_prev = None;
        self.sweep_current = None;
    }
}

impl Default for IncrementalCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IncrementalCollector {
    fn drop(&mut self) {
        let mut current = self.all_objects.take();
        while let Some(object) = current {
            current = object.header().next_object();
            unsafe { drop(Box::from_raw(object.as_non_null().as_ptr())) };
        }
        self.last_object = None;
    }
}
