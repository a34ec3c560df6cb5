//! Incremental GC Tests
//!
//! Tests for the phase state machine, allocation during a cycle and the write barrier.

use std::{cell::RefCell, rc::Rc, vec::Vec};

use super::{
    AnyGc, Field, Gc, GcColor, GcPhase, IncrementalCollector, IncrementalConfigBuilder, Managed,
};

type DropLog = Rc<RefCell<Vec<u32>>>;

/// An object with three reference fields
struct Object {
    id: u32,
    fields: [Field; 3],
    log: DropLog,
}

impl Managed for Object {
    fn fields(&self) -> &[Field] {
        &self.fields
    }
}

impl Drop for Object {
    fn drop(&mut self) {
        self.log.borrow_mut().push(self.id);
    }
}

/// An array of references, sized when allocated
struct Vector {
    id: u32,
    items: Vec<Field>,
    log: DropLog,
}

impl Managed for Vector {
    fn fields(&self) -> &[Field] {
        &self.items
    }
}

impl Drop for Vector {
    fn drop(&mut self) {
        self.log.borrow_mut().push(self.id);
    }
}

/// An object without references
struct Leaf {
    id: u32,
    log: DropLog,
}

impl Managed for Leaf {}

impl Drop for Leaf {
    fn drop(&mut self) {
        self.log.borrow_mut().push(self.id);
    }
}

fn object(gc: &mut IncrementalCollector, id: u32, log: &DropLog) -> Gc<Object> {
    gc.alloc(Object {
        id,
        fields: Default::default(),
        log: log.clone(),
    })
    .unwrap()
}

fn vector(
    gc: &mut IncrementalCollector,
    id: u32,
    log: &DropLog,
    items: &[Option<AnyGc>],
) -> Gc<Vector> {
    let items = items.iter().map(|item| gc.field(*item)).collect();
    gc.alloc(Vector {
        id,
        items,
        log: log.clone(),
    })
    .unwrap()
}

fn leaf(gc: &mut IncrementalCollector, id: u32, log: &DropLog) -> Gc<Leaf> {
    gc.alloc(Leaf { id, log: log.clone() }).unwrap()
}

/// A collector that never advances on its own, with the given step sizes
fn manual_collector(mark_step: usize, sweep_step: usize) -> IncrementalCollector {
    IncrementalCollector::with_config(
        IncrementalConfigBuilder::new()
            .bytes_threshold(usize::MAX)
            .mark_step(mark_step)
            .sweep_step(sweep_step)
            .build(),
    )
}

fn sorted(log: &DropLog) -> Vec<u32> {
    let mut ids = log.borrow().clone();
    ids.sort_unstable();
    ids
}

// ============================================================================
// Basic allocation and collection tests
// ============================================================================

#[test]
fn test_basic_alloc() {
    let log = DropLog::default();
    let mut gc = IncrementalCollector::new();

    let obj = leaf(&mut gc, 42, &log);

    assert_eq!(obj.id, 42);
    assert_eq!(gc.num_objects(), 1);
    assert!(gc.managed_bytes() >= core::mem::size_of::<Leaf>());
    assert_eq!(gc.phase(), GcPhase::Scan);
    assert_eq!(gc.color(obj.erase()), GcColor::White);
}

#[test]
fn test_collect_unreachable() {
    let log = DropLog::default();
    let mut gc = IncrementalCollector::new();

    for i in 0..10 {
        leaf(&mut gc, i, &log);
    }

    // Steps: 1 (scan: no roots) + 1 (mark: empty queue -> Sweep) + 1 (sweep: 10 objects)
    let steps = gc.finish_cycle();

    assert_eq!(steps, 3);
    assert_eq!(gc.num_objects(), 0);
    assert_eq!(gc.managed_bytes(), 0);
    assert_eq!(sorted(&log), (0..10).collect::<Vec<_>>());
}

#[test]
fn test_collect_rooted() {
    let log = DropLog::default();
    let mut gc = IncrementalCollector::new();

    let root = leaf(&mut gc, 100, &log);
    for i in 0..10 {
        leaf(&mut gc, i, &log);
    }
    gc.add_root(root.erase());

    let steps = gc.finish_cycle();

    assert_eq!(steps, 3);
    assert_eq!(gc.num_objects(), 1);
    assert_eq!(root.id, 100);
    assert_eq!(gc.color(root.erase()), GcColor::White);
    assert!(!log.borrow().contains(&100));
}

#[test]
fn test_managed_bytes_accounting() {
    let log = DropLog::default();
    let mut gc = IncrementalCollector::new();

    let a = leaf(&mut gc, 0, &log);
    let one = gc.managed_bytes();
    leaf(&mut gc, 1, &log);
    assert_eq!(gc.managed_bytes(), 2 * one);

    gc.add_root(a.erase());
    gc.finish_cycle();
    assert_eq!(gc.managed_bytes(), one);

    assert!(gc.remove_root(a.erase()));
    assert!(!gc.remove_root(a.erase()));
    gc.finish_cycle();
    assert_eq!(gc.managed_bytes(), 0);
    assert_eq!(gc.num_objects(), 0);
}

#[test]
fn test_drop_collector_destroys_everything() {
    let log = DropLog::default();
    {
        let mut gc = manual_collector(1, 1);
        let a = object(&mut gc, 0, &log);
        let b = leaf(&mut gc, 1, &log);
        gc.write_barrier(&a.fields[0], Some(b.erase()));
        vector(&mut gc, 2, &log, &[]);
        gc.add_root(a.erase());

        // Leave a cycle half done
        gc.collect();
        gc.collect();
    }

    assert_eq!(sorted(&log), [0, 1, 2]);
}

// ============================================================================
// Phase sequencing
// ============================================================================

#[test]
fn test_root_field_scenario_step_by_step() {
    let log = DropLog::default();
    let mut gc = manual_collector(1, 1);

    let r = object(&mut gc, 0, &log);
    let a = object(&mut gc, 1, &log);
    gc.write_barrier(&r.fields[0], Some(a.erase()));
    leaf(&mut gc, 2, &log);
    leaf(&mut gc, 3, &log);
    gc.add_root(r.erase());

    // Scan grays the root
    assert_eq!(gc.collect(), GcPhase::Mark);

    // One mark call per object: R, then A
    assert_eq!(gc.collect(), GcPhase::Mark);
    assert_eq!(gc.color(r.erase()), GcColor::Black);
    assert_eq!(gc.collect(), GcPhase::Sweep);
    assert_eq!(gc.color(a.erase()), GcColor::Black);

    // One sweep call per registered object
    for _ in 0..3 {
        assert_eq!(gc.collect(), GcPhase::Sweep);
    }
    assert_eq!(gc.collect(), GcPhase::Scan);

    assert_eq!(sorted(&log), [2, 3]);
    assert_eq!(gc.num_objects(), 2);
    assert_eq!(gc.color(r.erase()), GcColor::White);
    assert_eq!(gc.color(a.erase()), GcColor::White);
}

#[test]
fn test_root_field_scenario_with_zero_threshold() {
    let log = DropLog::default();
    let mut gc = IncrementalCollector::with_config(
        IncrementalConfigBuilder::new()
            .bytes_threshold(0)
            .mark_step(1)
            .sweep_step(1)
            .build(),
    );

    let r = object(&mut gc, 0, &log);
    gc.add_root(r.erase());
    let a = object(&mut gc, 1, &log);
    gc.write_barrier(&r.fields[0], Some(a.erase()));
    leaf(&mut gc, 2, &log);
    leaf(&mut gc, 3, &log);

    // Allocation already advanced the collector. B and C may have been allocated mid-cycle and
    // kept alive by that, but two full cycles reclaim them.
    gc.finish_cycle();
    gc.finish_cycle();

    assert_eq!(sorted(&log), [2, 3]);
    assert_eq!(gc.num_objects(), 2);
    assert_eq!(r.fields[0].get_as::<Object>(), Some(a));
}

#[test]
fn test_mark_step_one_takes_one_call_per_root() {
    let log = DropLog::default();
    let mut gc = manual_collector(1, 100);

    let k = 5;
    for i in 0..k {
        let root = leaf(&mut gc, i, &log);
        gc.add_root(root.erase());
    }

    assert_eq!(gc.collect(), GcPhase::Mark);
    assert_eq!(gc.num_gray(), k as usize);

    for _ in 0..k - 1 {
        assert_eq!(gc.collect(), GcPhase::Mark);
    }
    assert_eq!(gc.collect(), GcPhase::Sweep);
    assert_eq!(gc.num_gray(), 0);
}

#[test]
fn test_mark_step_covering_all_roots_takes_one_call() {
    let log = DropLog::default();
    let mut gc = manual_collector(8, 100);

    for i in 0..5 {
        let root = leaf(&mut gc, i, &log);
        gc.add_root(root.erase());
    }

    assert_eq!(gc.collect(), GcPhase::Mark);
    assert_eq!(gc.collect(), GcPhase::Sweep);
}

#[test]
fn test_chain_step_counts() {
    let log = DropLog::default();
    let mut gc = manual_collector(10, 10);

    // Built back to front, each node holding the one allocated before it
    let mut head = vector(&mut gc, 99, &log, &[]);
    for id in (0..99).rev() {
        head = vector(&mut gc, id, &log, &[Some(head.erase())]);
    }
    gc.add_root(head.erase());

    // Fields created outside a cycle gray their values; settle that first
    gc.finish_cycle();
    assert_eq!(gc.num_objects(), 100);

    // Steps: 1 (scan) + 10 (mark: 100 objects, 10 per step) + 10 (sweep: 10 per step)
    let steps = gc.finish_cycle();
    assert_eq!(steps, 21);
    assert_eq!(gc.num_objects(), 100);

    gc.remove_root(head.erase());

    // Steps: 1 (scan) + 1 (mark: empty queue) + 10 (sweep)
    let steps = gc.finish_cycle();
    assert_eq!(steps, 12);
    assert_eq!(gc.num_objects(), 0);
}

#[test]
fn test_sweep_resumes_across_calls() {
    let log = DropLog::default();
    let mut gc = manual_collector(100, 2);

    for i in 0..5 {
        leaf(&mut gc, i, &log);
    }

    gc.collect();
    assert_eq!(gc.collect(), GcPhase::Sweep);

    assert_eq!(gc.collect(), GcPhase::Sweep);
    assert_eq!(sorted(&log), [0, 1]);
    assert_eq!(gc.collect(), GcPhase::Sweep);
    assert_eq!(sorted(&log), [0, 1, 2, 3]);
    assert_eq!(gc.collect(), GcPhase::Scan);
    assert_eq!(sorted(&log), [0, 1, 2, 3, 4]);
}

#[test]
fn test_cycles_collected_and_kept() {
    let log = DropLog::default();
    let mut gc = manual_collector(1, 1);

    // a <-> b unrooted, c -> d -> c rooted
    let a = object(&mut gc, 0, &log);
    let b = object(&mut gc, 1, &log);
    gc.write_barrier(&a.fields[0], Some(b.erase()));
    gc.write_barrier(&b.fields[0], Some(a.erase()));
    let c = object(&mut gc, 2, &log);
    let d = object(&mut gc, 3, &log);
    gc.write_barrier(&c.fields[0], Some(d.erase()));
    gc.write_barrier(&d.fields[0], Some(c.erase()));
    let self_ref = object(&mut gc, 4, &log);
    gc.write_barrier(&self_ref.fields[0], Some(self_ref.erase()));
    gc.add_root(c.erase());

    // Barriered stores outside a cycle grayed everything; the second cycle sees the real graph
    gc.finish_cycle();
    gc.finish_cycle();

    assert_eq!(sorted(&log), [0, 1, 4]);
    assert_eq!(gc.num_objects(), 2);
}

// ============================================================================
// Allocation driven collection
// ============================================================================

#[test]
fn test_alloc_above_threshold_advances_collector() {
    let log = DropLog::default();
    let mut gc = IncrementalCollector::with_config(
        IncrementalConfigBuilder::new()
            .bytes_threshold(0)
            .mark_step(1)
            .sweep_step(1)
            .build(),
    );

    // Nothing managed yet, so no step runs
    let first = leaf(&mut gc, 0, &log);
    assert_eq!(gc.phase(), GcPhase::Scan);
    assert!(!gc.is_marked(first.erase()));

    // Above the threshold: the scan step runs, then the new object is allocated marked
    let second = leaf(&mut gc, 1, &log);
    assert_eq!(gc.phase(), GcPhase::Mark);
    assert!(gc.is_marked(second.erase()));
    assert!(!gc.is_marked(first.erase()));
}

#[test]
fn test_threshold_setter_takes_effect() {
    let log = DropLog::default();
    let mut gc = IncrementalCollector::new();

    leaf(&mut gc, 0, &log);
    leaf(&mut gc, 1, &log);
    assert_eq!(gc.phase(), GcPhase::Scan);

    gc.set_bytes_threshold(1);
    gc.set_mark_step(0);
    gc.set_sweep_step(0);
    assert_eq!(gc.config().mark_step, 1);
    assert_eq!(gc.config().sweep_step, 1);

    leaf(&mut gc, 2, &log);
    assert_eq!(gc.phase(), GcPhase::Mark);
}

// ============================================================================
// Allocate black
// ============================================================================

#[test]
fn test_alloc_during_mark_survives_one_cycle() {
    let log = DropLog::default();
    let mut gc = manual_collector(1, 1);

    let root = leaf(&mut gc, 0, &log);
    gc.add_root(root.erase());

    assert_eq!(gc.collect(), GcPhase::Mark);

    // Unattached and not a root, but allocated mid-cycle
    let floating = leaf(&mut gc, 1, &log);
    assert!(gc.is_marked(floating.erase()));

    gc.finish_cycle();
    assert!(log.borrow().is_empty());
    assert_eq!(gc.num_objects(), 2);
    assert_eq!(gc.color(floating.erase()), GcColor::White);

    gc.finish_cycle();
    assert_eq!(sorted(&log), [1]);
    assert_eq!(gc.num_objects(), 1);
}

#[test]
fn test_alloc_during_sweep_survives_one_cycle() {
    let log = DropLog::default();
    let mut gc = manual_collector(1, 1);

    let root = leaf(&mut gc, 0, &log);
    gc.add_root(root.erase());
    leaf(&mut gc, 1, &log);
    leaf(&mut gc, 2, &log);

    gc.collect();
    assert_eq!(gc.collect(), GcPhase::Sweep);
    assert_eq!(gc.collect(), GcPhase::Sweep);

    let floating = leaf(&mut gc, 3, &log);

    gc.finish_cycle();
    assert_eq!(sorted(&log), [1, 2]);
    assert_eq!(gc.color(floating.erase()), GcColor::White);

    gc.finish_cycle();
    assert_eq!(sorted(&log), [1, 2, 3]);
    assert_eq!(gc.num_objects(), 1);
}

// ============================================================================
// Roots changing mid-cycle
// ============================================================================

#[test]
fn test_root_added_during_mark_survives() {
    let log = DropLog::default();
    let mut gc = manual_collector(1, 1);

    let anchor = leaf(&mut gc, 0, &log);
    let late = leaf(&mut gc, 1, &log);
    gc.add_root(anchor.erase());

    assert_eq!(gc.collect(), GcPhase::Mark);
    gc.add_root(late.erase());
    assert!(gc.is_marked(late.erase()));

    gc.finish_cycle();
    assert!(log.borrow().is_empty());

    gc.finish_cycle();
    assert!(log.borrow().is_empty());
    assert_eq!(gc.num_objects(), 2);
    assert_eq!(gc.roots().len(), 2);
}

#[test]
fn test_root_added_during_sweep_survives() {
    let log = DropLog::default();
    let mut gc = manual_collector(1, 1);

    // anchor -> child, then loose and late unattached
    let anchor = object(&mut gc, 0, &log);
    let child = leaf(&mut gc, 1, &log);
    gc.write_barrier(&anchor.fields[0], Some(child.erase()));
    gc.add_root(anchor.erase());
    gc.finish_cycle();

    leaf(&mut gc, 2, &log);
    let late = leaf(&mut gc, 3, &log);

    while gc.phase() != GcPhase::Sweep {
        gc.collect();
    }
    // Sweep past anchor and child
    gc.collect();
    gc.collect();

    // child becomes a root behind the sweep cursor, late one ahead of it
    gc.write_barrier(&anchor.fields[0], None);
    gc.add_root(child.erase());
    gc.add_root(late.erase());

    gc.finish_cycle();
    assert_eq!(sorted(&log), [2]);
    assert_eq!(gc.color(child.erase()), GcColor::White);
    assert_eq!(gc.color(late.erase()), GcColor::White);

    gc.finish_cycle();
    gc.finish_cycle();
    assert_eq!(sorted(&log), [2]);
    assert_eq!(gc.num_objects(), 3);
}

#[test]
fn test_root_removed_during_mark_survives_current_cycle() {
    let log = DropLog::default();
    let mut gc = manual_collector(1, 1);

    let root = leaf(&mut gc, 0, &log);
    gc.add_root(root.erase());

    assert_eq!(gc.collect(), GcPhase::Mark);
    assert!(gc.remove_root(root.erase()));

    gc.finish_cycle();
    assert!(log.borrow().is_empty());

    gc.finish_cycle();
    assert_eq!(sorted(&log), [0]);
}

// ============================================================================
// Write barrier
// ============================================================================

/// Root R holds X, X holds W. Returns after R has been blackened and X is still gray.
fn black_root_with_gray_child(
    gc: &mut IncrementalCollector,
    log: &DropLog,
) -> (Gc<Object>, Gc<Object>, Gc<Leaf>) {
    let r = object(gc, 0, log);
    let x = object(gc, 1, log);
    let w = leaf(gc, 2, log);
    gc.write_barrier(&r.fields[0], Some(x.erase()));
    gc.write_barrier(&x.fields[0], Some(w.erase()));
    gc.add_root(r.erase());

    // Settle the graph so every object starts the next cycle white
    gc.finish_cycle();
    assert!(log.borrow().is_empty());

    assert_eq!(gc.collect(), GcPhase::Mark);
    assert_eq!(gc.collect(), GcPhase::Mark);
    assert_eq!(gc.color(r.erase()), GcColor::Black);
    assert_eq!(gc.color(x.erase()), GcColor::Gray);
    assert_eq!(gc.color(w.erase()), GcColor::White);

    (r, x, w)
}

#[test]
fn test_unbarriered_store_into_black_object_loses_target() {
    let log = DropLog::default();
    let mut gc = manual_collector(1, 1);

    let (r, x, w) = black_root_with_gray_child(&mut gc, &log);

    // Move W from the gray X into the black R, bypassing the barrier for the store into R
    unsafe { r.fields[1].set_unbarriered(Some(w.erase())) };
    gc.write_barrier(&x.fields[0], None);

    gc.finish_cycle();

    // W was destroyed even though R still references it
    assert_eq!(sorted(&log), [2]);
    unsafe { r.fields[1].set_unbarriered(None) };
}

#[test]
fn test_barriered_store_into_black_object_keeps_target() {
    let log = DropLog::default();
    let mut gc = manual_collector(1, 1);

    let (r, x, w) = black_root_with_gray_child(&mut gc, &log);

    gc.write_barrier(&r.fields[1], Some(w.erase()));
    assert_eq!(gc.color(w.erase()), GcColor::Gray);
    gc.write_barrier(&x.fields[0], None);

    gc.finish_cycle();
    assert!(log.borrow().is_empty());

    gc.finish_cycle();
    assert!(log.borrow().is_empty());
    assert_eq!(r.fields[1].get_as::<Leaf>(), Some(w));
    assert_eq!(gc.num_objects(), 3);
}

#[test]
fn test_moving_reference_between_fields_keeps_target() {
    let log = DropLog::default();
    let mut gc = manual_collector(1, 1);

    let (r, x, w) = black_root_with_gray_child(&mut gc, &log);

    // Move W out of the gray X and into the black R
    let moved = x.fields[0].get();
    gc.write_barrier(&r.fields[1], moved);
    gc.write_barrier(&x.fields[0], None);

    gc.finish_cycle();
    gc.finish_cycle();

    assert!(log.borrow().is_empty());
    assert!(x.fields[0].is_empty());
    assert_eq!(r.fields[1].get_as::<Leaf>(), Some(w));
}

#[test]
fn test_store_behind_sweep_cursor_still_traced_next_cycle() {
    let log = DropLog::default();
    let mut gc = manual_collector(1, 1);

    // R -> Q -> Z, all rooted through R
    let r = object(&mut gc, 0, &log);
    let q = object(&mut gc, 1, &log);
    let z = leaf(&mut gc, 2, &log);
    gc.write_barrier(&r.fields[0], Some(q.erase()));
    gc.write_barrier(&q.fields[0], Some(z.erase()));
    gc.add_root(r.erase());
    gc.finish_cycle();

    // Advance until the sweep cursor has passed R and Q
    while gc.phase() != GcPhase::Sweep {
        gc.collect();
    }
    gc.collect();
    gc.collect();
    assert_eq!(gc.color(q.erase()), GcColor::White);

    // Q has already been swept, the barrier grays it anyway
    gc.write_barrier(&r.fields[1], Some(q.erase()));

    gc.finish_cycle();
    assert_eq!(gc.color(q.erase()), GcColor::White);

    // The next cycle must enumerate Q's fields again, keeping Z alive
    gc.finish_cycle();
    assert!(log.borrow().is_empty());
    assert_eq!(gc.num_objects(), 3);
    assert_eq!(q.fields[0].get_as::<Leaf>(), Some(z));
}

#[test]
fn test_field_views() {
    let log = DropLog::default();
    let mut gc = manual_collector(1, 1);

    let a = leaf(&mut gc, 1, &log);
    let vec = vector(&mut gc, 0, &log, &[None, Some(a.erase()), None]);

    assert_eq!(vec.fields().len(), 3);
    assert!(vec.fields()[0].is_empty());
    assert_eq!(vec.fields()[1].get(), Some(a.erase()));
    assert_eq!(vec.fields()[1].get_as::<Leaf>(), Some(a));
    assert_eq!(vec.fields()[1].get_as::<Object>(), None);

    let any = vec.erase();
    assert!(any.is::<Vector>());
    assert_eq!(any.object().fields().len(), 3);
    assert_eq!(any.downcast::<Vector>(), Some(vec));

    let leaf_fields: &[Field] = a.fields();
    assert!(leaf_fields.is_empty());
}
