use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use ember_gc::{
    copying::{EvacuatingCollector, Evacuate, Handle, Relocator},
    incremental::{Field, IncrementalCollector, IncrementalConfigBuilder, Managed},
    mark_sweep::{GcPtr, Trace, TracingCollector},
};

const TREE_DEPTHS: [u32; 3] = [8, 12, 14];

// ============================================================================
// Mark-sweep
// ============================================================================

struct TraceNode {
    left: Option<GcPtr<TraceNode>>,
    right: Option<GcPtr<TraceNode>>,
}

impl Trace for TraceNode {
    fn trace(&self, gc: &TracingCollector) {
        gc.mark_opt(self.left);
        gc.mark_opt(self.right);
    }
}

fn trace_tree(gc: &mut TracingCollector, depth: u32) -> GcPtr<TraceNode> {
    let (left, right) = if depth == 0 {
        (None, None)
    } else {
        (Some(trace_tree(gc, depth - 1)), Some(trace_tree(gc, depth - 1)))
    };
    GcPtr::new(gc, TraceNode { left, right }).unwrap()
}

fn bench_mark_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("mark_sweep");

    for depth in TREE_DEPTHS {
        group.bench_with_input(BenchmarkId::new("tree_half_live", depth), &depth, |b, &depth| {
            b.iter(|| {
                let mut gc = TracingCollector::new();
                let live = trace_tree(&mut gc, depth);
                trace_tree(&mut gc, depth);

                gc.mark(live);
                black_box(gc.collect())
            })
        });
    }

    group.finish();
}

// ============================================================================
// Copying
// ============================================================================

struct CopyNode {
    left: Option<Handle<CopyNode>>,
    right: Option<Handle<CopyNode>>,
}

impl Evacuate for CopyNode {
    fn relocate(&mut self, relocator: &mut Relocator<'_>) {
        relocator.visit_opt(&mut self.left);
        relocator.visit_opt(&mut self.right);
    }
}

/// Builds a tree under a single root. Children are linked after allocation, since an
/// allocation may move every object.
fn copy_tree(gc: &mut EvacuatingCollector, depth: u32) -> ember_gc::copying::RootId {
    let node = gc.alloc(CopyNode { left: None, right: None }).unwrap();
    let root = gc.push_root(node);

    if depth > 0 {
        let left = copy_tree(gc, depth - 1);
        let right = copy_tree(gc, depth - 1);

        let left_handle = gc.root::<CopyNode>(left);
        let right_handle = gc.root::<CopyNode>(right);
        let node = gc.root::<CopyNode>(root).unwrap();
        let node = gc.get_mut(node);
        node.left = left_handle;
        node.right = right_handle;

        gc.remove_root(left);
        gc.remove_root(right);
    }

    root
}

fn bench_copying(c: &mut Criterion) {
    let mut group = c.benchmark_group("copying");

    for depth in TREE_DEPTHS {
        group.bench_with_input(BenchmarkId::new("tree_collect", depth), &depth, |b, &depth| {
            let mut gc = EvacuatingCollector::new().unwrap();
            copy_tree(&mut gc, depth);

            b.iter(|| {
                gc.collect();
                black_box(gc.stats().bytes_in_use)
            })
        });
    }

    group.bench_function("alloc_churn", |b| {
        let mut gc = EvacuatingCollector::new().unwrap();
        copy_tree(&mut gc, 8);

        b.iter(|| {
            for _ in 0..1000 {
                black_box(gc.alloc(CopyNode { left: None, right: None }).unwrap());
            }
        })
    });

    group.finish();
}

// ============================================================================
// Incremental
// ============================================================================

struct IncNode {
    fields: [Field; 2],
}

impl Managed for IncNode {
    fn fields(&self) -> &[Field] {
        &self.fields
    }
}

fn inc_tree(gc: &mut IncrementalCollector, depth: u32) -> ember_gc::incremental::Gc<IncNode> {
    let node = gc
        .alloc(IncNode {
            fields: Default::default(),
        })
        .unwrap();

    if depth > 0 {
        let left = inc_tree(gc, depth - 1);
        let right = inc_tree(gc, depth - 1);
        gc.write_barrier(&node.fields[0], Some(left.erase()));
        gc.write_barrier(&node.fields[1], Some(right.erase()));
    }

    node
}

fn bench_incremental(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental");

    for depth in TREE_DEPTHS {
        group.bench_with_input(BenchmarkId::new("tree_cycle", depth), &depth, |b, &depth| {
            let mut gc = IncrementalCollector::new();
            let root = inc_tree(&mut gc, depth);
            gc.add_root(root.erase());
            gc.finish_cycle();

            b.iter(|| black_box(gc.finish_cycle()))
        });
    }

    group.bench_function("alloc_churn_small_steps", |b| {
        let mut gc = IncrementalCollector::with_config(
            IncrementalConfigBuilder::new()
                .bytes_threshold(64 * 1024)
                .mark_step(64)
                .sweep_step(64)
                .build(),
        );
        let root = inc_tree(&mut gc, 8);
        gc.add_root(root.erase());

        b.iter(|| {
            for _ in 0..1000 {
                black_box(
                    gc.alloc(IncNode {
                        fields: Default::default(),
                    })
                    .unwrap(),
                );
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_mark_sweep, bench_copying, bench_incremental);
criterion_main!(benches);
