//! Benchmarks for panel tree editing
//!
//! This benchmark measures:
//! - Lookup and copy-on-write edits on trees of increasing depth
//! - Preset instantiation (fresh id minting)
//! - Project serialization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use panelkit::preset::{builtin_presets, find_preset};
use panelkit::tree::{self, Node, NodeId, SplitDirection};
use panelkit::Project;

/// Repeatedly split the last leaf until the tree is `depth` levels deep.
fn deep_tree(depth: usize) -> (Node, NodeId) {
    let mut page = find_preset("Grid 2x2").unwrap().instantiate();
    for level in 0..depth {
        let target = page.leaves().last().unwrap().id.clone();
        let direction = if level % 2 == 0 {
            SplitDirection::Vertical
        } else {
            SplitDirection::Horizontal
        };
        page = tree::split_node(&page, &target, direction, 3);
    }
    let deepest = page.leaves().last().unwrap().id.clone();
    (page, deepest)
}

fn bench_tree_edits(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_edits");

    for depth in [2usize, 8, 32] {
        let (page, deepest) = deep_tree(depth);
        group.throughput(Throughput::Elements(page.ids().len() as u64));

        group.bench_with_input(BenchmarkId::new("find_node", depth), &page, |b, page| {
            b.iter(|| tree::find_node(black_box(page), black_box(&deepest)))
        });

        group.bench_with_input(BenchmarkId::new("duplicate", depth), &page, |b, page| {
            b.iter(|| tree::duplicate_node_in_parent(black_box(page), black_box(&deepest)))
        });

        let parent = tree::find_parent_node(&page, &deepest).unwrap().id.clone();
        group.bench_with_input(BenchmarkId::new("resize_split", depth), &page, |b, page| {
            b.iter(|| tree::resize_split(black_box(page), black_box(&parent), 0, 0.05))
        });
    }

    group.finish();
}

fn bench_presets(c: &mut Criterion) {
    let mut group = c.benchmark_group("presets");
    group.throughput(Throughput::Elements(builtin_presets().len() as u64));

    group.bench_function("instantiate_catalog", |b| {
        b.iter(|| {
            builtin_presets()
                .iter()
                .map(|p| p.instantiate())
                .collect::<Vec<_>>()
        })
    });

    let mut project = Project::new("bench", find_preset("Classic 6-Panel").unwrap());
    for preset in builtin_presets() {
        project.add_page(preset);
    }
    group.bench_function("project_to_json", |b| {
        b.iter(|| black_box(&project).to_json().unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_tree_edits, bench_presets);
criterion_main!(benches);
