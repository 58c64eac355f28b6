use catalog_core::hierarchy::{self, Hierarchical, SortOrder};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

#[derive(Clone)]
struct Node {
    key: String,
    parent: Option<String>,
    name: String,
}

impl Hierarchical for Node {
    fn node_key(&self) -> &str {
        &self.key
    }

    fn parent_node_key(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn sort_name(&self) -> &str {
        &self.name
    }
}

fn node(i: usize, parent: Option<usize>) -> Node {
    Node {
        key: format!("urn:li:glossaryNode:{i}"),
        parent: parent.map(|p| format!("urn:li:glossaryNode:{p}")),
        name: format!("term {:05}", (i * 7919) % 100_000),
    }
}

/// Every node is the child of the one before it, listed leaf first.
fn deep_chain(len: usize) -> Vec<Node> {
    (0..len)
        .rev()
        .map(|i| node(i, i.checked_sub(1)))
        .collect()
}

/// Ten roots, each with a two-level fan-out.
fn wide_forest(len: usize) -> Vec<Node> {
    (0..len)
        .map(|i| match i {
            0..10 => node(i, None),
            _ => node(i, Some(i / 10)),
        })
        .collect()
}

fn build_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("hierarchy::build");
    for len in [1_000, 10_000] {
        let chain = deep_chain(len);
        group.bench_with_input(BenchmarkId::new("deep_chain", len), &chain, |b, items| {
            b.iter(|| hierarchy::build(black_box(items.clone())))
        });

        let wide = wide_forest(len);
        group.bench_with_input(BenchmarkId::new("wide_forest", len), &wide, |b, items| {
            b.iter(|| hierarchy::build_sorted(black_box(items.clone()), SortOrder::AllByName))
        });
    }
    group.finish();
}

fn walk_benchmark(c: &mut Criterion) {
    c.bench_function("hierarchy::Forest::walk (10k chain)", |b| {
        let forest = hierarchy::build(deep_chain(10_000));
        b.iter(|| black_box(forest.walk().map(|(depth, _)| depth).max()))
    });
}

criterion_group!(benches, build_benchmark, walk_benchmark);
criterion_main!(benches);
