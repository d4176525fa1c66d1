//! Benchmarks for mesh operations.

use criterion::{criterion_group, criterion_main, Criterion};
use dtsmesh::prelude::*;

fn grid_arrays(n: usize) -> MeshArrays {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    let mut triangles = Vec::with_capacity(n * n * 2);

    // Create grid vertices on a gentle paraboloid so curvature is non-trivial
    for j in 0..=n {
        for i in 0..=n {
            let (x, y) = (i as f64 / n as f64, j as f64 / n as f64);
            vertices.push([x, y, 0.25 * (x * x + y * y)]);
        }
    }

    // Create triangles
    for j in 0..n {
        for i in 0..n {
            let v00 = (j * (n + 1) + i) as i64;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1) as i64;
            let v11 = v01 + 1;

            triangles.push([v00, v10, v11]);
            triangles.push([v00, v11, v01]);
        }
    }

    MeshArrays::from_rows(&vertices, &triangles)
}

fn bench_mesh_construction(c: &mut Criterion) {
    let arrays = grid_arrays(100);

    c.bench_function("blueprint_grid_100x100", |b| {
        b.iter(|| build_blueprint(&arrays).unwrap())
    });

    let blueprint = build_blueprint(&arrays).unwrap();
    c.bench_function("topology_grid_100x100", |b| {
        b.iter(|| {
            let mesh: Mesh = generate(&blueprint).unwrap();
            mesh
        })
    });
}

fn bench_curvature(c: &mut Criterion) {
    let arrays = grid_arrays(100);
    let mesh: Mesh = generate(&build_blueprint(&arrays).unwrap()).unwrap();

    c.bench_function("curvature_grid_100x100_parallel", |b| {
        let engine = CurvatureEngine::new(CurvatureOptions::default());
        b.iter(|| engine.initialize(&mesh))
    });

    c.bench_function("curvature_grid_100x100_sequential", |b| {
        let engine = CurvatureEngine::new(CurvatureOptions::sequential());
        b.iter(|| engine.initialize(&mesh))
    });
}

criterion_group!(benches, bench_mesh_construction, bench_curvature);
criterion_main!(benches);
