//! Ray query throughput per SIMD tier.
//!
//! Run with: cargo bench -p vcad-kernel-trimesh

#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nalgebra::{Point3, Vector3};
use vcad_kernel_trimesh::{Ray, SimdTier, TriangleMesh};

/// Flat grid of `side * side * 2` triangles in the z = 0 plane.
fn grid(side: usize) -> Vec<f32> {
    let mut vertices = Vec::with_capacity(side * side * 18);
    for i in 0..side {
        for j in 0..side {
            let (x, y) = (i as f32, j as f32);
            vertices.extend_from_slice(&[x, y, 0.0, x + 1.0, y, 0.0, x, y + 1.0, 0.0]);
            vertices.extend_from_slice(&[x + 1.0, y, 0.0, x + 1.0, y + 1.0, 0.0, x, y + 1.0, 0.0]);
        }
    }
    vertices
}

fn rays(side: usize, count: usize) -> Vec<Ray> {
    let extent = side as f32;
    (0..count)
        .map(|k| {
            let f = k as f32 / count as f32;
            Ray::new(
                Point3::new(f * extent, (1.0 - f) * extent, 10.0),
                Vector3::new(0.01, -0.02, -1.0),
            )
        })
        .collect()
}

fn bench_intersect_ray(c: &mut Criterion) {
    let mut group = c.benchmark_group("intersect_ray");

    for side in [8, 32, 128] {
        let vertices = grid(side);
        let queries = rays(side, 64);
        group.throughput(Throughput::Elements((side * side * 2 * queries.len()) as u64));

        for tier in SimdTier::ALL {
            let mut mesh = TriangleMesh::with_tier(tier);
            if mesh.set(&vertices).is_err() {
                continue;
            }
            group.bench_with_input(BenchmarkId::new(tier.as_str(), side * side * 2), &mesh, |b, mesh| {
                b.iter(|| {
                    for ray in &queries {
                        black_box(mesh.intersect_ray_distance(ray));
                    }
                });
            });
        }
    }

    group.finish();
}

fn bench_intersect_ray_par(c: &mut Criterion) {
    let mut group = c.benchmark_group("intersect_ray_par");
    let side = 256;
    let vertices = grid(side);
    let queries = rays(side, 16);

    for tier in SimdTier::ALL {
        let mut mesh = TriangleMesh::with_tier(tier);
        if mesh.set(&vertices).is_err() {
            continue;
        }
        group.bench_function(tier.as_str(), |b| {
            b.iter(|| {
                for ray in &queries {
                    black_box(mesh.intersect_ray_par(ray));
                }
            });
        });
    }

    group.finish();
}

fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("set");
    let vertices = grid(128);

    for tier in SimdTier::ALL {
        let mut mesh = TriangleMesh::with_tier(tier);
        group.bench_function(tier.as_str(), |b| {
            b.iter(|| mesh.set(black_box(&vertices)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_intersect_ray, bench_intersect_ray_par, bench_set);
criterion_main!(benches);
