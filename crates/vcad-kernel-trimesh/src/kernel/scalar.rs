//! Scalar kernel over interleaved triangles.

use super::{solve, V3};
use crate::layout::PackedTriangle;
use crate::ray::{MeshHit, Ray, Triangle};

/// Determinants with a smaller magnitude count as degenerate (no hit).
pub const DET_EPSILON: f32 = 1e-6;

#[inline(always)]
fn ray_lanes(ray: &Ray) -> (V3<f32>, V3<f32>) {
    (
        V3::new(ray.origin.x, ray.origin.y, ray.origin.z),
        V3::new(ray.direction.x, ray.direction.y, ray.direction.z),
    )
}

/// Test one triangle given as vertex `a` and edges `e1 = b - a`, `e2 = c - a`.
///
/// Returns `(t, u, v)` when the ray hits the triangle at `t >= 0`.
#[inline(always)]
fn test_edges(origin: V3<f32>, dir: V3<f32>, a: V3<f32>, e1: V3<f32>, e2: V3<f32>) -> Option<(f32, f32, f32)> {
    let s = solve(origin, dir, a, e1, e2, 1.0);
    let accepted = s.det.abs() >= DET_EPSILON
        && s.u >= 0.0
        && s.v >= 0.0
        && s.u + s.v <= 1.0
        && s.t >= 0.0;
    accepted.then_some((s.t, s.u, s.v))
}

/// Intersect a ray with a single triangle.
///
/// Returns `(t, u, v)` with `t` in multiples of the ray direction's length,
/// or `None` for a miss, a hit behind the origin, or a degenerate triangle.
pub fn intersect_triangle(ray: &Ray, triangle: &Triangle) -> Option<(f32, f32, f32)> {
    let (origin, dir) = ray_lanes(ray);
    let a = V3::new(triangle.a.x, triangle.a.y, triangle.a.z);
    let b = V3::new(triangle.b.x, triangle.b.y, triangle.b.z);
    let c = V3::new(triangle.c.x, triangle.c.y, triangle.c.z);
    test_edges(origin, dir, a, b - a, c - a)
}

/// Nearest hit among `triangles`, whose first element is mesh triangle `first_index`.
///
/// Ties keep the earliest triangle.
pub fn intersect_interleaved(triangles: &[PackedTriangle], ray: &Ray, first_index: usize) -> Option<MeshHit> {
    let (origin, dir) = ray_lanes(ray);
    let mut nearest_t = f32::INFINITY;
    let mut nearest = None;

    for (i, tri) in triangles.iter().enumerate() {
        let a = V3::from(tri.a);
        let e1 = V3::from(tri.b) - a;
        let e2 = V3::from(tri.c) - a;

        if let Some((t, u, v)) = test_edges(origin, dir, a, e1, e2) {
            if t < nearest_t {
                nearest_t = t;
                nearest = Some(MeshHit {
                    t,
                    triangle_index: first_index + i,
                    u,
                    v,
                });
            }
        }
    }

    nearest
}
