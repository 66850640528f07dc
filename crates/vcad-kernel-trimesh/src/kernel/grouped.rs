//! Grouped (structure-of-arrays) kernel, generic over lane width.

use super::lanes::{SimdLanes, MAX_LANES};
use super::{solve, V3, DET_EPSILON};
use crate::layout::FLOATS_PER_TRIANGLE;
use crate::ray::{MeshHit, Ray};

/// Nearest hit over the full groups in `data`.
///
/// `data` holds whole groups of `L::WIDTH` triangles in grouped layout
/// (absolute A, then `B - A`, then `C - A`, each channel `L::WIDTH` wide).
/// Its first group is group `first_group` of the mesh, so lane `i` of local
/// group `g` is mesh triangle `(first_group + g) * L::WIDTH + i`.
///
/// Each lane keeps its own running minimum with a strict `<`, so on ties a
/// lane keeps its earliest group; the lanes are then reduced by `(t, index)`.
/// The result is therefore the same triangle the scalar kernel would report.
pub fn intersect_groups<L: SimdLanes>(data: &[f32], ray: &Ray, first_group: usize) -> Option<MeshHit> {
    let width = L::WIDTH;
    let group_len = width * FLOATS_PER_TRIANGLE;
    debug_assert!(width <= MAX_LANES);
    debug_assert_eq!(data.len() % group_len, 0, "grouped region is not a whole number of groups");

    let origin = V3::new(L::splat(ray.origin.x), L::splat(ray.origin.y), L::splat(ray.origin.z));
    let dir = V3::new(
        L::splat(ray.direction.x),
        L::splat(ray.direction.y),
        L::splat(ray.direction.z),
    );
    let zero = L::splat(0.0);
    let one = L::splat(1.0);
    let epsilon = L::splat(DET_EPSILON);
    let infinity = L::splat(f32::INFINITY);

    let mut best_t = infinity;
    let mut best_u = zero;
    let mut best_v = zero;
    let mut best_group = [0usize; MAX_LANES];

    for (g, group) in data.chunks_exact(group_len).enumerate() {
        let channel = |k: usize| L::load(&group[k * width..(k + 1) * width]);
        let a = V3::new(channel(0), channel(1), channel(2));
        let e1 = V3::new(channel(3), channel(4), channel(5));
        let e2 = V3::new(channel(6), channel(7), channel(8));

        let s = solve(origin, dir, a, e1, e2, one);
        let accepted = s
            .det
            .abs_lanes()
            .mask_ge(epsilon)
            .mask_and(s.u.mask_ge(zero))
            .mask_and(s.v.mask_ge(zero))
            .mask_and((s.u + s.v).mask_le(one))
            .mask_and(s.t.mask_ge(zero));
        let t = L::select(accepted, s.t, infinity);

        let closer = t.mask_lt(best_t);
        let bits = closer.bitmask();
        if bits == 0 {
            continue;
        }

        best_t = L::select(closer, t, best_t);
        best_u = L::select(closer, s.u, best_u);
        best_v = L::select(closer, s.v, best_v);
        for (lane, slot) in best_group.iter_mut().enumerate().take(width) {
            if bits & (1 << lane) != 0 {
                *slot = first_group + g;
            }
        }
    }

    reduce_lanes::<L>(best_t, best_u, best_v, &best_group)
}

/// Horizontal reduction of per-lane candidates to the single nearest hit.
fn reduce_lanes<L: SimdLanes>(t: L, u: L, v: L, group: &[usize; MAX_LANES]) -> Option<MeshHit> {
    let width = L::WIDTH;
    let mut ts = [f32::INFINITY; MAX_LANES];
    let mut us = [0.0f32; MAX_LANES];
    let mut vs = [0.0f32; MAX_LANES];
    t.store(&mut ts);
    u.store(&mut us);
    v.store(&mut vs);

    (0..width)
        .filter(|&lane| ts[lane] < f32::INFINITY)
        .map(|lane| MeshHit {
            t: ts[lane],
            triangle_index: group[lane] * width + lane,
            u: us[lane],
            v: vs[lane],
        })
        .fold(None, |nearest, hit| MeshHit::nearest(nearest, Some(hit)))
}
