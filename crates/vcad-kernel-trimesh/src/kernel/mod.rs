//! Ray / triangle intersection kernels.
//!
//! One kernel per [`Layout`](crate::Layout):
//!
//! - [`scalar`] walks interleaved triangles one at a time.
//! - [`grouped`] tests a whole group per step, generic over the lane type
//!   ([`SimdLanes`]), and is instantiated for 4 and 8 lanes.
//!
//! Both evaluate the Möller–Trumbore test through the same [`V3`] helpers, so
//! every lane performs exactly the IEEE operations the scalar path performs,
//! in the same order. Distances and barycentrics are therefore bit-identical
//! across layouts.

pub mod grouped;
pub mod lanes;
pub mod scalar;

use std::ops::{Add, Div, Mul, Sub};

pub use lanes::SimdLanes;
pub use scalar::{intersect_triangle, DET_EPSILON};

/// Arithmetic shared by `f32` and vector lanes.
pub trait Arith:
    Copy + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> + Div<Output = Self>
{
}

impl<T> Arith for T where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<Output = T> + Div<Output = T>
{
}

/// Three-component vector over scalars or lanes.
#[derive(Debug, Clone, Copy)]
pub struct V3<T> {
    /// X component.
    pub x: T,
    /// Y component.
    pub y: T,
    /// Z component.
    pub z: T,
}

impl<T: Arith> V3<T> {
    /// Create from components.
    #[inline(always)]
    pub fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }

    /// Dot product, summed left to right.
    #[inline(always)]
    pub fn dot(self, o: Self) -> T {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    /// Cross product.
    #[inline(always)]
    pub fn cross(self, o: Self) -> Self {
        Self {
            x: self.y * o.z - self.z * o.y,
            y: self.z * o.x - self.x * o.z,
            z: self.x * o.y - self.y * o.x,
        }
    }
}

impl<T: Arith> Sub for V3<T> {
    type Output = Self;

    #[inline(always)]
    fn sub(self, o: Self) -> Self {
        Self {
            x: self.x - o.x,
            y: self.y - o.y,
            z: self.z - o.z,
        }
    }
}

impl From<[f32; 3]> for V3<f32> {
    #[inline(always)]
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Unnormalized Möller–Trumbore terms for one triangle (or one lane each).
#[derive(Debug, Clone, Copy)]
pub struct Solution<T> {
    /// Determinant `e1 · (d × e2)`; near zero for degenerate or parallel cases.
    pub det: T,
    /// Barycentric weight of B.
    pub u: T,
    /// Barycentric weight of C.
    pub v: T,
    /// Distance along the ray in multiples of the direction length.
    pub t: T,
}

/// Evaluate the Möller–Trumbore terms for a triangle given as `a` plus edges.
///
/// No rejection happens here; callers accept a solution when
/// `|det| >= DET_EPSILON`, `u >= 0`, `v >= 0`, `u + v <= 1` and `t >= 0`.
#[inline(always)]
pub fn solve<T: Arith>(origin: V3<T>, dir: V3<T>, a: V3<T>, e1: V3<T>, e2: V3<T>, one: T) -> Solution<T> {
    let p = dir.cross(e2);
    let det = e1.dot(p);
    let inv_det = one / det;
    let s = origin - a;
    let u = s.dot(p) * inv_det;
    let q = s.cross(e1);
    let v = dir.dot(q) * inv_det;
    let t = e2.dot(q) * inv_det;
    Solution { det, u, v, t }
}
