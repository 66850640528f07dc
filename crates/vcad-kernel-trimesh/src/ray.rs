//! Ray, triangle and hit types.

use nalgebra::{Point3, Vector3};

/// A ray in 3D space defined by origin and direction.
///
/// The direction is stored as given and is not normalized. Every distance
/// reported by the kernels is a multiple of the direction's length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3<f32>,
    /// Direction of the ray.
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Create a new ray from origin and direction.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }
}

/// A triangle given by its three vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex.
    pub a: Point3<f32>,
    /// Second vertex.
    pub b: Point3<f32>,
    /// Third vertex.
    pub c: Point3<f32>,
}

impl Triangle {
    /// Create a triangle from three vertices.
    pub fn new(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Self {
        Self { a, b, c }
    }

    /// Build from nine scalars in `A, B, C` / `x, y, z` order.
    pub fn from_array(v: &[f32; 9]) -> Self {
        Self {
            a: Point3::new(v[0], v[1], v[2]),
            b: Point3::new(v[3], v[4], v[5]),
            c: Point3::new(v[6], v[7], v[8]),
        }
    }

    /// Flatten into nine scalars in `A, B, C` / `x, y, z` order.
    pub fn to_array(&self) -> [f32; 9] {
        [
            self.a.x, self.a.y, self.a.z,
            self.b.x, self.b.y, self.b.z,
            self.c.x, self.c.y, self.c.z,
        ]
    }

    /// Point at barycentric coordinates `(u, v)`: `a + u (b - a) + v (c - a)`.
    pub fn point_at(&self, u: f32, v: f32) -> Point3<f32> {
        self.a + (self.b - self.a) * u + (self.c - self.a) * v
    }
}

/// Nearest intersection of a ray with a triangle mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHit {
    /// Parameter along the ray where the intersection occurs.
    pub t: f32,
    /// Index of the hit triangle in input order.
    pub triangle_index: usize,
    /// Barycentric weight of vertex B.
    pub u: f32,
    /// Barycentric weight of vertex C.
    pub v: f32,
}

impl MeshHit {
    /// 3D intersection point on `ray`.
    pub fn point(&self, ray: &Ray) -> Point3<f32> {
        ray.at(self.t)
    }

    /// Barycentric weights `(w, u, v)` of vertices A, B and C.
    pub fn barycentric(&self) -> (f32, f32, f32) {
        (1.0 - self.u - self.v, self.u, self.v)
    }

    /// Whether `self` wins the nearest-hit reduction against `other`.
    ///
    /// Smaller `t` wins; exact ties go to the lower triangle index.
    #[inline]
    pub fn is_nearer_than(&self, other: &MeshHit) -> bool {
        self.t < other.t || (self.t == other.t && self.triangle_index < other.triangle_index)
    }

    /// Reduce two candidates to the nearer one.
    #[inline]
    pub fn nearest(a: Option<MeshHit>, b: Option<MeshHit>) -> Option<MeshHit> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if b.is_nearer_than(&a) { b } else { a }),
            (a, None) => a,
            (None, b) => b,
        }
    }
}
