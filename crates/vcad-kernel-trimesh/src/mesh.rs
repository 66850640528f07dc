//! Triangle mesh with capability-dispatched ray queries.

use rayon::prelude::*;
use tracing::warn;
use wide::{f32x4, f32x8};

use crate::capability::{detect_capability, SimdTier};
use crate::config::TriMeshConfig;
use crate::error::{Result, TriMeshError};
use crate::kernel::grouped::intersect_groups;
use crate::kernel::scalar::intersect_interleaved;
use crate::kernel::SimdLanes;
use crate::layout::{Layout, MeshBuffer, FLOATS_PER_TRIANGLE};
use crate::ray::{MeshHit, Ray, Triangle};

/// Triangles per work item in [`TriangleMesh::intersect_ray_par`].
const PAR_CHUNK_TRIANGLES: usize = 1024;

/// A static triangle soup prepared for nearest-hit ray queries.
///
/// The SIMD tier is fixed when the mesh is created and decides the layout
/// every [`set`](Self::set) builds. Queries dispatch on the layout recorded
/// in the resident buffer, never on the tier, so the kernel always matches
/// the data it reads.
///
/// Queries take `&self` and may run from many threads at once; `set` takes
/// `&mut self`. Wrap the mesh in an `RwLock` if rebuilds and queries overlap.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    tier: SimdTier,
    buffer: MeshBuffer,
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl TriangleMesh {
    /// Create an empty mesh using the detected tier.
    pub fn new() -> Self {
        Self::with_tier(detect_capability())
    }

    /// Create an empty mesh using `tier`.
    ///
    /// A tier that is not compiled into this build is replaced by the next
    /// lower compiled tier.
    pub fn with_tier(tier: SimdTier) -> Self {
        let effective = tier.fallback();
        if effective != tier {
            warn!(requested = %tier, using = %effective, "SIMD tier not compiled in, falling back");
        }
        Self {
            tier: effective,
            buffer: MeshBuffer::empty(),
        }
    }

    /// Create an empty mesh from a configuration.
    pub fn with_config(config: &TriMeshConfig) -> Self {
        Self::with_tier(config.requested_tier())
    }

    /// Replace the mesh with `vertices`: `n * 9` scalars, triangle-major,
    /// each triangle as `A, B, C` and each vertex as `x, y, z`.
    ///
    /// On error the previous triangles are kept.
    pub fn set(&mut self, vertices: &[f32]) -> Result<()> {
        self.buffer = MeshBuffer::build(self.tier.layout(), vertices)?;
        Ok(())
    }

    /// Replace the mesh with `triangles`.
    pub fn set_triangles(&mut self, triangles: &[Triangle]) -> Result<()> {
        let len = triangles.len().saturating_mul(FLOATS_PER_TRIANGLE);
        let mut vertices = Vec::new();
        vertices
            .try_reserve_exact(len)
            .map_err(|_| TriMeshError::Allocation {
                triangles: triangles.len(),
                bytes: len.saturating_mul(std::mem::size_of::<f32>()),
            })?;
        vertices.extend(triangles.iter().flat_map(Triangle::to_array));
        self.set(&vertices)
    }

    /// Remove all triangles.
    pub fn clear(&mut self) {
        self.buffer = MeshBuffer::empty();
    }

    /// SIMD tier this mesh builds its layout for.
    pub fn tier(&self) -> SimdTier {
        self.tier
    }

    /// Layout of the resident buffer.
    pub fn layout(&self) -> Layout {
        self.buffer.layout()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.buffer.num_triangles()
    }

    /// Whether the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The resident buffer.
    pub fn buffer(&self) -> &MeshBuffer {
        &self.buffer
    }

    /// Triangle `index` with absolute vertices, in input order.
    pub fn triangle(&self, index: usize) -> Option<Triangle> {
        self.buffer.triangle(index)
    }

    /// All triangles with absolute vertices, in input order.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.buffer.triangles()
    }

    /// Nearest hit distance, or `f32::INFINITY` if the ray misses every triangle.
    pub fn intersect_ray_distance(&self, ray: &Ray) -> f32 {
        self.intersect_ray(ray).map_or(f32::INFINITY, |hit| hit.t)
    }

    /// Nearest hit distance and triangle index.
    pub fn intersect_ray_index(&self, ray: &Ray) -> Option<(f32, usize)> {
        self.intersect_ray(ray).map(|hit| (hit.t, hit.triangle_index))
    }

    /// Nearest hit with triangle index and barycentric coordinates.
    ///
    /// Among triangles at exactly the same distance the lowest index wins.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<MeshHit> {
        if self.buffer.is_empty() {
            return None;
        }

        let grouped = match self.buffer.layout() {
            Layout::Interleaved => None,
            Layout::Grouped4 => self.intersect_grouped::<f32x4>(ray),
            Layout::Grouped8 => self.intersect_grouped::<f32x8>(ray),
        };
        let tail = intersect_interleaved(self.buffer.tail(), ray, self.buffer.grouped_triangles());

        MeshHit::nearest(grouped, tail)
    }

    /// Same result as [`intersect_ray`](Self::intersect_ray), sweeping chunks
    /// of the mesh on the rayon thread pool.
    pub fn intersect_ray_par(&self, ray: &Ray) -> Option<MeshHit> {
        if self.buffer.is_empty() {
            return None;
        }

        let grouped = match self.buffer.layout() {
            Layout::Interleaved => None,
            Layout::Grouped4 => self.intersect_grouped_par::<f32x4>(ray),
            Layout::Grouped8 => self.intersect_grouped_par::<f32x8>(ray),
        };

        let offset = self.buffer.grouped_triangles();
        let tail = self
            .buffer
            .tail()
            .par_chunks(PAR_CHUNK_TRIANGLES)
            .enumerate()
            .map(|(i, chunk)| intersect_interleaved(chunk, ray, offset + i * PAR_CHUNK_TRIANGLES))
            .reduce(|| None, MeshHit::nearest);

        MeshHit::nearest(grouped, tail)
    }

    fn intersect_grouped<L: SimdLanes>(&self, ray: &Ray) -> Option<MeshHit> {
        debug_assert_eq!(self.buffer.layout().group_width(), L::WIDTH);
        intersect_groups::<L>(self.buffer.grouped_data(), ray, 0)
    }

    fn intersect_grouped_par<L: SimdLanes>(&self, ray: &Ray) -> Option<MeshHit> {
        debug_assert_eq!(self.buffer.layout().group_width(), L::WIDTH);
        let groups_per_chunk = (PAR_CHUNK_TRIANGLES / L::WIDTH).max(1);
        let chunk_len = groups_per_chunk * L::WIDTH * FLOATS_PER_TRIANGLE;

        self.buffer
            .grouped_data()
            .par_chunks(chunk_len)
            .enumerate()
            .map(|(i, chunk)| intersect_groups::<L>(chunk, ray, i * groups_per_chunk))
            .reduce(|| None, MeshHit::nearest)
    }
}
