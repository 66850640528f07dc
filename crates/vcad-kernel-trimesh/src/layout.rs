//! Physical layouts of the resident triangle buffer.
//!
//! A [`MeshBuffer`] always holds exactly `num_triangles * 9` scalars. How they
//! map to (triangle, vertex, coordinate) depends on its [`Layout`]:
//!
//! ```text
//! Interleaved   ax ay az bx by bz cx cy cz | ax ay az ...          (per triangle)
//! Grouped4      ax0 ax1 ax2 ax3 | ay0..ay3 | az0..az3 |            (A absolute)
//!               e1x0..e1x3 | e1y.. | e1z.. | e2x.. | e2y.. | e2z.. (B-A, C-A)
//!               ... one 36-scalar block per full group ...
//!               tail triangles, interleaved
//! Grouped8      same with 8 lanes (72 scalars per group)
//! ```
//!
//! Triangles that do not fill a whole group are stored interleaved right after
//! the last full group and are covered by the scalar kernel.

use bytemuck::{Pod, Zeroable};
use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::error::{Result, TriMeshError};
use crate::ray::Triangle;

/// Scalars per triangle (3 vertices x 3 coordinates).
pub const FLOATS_PER_TRIANGLE: usize = 9;

/// Byte alignment of every mesh buffer, enough for 8-wide loads.
pub const BUFFER_ALIGNMENT: usize = 32;

const FLOATS_PER_BLOCK: usize = BUFFER_ALIGNMENT / std::mem::size_of::<f32>();

/// How the scalars of a [`MeshBuffer`] are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// Array of structures: one 9-scalar run per triangle.
    Interleaved,
    /// Structure of arrays over groups of 4 triangles, edge-relative.
    Grouped4,
    /// Structure of arrays over groups of 8 triangles, edge-relative.
    Grouped8,
}

impl Layout {
    /// Triangles per group (1 for the interleaved layout).
    pub fn group_width(self) -> usize {
        match self {
            Layout::Interleaved => 1,
            Layout::Grouped4 => 4,
            Layout::Grouped8 => 8,
        }
    }

    /// Whether the layout transposes triangles into channel-major groups.
    pub fn is_grouped(self) -> bool {
        self != Layout::Interleaved
    }

    /// Number of triangles stored in grouped form for a mesh of `num_triangles`.
    pub fn grouped_triangles(self, num_triangles: usize) -> usize {
        if self.is_grouped() {
            num_triangles - num_triangles % self.group_width()
        } else {
            0
        }
    }
}

/// One triangle as stored in the interleaved region.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PackedTriangle {
    /// Vertex A.
    pub a: [f32; 3],
    /// Vertex B.
    pub b: [f32; 3],
    /// Vertex C.
    pub c: [f32; 3],
}

impl From<&PackedTriangle> for Triangle {
    fn from(p: &PackedTriangle) -> Self {
        Triangle::new(Point3::from(p.a), Point3::from(p.b), Point3::from(p.c))
    }
}

/// Storage unit that carries the buffer alignment.
#[repr(C, align(32))]
#[derive(Clone, Copy, Debug)]
struct AlignedBlock([f32; FLOATS_PER_BLOCK]);

// SAFETY: a 32-byte array of f32 with 32-byte alignment has no padding and
// every bit pattern is a valid f32.
unsafe impl Zeroable for AlignedBlock {}
// SAFETY: see above.
unsafe impl Pod for AlignedBlock {}

/// Owned, 32-byte aligned run of `len` scalars.
#[derive(Debug, Clone, Default)]
struct AlignedStorage {
    blocks: Vec<AlignedBlock>,
    len: usize,
}

impl AlignedStorage {
    fn zeroed(len: usize, num_triangles: usize) -> Result<Self> {
        let alloc_error = || TriMeshError::Allocation {
            triangles: num_triangles,
            bytes: len.saturating_mul(std::mem::size_of::<f32>()),
        };

        let num_blocks = len.div_ceil(FLOATS_PER_BLOCK);
        let mut blocks = Vec::new();
        blocks.try_reserve_exact(num_blocks).map_err(|_| alloc_error())?;
        blocks.resize(num_blocks, AlignedBlock::zeroed());

        Ok(Self { blocks, len })
    }

    fn as_slice(&self) -> &[f32] {
        &bytemuck::cast_slice::<AlignedBlock, f32>(&self.blocks)[..self.len]
    }

    fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut bytemuck::cast_slice_mut::<AlignedBlock, f32>(&mut self.blocks)[..self.len]
    }
}

/// The resident triangle buffer together with the layout it was built in.
///
/// Layout and contents are produced by the same call to [`MeshBuffer::build`]
/// and are never modified afterwards.
#[derive(Debug, Clone)]
pub struct MeshBuffer {
    layout: Layout,
    num_triangles: usize,
    storage: AlignedStorage,
}

impl Default for MeshBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

impl MeshBuffer {
    /// A buffer with no triangles.
    pub fn empty() -> Self {
        Self {
            layout: Layout::Interleaved,
            num_triangles: 0,
            storage: AlignedStorage::default(),
        }
    }

    /// Repack flat `A, B, C` vertex data into `layout`.
    ///
    /// `vertices` holds `n * 9` scalars in triangle-major order.
    pub fn build(layout: Layout, vertices: &[f32]) -> Result<Self> {
        if vertices.len() % FLOATS_PER_TRIANGLE != 0 {
            return Err(TriMeshError::VertexCount(vertices.len()));
        }
        let num_triangles = vertices.len() / FLOATS_PER_TRIANGLE;
        let width = layout.group_width();
        let grouped = layout.grouped_triangles(num_triangles);
        let split = grouped * FLOATS_PER_TRIANGLE;

        let mut storage = AlignedStorage::zeroed(vertices.len(), num_triangles)?;
        let out = storage.as_mut_slice();

        if layout.is_grouped() {
            transpose_groups(width, &vertices[..split], &mut out[..split]);
            encode_edges(width, &mut out[..split]);
        }
        out[split..].copy_from_slice(&vertices[split..]);

        debug!(
            ?layout,
            triangles = num_triangles,
            grouped,
            tail = num_triangles - grouped,
            "built mesh buffer"
        );

        Ok(Self { layout, num_triangles, storage })
    }

    /// Layout the buffer was built in.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Number of triangles stored.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.num_triangles
    }

    /// Whether the buffer holds no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_triangles == 0
    }

    /// Number of triangles in full groups. Always 0 for the interleaved layout.
    #[inline]
    pub fn grouped_triangles(&self) -> usize {
        self.layout.grouped_triangles(self.num_triangles)
    }

    /// All scalars, in layout order.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        self.storage.as_slice()
    }

    /// Scalars of the full groups, `group_width * 9` per group.
    #[inline]
    pub fn grouped_data(&self) -> &[f32] {
        &self.as_slice()[..self.grouped_triangles() * FLOATS_PER_TRIANGLE]
    }

    /// Interleaved triangles after the grouped region.
    ///
    /// For [`Layout::Interleaved`] this is the whole mesh. Triangle `i` of the
    /// returned slice is mesh triangle `grouped_triangles() + i`.
    #[inline]
    pub fn tail(&self) -> &[PackedTriangle] {
        let split = self.grouped_triangles() * FLOATS_PER_TRIANGLE;
        bytemuck::cast_slice(&self.as_slice()[split..])
    }

    /// Reconstruct triangle `index` with absolute vertices.
    pub fn triangle(&self, index: usize) -> Option<Triangle> {
        if index >= self.num_triangles {
            return None;
        }

        let grouped = self.grouped_triangles();
        if index >= grouped {
            return self.tail().get(index - grouped).map(Triangle::from);
        }

        let width = self.layout.group_width();
        let group = &self.grouped_data()[(index / width) * width * FLOATS_PER_TRIANGLE..];
        let lane = index % width;
        let channel = |k: usize| group[k * width + lane];

        let a = Point3::new(channel(0), channel(1), channel(2));
        let e1 = Vector3::new(channel(3), channel(4), channel(5));
        let e2 = Vector3::new(channel(6), channel(7), channel(8));
        Some(Triangle::new(a, a + e1, a + e2))
    }

    /// Iterate over all triangles with absolute vertices.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.num_triangles).filter_map(move |i| self.triangle(i))
    }
}

/// Transpose each full group from per-triangle to per-channel order.
///
/// Channel `k` (vertex `k / 3`, coordinate `k % 3`) of lane `i` lands at
/// `k * width + i` within the group.
fn transpose_groups(width: usize, input: &[f32], output: &mut [f32]) {
    let group_len = width * FLOATS_PER_TRIANGLE;
    for (src, dst) in input.chunks_exact(group_len).zip(output.chunks_exact_mut(group_len)) {
        for channel in 0..FLOATS_PER_TRIANGLE {
            for lane in 0..width {
                dst[channel * width + lane] = src[lane * FLOATS_PER_TRIANGLE + channel];
            }
        }
    }
}

/// Replace the B and C channels of every transposed group with `B - A` and `C - A`.
fn encode_edges(width: usize, data: &mut [f32]) {
    let vertex_len = 3 * width;
    for group in data.chunks_exact_mut(vertex_len * 3) {
        let (a, edges) = group.split_at_mut(vertex_len);
        let (b, c) = edges.split_at_mut(vertex_len);
        for ((a, b), c) in a.iter().zip(b.iter_mut()).zip(c.iter_mut()) {
            *b -= *a;
            *c -= *a;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Triangle `i` has vertex `v`, coordinate `k` equal to `100 i + 10 v + k`.
    fn numbered(n: usize) -> Vec<f32> {
        (0..n)
            .flat_map(|i| (0..9).map(move |j| (100 * i + 10 * (j / 3) + j % 3) as f32))
            .collect()
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = MeshBuffer::build(Layout::Grouped8, &[]).unwrap();
        assert!(buffer.is_empty());
        assert!(buffer.as_slice().is_empty());
        assert!(buffer.tail().is_empty());
        assert_eq!(buffer.triangle(0), None);
    }

    #[test]
    fn test_rejects_partial_triangle() {
        let err = MeshBuffer::build(Layout::Interleaved, &[0.0; 10]).unwrap_err();
        assert!(matches!(err, TriMeshError::VertexCount(10)));
    }

    #[test]
    fn test_interleaved_is_a_copy() {
        let input = numbered(3);
        let buffer = MeshBuffer::build(Layout::Interleaved, &input).unwrap();
        assert_eq!(buffer.as_slice(), input.as_slice());
        assert_eq!(buffer.grouped_triangles(), 0);
        assert_eq!(buffer.tail().len(), 3);
    }

    #[test]
    fn test_buffer_is_exact_and_aligned() {
        for n in [1, 4, 7, 9, 33] {
            let buffer = MeshBuffer::build(Layout::Grouped8, &numbered(n)).unwrap();
            assert_eq!(buffer.as_slice().len(), n * FLOATS_PER_TRIANGLE);
            assert_eq!(buffer.as_slice().as_ptr() as usize % BUFFER_ALIGNMENT, 0);
        }
    }

    #[test]
    fn test_grouped4_channel_order() {
        let buffer = MeshBuffer::build(Layout::Grouped4, &numbered(4)).unwrap();
        let data = buffer.as_slice();

        // A.x of the four triangles, then A.y.
        assert_eq!(&data[0..4], &[0.0, 100.0, 200.0, 300.0]);
        assert_eq!(&data[4..8], &[1.0, 101.0, 201.0, 301.0]);
        // B - A and C - A are constant offsets for numbered triangles.
        assert_eq!(&data[12..16], &[10.0; 4]);
        assert_eq!(&data[32..36], &[20.0; 4]);
    }

    #[test]
    fn test_group_tail_split() {
        let buffer = MeshBuffer::build(Layout::Grouped8, &numbered(9)).unwrap();
        assert_eq!(buffer.grouped_triangles(), 8);
        assert_eq!(buffer.tail().len(), 1);
        assert_eq!(buffer.tail()[0].a, [800.0, 801.0, 802.0]);

        let buffer = MeshBuffer::build(Layout::Grouped4, &numbered(3)).unwrap();
        assert_eq!(buffer.grouped_triangles(), 0);
        assert_eq!(buffer.tail().len(), 3);
    }

    #[test]
    fn test_round_trip_all_layouts() {
        for layout in [Layout::Interleaved, Layout::Grouped4, Layout::Grouped8] {
            for n in 0..=20 {
                let input = numbered(n);
                let buffer = MeshBuffer::build(layout, &input).unwrap();
                let rebuilt: Vec<f32> = buffer.triangles().flat_map(|t| t.to_array()).collect();
                assert_eq!(rebuilt, input, "layout {layout:?}, n = {n}");
            }
        }
    }

    #[test]
    fn test_round_trip_fractional_vertices() {
        let input: Vec<f32> = (0..16 * 9).map(|i| ((i * 37) % 101) as f32 * 0.173 - 8.0).collect();
        let buffer = MeshBuffer::build(Layout::Grouped8, &input).unwrap();
        for (i, tri) in buffer.triangles().enumerate() {
            for (got, want) in tri.to_array().iter().zip(&input[i * 9..(i + 1) * 9]) {
                approx::assert_abs_diff_eq!(*got, *want, epsilon = 1e-5);
            }
        }
    }
}
