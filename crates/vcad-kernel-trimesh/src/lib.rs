#![warn(missing_docs)]

//! SIMD ray / triangle-soup intersection for the vcad kernel.
//!
//! A [`TriangleMesh`] holds an unstructured list of triangles and answers
//! nearest-hit ray queries by testing every triangle. The buffer is repacked
//! at [`TriangleMesh::set`] into the layout best suited to the SIMD tier
//! selected for the host, and queries dispatch on that layout.
//!
//! # Architecture
//!
//! - [`capability`] - Host SIMD detection and tier selection
//! - [`layout`] - Interleaved and grouped buffer layouts
//! - [`kernel`] - Scalar and lane-generic Möller–Trumbore kernels
//! - [`TriangleMesh`] - Owner of the buffer and query dispatcher
//! - [`TriMeshConfig`] - Tier override, loadable from TOML
//!
//! Every tier returns the same triangle, distance and barycentrics for the
//! same mesh and ray. Among equidistant triangles the lowest index wins.
//!
//! # Example
//!
//! ```
//! use nalgebra::{Point3, Vector3};
//! use vcad_kernel_trimesh::{Ray, TriangleMesh};
//!
//! let mut mesh = TriangleMesh::new();
//! mesh.set(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]).unwrap();
//!
//! let ray = Ray::new(Point3::new(0.25, 0.25, 1.0), Vector3::new(0.0, 0.0, -1.0));
//! let hit = mesh.intersect_ray(&ray).unwrap();
//! assert_eq!(hit.triangle_index, 0);
//! assert!((hit.t - 1.0).abs() < 1e-6);
//! ```

pub mod capability;
mod config;
mod error;
pub mod kernel;
pub mod layout;
mod mesh;
mod ray;

pub use capability::{detect_capability, select_tier, CompiledTiers, HardwareFeatures, SimdTier};
pub use config::TriMeshConfig;
pub use error::{Result, TriMeshError};
pub use kernel::{intersect_triangle, DET_EPSILON};
pub use layout::{Layout, MeshBuffer};
pub use mesh::TriangleMesh;
pub use ray::{MeshHit, Ray, Triangle};
