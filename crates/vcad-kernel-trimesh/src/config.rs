//! Mesh configuration.

use serde::{Deserialize, Serialize};

use crate::capability::{detect_capability, SimdTier};
use crate::error::{Result, TriMeshError};

/// Options for constructing a [`TriangleMesh`](crate::TriangleMesh).
///
/// ```toml
/// force_tier = "baseline"   # none | scalar | baseline | wide | widest
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriMeshConfig {
    /// Use this tier instead of the detected one.
    ///
    /// A tier missing from the build falls back to the next lower compiled tier.
    /// A tier above what the host reports is allowed: the lane kernels run on
    /// any CPU, only slower.
    pub force_tier: Option<SimdTier>,
}

impl TriMeshConfig {
    /// Configuration that forces `tier`.
    pub fn forced(tier: SimdTier) -> Self {
        Self { force_tier: Some(tier) }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| TriMeshError::Config(e.to_string()))
    }

    /// The requested tier: the forced one, or the detected one.
    pub fn requested_tier(&self) -> SimdTier {
        self.force_tier.unwrap_or_else(detect_capability)
    }
}
