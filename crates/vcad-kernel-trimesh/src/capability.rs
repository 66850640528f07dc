//! Runtime CPU capability detection.
//!
//! The host is classified once into a [`SimdTier`]. A tier is only ever
//! reported when the hardware supports it *and* the matching cargo feature
//! (`tier-baseline`, `tier-wide`, `tier-widest`) was enabled at build time.

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::layout::Layout;

static DETECTED_TIER: OnceLock<SimdTier> = OnceLock::new();

/// Ordered classification of vector-instruction capability.
///
/// Variants are declared lowest first, so `Ord` matches preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimdTier {
    /// No vector unit used; interleaved layout and scalar kernel.
    #[serde(alias = "none")]
    Scalar,
    /// 4-wide lanes (SSE2 or NEON).
    Baseline,
    /// 4-wide lanes on hosts with SSE4.1.
    Wide,
    /// 8-wide lanes (AVX).
    Widest,
}

impl SimdTier {
    /// All tiers, lowest first.
    pub const ALL: [SimdTier; 4] = [
        SimdTier::Scalar,
        SimdTier::Baseline,
        SimdTier::Wide,
        SimdTier::Widest,
    ];

    /// Physical layout that `set` builds for this tier.
    pub fn layout(self) -> Layout {
        match self {
            SimdTier::Scalar => Layout::Interleaved,
            SimdTier::Baseline | SimdTier::Wide => Layout::Grouped4,
            SimdTier::Widest => Layout::Grouped8,
        }
    }

    /// Number of triangles tested per kernel step.
    pub fn lane_width(self) -> usize {
        self.layout().group_width()
    }

    /// Whether this build carries the tier.
    pub fn is_compiled(self) -> bool {
        CompiledTiers::current().contains(self)
    }

    /// The highest compiled-in tier that does not exceed `self`.
    pub fn fallback(self) -> SimdTier {
        CompiledTiers::current().clamp(self)
    }

    /// Lowercase name, as accepted in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            SimdTier::Scalar => "scalar",
            SimdTier::Baseline => "baseline",
            SimdTier::Wide => "wide",
            SimdTier::Widest => "widest",
        }
    }
}

impl fmt::Display for SimdTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU feature flags relevant to tier selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HardwareFeatures {
    /// x86 SSE2.
    pub sse2: bool,
    /// x86 SSE4.1.
    pub sse41: bool,
    /// x86 AVX.
    pub avx: bool,
    /// aarch64 Advanced SIMD.
    pub neon: bool,
}

impl HardwareFeatures {
    /// Read the feature flags of the running CPU.
    pub fn detect() -> Self {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        let features = Self {
            sse2: is_x86_feature_detected!("sse2"),
            sse41: is_x86_feature_detected!("sse4.1"),
            avx: is_x86_feature_detected!("avx"),
            neon: false,
        };

        #[cfg(target_arch = "aarch64")]
        let features = Self {
            neon: std::arch::is_aarch64_feature_detected!("neon"),
            ..Self::default()
        };

        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
        let features = Self::default();

        features
    }

    /// Whether the hardware can run `tier`.
    pub fn supports(self, tier: SimdTier) -> bool {
        match tier {
            SimdTier::Scalar => true,
            SimdTier::Baseline => self.sse2 || self.neon,
            SimdTier::Wide => self.sse41,
            SimdTier::Widest => self.avx,
        }
    }
}

/// Which vector tiers this build was compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledTiers {
    /// `tier-baseline` feature.
    pub baseline: bool,
    /// `tier-wide` feature.
    pub wide: bool,
    /// `tier-widest` feature.
    pub widest: bool,
}

impl CompiledTiers {
    /// Tiers enabled through cargo features in this build.
    pub const fn current() -> Self {
        Self {
            baseline: cfg!(feature = "tier-baseline"),
            wide: cfg!(feature = "tier-wide"),
            widest: cfg!(feature = "tier-widest"),
        }
    }

    /// A build with every vector tier enabled.
    pub const fn all() -> Self {
        Self { baseline: true, wide: true, widest: true }
    }

    /// A scalar-only build.
    pub const fn none() -> Self {
        Self { baseline: false, wide: false, widest: false }
    }

    /// Whether `tier` is compiled in. `Scalar` always is.
    pub fn contains(self, tier: SimdTier) -> bool {
        match tier {
            SimdTier::Scalar => true,
            SimdTier::Baseline => self.baseline,
            SimdTier::Wide => self.wide,
            SimdTier::Widest => self.widest,
        }
    }

    /// Highest compiled tier at or below `tier`.
    pub fn clamp(self, tier: SimdTier) -> SimdTier {
        SimdTier::ALL
            .iter()
            .rev()
            .copied()
            .find(|&t| t <= tier && self.contains(t))
            .unwrap_or(SimdTier::Scalar)
    }
}

/// Pick the highest tier both supported by `hardware` and present in `compiled`.
pub fn select_tier(hardware: HardwareFeatures, compiled: CompiledTiers) -> SimdTier {
    SimdTier::ALL
        .iter()
        .rev()
        .copied()
        .find(|&tier| compiled.contains(tier) && hardware.supports(tier))
        .unwrap_or(SimdTier::Scalar)
}

/// Detect the tier of the running CPU.
///
/// The result is computed on first use and cached for the process lifetime.
pub fn detect_capability() -> SimdTier {
    *DETECTED_TIER.get_or_init(|| {
        let hardware = HardwareFeatures::detect();
        let tier = select_tier(hardware, CompiledTiers::current());
        info!(%tier, ?hardware, "detected SIMD capability");
        tier
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x86(sse2: bool, sse41: bool, avx: bool) -> HardwareFeatures {
        HardwareFeatures { sse2, sse41, avx, neon: false }
    }

    #[test]
    fn test_tier_ordering() {
        assert!(SimdTier::Widest > SimdTier::Wide);
        assert!(SimdTier::Wide > SimdTier::Baseline);
        assert!(SimdTier::Baseline > SimdTier::Scalar);
    }

    #[test]
    fn test_select_highest_supported() {
        let all = CompiledTiers::all();
        assert_eq!(select_tier(x86(true, true, true), all), SimdTier::Widest);
        assert_eq!(select_tier(x86(true, true, false), all), SimdTier::Wide);
        assert_eq!(select_tier(x86(true, false, false), all), SimdTier::Baseline);
        assert_eq!(select_tier(x86(false, false, false), all), SimdTier::Scalar);
    }

    #[test]
    fn test_select_neon_is_baseline() {
        let hw = HardwareFeatures { neon: true, ..Default::default() };
        assert_eq!(select_tier(hw, CompiledTiers::all()), SimdTier::Baseline);
    }

    #[test]
    fn test_compiled_out_tier_is_skipped() {
        let no_widest = CompiledTiers { baseline: true, wide: true, widest: false };
        assert_eq!(select_tier(x86(true, true, true), no_widest), SimdTier::Wide);

        let baseline_only = CompiledTiers { baseline: true, wide: false, widest: false };
        assert_eq!(select_tier(x86(true, true, true), baseline_only), SimdTier::Baseline);

        let widest_only = CompiledTiers { baseline: false, wide: false, widest: true };
        assert_eq!(select_tier(x86(true, true, false), widest_only), SimdTier::Scalar);
    }

    #[test]
    fn test_nothing_compiled_is_scalar() {
        assert_eq!(select_tier(x86(true, true, true), CompiledTiers::none()), SimdTier::Scalar);
    }

    #[test]
    fn test_clamp() {
        let no_wide = CompiledTiers { baseline: true, wide: false, widest: true };
        assert_eq!(no_wide.clamp(SimdTier::Widest), SimdTier::Widest);
        assert_eq!(no_wide.clamp(SimdTier::Wide), SimdTier::Baseline);
        assert_eq!(CompiledTiers::none().clamp(SimdTier::Widest), SimdTier::Scalar);
    }

    #[test]
    fn test_tier_layouts() {
        assert_eq!(SimdTier::Scalar.layout(), Layout::Interleaved);
        assert_eq!(SimdTier::Baseline.layout(), Layout::Grouped4);
        assert_eq!(SimdTier::Wide.layout(), Layout::Grouped4);
        assert_eq!(SimdTier::Widest.layout(), Layout::Grouped8);
        assert_eq!(SimdTier::Widest.lane_width(), 8);
        assert_eq!(SimdTier::Scalar.lane_width(), 1);
    }

    #[test]
    fn test_detect_is_cached() {
        let first = detect_capability();
        assert_eq!(first, detect_capability());
        assert!(first.is_compiled());
        assert!(HardwareFeatures::detect().supports(first));
    }
}
