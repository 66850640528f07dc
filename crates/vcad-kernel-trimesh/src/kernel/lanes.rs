//! Lane abstraction over `wide` vector types.
//!
//! The grouped kernel is written once against [`SimdLanes`]; each width is a
//! monomorphization. Masks use the same type as values (all bits set = true).

use wide::{f32x4, f32x8, CmpGe, CmpLe, CmpLt};

use super::Arith;

/// Largest lane count of any implementation.
pub const MAX_LANES: usize = 8;

/// A vector of `WIDTH` `f32` lanes.
pub trait SimdLanes: Arith + Send + Sync {
    /// Number of lanes.
    const WIDTH: usize;

    /// All lanes set to `x`.
    fn splat(x: f32) -> Self;

    /// Load `WIDTH` consecutive scalars. `src.len()` must equal `WIDTH`.
    fn load(src: &[f32]) -> Self;

    /// Lane-wise absolute value.
    fn abs_lanes(self) -> Self;

    /// Lane-wise `self >= rhs` mask.
    fn mask_ge(self, rhs: Self) -> Self;

    /// Lane-wise `self <= rhs` mask.
    fn mask_le(self, rhs: Self) -> Self;

    /// Lane-wise `self < rhs` mask.
    fn mask_lt(self, rhs: Self) -> Self;

    /// Lane-wise AND of two masks.
    fn mask_and(self, rhs: Self) -> Self;

    /// Pick `if_true` where `mask` is set, `if_false` elsewhere.
    fn select(mask: Self, if_true: Self, if_false: Self) -> Self;

    /// One bit per lane, lane 0 in bit 0.
    fn bitmask(self) -> u32;

    /// Write all lanes to `dst[..WIDTH]`.
    fn store(self, dst: &mut [f32]);
}

macro_rules! impl_simd_lanes {
    ($ty:ident, $width:literal) => {
        impl SimdLanes for $ty {
            const WIDTH: usize = $width;

            #[inline(always)]
            fn splat(x: f32) -> Self {
                $ty::splat(x)
            }

            #[inline(always)]
            fn load(src: &[f32]) -> Self {
                let mut lanes = [0.0f32; $width];
                lanes.copy_from_slice(src);
                $ty::from(lanes)
            }

            #[inline(always)]
            fn abs_lanes(self) -> Self {
                self.abs()
            }

            #[inline(always)]
            fn mask_ge(self, rhs: Self) -> Self {
                self.cmp_ge(rhs)
            }

            #[inline(always)]
            fn mask_le(self, rhs: Self) -> Self {
                self.cmp_le(rhs)
            }

            #[inline(always)]
            fn mask_lt(self, rhs: Self) -> Self {
                self.cmp_lt(rhs)
            }

            #[inline(always)]
            fn mask_and(self, rhs: Self) -> Self {
                self & rhs
            }

            #[inline(always)]
            fn select(mask: Self, if_true: Self, if_false: Self) -> Self {
                mask.blend(if_true, if_false)
            }

            #[inline(always)]
            fn bitmask(self) -> u32 {
                self.move_mask() as u32
            }

            #[inline(always)]
            fn store(self, dst: &mut [f32]) {
                dst[..$width].copy_from_slice(&self.to_array());
            }
        }
    };
}

impl_simd_lanes!(f32x4, 4);
impl_simd_lanes!(f32x8, 8);
