//! Precision policies.
//!
//! Vertex positions are computed in `f64` and uploaded as `f32` offsets from
//! a reference origin, which keeps magnitudes small anywhere on the map.

use core::cmp::Ordering;

use super::Vec2;

/// GPU-friendly, origin-relative position in `f32`.
pub type OriginRelativeF32 = [f32; 2];

/// Origin-relative precision model.
///
/// Store a high-precision `origin` (the projected map center of the current
/// render pass) and express all GPU positions relative to it.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct OriginRelative {
    pub origin: Vec2,
}

impl OriginRelative {
    pub fn new(origin: Vec2) -> Self {
        Self { origin }
    }

    /// Offset of `pixel` from the origin, still in `f64`.
    #[inline]
    pub fn offset(self, pixel: Vec2) -> Vec2 {
        pixel - self.origin
    }

    /// Convert a pixel position (f64) to an origin-relative `f32` offset.
    #[inline]
    pub fn to_f32(self, pixel: Vec2) -> OriginRelativeF32 {
        let d = self.offset(pixel);
        [d.x as f32, d.y as f32]
    }
}

/// Canonicalize a floating-point value for deterministic ordering.
///
/// Rules:
/// - `-0.0` becomes `0.0`
/// - all NaNs become a single canonical NaN
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Deterministic total ordering for floats.
///
/// Prefer this any time you sort floats or use them in ordered keys.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}
