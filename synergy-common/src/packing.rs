//! Asset packing utilities
//!
//! Converts between host-side floating point data and the quantized values
//! stored in `.mdl` files:
//! - position: host Z-up f32 → integer Y-up (round half up)
//! - UV: palette texel coordinate → packed color id (128 × 512 grid)
//! - opacity: f32 in [0.0, 1.0] → alpha byte (0 = opaque, 255 = transparent)

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

// ============================================================================
// Palette Constants
// ============================================================================

/// Palette grid width in texels
pub const PALETTE_COLUMNS: u16 = 128;
/// Palette grid height in texels
pub const PALETTE_ROWS: u16 = 512;

/// Opacity products closer than this to the next integer snap up.
///
/// `k / 255` is not representable in f32, so `opacity * 255` can land just
/// below `k` for opacities that were decoded from an alpha byte.
const ALPHA_EPSILON: f64 = 1e-3;

// ============================================================================
// Position Packing
// ============================================================================

/// Round to the nearest integer with halves going up (`floor(x + 0.5)`).
///
/// This is not banker's rounding: `-0.5` rounds to `0` and `2.5` to `3`.
#[inline]
pub fn round_half_up(value: f32) -> i32 {
    (f64::from(value) + 0.5).floor() as i32
}

/// Pack a host position (Z-up, Y-forward) to model coordinates (Y-up).
///
/// `x = round(x)`, `y = round(-z)`, `z = round(y)`. No clamping.
#[inline]
pub fn pack_position(pos: Vec3) -> [i32; 3] {
    [
        round_half_up(pos.x),
        round_half_up(-pos.z),
        round_half_up(pos.y),
    ]
}

/// Unpack model coordinates back into the host frame.
///
/// Exact inverse of [`pack_position`] on integer-valued input.
#[inline]
pub fn unpack_position(v: [i32; 3]) -> Vec3 {
    Vec3::new(v[0] as f32, v[2] as f32, -(v[1] as f32))
}

// ============================================================================
// Color / UV Packing
// ============================================================================

/// Pack a UV coordinate to a palette color id.
///
/// `col = floor(u * 128)`, `row = 511 - floor(v * 512)`,
/// `packed = col + row * 128`. UVs outside the unit square clamp to the
/// nearest edge texel so the id always addresses the palette.
#[inline]
pub fn pack_color_uv(uv: Vec2) -> u16 {
    let col = texel(uv.x, PALETTE_COLUMNS);
    let row = PALETTE_ROWS - 1 - texel(uv.y, PALETTE_ROWS);
    col + row * PALETTE_COLUMNS
}

/// Unpack a palette color id to the UV at the center of its texel.
///
/// `u = (col + 0.5) / 128`, `v = 1 - (row + 0.5) / 512`.
#[inline]
pub fn unpack_color_uv(packed: u16) -> Vec2 {
    let col = f32::from(packed % PALETTE_COLUMNS);
    let row = f32::from(packed / PALETTE_COLUMNS);
    Vec2::new(
        (col + 0.5) / f32::from(PALETTE_COLUMNS),
        1.0 - (row + 0.5) / f32::from(PALETTE_ROWS),
    )
}

/// Unpack a palette color id the way older importers did.
///
/// The row is taken from a fractional division (`packed / 128.0`), so the V
/// coordinate drifts by up to one texel for columns past the middle of the
/// grid. Kept for reading files checked against those importers; never used
/// for writing.
#[inline]
pub fn unpack_color_uv_legacy(packed: u16) -> Vec2 {
    let col = f32::from(packed % PALETTE_COLUMNS);
    let row = f32::from(packed) / f32::from(PALETTE_COLUMNS);
    Vec2::new(
        (col + 0.5) / f32::from(PALETTE_COLUMNS),
        (f32::from(PALETTE_ROWS) - (row + 0.5)) / f32::from(PALETTE_ROWS),
    )
}

#[inline]
fn texel(coord: f32, size: u16) -> u16 {
    let scaled = (coord * f32::from(size)).floor();
    scaled.clamp(0.0, f32::from(size - 1)) as u16
}

/// Which color id → UV mapping to use when reading a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UvPacking {
    /// Texel-centered mapping, inverse of [`pack_color_uv`]
    #[default]
    Canonical,
    /// Read-only mapping of older importers ([`unpack_color_uv_legacy`])
    Legacy,
}

impl UvPacking {
    /// Unpack a color id with this mapping
    #[inline]
    pub fn unpack(self, packed: u16) -> Vec2 {
        match self {
            UvPacking::Canonical => unpack_color_uv(packed),
            UvPacking::Legacy => unpack_color_uv_legacy(packed),
        }
    }
}

// ============================================================================
// Alpha Packing
// ============================================================================

/// Pack an opacity in [0.0, 1.0] to an alpha byte (`255 - floor(opacity * 255)`).
#[inline]
pub fn pack_alpha(opacity: f32) -> u8 {
    let opaque = (f64::from(opacity.clamp(0.0, 1.0)) * 255.0 + ALPHA_EPSILON).floor();
    255 - opaque.min(255.0) as u8
}

/// Unpack an alpha byte to an opacity in [0.0, 1.0]
#[inline]
pub fn unpack_alpha(alpha: u8) -> f32 {
    f32::from(255 - alpha) / 255.0
}
