//! Render surface seam.
//!
//! The host forwards every `Gfx*` capability to a [`RenderSurface`]. The real
//! renderer lives outside this crate; [`Framebuffer`] is a small software surface
//! used by the headless runner, the libretro frontend and tests.

mod framebuffer;
mod sprite;


pub use framebuffer::Framebuffer;
pub use sprite::{SPRITE_HEIGHT, SPRITE_WIDTH, sprite_rgba};

/// An 8-bit RGBA color.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Convert normalized guest channels. Each channel is clamped to `[0, 1]`,
    /// scaled by 255 and truncated: `1.5 -> 255`, `-0.2 -> 0`, `0.5 -> 127`.
    /// NaN maps to 0.
    pub fn from_unit(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: unit_to_u8(r),
            g: unit_to_u8(g),
            b: unit_to_u8(b),
            a: unit_to_u8(a),
        }
    }

    /// Packed `0x00RRGGBB` (XRGB8888), alpha dropped.
    pub const fn to_xrgb(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | (self.b as u32)
    }

    /// Per-channel multiply, as used for sprite tinting.
    pub const fn modulate(self, tint: Rgba) -> Rgba {
        Rgba {
            r: mul_u8(self.r, tint.r),
            g: mul_u8(self.g, tint.g),
            b: mul_u8(self.b, tint.b),
            a: mul_u8(self.a, tint.a),
        }
    }
}

/// Saturating normalized-float to 8-bit conversion (truncating).
#[inline]
pub fn unit_to_u8(v: f32) -> u8 {
    // `clamp` passes NaN through and `NaN as u8` is 0.
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

#[inline]
const fn mul_u8(a: u8, b: u8) -> u8 {
    ((a as u16 * b as u16) / 255) as u8
}

/// Pixels a surface can hand to a presenter.
#[derive(Copy, Clone, Debug)]
pub struct FrameView<'a> {
    pub width: u32,
    pub height: u32,
    /// Row-major XRGB8888.
    pub pixels: &'a [u32],
}

impl FrameView<'_> {
    /// Replace `out` with the pixels as native-endian bytes, the layout libretro
    /// expects for its 32-bit pixel format.
    pub fn write_ne_bytes(&self, out: &mut Vec<u8>) {
        out.clear();
        out.extend(self.pixels.iter().flat_map(|p| p.to_ne_bytes()));
    }
}

/// The drawing primitives reachable from the guest.
///
/// Calls arrive in the order the guest issued them. Implementations must not
/// panic on out-of-range coordinates: clip or ignore.
pub trait RenderSurface: Send {
    fn clear(&mut self, color: Rgba);

    /// Draw the built-in sprite with its top-left corner at `(x, y)`, multiplying
    /// every texel by `tint`.
    fn image(&mut self, x: f32, y: f32, tint: Rgba);

    fn rectangle(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba);

    /// Debug text at `(x, y)`.
    fn text(&mut self, text: &str, x: f32, y: f32);

    /// The current pixels, for surfaces that keep any.
    fn frame(&self) -> Option<FrameView<'_>> {
        None
    }
}
