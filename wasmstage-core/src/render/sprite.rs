//! The built-in sprite drawn by `GfxImage`.
//!
//! Generated rather than decoded: a round-bodied critter with two eyes, white
//! body so the guest's tint decides its color.

use super::Rgba;

pub const SPRITE_WIDTH: u32 = 27;
pub const SPRITE_HEIGHT: u32 = 29;

const BODY: Rgba = Rgba::WHITE;
const OUTLINE: Rgba = Rgba::new(40, 40, 40, 255);
const PUPIL: Rgba = Rgba::new(0, 0, 0, 255);
const CLEAR: Rgba = Rgba::new(0, 0, 0, 0);

/// Row-major RGBA texels, `SPRITE_WIDTH * SPRITE_HEIGHT` long.
pub fn sprite_rgba() -> Vec<Rgba> {
    let w = SPRITE_WIDTH as f32;
    let h = SPRITE_HEIGHT as f32;
    let (cx, cy) = ((w - 1.0) / 2.0, (h - 1.0) / 2.0);
    let (rx, ry) = (w / 2.0, h / 2.0);

    let eyes = [(cx - 5.0, cy - 5.0), (cx + 5.0, cy - 5.0)];

    let mut texels = Vec::with_capacity((SPRITE_WIDTH * SPRITE_HEIGHT) as usize);
    for y in 0..SPRITE_HEIGHT {
        for x in 0..SPRITE_WIDTH {
            let (fx, fy) = (x as f32, y as f32);
            let d = ((fx - cx) / rx).powi(2) + ((fy - cy) / ry).powi(2);

            let texel = if d > 1.0 {
                CLEAR
            } else if d > 0.8 {
                OUTLINE
            } else if eyes
                .iter()
                .any(|&(ex, ey)| (fx - ex).powi(2) + (fy - ey).powi(2) <= 4.0)
            {
                PUPIL
            } else {
                BODY
            };
            texels.push(texel);
        }
    }
    texels
}
