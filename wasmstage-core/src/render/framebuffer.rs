use super::sprite::{SPRITE_HEIGHT, SPRITE_WIDTH, sprite_rgba};
use super::{FrameView, RenderSurface, Rgba};

/// Debug text cell size in pixels (glyph box plus spacing).
pub const GLYPH_CELL_W: i32 = 6;
pub const GLYPH_CELL_H: i32 = 13;

/// Software XRGB8888 surface.
///
/// Colors with alpha are blended source-over onto the existing pixels; the surface
/// itself is opaque.
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    sprite: Vec<Rgba>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize).saturating_mul(height as usize);
        Self {
            width,
            height,
            pixels: vec![0; len],
            sprite: sprite_rgba(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Pixel at `(x, y)`, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// Fill the clipped integer rectangle `[x0, x1) x [y0, y1)`.
    fn fill(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba) {
        let x_start = x0.max(0);
        let y_start = y0.max(0);
        let x_end = x1.min(self.width as i32);
        let y_end = y1.min(self.height as i32);

        if x_start >= x_end || y_start >= y_end || color.a == 0 {
            return;
        }

        let fb_w = self.width as usize;
        for curr_y in y_start..y_end {
            let start_idx = (curr_y as usize) * fb_w + (x_start as usize);
            let end_idx = (curr_y as usize) * fb_w + (x_end as usize);
            let row = &mut self.pixels[start_idx..end_idx];
            if color.a == 255 {
                row.fill(color.to_xrgb());
            } else {
                for px in row {
                    *px = blend(*px, color);
                }
            }
        }
    }
}

impl RenderSurface for Framebuffer {
    fn clear(&mut self, color: Rgba) {
        self.pixels.fill(color.to_xrgb());
    }

    fn image(&mut self, x: f32, y: f32, tint: Rgba) {
        let x = x.round() as i32;
        let y = y.round() as i32;
        let screen_w = self.width as i32;
        let screen_h = self.height as i32;
        let w = SPRITE_WIDTH as i32;
        let h = SPRITE_HEIGHT as i32;

        let x_start = x.max(0);
        let y_start = y.max(0);
        let x_end = x.saturating_add(w).min(screen_w);
        let y_end = y.saturating_add(h).min(screen_h);

        for curr_y in y_start..y_end {
            let src_row = ((curr_y - y) * w) as usize;
            let dst_row = (curr_y as usize) * (screen_w as usize);
            for curr_x in x_start..x_end {
                let texel = self.sprite[src_row + (curr_x - x) as usize].modulate(tint);
                if texel.a > 0 {
                    let idx = dst_row + curr_x as usize;
                    self.pixels[idx] = blend(self.pixels[idx], texel);
                }
            }
        }
    }

    fn rectangle(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        if !(w > 0.0 && h > 0.0) {
            return;
        }
        let x0 = x.round() as i32;
        let y0 = y.round() as i32;
        let x1 = (x + w).round() as i32;
        let y1 = (y + h).round() as i32;
        self.fill(x0, y0, x1, y1, color);
    }

    /// No font data ships with the host: each visible glyph is drawn as one solid
    /// white cell, which is enough to see where debug text lands.
    fn text(&mut self, text: &str, x: f32, y: f32) {
        let origin_x = x.round() as i32;
        let mut cx = origin_x;
        let mut cy = y.round() as i32;

        for ch in text.chars() {
            match ch {
                '\n' => {
                    cx = origin_x;
                    cy = cy.saturating_add(GLYPH_CELL_H);
                }
                c if c.is_whitespace() => cx = cx.saturating_add(GLYPH_CELL_W),
                _ => {
                    self.fill(
                        cx,
                        cy.saturating_add(2),
                        cx.saturating_add(GLYPH_CELL_W - 1),
                        cy.saturating_add(GLYPH_CELL_H - 2),
                        Rgba::WHITE,
                    );
                    cx = cx.saturating_add(GLYPH_CELL_W);
                }
            }
        }
    }

    fn frame(&self) -> Option<FrameView<'_>> {
        Some(FrameView {
            width: self.width,
            height: self.height,
            pixels: &self.pixels,
        })
    }
}

/// Source-over blend of `src` onto an opaque XRGB8888 pixel.
#[inline]
fn blend(dst: u32, src: Rgba) -> u32 {
    if src.a == 255 {
        return src.to_xrgb();
    }
    let a = src.a as u32;
    let inv = 255 - a;
    let mix = |s: u8, d: u32| (s as u32 * a + d * inv) / 255;
    let r = mix(src.r, (dst >> 16) & 0xFF);
    let g = mix(src.g, (dst >> 8) & 0xFF);
    let b = mix(src.b, dst & 0xFF);
    (r << 16) | (g << 8) | b
}
