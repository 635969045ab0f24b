use std::fs;
use std::path::Path;
use std::sync::Arc;

use carta_image::{Color, ImageSurface};

use crate::error::Error;

/// A loaded TTF face bound to a size and a color. Cloning is cheap, so
/// per-category variants just swap the color.
#[derive(Clone)]
pub struct FontFace {
    font: Arc<fontdue::Font>,
    size: f32,
    color: Color,
}

impl FontFace {
    pub fn open(path: &Path, size: f32, color: Color) -> Result<FontFace, Error> {
        let bytes = fs::read(path)
            .map_err(|e| Error::Font(format!("ttf-path {}: {}", path.display(), e)))?;
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| Error::Font(format!("ttf-path {}: {}", path.display(), e)))?;
        Ok(FontFace {
            font: Arc::new(font),
            size,
            color,
        })
    }

    pub fn with_color(&self, color: Color) -> FontFace {
        FontFace {
            font: Arc::clone(&self.font),
            size: self.size,
            color,
        }
    }

    /// Rasterize `text` with its baseline anchored under `(x, y)` and paint
    /// the coverage over the surface.
    pub fn draw(&self, img: &mut dyn ImageSurface, text: &str, x: i64, y: i64) {
        let baseline = y + (self.size * 0.8) as i64;
        let mut pen = x as f32;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, self.size);
            let gx = pen as i64 + i64::from(metrics.xmin);
            let gy = baseline - (metrics.height as i64 + i64::from(metrics.ymin));
            for row in 0..metrics.height {
                for col in 0..metrics.width {
                    let coverage = bitmap[row * metrics.width + col];
                    if coverage == 0 {
                        continue;
                    }
                    let px = gx + col as i64;
                    let py = gy + row as i64;
                    if px < 0 || py < 0 || px >= img.get_width() || py >= img.get_height() {
                        continue;
                    }
                    let a = (u32::from(coverage) * u32::from(self.color.a) / 0xff) as u8;
                    let mut glyph = Color::new(self.color.r, self.color.g, self.color.b, a);
                    glyph.blend(img.get_pixel(px, py));
                    img.set_pixel(px, py, glyph);
                }
            }
            pen += metrics.advance_width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_font_is_a_font_error() {
        let missing = std::env::temp_dir().join("carta-no-such-font.ttf");
        match FontFace::open(&missing, 12.0, Color::opaque(0, 0, 0)) {
            Err(Error::Font(_)) => {}
            other => panic!("expected font error, got {:?}", other.err().map(|e| e.to_string())),
        }
    }
}
