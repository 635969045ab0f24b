use crate::{Color, ImageSurface};

/// A surface owning a contiguous row-major pixel array.
pub struct MemoryImage {
    width: i64,
    height: i64,
    colors: Vec<Color>,
}

impl MemoryImage {
    pub fn new(width: i64, height: i64) -> Self {
        Self {
            width,
            height,
            colors: vec![Color::INVISIBLE; (width * height) as usize],
        }
    }

    #[inline]
    fn offset(&self, x: i64, y: i64) -> usize {
        (y * self.width + x) as usize
    }
}

impl ImageSurface for MemoryImage {
    fn get_width(&self) -> i64 {
        self.width
    }

    fn get_height(&self) -> i64 {
        self.height
    }

    fn get_pixel(&mut self, x: i64, y: i64) -> Color {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return Color::INVISIBLE;
        }
        self.colors[self.offset(x, y)]
    }

    fn set_pixel(&mut self, x: i64, y: i64, c: Color) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        let o = self.offset(x, y);
        self.colors[o] = c;
    }

    fn blend_pixel(&mut self, x: i64, y: i64, c: Color) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        let o = self.offset(x, y);
        self.colors[o].blend(c);
    }

    fn get_line(&mut self, y: i64, offset: i64, width: i64, out: &mut [Color]) {
        if y < 0 || y >= self.height || offset < 0 || offset >= self.width {
            return;
        }
        let width = if width + offset <= self.width {
            width
        } else {
            self.width - offset
        };
        let start = self.offset(offset, y);
        let n = width as usize;
        out[..n].copy_from_slice(&self.colors[start..start + n]);
    }
}
