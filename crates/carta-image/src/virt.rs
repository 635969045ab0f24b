use std::collections::BTreeMap;

use crate::{Color, ImageError, ImageSurface};

/// A window onto another surface, expressed in the base's coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

/// A windowed view onto another surface; every operation translates by the
/// window origin and forwards. Views compose by translation, which is how
/// the final image is carved into fixed-size output tiles.
pub struct VirtualImage<'a> {
    rect: Rect,
    base: &'a mut dyn ImageSurface,
}

impl<'a> VirtualImage<'a> {
    pub fn new(base: &'a mut dyn ImageSurface, rect: Rect) -> Self {
        Self { rect, base }
    }
}

impl ImageSurface for VirtualImage<'_> {
    fn get_width(&self) -> i64 {
        self.rect.w
    }

    fn get_height(&self) -> i64 {
        self.rect.h
    }

    fn get_pixel(&mut self, x: i64, y: i64) -> Color {
        if x < 0 || y < 0 || x >= self.rect.w || y >= self.rect.h {
            return Color::INVISIBLE;
        }
        self.base.get_pixel(self.rect.x + x, self.rect.y + y)
    }

    fn set_pixel(&mut self, x: i64, y: i64, c: Color) {
        if x < 0 || y < 0 || x >= self.rect.w || y >= self.rect.h {
            return;
        }
        self.base.set_pixel(self.rect.x + x, self.rect.y + y, c);
    }

    fn blend_pixel(&mut self, x: i64, y: i64, c: Color) {
        if x < 0 || y < 0 || x >= self.rect.w || y >= self.rect.h {
            return;
        }
        self.base.blend_pixel(self.rect.x + x, self.rect.y + y, c);
    }

    fn get_line(&mut self, y: i64, offset: i64, width: i64, out: &mut [Color]) {
        if y < 0 || y >= self.rect.h || offset < 0 || offset >= self.rect.w {
            return;
        }
        let width = if width + offset <= self.rect.w {
            width
        } else {
            self.rect.w - offset
        };
        self.base
            .get_line(self.rect.y + y, self.rect.x + offset, width, out);
    }

    fn flush(&mut self) -> Result<(), ImageError> {
        self.base.flush()
    }
}

/// Carve a `width x height` surface into `pixels x pixels` windows, keyed by
/// `(tile_x, tile_y)` ordered left-to-right, top-to-bottom. Edge windows are
/// clamped to the surface bounds.
pub fn split_rects(width: i64, height: i64, pixels: i64) -> BTreeMap<(i64, i64), Rect> {
    let mut map = BTreeMap::new();
    let mut py = 0;
    let mut y = 0;
    while y < height {
        let mut px = 0;
        let mut x = 0;
        while x < width {
            map.insert(
                (px, py),
                Rect {
                    x,
                    y,
                    w: pixels.min(width - x),
                    h: pixels.min(height - y),
                },
            );
            x += pixels;
            px += 1;
        }
        y += pixels;
        py += 1;
    }
    map
}
