use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::{Color, ImageOperations};

#[derive(Debug)]
pub enum ImageError {
    Io(io::Error),
    Encode(png::EncodingError),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::Io(e) => write!(f, "image i/o error: {}", e),
            ImageError::Encode(e) => write!(f, "png encoding error: {}", e),
        }
    }
}

impl std::error::Error for ImageError {}

impl From<io::Error> for ImageError {
    fn from(e: io::Error) -> Self {
        ImageError::Io(e)
    }
}

impl From<png::EncodingError> for ImageError {
    fn from(e: png::EncodingError) -> Self {
        ImageError::Encode(e)
    }
}

/// The pixel-store capability set. Three implementations exist: in-memory,
/// disk-backed with a bounded pixel cache, and a windowed view onto another
/// surface. Out-of-bounds accesses are ignored rather than panicking, so
/// projections may overshoot a surface edge by design.
pub trait ImageSurface {
    fn get_width(&self) -> i64;
    fn get_height(&self) -> i64;

    fn get_pixel(&mut self, x: i64, y: i64) -> Color;
    fn set_pixel(&mut self, x: i64, y: i64, c: Color);

    /// Place `c` underneath the current pixel value (the pixel accumulated
    /// so far stays in front). This is the playback primitive for
    /// [`ImageOperations`].
    fn blend_pixel(&mut self, x: i64, y: i64, c: Color);

    /// Copy part of a row into `out`. `width + offset` may equal the full
    /// surface width; larger requests are clamped.
    fn get_line(&mut self, y: i64, offset: i64, width: i64, out: &mut [Color]);

    /// Push pending state to the backing store and surface any deferred
    /// write error. In-memory surfaces have nothing to do.
    fn flush(&mut self) -> Result<(), ImageError> {
        Ok(())
    }

    fn fill(&mut self, c: Color) {
        for y in 0..self.get_height() {
            for x in 0..self.get_width() {
                self.set_pixel(x, y, c);
            }
        }
    }

    /// Play a chunk's paint list back at offset `(dx, dy)`. The list is
    /// consumed tail-to-head; see [`ImageOperations`] for the contract.
    fn composite_ops(&mut self, dx: i64, dy: i64, ops: &ImageOperations) {
        for op in ops.iter().rev() {
            let x = dx + i64::from(op.x);
            let y = dy + i64::from(op.y);
            self.blend_pixel(x, y, op.c);
        }
    }

    /// Paint another surface *over* this one at offset `(dx, dy)`.
    fn composite(&mut self, dx: i64, dy: i64, img: &mut dyn ImageSurface) {
        if dx < 0 || dy < 0 {
            return;
        }
        if dx + img.get_width() > self.get_width() || dy + img.get_height() > self.get_height() {
            return;
        }
        for y in 0..img.get_height() {
            for x in 0..img.get_width() {
                let mut c = img.get_pixel(x, y);
                if c.is_invisible() {
                    continue;
                }
                c.blend(self.get_pixel(dx + x, dy + y));
                self.set_pixel(dx + x, dy + y, c);
            }
        }
    }

    fn safe_composite(&mut self, dx: i64, dy: i64, img: &mut dyn ImageSurface) {
        if dx < 0 || dy < 0 {
            return;
        }
        if dx + img.get_width() > self.get_width() || dy + img.get_height() > self.get_height() {
            return;
        }
        self.composite(dx, dy, img);
    }

    /// Serialize as 8-bit RGBA non-interlaced PNG, row by row. `title`
    /// becomes a "Title" text chunk. `progress` receives
    /// `(rows_written, total_rows)` after each row and a terminal tick. A
    /// path of `-` streams to stdout.
    fn save_png(
        &mut self,
        path: &Path,
        title: Option<&str>,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<(), ImageError> {
        self.flush()?;

        let width = self.get_width() as u32;
        let height = self.get_height() as u32;

        let out: Box<dyn Write> = if path == Path::new("-") {
            Box::new(io::stdout().lock())
        } else {
            Box::new(BufWriter::new(File::create(path)?))
        };

        let mut encoder = png::Encoder::new(out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        if let Some(title) = title {
            encoder.add_text_chunk("Title".to_string(), title.to_string())?;
        }

        let mut writer = encoder.write_header()?;
        let mut stream = writer.stream_writer()?;

        let w = width as usize;
        let h = height as usize;
        let mut line = vec![Color::INVISIBLE; w];
        let mut row = vec![0u8; w * 4];
        for y in 0..h {
            progress(y, h);
            self.get_line(y as i64, 0, w as i64, &mut line);
            for (i, c) in line.iter().enumerate() {
                let b: &mut [u8] = &mut row[i * 4..i * 4 + 4];
                b[0] = c.r;
                b[1] = c.g;
                b[2] = c.b;
                b[3] = c.a;
            }
            stream.write_all(&row)?;
        }
        stream.finish()?;
        progress(h, h);
        Ok(())
    }
}
