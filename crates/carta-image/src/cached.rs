use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::{Color, ImageError, ImageSurface};

/// One bucket of the pixel cache.
#[derive(Clone, Copy, Debug, Default)]
struct CacheEntry {
    x: i64,
    y: i64,
    c: Color,
    set: bool,
}

/// A surface backed by a file of `width * height * 4` bytes with a bounded
/// in-memory pixel cache.
///
/// The cache is a fixed array of single-entry buckets addressed by
/// `(x + y * width) % capacity`; a colliding blend flushes the occupant. A
/// cached entry always holds the authoritative value of its pixel (a bucket
/// miss loads the file pixel before blending), so interleaved `set`/`get`/
/// `blend` sequences match [`crate::MemoryImage`] bit for bit.
///
/// Write failures inside `blend_pixel` cannot be returned through the
/// capability set; the first one is recorded and surfaced by the next
/// `flush`, which `save_png` always performs. The backing file is removed
/// when the surface is dropped.
pub struct CachedImage {
    width: i64,
    height: i64,
    file: File,
    path: PathBuf,
    buffer: Vec<CacheEntry>,
    dirty: bool,
    pending: Option<io::Error>,
}

impl CachedImage {
    /// Create the backing file (truncating any previous run's) and size it
    /// to hold the full pixel grid, zero-filled: every pixel starts
    /// invisible.
    pub fn build(path: &Path, width: i64, height: i64, capacity: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len((width * height * 4) as u64)?;
        Ok(Self {
            width,
            height,
            file,
            path: path.to_path_buf(),
            buffer: vec![CacheEntry::default(); capacity.max(1)],
            dirty: false,
            pending: None,
        })
    }

    /// Bytes of in-memory cache spent per bucket; the memory limit divided
    /// by this gives the capacity.
    pub const ENTRY_SIZE: usize = std::mem::size_of::<CacheEntry>();

    #[inline]
    fn file_offset(&self, x: i64, y: i64) -> u64 {
        ((y * self.width + x) * 4) as u64
    }

    #[inline]
    fn bucket(&self, x: i64, y: i64) -> usize {
        ((x + y * self.width) % self.buffer.len() as i64) as usize
    }

    fn write_file_pixel(&mut self, x: i64, y: i64, c: Color) -> io::Result<()> {
        let off = self.file_offset(x, y);
        self.file.seek(SeekFrom::Start(off))?;
        self.file.write_all(&[c.r, c.g, c.b, c.a])
    }

    fn read_file_pixel(&mut self, x: i64, y: i64) -> io::Result<Color> {
        let off = self.file_offset(x, y);
        self.file.seek(SeekFrom::Start(off))?;
        let mut b = [0u8; 4];
        self.file.read_exact(&mut b)?;
        let mut c = Color::INVISIBLE;
        c.read(&b);
        Ok(c)
    }

    fn record(&mut self, e: io::Error) {
        log::warn!("cached surface write failed: {}", e);
        if self.pending.is_none() {
            self.pending = Some(e);
        }
    }

    fn flush_cache(&mut self) {
        for i in 0..self.buffer.len() {
            let entry = self.buffer[i];
            if entry.set {
                if let Err(e) = self.write_file_pixel(entry.x, entry.y, entry.c) {
                    self.record(e);
                }
                self.buffer[i].set = false;
            }
        }
        self.dirty = false;
    }
}

impl ImageSurface for CachedImage {
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
        let s = self.bucket(x, y);
        let entry = self.buffer[s];
        if entry.set && entry.x == x && entry.y == y {
            return entry.c;
        }
        match self.read_file_pixel(x, y) {
            Ok(c) => c,
            Err(e) => {
                self.record(e);
                Color::INVISIBLE
            }
        }
    }

    fn set_pixel(&mut self, x: i64, y: i64, c: Color) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        // A cached entry for this pixel would shadow the write.
        let s = self.bucket(x, y);
        let entry = self.buffer[s];
        if entry.set && entry.x == x && entry.y == y {
            self.buffer[s].set = false;
        }
        if let Err(e) = self.write_file_pixel(x, y, c) {
            self.record(e);
        }
    }

    fn blend_pixel(&mut self, x: i64, y: i64, c: Color) {
        if c.is_invisible() {
            return;
        }
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        let s = self.bucket(x, y);
        let entry = self.buffer[s];
        if entry.set {
            if entry.x == x && entry.y == y {
                self.buffer[s].c.blend(c);
                return;
            }
            // Collision: evict the occupant to disk.
            if let Err(e) = self.write_file_pixel(entry.x, entry.y, entry.c) {
                self.record(e);
            }
        }
        let mut cur = match self.read_file_pixel(x, y) {
            Ok(c) => c,
            Err(e) => {
                self.record(e);
                Color::INVISIBLE
            }
        };
        cur.blend(c);
        self.buffer[s] = CacheEntry {
            x,
            y,
            c: cur,
            set: true,
        };
        self.dirty = true;
    }

    fn get_line(&mut self, y: i64, offset: i64, width: i64, out: &mut [Color]) {
        if y < 0 || y >= self.height || offset < 0 || offset >= self.width {
            return;
        }
        if self.dirty {
            self.flush_cache();
        }
        let width = if width + offset <= self.width {
            width
        } else {
            self.width - offset
        };
        let off = self.file_offset(offset, y);
        let n = width as usize;
        let mut bytes = vec![0u8; n * 4];
        let read = self
            .file
            .seek(SeekFrom::Start(off))
            .and_then(|_| self.file.read_exact(&mut bytes));
        if let Err(e) = read {
            self.record(e);
            return;
        }
        for (i, c) in out[..n].iter_mut().enumerate() {
            c.r = bytes[i * 4];
            c.g = bytes[i * 4 + 1];
            c.b = bytes[i * 4 + 2];
            c.a = bytes[i * 4 + 3];
        }
    }

    fn flush(&mut self) -> Result<(), ImageError> {
        self.flush_cache();
        match self.pending.take() {
            Some(e) => Err(ImageError::Io(e)),
            None => Ok(()),
        }
    }
}

impl Drop for CachedImage {
    fn drop(&mut self) {
        self.flush_cache();
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("could not remove cache file {}: {}", self.path.display(), e);
        }
    }
}
