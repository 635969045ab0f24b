use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use carta_proj::Rotation;

use crate::chunk::{decode_chunk, decode_chunk_header, ParseError, CHUNK_EXTENSION};

#[derive(Debug)]
pub enum WorldError {
    Io(io::Error),
    /// The broad phase hit an unparsable chunk with `require_all` set.
    Parse(ParseError),
    /// No chunks under the world directory (after limits).
    Empty(PathBuf),
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldError::Io(e) => write!(f, "world scan failed: {}", e),
            WorldError::Parse(e) => write!(f, "broad phase parser error: {}", e),
            WorldError::Empty(p) => write!(f, "no chunks found under {}", p.display()),
        }
    }
}

impl std::error::Error for WorldError {}

impl From<io::Error> for WorldError {
    fn from(e: io::Error) -> Self {
        WorldError::Io(e)
    }
}

/// One discovered chunk file, with rotated chunk coordinates.
#[derive(Clone, Debug)]
pub struct Level {
    pub x_pos: i64,
    pub z_pos: i64,
    pub path: PathBuf,
}

#[derive(Clone, Copy, Debug)]
pub struct ScanOptions {
    /// Full-parse every chunk during the broad phase instead of reading only
    /// the header.
    pub pedantic: bool,
    /// Abort the scan when a chunk file fails to parse, instead of skipping
    /// it with a warning.
    pub require_all: bool,
    /// Chunk-coordinate render limits, applied before rotation:
    /// north, south, east, west.
    pub min_x: i64,
    pub max_x: i64,
    pub min_z: i64,
    pub max_z: i64,
    /// Rotation applied to chunk coordinates. The same rotation must be
    /// applied to chunk content and marker coordinates by the render layer.
    pub rotation: Rotation,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            pedantic: false,
            require_all: false,
            min_x: i64::MIN,
            max_x: i64::MAX,
            min_z: i64::MIN,
            max_z: i64::MAX,
            rotation: Rotation::R0,
        }
    }
}

/// The chunks of one world (or one split tile) and their bounding box in
/// chunk coordinates.
#[derive(Clone, Debug)]
pub struct WorldInfo {
    pub min_x: i64,
    pub max_x: i64,
    pub min_z: i64,
    pub max_z: i64,
    pub levels: Vec<Level>,
    /// Tile identity when this world was produced by [`WorldInfo::split`].
    pub chunk_x: i64,
    pub chunk_y: i64,
}

impl WorldInfo {
    /// Broad-phase scan: walk the world directory recursively, parse every
    /// chunk file header (full parse in pedantic mode), filter against the
    /// limits, rotate, and compute the bounding box. Unparsable files are
    /// skipped with a warning unless `require_all` is set. `progress`
    /// receives one tick per considered file.
    pub fn scan(
        root: &Path,
        opts: &ScanOptions,
        progress: &mut dyn FnMut(usize),
    ) -> Result<WorldInfo, WorldError> {
        let mut world = WorldInfo {
            min_x: i64::MAX,
            max_x: i64::MIN,
            min_z: i64::MAX,
            max_z: i64::MIN,
            levels: Vec::new(),
            chunk_x: 0,
            chunk_y: 0,
        };

        let mut pending = vec![root.to_path_buf()];
        let mut seen = 0usize;
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                let kind = entry.file_type()?;
                if kind.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) != Some(CHUNK_EXTENSION) {
                    continue;
                }
                seen += 1;
                progress(seen);

                let parsed = if opts.pedantic {
                    decode_chunk(&path).map(|c| (c.x_pos, c.z_pos))
                } else {
                    decode_chunk_header(&path)
                };
                let (x, z) = match parsed {
                    Ok(pos) => pos,
                    Err(e) if opts.require_all => return Err(WorldError::Parse(e)),
                    Err(e) => {
                        log::warn!("ignoring unparsable chunk file: {}", e);
                        continue;
                    }
                };

                let (x, z) = (i64::from(x), i64::from(z));
                if x < opts.min_x || x > opts.max_x || z < opts.min_z || z > opts.max_z {
                    continue;
                }
                let (x, z) = opts.rotation.apply_chunk(x, z);
                world.track(x, z);
                world.levels.push(Level {
                    x_pos: x,
                    z_pos: z,
                    path,
                });
            }
        }

        if world.levels.is_empty() {
            return Err(WorldError::Empty(root.to_path_buf()));
        }

        // Chunks composite in list order and earlier content stays in
        // front, so order front-to-back: south-east first. This is what
        // makes the oblique and isometric modes stack correctly, and it
        // makes the output deterministic regardless of scan order.
        world.levels.sort_by_key(|l| {
            (
                std::cmp::Reverse(l.z_pos),
                std::cmp::Reverse(l.x_pos),
                l.path.clone(),
            )
        });
        Ok(world)
    }

    fn track(&mut self, x: i64, z: i64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_z = self.min_z.min(z);
        self.max_z = self.max_z.max(z);
    }

    /// Partition into contiguous `n x n` chunk-count tiles relative to the
    /// world minimum. Tiles keep their `(chunk_x, chunk_y)` identity; empty
    /// tiles do not appear.
    pub fn split(&self, n: i64) -> Vec<WorldInfo> {
        let mut tiles: BTreeMap<(i64, i64), WorldInfo> = BTreeMap::new();
        for level in &self.levels {
            let tx = (level.x_pos - self.min_x).div_euclid(n);
            let tz = (level.z_pos - self.min_z).div_euclid(n);
            let tile = tiles.entry((tx, tz)).or_insert_with(|| WorldInfo {
                min_x: i64::MAX,
                max_x: i64::MIN,
                min_z: i64::MAX,
                max_z: i64::MIN,
                levels: Vec::new(),
                chunk_x: tx,
                chunk_y: tz,
            });
            tile.track(level.x_pos, level.z_pos);
            tile.levels.push(level.clone());
        }
        tiles.into_values().collect()
    }
}
