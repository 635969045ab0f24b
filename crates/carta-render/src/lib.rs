//! The per-chunk render stage: decode output in, positioned color
//! operations out.
#![forbid(unsafe_code)]

use carta_blocks::{MaterialTable, AIR, MATERIAL_COUNT};
use carta_image::{Color, ImageOperations};
use carta_proj::{Cube, Mode, Point3, Rotation};
use carta_world::{ChunkData, MAP_X, MAP_Y, MAP_Z};

/// Channel scale applied to the sky light contribution in night mode.
const NIGHT_SKY_SHIFT: u8 = 2;
/// Color of a voxel that receives no light at all in night mode.
const NIGHT_VOID: Color = Color::new(0, 0, 0x30, 0xff);
/// Darkening applied to every other layer in striped mode.
const STRIPE_DARKEN: u8 = 0x10;

#[derive(Clone)]
pub struct RenderSettings {
    pub mode: Mode,
    /// Inclusive y splice limits, `0 <= bottom < top < MAP_Y`.
    pub top: usize,
    pub bottom: usize,
    pub night: bool,
    pub heightmap: bool,
    pub cavemode: bool,
    pub striped: bool,
    pub rotation: Rotation,
    pub excludes: [bool; MATERIAL_COUNT],
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            mode: Mode::Top,
            top: MAP_Y - 1,
            bottom: 0,
            night: false,
            heightmap: false,
            cavemode: false,
            striped: false,
            rotation: Rotation::R0,
            excludes: [false; MATERIAL_COUNT],
        }
    }
}

#[inline]
fn chunk_cube() -> Cube {
    Cube::new(MAP_X as i64, MAP_Y as i64, MAP_Z as i64)
}

/// The projected footprint of a single chunk under `mode`.
pub fn chunk_footprint(mode: Mode) -> (u16, u16) {
    let (w, h) = chunk_cube().dimensions(mode);
    (w as u16, h as u16)
}

#[inline]
fn shade(c: Color, chunk: &ChunkData, s: &RenderSettings, x: usize, y: usize, z: usize) -> Color {
    if s.heightmap {
        let v = (y * 0xff / (MAP_Y - 1)) as u8;
        return Color::opaque(v, v, v);
    }
    let mut c = c;
    if s.night {
        let sky = chunk.sky_light_at(x, y, z) >> NIGHT_SKY_SHIFT;
        let light = sky.max(chunk.block_light_at(x, y, z));
        if light == 0 {
            return Color::new(NIGHT_VOID.r, NIGHT_VOID.g, NIGHT_VOID.b, c.a);
        }
        let l = u16::from(light);
        c.r = (u16::from(c.r) * l / 15) as u8;
        c.g = (u16::from(c.g) * l / 15) as u8;
        c.b = (u16::from(c.b) * l / 15) as u8;
    }
    if s.striped && y % 2 == 1 {
        c.darken(STRIPE_DARKEN);
    }
    c
}

/// Render one decoded chunk into an [`ImageOperations`] sized to the mode's
/// chunk footprint.
///
/// Columns descend from `top` to `bottom`, so higher voxels claim pixels
/// first and the paint list's dedup and playback rules produce the final
/// stacking. Excluded materials are treated as air. In cave mode a column
/// stays dark until the first opaque drawn block, and emits from the next
/// voxel down.
pub fn render_chunk(
    chunk: &ChunkData,
    materials: &MaterialTable,
    s: &RenderSettings,
) -> ImageOperations {
    let (w, h) = chunk_footprint(s.mode);
    let mut ops = ImageOperations::new(w, h);
    let cube = chunk_cube();

    for lz in 0..MAP_Z {
        for lx in 0..MAP_X {
            let (rx, rz) = s.rotation.apply_local(lx as i64, lz as i64);
            let mut covered = s.cavemode;
            for y in (s.bottom..=s.top).rev() {
                let id = chunk.block(lx, y, lz);
                if id == AIR || s.excludes[id as usize] {
                    continue;
                }
                let material = materials.get(id);
                if !material.drawn {
                    continue;
                }
                if covered {
                    // Still above ground: wait for the roof.
                    if material.base.is_opaque() {
                        covered = false;
                    }
                    continue;
                }

                let top = shade(material.base, chunk, s, lx, y, lz);
                let side = shade(material.side, chunk, s, lx, y, lz);
                let p = Point3::new(rx, y as i64, rz);
                let Some(at) = cube.project(s.mode, p) else {
                    continue;
                };

                match s.mode {
                    Mode::Top => {
                        ops.add(at.x, at.y, top);
                    }
                    Mode::Oblique | Mode::ObliqueAngle => {
                        ops.add(at.x, at.y, top);
                        ops.add(at.x, at.y + 1, side);
                    }
                    Mode::Isometric => {
                        ops.add(at.x, at.y, top);
                        ops.add(at.x + 1, at.y, top);
                        ops.add(at.x, at.y + 1, side);
                        ops.add(at.x + 1, at.y + 1, side);
                    }
                }
            }
        }
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use carta_image::{ImageSurface, MemoryImage};

    fn flat_world(surface_y: usize, id: u8) -> ChunkData {
        let mut chunk = ChunkData::new(0, 0);
        for x in 0..MAP_X {
            for z in 0..MAP_Z {
                for y in 0..=surface_y {
                    chunk.set_block(x, y, z, id);
                }
            }
        }
        chunk
    }

    #[test]
    fn top_mode_paints_the_surface_base_color() {
        let chunk = flat_world(40, 1);
        let materials = MaterialTable::new();
        let ops = render_chunk(&chunk, &materials, &RenderSettings::default());
        let mut img = MemoryImage::new(16, 16);
        img.composite_ops(0, 0, &ops);
        assert_eq!(img.get_pixel(0, 0), materials.get(1).base);
        assert_eq!(img.get_pixel(15, 15), materials.get(1).base);
    }

    #[test]
    fn opaque_stack_collapses_to_one_op_per_pixel_in_top_mode() {
        let chunk = flat_world(40, 1);
        let materials = MaterialTable::new();
        let ops = render_chunk(&chunk, &materials, &RenderSettings::default());
        assert_eq!(ops.len(), 16 * 16);
    }

    #[test]
    fn excluded_material_exposes_what_is_below() {
        let mut chunk = flat_world(10, 1);
        for x in 0..MAP_X {
            for z in 0..MAP_Z {
                chunk.set_block(x, 11, z, 12);
            }
        }
        let materials = MaterialTable::new();
        let mut s = RenderSettings::default();
        s.excludes[12] = true;
        let ops = render_chunk(&chunk, &materials, &s);
        let mut img = MemoryImage::new(16, 16);
        img.composite_ops(0, 0, &ops);
        assert_eq!(img.get_pixel(3, 3), materials.get(1).base);
    }

    #[test]
    fn splice_limits_hide_high_layers() {
        let mut chunk = flat_world(10, 1);
        chunk.set_block(0, 90, 0, 12);
        let materials = MaterialTable::new();
        let s = RenderSettings {
            top: 80,
            ..RenderSettings::default()
        };
        let ops = render_chunk(&chunk, &materials, &s);
        let mut img = MemoryImage::new(16, 16);
        img.composite_ops(0, 0, &ops);
        assert_eq!(img.get_pixel(0, 0), materials.get(1).base);
    }

    #[test]
    fn cave_mode_skips_the_roof_and_emits_below() {
        let mut chunk = ChunkData::new(0, 0);
        // A stone roof at y=60 over a sand floor at y=20.
        for x in 0..MAP_X {
            for z in 0..MAP_Z {
                chunk.set_block(x, 60, z, 1);
                chunk.set_block(x, 20, z, 12);
            }
        }
        let materials = MaterialTable::new();
        let s = RenderSettings {
            cavemode: true,
            ..RenderSettings::default()
        };
        let ops = render_chunk(&chunk, &materials, &s);
        let mut img = MemoryImage::new(16, 16);
        img.composite_ops(0, 0, &ops);
        assert_eq!(img.get_pixel(5, 5), materials.get(12).base);
    }

    #[test]
    fn heightmap_mode_ramps_with_height() {
        let mut chunk = ChunkData::new(0, 0);
        chunk.set_block(0, 127, 0, 1);
        chunk.set_block(2, 63, 2, 1);
        let materials = MaterialTable::new();
        let s = RenderSettings {
            heightmap: true,
            ..RenderSettings::default()
        };
        let ops = render_chunk(&chunk, &materials, &s);
        let mut img = MemoryImage::new(16, 16);
        img.composite_ops(0, 0, &ops);
        assert_eq!(img.get_pixel(0, 0), Color::opaque(255, 255, 255));
        let mid = (63 * 255 / 127) as u8;
        assert_eq!(img.get_pixel(2, 2), Color::opaque(mid, mid, mid));
    }

    #[test]
    fn night_mode_zero_light_is_deep_blue() {
        let mut chunk = ChunkData::new(0, 0);
        chunk.set_block(4, 50, 4, 1);
        let materials = MaterialTable::new();
        let s = RenderSettings {
            night: true,
            ..RenderSettings::default()
        };
        let ops = render_chunk(&chunk, &materials, &s);
        let mut img = MemoryImage::new(16, 16);
        img.composite_ops(0, 0, &ops);
        assert_eq!(img.get_pixel(4, 4), Color::opaque(0, 0, 0x30));
    }

    #[test]
    fn night_mode_scales_with_block_light() {
        let mut chunk = ChunkData::new(0, 0);
        chunk.set_block(4, 50, 4, 1);
        chunk.set_block_light(4, 50, 4, 15);
        let materials = MaterialTable::new();
        let s = RenderSettings {
            night: true,
            ..RenderSettings::default()
        };
        let ops = render_chunk(&chunk, &materials, &s);
        let mut img = MemoryImage::new(16, 16);
        img.composite_ops(0, 0, &ops);
        assert_eq!(img.get_pixel(4, 4), materials.get(1).base);
    }

    #[test]
    fn oblique_emits_top_and_side_pixels() {
        let mut chunk = ChunkData::new(0, 0);
        chunk.set_block(3, 64, 0, 1);
        let materials = MaterialTable::new();
        let s = RenderSettings {
            mode: Mode::Oblique,
            ..RenderSettings::default()
        };
        let ops = render_chunk(&chunk, &materials, &s);
        assert_eq!(ops.len(), 2);
        let (w, h) = chunk_footprint(Mode::Oblique);
        let mut img = MemoryImage::new(i64::from(w), i64::from(h));
        img.composite_ops(0, 0, &ops);
        // project(3, 64, 0) = (3, 64)
        assert_eq!(img.get_pixel(3, 64), materials.get(1).base);
        assert_eq!(img.get_pixel(3, 65), materials.get(1).side);
    }

    #[test]
    fn isometric_emits_two_wide_faces() {
        let mut chunk = ChunkData::new(0, 0);
        chunk.set_block(8, 64, 8, 1);
        let materials = MaterialTable::new();
        let s = RenderSettings {
            mode: Mode::Isometric,
            ..RenderSettings::default()
        };
        let ops = render_chunk(&chunk, &materials, &s);
        assert_eq!(ops.len(), 4);
        let (w, h) = chunk_footprint(Mode::Isometric);
        let mut img = MemoryImage::new(i64::from(w), i64::from(h));
        img.composite_ops(0, 0, &ops);
        // project(8, 64, 8) = (32, 144)
        assert_eq!(img.get_pixel(32, 144), materials.get(1).base);
        assert_eq!(img.get_pixel(33, 144), materials.get(1).base);
        assert_eq!(img.get_pixel(32, 145), materials.get(1).side);
    }

    #[test]
    fn rotation_moves_chunk_content() {
        let mut chunk = ChunkData::new(0, 0);
        chunk.set_block(3, 64, 0, 1);
        let materials = MaterialTable::new();
        let s = RenderSettings {
            rotation: Rotation::R90,
            ..RenderSettings::default()
        };
        let ops = render_chunk(&chunk, &materials, &s);
        let mut img = MemoryImage::new(16, 16);
        img.composite_ops(0, 0, &ops);
        // (3, 0) rotates to (0, 12)
        assert_eq!(img.get_pixel(0, 12), materials.get(1).base);
    }
}
