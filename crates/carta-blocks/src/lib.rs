//! Block materials: the dense id-indexed table and palette file I/O.
#![forbid(unsafe_code)]

mod palette;
mod table;

pub use palette::{load_palette, parse_color_spec, write_palette, PaletteError};
pub use table::{Material, MaterialTable, AIR, MATERIAL_COUNT, SIDE_DARKEN};
