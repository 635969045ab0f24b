//! Pixel surfaces: colors, per-chunk paint lists, and the memory, cached,
//! and virtual image implementations behind one capability trait.
#![forbid(unsafe_code)]

mod cached;
mod color;
mod memory;
mod ops;
mod surface;
mod virt;

pub use cached::CachedImage;
pub use color::Color;
pub use memory::MemoryImage;
pub use ops::{ImageOperation, ImageOperations};
pub use surface::{ImageError, ImageSurface};
pub use virt::{split_rects, Rect, VirtualImage};
