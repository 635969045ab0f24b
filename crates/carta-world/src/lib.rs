//! World discovery and the chunk file codec.
#![forbid(unsafe_code)]

mod chunk;
mod world;

pub use chunk::{
    decode_chunk, decode_chunk_header, encode_chunk, ChunkData, ParseError, SignText,
    CHUNK_EXTENSION, MAP_X, MAP_Y, MAP_Z,
};
pub use world::{Level, ScanOptions, WorldError, WorldInfo};
