//! Byte-range access to slide files.
//!
//! The TIFF parser never reads a whole slide: it asks for the header, the IFD
//! chain, tag payloads and individual tiles through [`RangeReader`].

mod file_reader;
mod range_reader;

pub use file_reader::{FileRangeReader, MemoryRangeReader};
pub use range_reader::{
    read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le, RangeReader,
};
