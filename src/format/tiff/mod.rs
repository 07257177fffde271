//! TIFF and BigTIFF structure parsing.
//!
//! - **Byte order**: `II` (little-endian) or `MM` (big-endian); every
//!   multi-byte value is read through [`ByteOrder`].
//! - **Classic vs BigTIFF**: 32-bit vs 64-bit offsets, handled transparently.
//! - **IFDs**: one per image (pyramid levels, label, macro, thumbnail).
//! - **Inline vs offset values**: values of up to 4 (classic) or 8 (BigTIFF)
//!   bytes live in the entry itself.

mod parser;
mod pyramid;
mod tags;
mod values;

pub use parser::{
    ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, MAX_IFD_ENTRIES, TIFF_HEADER_SIZE,
};
pub use pyramid::{PyramidLevel, TiffPyramid, TileData, MAX_IFDS};
pub use tags::{Compression, FieldType, ResolutionUnit, TiffTag};
pub use values::{parse_u64_array, ValueReader};
