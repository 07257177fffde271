//! JPEG tile decoding and thumbnail encoding.
//!
//! Aperio tiles are abbreviated JPEG streams: the quantization (DQT) and
//! Huffman (DHT) tables are stored once in the `JPEGTables` tag and must be
//! spliced in front of each tile's scan before a standard decoder accepts it.
//!
//! ```text
//! tables: SOI DQT DHT EOI      tile: SOI SOF SOS ... EOI
//! merged: SOI DQT DHT SOF SOS ... EOI
//! ```

use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, ImageReader, RgbImage};

use crate::error::DecodeError;

/// Default thumbnail JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

pub const MIN_JPEG_QUALITY: u8 = 1;

pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// Markers
// =============================================================================

pub const SOI: [u8; 2] = [0xFF, 0xD8];
pub const EOI: [u8; 2] = [0xFF, 0xD9];
pub const DHT: [u8; 2] = [0xFF, 0xC4];
pub const DQT: [u8; 2] = [0xFF, 0xDB];
pub const SOS: [u8; 2] = [0xFF, 0xDA];

/// First table-or-scan marker after SOI, walking segment lengths.
fn first_table_or_scan(data: &[u8]) -> Option<[u8; 2]> {
    if data.len() < 4 || data[0..2] != SOI {
        return None;
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = [data[pos], data[pos + 1]];
        if marker == DQT || marker == DHT || marker == SOS {
            return Some(marker);
        }

        // Standalone markers carry no length
        let standalone = matches!(marker[1], 0x00 | 0x01 | 0xD0..=0xD9 | 0xFF);
        if standalone || pos + 3 >= data.len() {
            pos += 2;
        } else {
            let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            pos += 2 + length.max(2);
        }
    }

    None
}

/// Stream reaches its scan without defining any tables.
pub fn is_abbreviated_stream(data: &[u8]) -> bool {
    first_table_or_scan(data) == Some(SOS)
}

/// Stream defines its own tables before the scan.
pub fn is_complete_stream(data: &[u8]) -> bool {
    matches!(first_table_or_scan(data), Some(m) if m == DQT || m == DHT)
}

/// Splice `tables` in front of an abbreviated tile.
///
/// The trailing EOI of `tables` and the leading SOI of `tile` are dropped.
pub fn merge_jpeg_tables(tables: &[u8], tile: &[u8]) -> Bytes {
    if tables.is_empty() {
        return Bytes::copy_from_slice(tile);
    }
    if tile.is_empty() {
        return Bytes::new();
    }

    let tables = tables.strip_suffix(&EOI).unwrap_or(tables);
    let tile = tile.strip_prefix(&SOI).unwrap_or(tile);

    let mut merged = BytesMut::with_capacity(tables.len() + tile.len());
    merged.extend_from_slice(tables);
    merged.extend_from_slice(tile);
    merged.freeze()
}

/// Make tile bytes decodable, merging tables only when the tile lacks them.
pub fn prepare_tile_jpeg(tables: Option<&[u8]>, tile: &[u8]) -> Bytes {
    match tables {
        Some(tables) if is_abbreviated_stream(tile) => merge_jpeg_tables(tables, tile),
        _ => Bytes::copy_from_slice(tile),
    }
}

// =============================================================================
// Codec
// =============================================================================

/// Decode a complete JPEG stream to RGB.
pub fn decode_jpeg(data: &[u8]) -> Result<RgbImage, DecodeError> {
    let reader = ImageReader::with_format(Cursor::new(data), ImageFormat::Jpeg);
    let image = reader.decode().map_err(|e| DecodeError::Image {
        message: e.to_string(),
    })?;
    Ok(image.into_rgb8())
}

/// Encode an RGB image as JPEG; quality is clamped to 1..=100.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Bytes, DecodeError> {
    let quality = quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY);
    let mut output = Vec::new();
    JpegEncoder::new_with_quality(&mut output, quality)
        .encode_image(image)
        .map_err(|e| DecodeError::Encode {
            message: e.to_string(),
        })?;
    Ok(Bytes::from(output))
}

pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

// =============================================================================
// Tests
// =============================================================================
