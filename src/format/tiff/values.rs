//! TIFF tag value reading.
//!
//! Values are either stored inline in the IFD entry or at an offset in the
//! file. Arrays such as TileOffsets are fetched with a single range read.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, IfdEntry, TiffHeader};
use super::tags::FieldType;

/// Reads tag values respecting the file's byte order.
pub struct ValueReader<'a, R: RangeReader> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader> ValueReader<'a, R> {
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Raw bytes of an entry's value, inline or fetched from the file.
    pub fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        let size = entry
            .value_byte_size()
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.is_inline {
            return Ok(Bytes::copy_from_slice(
                &entry.value_offset_bytes[..size as usize],
            ));
        }

        let size = usize::try_from(size).map_err(|_| TiffError::InvalidTagValue {
            tag: "value",
            message: format!("value of {} bytes is too large", size),
        })?;
        Ok(self.reader.read_exact_at(entry.value_offset, size)?)
    }

    /// Array of integers (Short, Long or Long8) widened to u64.
    pub fn read_u64_array(&self, entry: &IfdEntry) -> Result<Vec<u64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;
        if !matches!(
            field_type,
            FieldType::Short | FieldType::Long | FieldType::Long8
        ) {
            return Err(TiffError::InvalidTagValue {
                tag: "array",
                message: format!("expected Short, Long or Long8, got {:?}", field_type),
            });
        }

        if entry.count == 0 {
            return Ok(Vec::new());
        }

        let bytes = self.read_bytes(entry)?;
        Ok(parse_u64_array(
            &bytes,
            entry.count as usize,
            field_type,
            self.byte_order(),
        ))
    }

    /// NUL-terminated ASCII string; invalid UTF-8 is replaced lossily.
    pub fn read_string(&self, entry: &IfdEntry) -> Result<String, TiffError> {
        if entry.field_type != Some(FieldType::Ascii) {
            return Err(TiffError::InvalidTagValue {
                tag: "string",
                message: format!("expected Ascii, got type {}", entry.field_type_raw),
            });
        }

        let bytes = self.read_bytes(entry)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// First value of a Rational (or integer) tag as a float.
    pub fn read_rational(&self, entry: &IfdEntry) -> Result<f64, TiffError> {
        let byte_order = self.byte_order();
        match entry.field_type {
            Some(FieldType::Rational) if entry.count >= 1 => {
                let bytes = self.read_bytes(entry)?;
                let numerator = byte_order.read_u32(&bytes[0..4]);
                let denominator = byte_order.read_u32(&bytes[4..8]);
                if denominator == 0 {
                    return Err(TiffError::InvalidTagValue {
                        tag: "rational",
                        message: format!("{}/0 has a zero denominator", numerator),
                    });
                }
                Ok(numerator as f64 / denominator as f64)
            }
            Some(FieldType::Short | FieldType::Long) => entry
                .inline_u32(byte_order)
                .map(f64::from)
                .ok_or_else(|| TiffError::InvalidTagValue {
                    tag: "rational",
                    message: format!("expected a single value, got {}", entry.count),
                }),
            _ => Err(TiffError::InvalidTagValue {
                tag: "rational",
                message: format!("expected Rational, got type {}", entry.field_type_raw),
            }),
        }
    }
}

/// Decode `count` integers of `field_type` from raw bytes.
///
/// Values that would run past the end of `bytes` are dropped.
pub fn parse_u64_array(
    bytes: &[u8],
    count: usize,
    field_type: FieldType,
    byte_order: ByteOrder,
) -> Vec<u64> {
    let width = field_type.size_in_bytes();
    bytes
        .chunks_exact(width)
        .take(count)
        .filter_map(|chunk| match field_type {
            FieldType::Short => Some(byte_order.read_u16(chunk) as u64),
            FieldType::Long => Some(byte_order.read_u32(chunk) as u64),
            FieldType::Long8 => Some(byte_order.read_u64(chunk)),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
