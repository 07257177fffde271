//! Slide format detection.
//!
//! - **Aperio SVS**: the first ImageDescription starts with the `Aperio` marker
//! - **Generic TIFF**: any other tiled pyramidal TIFF

use super::svs::is_aperio_description;
use super::tiff::{ByteOrder, TIFF_HEADER_SIZE};

/// Detected slide format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideFormat {
    /// Aperio SVS, with metadata in the ImageDescription
    AperioSvs,

    /// Plain tiled pyramidal TIFF
    GenericTiff,
}

impl SlideFormat {
    /// Classify by the first IFD's ImageDescription.
    pub fn from_description(description: Option<&str>) -> Self {
        match description {
            Some(d) if is_aperio_description(d) => SlideFormat::AperioSvs,
            _ => SlideFormat::GenericTiff,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            SlideFormat::AperioSvs => "Aperio SVS",
            SlideFormat::GenericTiff => "Generic Pyramidal TIFF",
        }
    }

    /// Value published as `openslide.vendor`.
    pub const fn vendor(&self) -> &'static str {
        match self {
            SlideFormat::AperioSvs => "aperio",
            SlideFormat::GenericTiff => "generic-tiff",
        }
    }
}

/// Quick magic and version check before full parsing.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    if bytes.len() < TIFF_HEADER_SIZE {
        return false;
    }

    let byte_order = match &bytes[0..2] {
        b"II" => ByteOrder::LittleEndian,
        b"MM" => ByteOrder::BigEndian,
        _ => return false,
    };

    matches!(byte_order.read_u16(&bytes[2..4]), 42 | 43)
}

// =============================================================================
// Tests
// =============================================================================
