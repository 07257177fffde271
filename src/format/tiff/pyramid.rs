//! Pyramid level discovery.
//!
//! A slide file holds several IFDs: the resolution levels of the pyramid plus
//! associated images (label, macro, thumbnail). Levels are the tiled IFDs
//! whose size halves consistently from the largest one; everything else is
//! kept aside in `other_ifds`.

use bytes::Bytes;
use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
use super::tags::TiffTag;
use super::values::ValueReader;

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of IFDs followed along the chain
pub const MAX_IFDS: usize = 100;

/// Images narrower than this on either side are never levels
const MIN_PYRAMID_DIMENSION: u32 = 256;

/// Square-ish tiled images up to this size are labels or thumbnails
const MAX_ASSOCIATED_DIMENSION: u32 = 1000;

/// Relative slack when matching a level to a requested downsample
const DOWNSAMPLE_TOLERANCE: f64 = 0.01;

// =============================================================================
// PyramidLevel
// =============================================================================

/// One resolution level of the pyramid.
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    /// 0 = full resolution
    pub level_index: usize,

    /// Position of the IFD in the chain
    pub ifd_index: usize,

    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,

    /// Size of level 0 relative to this level
    pub downsample: f64,

    /// Raw Compression tag value
    pub compression: u16,

    pub ifd: Ifd,
    pub tile_offsets_entry: Option<IfdEntry>,
    pub tile_byte_counts_entry: Option<IfdEntry>,
    pub jpeg_tables_entry: Option<IfdEntry>,
}

impl PyramidLevel {
    /// Build a level from a tiled IFD, `None` if tile or image size is missing.
    fn from_ifd(ifd: &Ifd, ifd_index: usize, header: &TiffHeader) -> Option<Self> {
        let byte_order = header.byte_order;
        let tile_width = ifd.tile_width(byte_order).filter(|&w| w > 0)?;
        let tile_height = ifd.tile_height(byte_order).filter(|&h| h > 0)?;
        let width = ifd.image_width(byte_order)?;
        let height = ifd.image_height(byte_order)?;

        Some(PyramidLevel {
            level_index: 0,
            ifd_index,
            width,
            height,
            tile_width,
            tile_height,
            tiles_x: width.div_ceil(tile_width),
            tiles_y: height.div_ceil(tile_height),
            downsample: 1.0,
            compression: ifd.compression(byte_order),
            tile_offsets_entry: ifd.get_entry_by_tag(TiffTag::TileOffsets).cloned(),
            tile_byte_counts_entry: ifd.get_entry_by_tag(TiffTag::TileByteCounts).cloned(),
            jpeg_tables_entry: ifd.get_entry_by_tag(TiffTag::JpegTables).cloned(),
            ifd: ifd.clone(),
        })
    }

    pub fn has_tile_data(&self) -> bool {
        self.tile_offsets_entry.is_some() && self.tile_byte_counts_entry.is_some()
    }

    pub fn tile_count(&self) -> u32 {
        self.tiles_x * self.tiles_y
    }

    /// Row-major index of a tile, `None` outside the grid.
    pub fn tile_index(&self, tile_x: u32, tile_y: u32) -> Option<u32> {
        if tile_x >= self.tiles_x || tile_y >= self.tiles_y {
            return None;
        }
        Some(tile_y * self.tiles_x + tile_x)
    }

    /// Pixels of a tile that lie inside the image; edge tiles are clipped.
    pub fn tile_dimensions(&self, tile_x: u32, tile_y: u32) -> Option<(u32, u32)> {
        self.tile_index(tile_x, tile_y)?;
        let w = (self.width - tile_x * self.tile_width).min(self.tile_width);
        let h = (self.height - tile_y * self.tile_height).min(self.tile_height);
        Some((w, h))
    }

    fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

// =============================================================================
// TiffPyramid
// =============================================================================

/// IFD chain of a file split into pyramid levels and associated images.
#[derive(Debug, Clone)]
pub struct TiffPyramid {
    pub header: TiffHeader,

    /// Sorted by resolution, level 0 first
    pub levels: Vec<PyramidLevel>,

    /// Non-level IFDs with their chain index
    pub other_ifds: Vec<(usize, Ifd)>,
}

impl TiffPyramid {
    /// Read the header and every IFD, then identify the levels.
    pub fn parse<R: RangeReader>(reader: &R) -> Result<Self, TiffError> {
        let header_len = (reader.size() as usize).min(BIGTIFF_HEADER_SIZE);
        if header_len < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: reader.size(),
            });
        }
        let header_bytes = reader.read_exact_at(0, header_len)?;
        let header = TiffHeader::parse(&header_bytes, reader.size())?;

        let ifds = Self::parse_all_ifds(reader, &header)?;
        debug!(
            slide = reader.identifier(),
            bigtiff = header.is_bigtiff,
            ifds = ifds.len(),
            "parsed IFD chain"
        );

        Ok(Self::build(header, ifds))
    }

    /// Follow next-IFD offsets until 0, a revisited offset, or [`MAX_IFDS`].
    fn parse_all_ifds<R: RangeReader>(
        reader: &R,
        header: &TiffHeader,
    ) -> Result<Vec<Ifd>, TiffError> {
        let mut ifds = Vec::new();
        let mut seen = Vec::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 && ifds.len() < MAX_IFDS {
            if seen.contains(&offset) {
                return Err(TiffError::InvalidIfdOffset(offset));
            }
            seen.push(offset);

            let count_bytes = reader.read_exact_at(offset, header.ifd_count_size())?;
            let entry_count = header.read_entry_count(&count_bytes);
            let ifd_size = Ifd::calculate_size(entry_count, header);
            let ifd_bytes = reader.read_exact_at(offset, ifd_size)?;
            let ifd = Ifd::parse(&ifd_bytes, header)?;

            offset = ifd.next_ifd_offset;
            ifds.push(ifd);
        }

        Ok(ifds)
    }

    fn build(header: TiffHeader, ifds: Vec<Ifd>) -> Self {
        let mut candidates = Vec::new();
        let mut other_ifds = Vec::new();

        for (ifd_index, ifd) in ifds.into_iter().enumerate() {
            match PyramidLevel::from_ifd(&ifd, ifd_index, &header) {
                Some(level) if Self::is_pyramid_candidate(&level) => candidates.push(level),
                _ => other_ifds.push((ifd_index, ifd)),
            }
        }

        candidates.sort_by_key(|level| std::cmp::Reverse(level.area()));

        let mut levels: Vec<PyramidLevel> = Vec::with_capacity(candidates.len());
        for mut level in candidates {
            let downsample = match levels.first() {
                None => 1.0,
                Some(base) => {
                    let dx = base.width as f64 / level.width as f64;
                    let dy = base.height as f64 / level.height as f64;
                    (dx + dy) / 2.0
                }
            };

            let previous = levels.last().map(|l| l.downsample);
            if Self::is_valid_downsample(downsample, previous) {
                level.level_index = levels.len();
                level.downsample = downsample;
                levels.push(level);
            } else {
                debug!(
                    ifd = level.ifd_index,
                    downsample, "tiled IFD does not fit the pyramid"
                );
                other_ifds.push((level.ifd_index, level.ifd));
            }
        }
        other_ifds.sort_by_key(|(index, _)| *index);

        TiffPyramid {
            header,
            levels,
            other_ifds,
        }
    }

    fn is_pyramid_candidate(level: &PyramidLevel) -> bool {
        if level.width < MIN_PYRAMID_DIMENSION || level.height < MIN_PYRAMID_DIMENSION {
            return false;
        }
        if !level.has_tile_data() {
            return false;
        }

        let small =
            level.width <= MAX_ASSOCIATED_DIMENSION && level.height <= MAX_ASSOCIATED_DIMENSION;
        let aspect = level.width as f64 / level.height as f64;
        !(small && aspect > 0.5 && aspect < 2.0)
    }

    /// Level 0 must be ~1; later levels must be strictly coarser than the
    /// level before. Any factor is accepted, not only powers of two.
    fn is_valid_downsample(downsample: f64, previous: Option<f64>) -> bool {
        match previous {
            None => (downsample - 1.0).abs() < 0.1,
            Some(previous) => downsample > previous * (1.0 + DOWNSAMPLE_TOLERANCE),
        }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn get_level(&self, level: usize) -> Option<&PyramidLevel> {
        self.levels.get(level)
    }

    pub fn base_level(&self) -> Option<&PyramidLevel> {
        self.levels.first()
    }

    /// Dimensions of level 0.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.base_level().map(|l| (l.width, l.height))
    }

    pub fn downsamples(&self) -> Vec<f64> {
        self.levels.iter().map(|l| l.downsample).collect()
    }

    /// Coarsest level that still has at least the requested resolution.
    ///
    /// Picks the largest downsample not exceeding `downsample` (within 1%),
    /// and level 0 when every level is coarser than requested.
    pub fn best_level_for_downsample(&self, downsample: f64) -> Option<&PyramidLevel> {
        let limit = downsample * (1.0 + DOWNSAMPLE_TOLERANCE);
        self.levels
            .iter()
            .rev()
            .find(|l| l.downsample <= limit)
            .or_else(|| self.levels.first())
    }

    /// First IFD of the chain, where descriptive tags usually live.
    pub fn first_ifd(&self) -> Option<&Ifd> {
        let first_level = self.levels.iter().map(|l| (l.ifd_index, &l.ifd));
        let others = self.other_ifds.iter().map(|(i, ifd)| (*i, ifd));
        first_level
            .chain(others)
            .min_by_key(|(index, _)| *index)
            .map(|(_, ifd)| ifd)
    }
}

// =============================================================================
// TileData
// =============================================================================

/// Tile locations and shared JPEG tables of one level.
#[derive(Debug, Clone)]
pub struct TileData {
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,
    pub jpeg_tables: Option<Bytes>,
}

impl TileData {
    pub fn load<R: RangeReader>(
        reader: &R,
        level: &PyramidLevel,
        header: &TiffHeader,
    ) -> Result<Self, TiffError> {
        let values = ValueReader::new(reader, header);

        let offsets = level
            .tile_offsets_entry
            .as_ref()
            .ok_or(TiffError::MissingTag("TileOffsets"))
            .and_then(|entry| values.read_u64_array(entry))?;
        let byte_counts = level
            .tile_byte_counts_entry
            .as_ref()
            .ok_or(TiffError::MissingTag("TileByteCounts"))
            .and_then(|entry| values.read_u64_array(entry))?;

        let expected = level.tile_count() as usize;
        if offsets.len() < expected || byte_counts.len() < expected {
            return Err(TiffError::InvalidTagValue {
                tag: "TileOffsets",
                message: format!(
                    "level {} needs {} tiles, found {} offsets and {} byte counts",
                    level.level_index,
                    expected,
                    offsets.len(),
                    byte_counts.len()
                ),
            });
        }

        let jpeg_tables = level
            .jpeg_tables_entry
            .as_ref()
            .map(|entry| values.read_bytes(entry))
            .transpose()?;

        Ok(TileData {
            offsets,
            byte_counts,
            jpeg_tables,
        })
    }

    /// (offset, byte count) of a tile.
    pub fn get_tile_location(&self, tile_index: u32) -> Option<(u64, u64)> {
        let idx = tile_index as usize;
        Some((*self.offsets.get(idx)?, *self.byte_counts.get(idx)?))
    }
}

// =============================================================================
// Tests
// =============================================================================
