//! Pyramidal TIFF slide decoder.
//!
//! Opens a tiled TIFF, BigTIFF or Aperio SVS file, publishes its metadata with
//! OpenSlide property names and renders regions and thumbnails from JPEG or
//! uncompressed tiles.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Rgb, RgbImage, RgbaImage};
use tracing::{debug, warn};

use crate::decoder::{fit_within, SlideDecoder};
use crate::error::{DecodeError, TiffError};
use crate::io::{FileRangeReader, RangeReader};
use crate::properties::{
    level_property, SlideProperties, PROPERTY_COMMENT, PROPERTY_LEVEL_COUNT,
    PROPERTY_TIFF_IMAGE_DESCRIPTION, PROPERTY_TIFF_RESOLUTION_UNIT, PROPERTY_TIFF_X_RESOLUTION,
    PROPERTY_TIFF_Y_RESOLUTION, PROPERTY_VENDOR,
};

use super::detect::{is_tiff_header, SlideFormat};
use super::jpeg::{decode_jpeg, prepare_tile_jpeg};
use super::svs::SvsMetadata;
use super::tiff::{
    Compression, Ifd, PyramidLevel, ResolutionUnit, TiffHeader, TiffPyramid, TiffTag, TileData,
    ValueReader, TIFF_HEADER_SIZE,
};

/// Largest region, in pixels, rendered in one call.
pub const MAX_REGION_PIXELS: u64 = 1 << 28;

/// Fill for areas outside the image and for empty tiles.
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// ASCII tags copied verbatim into `tiff.*` properties.
const DESCRIPTIVE_TAGS: &[TiffTag] = &[
    TiffTag::ImageDescription,
    TiffTag::Make,
    TiffTag::Model,
    TiffTag::Software,
    TiffTag::DateTime,
];

// =============================================================================
// TiffSlideDecoder
// =============================================================================

/// Decoder for tiled pyramidal TIFF files.
#[derive(Debug)]
pub struct TiffSlideDecoder<R: RangeReader = FileRangeReader> {
    reader: R,
    format: SlideFormat,
    pyramid: TiffPyramid,

    /// Tile locations per level, same order as `pyramid.levels`
    tiles: Vec<TileData>,

    properties: SlideProperties,
    downsamples: Vec<f64>,
}

impl TiffSlideDecoder<FileRangeReader> {
    /// Open a slide file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        Self::from_reader(FileRangeReader::open(path)?)
    }
}

impl<R: RangeReader> TiffSlideDecoder<R> {
    /// Parse the file structure, tile tables and metadata.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::UnsupportedFormat`] if the file is not a TIFF or has
    ///   no tiled pyramid levels
    /// - [`TiffError::StripOrganization`] if the image is stored in strips
    /// - any I/O or TIFF structure error
    pub fn from_reader(reader: R) -> Result<Self, DecodeError> {
        let magic_len = (reader.size() as usize).min(TIFF_HEADER_SIZE);
        let magic = reader.read_exact_at(0, magic_len)?;
        if !is_tiff_header(&magic) {
            return Err(DecodeError::UnsupportedFormat {
                reason: format!("{} is not a TIFF file", reader.identifier()),
            });
        }

        let pyramid = TiffPyramid::parse(&reader)?;
        if pyramid.levels.is_empty() {
            let stripped = pyramid.other_ifds.iter().any(|(_, ifd)| ifd.is_stripped());
            if stripped {
                return Err(TiffError::StripOrganization.into());
            }
            return Err(DecodeError::UnsupportedFormat {
                reason: "no tiled pyramid levels found".to_string(),
            });
        }

        let header = pyramid.header;
        let tiles = pyramid
            .levels
            .iter()
            .map(|level| TileData::load(&reader, level, &header))
            .collect::<Result<Vec<_>, _>>()?;

        for level in &pyramid.levels {
            let decodable = Compression::from_u16(level.compression)
                .is_some_and(Compression::is_decodable);
            if !decodable {
                warn!(
                    slide = reader.identifier(),
                    level = level.level_index,
                    compression = level.compression,
                    "level uses a compression that cannot be decoded"
                );
            }
        }

        let first_ifd = pyramid.first_ifd();
        let values = ValueReader::new(&reader, &header);
        let description = first_ifd
            .and_then(|ifd| read_ascii(&values, ifd, TiffTag::ImageDescription));
        let format = SlideFormat::from_description(description.as_deref());

        let mut properties = SlideProperties::new();
        properties.insert(PROPERTY_VENDOR, format.vendor());
        if let Some(ifd) = first_ifd {
            publish_tiff_tags(&values, ifd, &mut properties);
        }
        if let Some(description) = &description {
            properties.insert(PROPERTY_COMMENT, description.as_str());
            if format == SlideFormat::AperioSvs {
                SvsMetadata::parse(description).publish(&mut properties);
            }
        }
        publish_levels(&pyramid.levels, &mut properties);

        let downsamples = pyramid.downsamples();

        debug!(
            slide = reader.identifier(),
            format = format.name(),
            levels = pyramid.level_count(),
            properties = properties.len(),
            "opened TIFF slide"
        );

        Ok(TiffSlideDecoder {
            reader,
            format,
            pyramid,
            tiles,
            properties,
            downsamples,
        })
    }

    pub fn format(&self) -> SlideFormat {
        self.format
    }

    pub fn header(&self) -> &TiffHeader {
        &self.pyramid.header
    }

    pub fn pyramid(&self) -> &TiffPyramid {
        &self.pyramid
    }

    /// `(tile_width, tile_height)` of a level.
    pub fn tile_size(&self, level: usize) -> Option<(u32, u32)> {
        self.pyramid
            .get_level(level)
            .map(|l| (l.tile_width, l.tile_height))
    }

    fn level_data(&self, level: usize) -> Result<(&PyramidLevel, &TileData), DecodeError> {
        match (self.pyramid.get_level(level), self.tiles.get(level)) {
            (Some(l), Some(t)) => Ok((l, t)),
            _ => Err(DecodeError::LevelOutOfRange {
                level,
                count: self.pyramid.level_count(),
            }),
        }
    }

    /// Decode one tile to RGB.
    ///
    /// Tiles with a zero byte count are rendered as background.
    pub fn read_tile(&self, level: usize, tile_x: u32, tile_y: u32) -> Result<RgbImage, DecodeError> {
        let (pyramid_level, tiles) = self.level_data(level)?;
        let (offset, byte_count) = pyramid_level
            .tile_index(tile_x, tile_y)
            .and_then(|index| tiles.get_tile_location(index))
            .ok_or_else(|| DecodeError::InvalidRequest {
                message: format!("tile ({tile_x}, {tile_y}) is outside level {level}"),
            })?;

        let (tile_width, tile_height) = (pyramid_level.tile_width, pyramid_level.tile_height);
        if byte_count == 0 {
            return Ok(RgbImage::from_pixel(tile_width, tile_height, BACKGROUND));
        }

        let len = usize::try_from(byte_count).map_err(|_| DecodeError::InvalidRequest {
            message: format!("tile of {byte_count} bytes is too large"),
        })?;
        let data = self.reader.read_exact_at(offset, len)?;

        match Compression::from_u16(pyramid_level.compression) {
            Some(Compression::Jpeg) => {
                let jpeg = prepare_tile_jpeg(tiles.jpeg_tables.as_deref(), &data);
                decode_jpeg(&jpeg)
            }
            Some(Compression::None) => self.decode_uncompressed(pyramid_level, &data),
            Some(other) => Err(TiffError::UnsupportedCompression(other.name().to_string()).into()),
            None => Err(TiffError::UnsupportedCompression(format!(
                "code {}",
                pyramid_level.compression
            ))
            .into()),
        }
    }

    /// Interleaved 8-bit samples: gray, RGB or RGBA.
    fn decode_uncompressed(&self, level: &PyramidLevel, data: &[u8]) -> Result<RgbImage, DecodeError> {
        let samples = level
            .ifd
            .get_u32(TiffTag::SamplesPerPixel, self.pyramid.header.byte_order)
            .unwrap_or(1);
        let (w, h) = (level.tile_width, level.tile_height);
        let needed = w as usize * h as usize * samples as usize;
        if data.len() < needed {
            return Err(DecodeError::Image {
                message: format!(
                    "uncompressed tile has {} bytes, expected {}",
                    data.len(),
                    needed
                ),
            });
        }

        let raw = data[..needed].to_vec();
        let truncated = || DecodeError::Image {
            message: "tile buffer does not match its dimensions".to_string(),
        };
        let image = match samples {
            1 => DynamicImage::ImageLuma8(GrayImage::from_raw(w, h, raw).ok_or_else(truncated)?),
            3 => DynamicImage::ImageRgb8(RgbImage::from_raw(w, h, raw).ok_or_else(truncated)?),
            4 => DynamicImage::ImageRgba8(RgbaImage::from_raw(w, h, raw).ok_or_else(truncated)?),
            n => {
                return Err(DecodeError::UnsupportedFormat {
                    reason: format!("{n} samples per pixel"),
                })
            }
        };
        Ok(image.into_rgb8())
    }

    /// Render a region of a level; `x` and `y` are in that level's pixels.
    ///
    /// Parts of the region beyond the level's extent are background.
    pub fn read_region(
        &self,
        level: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<RgbImage, DecodeError> {
        let (pyramid_level, _) = self.level_data(level)?;
        let pixels = width as u64 * height as u64;
        if pixels > MAX_REGION_PIXELS {
            return Err(DecodeError::InvalidRequest {
                message: format!("region of {width}x{height} exceeds {MAX_REGION_PIXELS} pixels"),
            });
        }

        let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);
        let x_end = (x as u64 + width as u64).min(pyramid_level.width as u64);
        let y_end = (y as u64 + height as u64).min(pyramid_level.height as u64);
        if x as u64 >= x_end || y as u64 >= y_end {
            return Ok(canvas);
        }

        let tile_width = pyramid_level.tile_width as u64;
        let tile_height = pyramid_level.tile_height as u64;
        let first_x = x as u64 / tile_width;
        let first_y = y as u64 / tile_height;
        let last_x = (x_end - 1) / tile_width;
        let last_y = (y_end - 1) / tile_height;

        for tile_y in first_y..=last_y {
            for tile_x in first_x..=last_x {
                let (tx, ty) = (tile_x as u32, tile_y as u32);
                let tile = self.read_tile(level, tx, ty)?;

                // Edge tiles are padded past the image; keep only real pixels
                let (valid_w, valid_h) = pyramid_level
                    .tile_dimensions(tx, ty)
                    .unwrap_or((tile.width(), tile.height()));
                let valid = imageops::crop_imm(
                    &tile,
                    0,
                    0,
                    valid_w.min(tile.width()),
                    valid_h.min(tile.height()),
                )
                .to_image();

                let dest_x = (tile_x * tile_width) as i64 - x as i64;
                let dest_y = (tile_y * tile_height) as i64 - y as i64;
                imageops::replace(&mut canvas, &valid, dest_x, dest_y);
            }
        }

        Ok(canvas)
    }

    /// Draw a whole level into a `width` x `height` canvas, tile by tile.
    ///
    /// Tile edges map to rounded canvas coordinates, so neighbouring tiles
    /// share boundaries and the canvas is covered without gaps.
    fn render_scaled(
        &self,
        level: &PyramidLevel,
        width: u32,
        height: u32,
    ) -> Result<RgbImage, DecodeError> {
        let tiles = self.tiles.get(level.level_index).ok_or(DecodeError::LevelOutOfRange {
            level: level.level_index,
            count: self.tiles.len(),
        })?;
        let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);
        let scale_x = width as f64 / level.width as f64;
        let scale_y = height as f64 / level.height as f64;
        let edge = |pixel: u64, scale: f64, limit: u32| ((pixel as f64 * scale).round() as u32).min(limit);

        for tile_y in 0..level.tiles_y {
            for tile_x in 0..level.tiles_x {
                let Some((valid_w, valid_h)) = level.tile_dimensions(tile_x, tile_y) else {
                    continue;
                };
                let left = tile_x as u64 * level.tile_width as u64;
                let top = tile_y as u64 * level.tile_height as u64;
                let x0 = edge(left, scale_x, width);
                let x1 = edge(left + valid_w as u64, scale_x, width);
                let y0 = edge(top, scale_y, height);
                let y1 = edge(top + valid_h as u64, scale_y, height);
                if x1 <= x0 || y1 <= y0 {
                    continue;
                }

                // Empty tiles are background, which the canvas already is
                let empty = level
                    .tile_index(tile_x, tile_y)
                    .and_then(|index| tiles.get_tile_location(index))
                    .is_some_and(|(_, byte_count)| byte_count == 0);
                if empty {
                    continue;
                }

                let tile = self.read_tile(level.level_index, tile_x, tile_y)?;
                let valid = imageops::crop_imm(
                    &tile,
                    0,
                    0,
                    valid_w.min(tile.width()),
                    valid_h.min(tile.height()),
                )
                .to_image();

                let (dest_w, dest_h) = (x1 - x0, y1 - y0);
                let scaled = if valid.dimensions() == (dest_w, dest_h) {
                    valid
                } else if dest_w < valid.width() && dest_h < valid.height() {
                    imageops::thumbnail(&valid, dest_w, dest_h)
                } else {
                    imageops::resize(&valid, dest_w, dest_h, FilterType::Lanczos3)
                };
                imageops::replace(&mut canvas, &scaled, x0 as i64, y0 as i64);
            }
        }

        Ok(canvas)
    }
}

impl<R: RangeReader> SlideDecoder for TiffSlideDecoder<R> {
    fn identifier(&self) -> &str {
        self.reader.identifier()
    }

    fn properties(&self) -> &SlideProperties {
        &self.properties
    }

    fn level_downsamples(&self) -> &[f64] {
        &self.downsamples
    }

    fn level_dimensions(&self, level: usize) -> Option<(u32, u32)> {
        self.pyramid.get_level(level).map(|l| (l.width, l.height))
    }

    /// Renders from the coarsest level that is still at least as detailed
    /// as the box requires. Tiles are scaled one at a time into the output
    /// canvas, so memory follows the thumbnail size, not the level size.
    fn thumbnail(&self, width: u32, height: u32) -> Result<RgbImage, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::InvalidRequest {
                message: format!("thumbnail bounds {width}x{height} must be positive"),
            });
        }

        let (base_width, base_height) =
            self.dimensions().ok_or_else(|| DecodeError::UnsupportedFormat {
                reason: "slide has no levels".to_string(),
            })?;
        let (target_width, target_height) = fit_within((base_width, base_height), (width, height));
        if target_width as u64 * target_height as u64 > MAX_REGION_PIXELS {
            return Err(DecodeError::InvalidRequest {
                message: format!(
                    "thumbnail of {target_width}x{target_height} exceeds {MAX_REGION_PIXELS} pixels"
                ),
            });
        }

        let downsample = (base_width as f64 / width as f64).max(base_height as f64 / height as f64);
        let level = self
            .pyramid
            .best_level_for_downsample(downsample)
            .ok_or_else(|| DecodeError::UnsupportedFormat {
                reason: "slide has no levels".to_string(),
            })?;

        debug!(
            slide = self.identifier(),
            level = level.level_index,
            downsample,
            width = target_width,
            height = target_height,
            "rendering thumbnail"
        );

        self.render_scaled(level, target_width, target_height)
    }
}

// =============================================================================
// Property Publishing
// =============================================================================

fn read_ascii<R: RangeReader>(values: &ValueReader<'_, R>, ifd: &Ifd, tag: TiffTag) -> Option<String> {
    let entry = ifd.get_entry_by_tag(tag)?;
    match values.read_string(entry) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(tag = tag.name(), error = %err, "skipping unreadable tag");
            None
        }
    }
}

fn read_rational<R: RangeReader>(values: &ValueReader<'_, R>, ifd: &Ifd, tag: TiffTag) -> Option<f64> {
    let entry = ifd.get_entry_by_tag(tag)?;
    match values.read_rational(entry) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(tag = tag.name(), error = %err, "skipping unreadable tag");
            None
        }
    }
}

/// `tiff.*` properties from the first IFD.
fn publish_tiff_tags<R: RangeReader>(
    values: &ValueReader<'_, R>,
    ifd: &Ifd,
    properties: &mut SlideProperties,
) {
    for &tag in DESCRIPTIVE_TAGS {
        if let Some(value) = read_ascii(values, ifd, tag) {
            let key = if tag == TiffTag::ImageDescription {
                PROPERTY_TIFF_IMAGE_DESCRIPTION.to_string()
            } else {
                format!("tiff.{}", tag.name())
            };
            properties.insert(key, value);
        }
    }

    if let Some(unit) = ifd.get_u32(TiffTag::ResolutionUnit, values.byte_order()) {
        let rendered = u16::try_from(unit)
            .ok()
            .and_then(ResolutionUnit::from_u16)
            .map(ResolutionUnit::property_value)
            .unwrap_or("unknown");
        properties.insert(PROPERTY_TIFF_RESOLUTION_UNIT, rendered);
    }

    for (tag, key) in [
        (TiffTag::XResolution, PROPERTY_TIFF_X_RESOLUTION),
        (TiffTag::YResolution, PROPERTY_TIFF_Y_RESOLUTION),
    ] {
        if let Some(resolution) = read_rational(values, ifd, tag) {
            properties.insert(key, resolution.to_string());
        }
    }
}

/// `openslide.level-count` and `openslide.level[i].*` properties.
fn publish_levels(levels: &[PyramidLevel], properties: &mut SlideProperties) {
    properties.insert(PROPERTY_LEVEL_COUNT, levels.len().to_string());
    for level in levels {
        let i = level.level_index;
        properties.insert(level_property(i, "width"), level.width.to_string());
        properties.insert(level_property(i, "height"), level.height.to_string());
        properties.insert(level_property(i, "downsample"), level.downsample.to_string());
        properties.insert(level_property(i, "tile-width"), level.tile_width.to_string());
        properties.insert(level_property(i, "tile-height"), level.tile_height.to_string());
    }
}

// =============================================================================
// Tests
// =============================================================================
