//! Slide backend: spacing and metadata on top of a decoder.
//!
//! [`SlideBackend`] composes a [`SlideDecoder`] rather than extending it. On
//! construction it resolves the spacing of every level from the decoder's
//! properties and downsamples, and keeps the result for its lifetime. All
//! other accessors read the same property snapshot.

use std::path::Path;

use image::RgbImage;
use serde::Serialize;
use tracing::debug;

use crate::decoder::{SlideDecoder, ThumbnailSize};
use crate::error::SlideError;
use crate::format::TiffSlideDecoder;
use crate::properties::{SlideProperties, PROPERTY_OBJECTIVE_POWER, PROPERTY_VENDOR};
use crate::spacing::{LevelSpacings, Spacing, SpacingResolver};

/// Open a slide file with the built-in TIFF decoder.
pub fn open_slide(path: impl AsRef<Path>) -> Result<SlideBackend<TiffSlideDecoder>, SlideError> {
    let decoder = TiffSlideDecoder::open(path)?;
    SlideBackend::new(decoder)
}

/// A slide with resolved per-level spacing.
///
/// Immutable after construction; `Send + Sync` whenever the decoder is.
#[derive(Debug)]
pub struct SlideBackend<D: SlideDecoder> {
    decoder: D,
    spacings: LevelSpacings,
}

impl<D: SlideDecoder> SlideBackend<D> {
    /// Wrap a decoder, resolving spacing with the default rules.
    ///
    /// # Errors
    ///
    /// Returns [`SlideError::UnsupportedSlide`] if the spacing cannot be
    /// determined from the decoder's properties.
    pub fn new(decoder: D) -> Result<Self, SlideError> {
        Self::with_resolver(decoder, &SpacingResolver::new())
    }

    /// Wrap a decoder, resolving spacing with a custom resolver.
    pub fn with_resolver(decoder: D, resolver: &SpacingResolver) -> Result<Self, SlideError> {
        let spacings = resolver.resolve_levels(
            decoder.identifier(),
            decoder.properties(),
            decoder.level_downsamples(),
        )?;

        debug!(
            slide = decoder.identifier(),
            levels = spacings.len(),
            "opened slide backend"
        );

        Ok(Self { decoder, spacings })
    }

    /// Spacing of every level, level 0 first.
    pub fn spacings(&self) -> &LevelSpacings {
        &self.spacings
    }

    /// Spacing of level 0.
    pub fn base_spacing(&self) -> Option<Spacing> {
        self.spacings.base()
    }

    /// Objective power the slide was scanned at.
    ///
    /// # Errors
    ///
    /// [`SlideError::MissingProperty`] if the slide does not record it,
    /// [`SlideError::InvalidProperty`] if it is not an integer.
    pub fn magnification(&self) -> Result<u32, SlideError> {
        let raw = self.decoder.properties().require(PROPERTY_OBJECTIVE_POWER)?;
        raw.trim()
            .parse::<u32>()
            .map_err(|_| SlideError::InvalidProperty {
                key: PROPERTY_OBJECTIVE_POWER.to_string(),
                value: raw.to_string(),
            })
    }

    /// Scanner vendor, verbatim.
    pub fn vendor(&self) -> Result<&str, SlideError> {
        self.decoder.properties().require(PROPERTY_VENDOR)
    }

    /// Render an RGB thumbnail bounded by `size`, preserving aspect ratio.
    pub fn thumbnail(&self, size: impl Into<ThumbnailSize>) -> Result<RgbImage, SlideError> {
        let (width, height) = size.into().bounds();
        Ok(self.decoder.thumbnail(width, height)?)
    }

    pub fn identifier(&self) -> &str {
        self.decoder.identifier()
    }

    pub fn properties(&self) -> &SlideProperties {
        self.decoder.properties()
    }

    pub fn level_count(&self) -> usize {
        self.decoder.level_count()
    }

    pub fn level_downsamples(&self) -> &[f64] {
        self.decoder.level_downsamples()
    }

    pub fn level_dimensions(&self, level: usize) -> Option<(u32, u32)> {
        self.decoder.level_dimensions(level)
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.decoder.dimensions()
    }

    /// Serializable snapshot of the slide's metadata.
    ///
    /// Missing or malformed magnification and vendor become `None` here
    /// rather than errors.
    pub fn summary(&self, include_properties: bool) -> SlideSummary {
        let levels = self
            .spacings
            .iter()
            .enumerate()
            .map(|(level, spacing)| {
                let (width, height) = self.level_dimensions(level).unwrap_or((0, 0));
                LevelSummary {
                    level,
                    width,
                    height,
                    downsample: self.level_downsamples().get(level).copied().unwrap_or(1.0),
                    spacing: *spacing,
                }
            })
            .collect();

        SlideSummary {
            identifier: self.identifier().to_string(),
            vendor: self.vendor().ok().map(str::to_string),
            magnification: self.magnification().ok(),
            dimensions: self.dimensions(),
            levels,
            properties: include_properties.then(|| self.properties().clone()),
        }
    }

    /// Borrow the wrapped decoder.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Unwrap the decoder.
    pub fn into_decoder(self) -> D {
        self.decoder
    }
}

// =============================================================================
// SlideSummary
// =============================================================================

/// Metadata of one slide, as printed by `inspect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideSummary {
    pub identifier: String,
    pub vendor: Option<String>,
    pub magnification: Option<u32>,
    pub dimensions: Option<(u32, u32)>,
    pub levels: Vec<LevelSummary>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<SlideProperties>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelSummary {
    pub level: usize,
    pub width: u32,
    pub height: u32,
    pub downsample: f64,
    pub spacing: Spacing,
}

// =============================================================================
// Tests
// =============================================================================
