//! Slide decoder contract.
//!
//! A [`SlideDecoder`] is the native side of a slide backend: it owns the open
//! file, knows the pyramid layout and produces pixels. The backend never looks
//! inside it; it only reads the property snapshot and downsample list once and
//! forwards thumbnail requests.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            SlideBackend<D>              │
//! │   (spacings, magnification, vendor)     │
//! └────────────────────┬────────────────────┘
//!                      │ owns
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          SlideDecoder Trait             │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           TiffSlideDecoder              │
//! │    (pyramidal TIFF, BigTIFF, SVS)       │
//! └─────────────────────────────────────────┘
//! ```

use image::RgbImage;

use crate::error::DecodeError;
use crate::properties::SlideProperties;

// =============================================================================
// ThumbnailSize
// =============================================================================

/// Bounding box requested for a thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailSize {
    /// Same bound for width and height
    Square(u32),

    /// Explicit `(width, height)` bound
    Bounds { width: u32, height: u32 },
}

impl ThumbnailSize {
    /// The box as `(width, height)`.
    pub fn bounds(self) -> (u32, u32) {
        match self {
            ThumbnailSize::Square(size) => (size, size),
            ThumbnailSize::Bounds { width, height } => (width, height),
        }
    }
}

impl From<u32> for ThumbnailSize {
    fn from(size: u32) -> Self {
        ThumbnailSize::Square(size)
    }
}

impl From<(u32, u32)> for ThumbnailSize {
    fn from((width, height): (u32, u32)) -> Self {
        ThumbnailSize::Bounds { width, height }
    }
}

/// Largest size with the aspect ratio of `source` that fits in `bounds`.
///
/// Never upscales. The constrained side matches the bound exactly and the
/// other side is rounded, with a minimum of 1 pixel. An empty source or a
/// zero bound yields `(0, 0)`.
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    if src_w == 0 || src_h == 0 || max_w == 0 || max_h == 0 {
        return (0, 0);
    }
    if src_w <= max_w && src_h <= max_h {
        return source;
    }

    let scale_w = max_w as f64 / src_w as f64;
    let scale_h = max_h as f64 / src_h as f64;

    if scale_w <= scale_h {
        let height = ((src_h as f64 * scale_w).round() as u32).clamp(1, max_h);
        (max_w, height)
    } else {
        let width = ((src_w as f64 * scale_h).round() as u32).clamp(1, max_w);
        (width, max_h)
    }
}

// =============================================================================
// SlideDecoder Trait
// =============================================================================

/// Native slide access bound behind a [`crate::SlideBackend`].
///
/// Implementations are opened once per slide and must return stable answers:
/// properties and downsamples are read once and cached by the backend.
pub trait SlideDecoder {
    /// Identifier of the slide (usually its path), used in diagnostics.
    fn identifier(&self) -> &str;

    /// Snapshot of the slide's key-value metadata.
    fn properties(&self) -> &SlideProperties;

    /// Downsample factor of each pyramid level, level 0 first (`1.0`).
    fn level_downsamples(&self) -> &[f64];

    /// Number of pyramid levels.
    fn level_count(&self) -> usize {
        self.level_downsamples().len()
    }

    /// `(width, height)` of a level, or `None` if out of range.
    fn level_dimensions(&self, level: usize) -> Option<(u32, u32)>;

    /// `(width, height)` of level 0.
    fn dimensions(&self) -> Option<(u32, u32)> {
        self.level_dimensions(0)
    }

    /// Render an RGB thumbnail no larger than `width` x `height`.
    ///
    /// The aspect ratio of the slide is preserved and the image is never
    /// larger than the base level fitted into the box.
    fn thumbnail(&self, width: u32, height: u32) -> Result<RgbImage, DecodeError>;
}

// =============================================================================
// Tests
// =============================================================================
