//! # slide-spacing
//!
//! Physical pixel spacing, metadata and thumbnails for whole-slide images.
//!
//! A [`SlideBackend`] wraps any [`SlideDecoder`] and, when constructed,
//! resolves the microns-per-pixel spacing of every pyramid level from the
//! decoder's properties. Vendor-supplied `openslide.mpp-x`/`openslide.mpp-y`
//! take precedence; plain TIFFs fall back to their resolution tags. Slides
//! whose spacing cannot be determined are rejected with
//! [`SlideError::UnsupportedSlide`].
//!
//! ## Architecture
//!
//! - [`spacing`] - spacing types and the rule-based [`SpacingResolver`]
//! - [`properties`] - the slide property snapshot and well-known keys
//! - [`decoder`] - the [`SlideDecoder`] contract and thumbnail sizing
//! - [`backend`] - [`SlideBackend`], composing a decoder with its spacings
//! - [`io`] - synchronous range readers over files and memory
//! - [`mod@format`] - TIFF/BigTIFF/SVS parsing and the [`TiffSlideDecoder`]
//! - [`config`] - CLI configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use slide_spacing::open_slide;
//!
//! let slide = open_slide("CMU-1.svs")?;
//! for (level, spacing) in slide.spacings().iter().enumerate() {
//!     println!("level {level}: {} x {} um/px", spacing.mpp_y, spacing.mpp_x);
//! }
//! let thumbnail = slide.thumbnail(512u32)?;
//! # Ok::<(), slide_spacing::SlideError>(())
//! ```

pub mod backend;
pub mod config;
pub mod decoder;
pub mod error;
pub mod format;
pub mod io;
pub mod properties;
pub mod spacing;

// Re-export commonly used types
pub use backend::{open_slide, LevelSummary, SlideBackend, SlideSummary};
pub use config::{Cli, Command, InspectConfig, OutputFormat, ThumbnailConfig};
pub use decoder::{fit_within, SlideDecoder, ThumbnailSize};
pub use error::{DecodeError, IoError, SlideError, TiffError};
pub use format::{is_tiff_header, SlideFormat, SvsMetadata, TiffSlideDecoder};
pub use io::{FileRangeReader, MemoryRangeReader, RangeReader};
pub use properties::{
    SlideProperties, PROPERTY_MPP_X, PROPERTY_MPP_Y, PROPERTY_OBJECTIVE_POWER, PROPERTY_VENDOR,
};
pub use spacing::{LevelSpacings, MppRule, Spacing, SpacingResolver, DEFAULT_MPP_RULES};
