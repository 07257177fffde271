//! Command-line configuration.
//!
//! Options can also be set through environment variables with the `SLIDE_`
//! prefix:
//!
//! - `SLIDE_FORMAT` - `inspect` output format (`text` or `json`)
//! - `SLIDE_THUMBNAIL_SIZE` - square thumbnail bound (default: 512)
//! - `SLIDE_JPEG_QUALITY` - thumbnail JPEG quality (default: 80)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::decoder::ThumbnailSize;
use crate::format::jpeg::{is_valid_quality, DEFAULT_JPEG_QUALITY};

/// Square bound used when no size is given.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 512;

// =============================================================================
// CLI
// =============================================================================

/// Inspect whole-slide images: spacing, magnification, vendor and thumbnails.
#[derive(Parser, Debug, Clone)]
#[command(name = "slide-spacing")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print slide metadata and per-level spacing
    Inspect(InspectConfig),

    /// Write a JPEG thumbnail of a slide
    Thumbnail(ThumbnailConfig),
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Output format of `inspect`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,

    /// Single JSON object
    Json,
}

// =============================================================================
// inspect
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct InspectConfig {
    /// Slide file to open.
    pub path: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, env = "SLIDE_FORMAT")]
    pub format: OutputFormat,

    /// Include every slide property in the output.
    #[arg(long, default_value_t = false)]
    pub properties: bool,

    /// Enable debug logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// thumbnail
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ThumbnailConfig {
    /// Slide file to open.
    pub path: PathBuf,

    /// Where to write the JPEG thumbnail.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Bound applied to both width and height; --width/--height take
    /// precedence.
    #[arg(long, env = "SLIDE_THUMBNAIL_SIZE")]
    pub size: Option<u32>,

    /// Maximum width; requires --height.
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Maximum height; requires --width.
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "SLIDE_JPEG_QUALITY")]
    pub quality: u8,

    /// Enable debug logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ThumbnailConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        let (width, height) = self.thumbnail_size().bounds();
        if width == 0 || height == 0 {
            return Err("thumbnail size must be greater than 0".to_string());
        }

        if !is_valid_quality(self.quality) {
            return Err("quality must be between 1 and 100".to_string());
        }

        if self.output.as_os_str().is_empty() {
            return Err("output path is required".to_string());
        }

        Ok(())
    }

    /// Requested bounding box; explicit width and height win over `--size`.
    pub fn thumbnail_size(&self) -> ThumbnailSize {
        match (self.width, self.height, self.size) {
            (Some(width), Some(height), _) => ThumbnailSize::from((width, height)),
            (_, _, Some(size)) => ThumbnailSize::from(size),
            _ => ThumbnailSize::from(DEFAULT_THUMBNAIL_SIZE),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
