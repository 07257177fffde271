use thiserror::Error;

/// I/O errors that can occur when reading slide bytes
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from the underlying file or device
    #[error("I/O error: {0}")]
    Io(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => IoError::NotFound(err.to_string()),
            _ => IoError::Io(err.to_string()),
        }
    }
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Compression scheme we cannot decode
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    /// File uses strips instead of tiles
    #[error("Unsupported organization: file uses strips instead of tiles")]
    StripOrganization,

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),
}

/// Errors raised by a slide decoder while opening a slide or producing pixels
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// TIFF structure error
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// File is not a slide this decoder understands
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },

    /// Requested pyramid level does not exist
    #[error("Level {level} out of range (slide has {count} levels)")]
    LevelOutOfRange { level: usize, count: usize },

    /// Region, tile or thumbnail request the slide cannot satisfy
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Tile or image data could not be decoded
    #[error("Image decode error: {message}")]
    Image { message: String },

    /// Output image could not be encoded
    #[error("Image encode error: {message}")]
    Encode { message: String },
}

/// Errors surfaced by the slide backend
#[derive(Debug, Clone, Error)]
pub enum SlideError {
    /// Physical pixel spacing cannot be determined for this slide.
    ///
    /// Not recoverable locally: the caller decides whether to skip the slide
    /// or abort.
    #[error("Unsupported slide {identifier}: {reason}")]
    UnsupportedSlide { identifier: String, reason: String },

    /// A required property is absent
    #[error("Missing slide property: {key}")]
    MissingProperty { key: String },

    /// A property is present but cannot be interpreted
    #[error("Invalid value for slide property {key}: {value:?}")]
    InvalidProperty { key: String, value: String },

    /// Error from the bound decoder
    #[error("Decoder error: {0}")]
    Decode(#[from] DecodeError),
}

impl SlideError {
    /// Build an `UnsupportedSlide` error.
    pub fn unsupported(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        SlideError::UnsupportedSlide {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error means the slide cannot be used at all.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            SlideError::UnsupportedSlide { .. }
                | SlideError::Decode(DecodeError::UnsupportedFormat { .. })
        )
    }
}

impl From<TiffError> for SlideError {
    fn from(err: TiffError) -> Self {
        SlideError::Decode(DecodeError::Tiff(err))
    }
}

impl From<IoError> for SlideError {
    fn from(err: IoError) -> Self {
        SlideError::Decode(DecodeError::Io(err))
    }
}
