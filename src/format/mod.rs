//! Slide file formats.
//!
//! Everything here is TIFF based:
//!
//! - **Aperio SVS**: identified by the `Aperio` marker in ImageDescription,
//!   with abbreviated JPEG tiles and `key = value` metadata
//! - **Generic pyramidal TIFF**: any other tiled TIFF with a pyramid
//!
//! [`TiffSlideDecoder`] handles both and implements
//! [`SlideDecoder`](crate::decoder::SlideDecoder).

pub mod detect;
pub mod jpeg;
pub mod slide_decoder;
pub mod svs;
pub mod tiff;

pub use detect::{is_tiff_header, SlideFormat};
pub use slide_decoder::{TiffSlideDecoder, MAX_REGION_PIXELS};
pub use svs::SvsMetadata;
