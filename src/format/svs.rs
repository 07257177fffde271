//! Aperio SVS metadata.
//!
//! Aperio writes its metadata into the ImageDescription of the first IFD:
//!
//! ```text
//! Aperio Image Library v10.0.50
//! 46000x32914 [0,100 46000x32814] (256x256) JPEG/RGB Q=30|AppMag = 20|MPP = 0.4990|...
//! ```
//!
//! The segment before the first `|` is a free-form header. Every following
//! segment is a `key = value` pair, published as an `aperio.<key>` property.
//! `MPP` and `AppMag` are additionally mapped onto the generic
//! `openslide.mpp-x`/`openslide.mpp-y` and `openslide.objective-power` keys.

use crate::properties::{
    SlideProperties, PROPERTY_MPP_X, PROPERTY_MPP_Y, PROPERTY_OBJECTIVE_POWER,
};

/// Prefix of Aperio properties.
pub const APERIO_PREFIX: &str = "aperio.";

/// Marker identifying an Aperio ImageDescription.
pub const APERIO_MARKER: &str = "Aperio";

const KEY_MPP: &str = "MPP";
const KEY_APP_MAG: &str = "AppMag";

/// Key-value pairs parsed from an Aperio ImageDescription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SvsMetadata {
    /// Text before the first `|`
    pub header: String,

    /// Pairs in description order; values are kept verbatim
    pub fields: Vec<(String, String)>,
}

impl SvsMetadata {
    /// Split a description into its header and `key = value` fields.
    ///
    /// Segments without `=` are ignored.
    pub fn parse(description: &str) -> Self {
        let mut segments = description.split('|');
        let header = segments.next().unwrap_or_default().trim().to_string();

        let fields = segments
            .filter_map(|segment| {
                let (key, value) = segment.split_once('=')?;
                let key = key.trim();
                (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
            })
            .collect();

        SvsMetadata { header, fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Microns per pixel, verbatim.
    pub fn mpp(&self) -> Option<&str> {
        self.get(KEY_MPP)
    }

    /// Apparent magnification, verbatim.
    pub fn app_mag(&self) -> Option<&str> {
        self.get(KEY_APP_MAG)
    }

    /// Publish the fields as `aperio.*` properties plus the generic
    /// mpp and objective-power keys they map to.
    pub fn publish(&self, properties: &mut SlideProperties) {
        for (key, value) in &self.fields {
            properties.insert(format!("{APERIO_PREFIX}{key}"), value.clone());
        }

        if let Some(mpp) = self.mpp() {
            properties.insert(PROPERTY_MPP_X, mpp);
            properties.insert(PROPERTY_MPP_Y, mpp);
        }
        if let Some(mag) = self.app_mag() {
            properties.insert(PROPERTY_OBJECTIVE_POWER, mag);
        }
    }
}

/// Whether a description was written by an Aperio scanner.
pub fn is_aperio_description(description: &str) -> bool {
    description.starts_with(APERIO_MARKER)
        || description
            .lines()
            .next()
            .is_some_and(|line| line.contains(APERIO_MARKER))
}

// =============================================================================
// Tests
// =============================================================================
