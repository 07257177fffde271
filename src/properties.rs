//! Slide property snapshot.
//!
//! Decoders publish everything they know about a slide as a flat
//! string-to-string mapping, using OpenSlide's naming conventions:
//! `openslide.*` for normalized fields, `tiff.*` for raw TIFF tags and a
//! vendor prefix (e.g. `aperio.*`) for vendor-specific fields.
//!
//! The snapshot is taken once when the slide is opened and never changes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::SlideError;

// =============================================================================
// Well-known Keys
// =============================================================================

/// Microns per pixel in X at level 0.
pub const PROPERTY_MPP_X: &str = "openslide.mpp-x";

/// Microns per pixel in Y at level 0.
pub const PROPERTY_MPP_Y: &str = "openslide.mpp-y";

/// Nominal objective power of the scan.
pub const PROPERTY_OBJECTIVE_POWER: &str = "openslide.objective-power";

/// Scanner vendor identifier.
pub const PROPERTY_VENDOR: &str = "openslide.vendor";

/// Free-form slide description, usually the first ImageDescription.
pub const PROPERTY_COMMENT: &str = "openslide.comment";

/// Number of pyramid levels.
pub const PROPERTY_LEVEL_COUNT: &str = "openslide.level-count";

/// TIFF ResolutionUnit tag, rendered as `none`, `inch` or `centimeter`.
pub const PROPERTY_TIFF_RESOLUTION_UNIT: &str = "tiff.ResolutionUnit";

/// TIFF XResolution tag (pixels per resolution unit).
pub const PROPERTY_TIFF_X_RESOLUTION: &str = "tiff.XResolution";

/// TIFF YResolution tag (pixels per resolution unit).
pub const PROPERTY_TIFF_Y_RESOLUTION: &str = "tiff.YResolution";

/// TIFF ImageDescription of the first directory.
pub const PROPERTY_TIFF_IMAGE_DESCRIPTION: &str = "tiff.ImageDescription";

/// Key for a per-level field, e.g. `openslide.level[1].downsample`.
pub fn level_property(level: usize, field: &str) -> String {
    format!("openslide.level[{}].{}", level, field)
}

// =============================================================================
// SlideProperties
// =============================================================================

/// Immutable key-value metadata of a slide.
///
/// Keys iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SlideProperties {
    entries: BTreeMap<String, String>,
}

impl SlideProperties {
    /// Create an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Look up a property.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether a property is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up a property that must be present.
    pub fn require(&self, key: &str) -> Result<&str, SlideError> {
        self.get(key).ok_or_else(|| SlideError::MissingProperty {
            key: key.to_string(),
        })
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no properties.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over the properties whose key starts with `prefix`.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.iter().filter(move |(k, _)| k.starts_with(prefix))
    }
}

impl<K, V> FromIterator<(K, V)> for SlideProperties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
