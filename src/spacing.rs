//! Physical pixel spacing (microns per pixel) across pyramid levels.
//!
//! Spacing is resolved once from the slide's property snapshot using an
//! ordered table of rules. The first rule whose required keys are all present
//! is applied and its outcome is final:
//!
//! 1. **Vendor mpp**: `openslide.mpp-x` and `openslide.mpp-y`, used verbatim.
//! 2. **TIFF resolution**: `tiff.ResolutionUnit`, `tiff.XResolution` and
//!    `tiff.YResolution`, converted with [`RESOLUTION_UNITS`].
//!
//! If no rule applies, or the applied rule cannot produce a positive spacing,
//! the slide is rejected with [`SlideError::UnsupportedSlide`].
//!
//! Per-level spacing is the base spacing multiplied by each level's
//! downsample factor, without rounding.

use serde::Serialize;
use tracing::debug;

use crate::error::SlideError;
use crate::properties::{
    SlideProperties, PROPERTY_MPP_X, PROPERTY_MPP_Y, PROPERTY_TIFF_RESOLUTION_UNIT,
    PROPERTY_TIFF_X_RESOLUTION, PROPERTY_TIFF_Y_RESOLUTION,
};

/// Reason reported when no rule can determine the spacing.
pub const MPP_UNAVAILABLE: &str = "mpp property is not available";

/// Microns per resolution unit, for the TIFF `ResolutionUnit` values we trust.
///
/// Only extend with vetted entries: an unknown unit must reject the slide.
pub const RESOLUTION_UNITS: &[(&str, f64)] = &[("centimeter", 10_000.0)];

/// Look up the microns-per-unit multiplier for a TIFF resolution unit.
pub fn unit_multiplier(unit: &str) -> Option<f64> {
    RESOLUTION_UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, multiplier)| *multiplier)
}

// =============================================================================
// Spacing
// =============================================================================

/// Microns per pixel along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Spacing {
    /// Microns per pixel vertically
    pub mpp_y: f64,

    /// Microns per pixel horizontally
    pub mpp_x: f64,
}

impl Spacing {
    pub const fn new(mpp_y: f64, mpp_x: f64) -> Self {
        Self { mpp_y, mpp_x }
    }

    /// Spacing of a level downsampled by `factor` relative to this one.
    #[inline]
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            mpp_y: self.mpp_y * factor,
            mpp_x: self.mpp_x * factor,
        }
    }

    /// `(mpp_y, mpp_x)`
    #[inline]
    pub fn as_tuple(self) -> (f64, f64) {
        (self.mpp_y, self.mpp_x)
    }
}

// =============================================================================
// LevelSpacings
// =============================================================================

/// Spacing of every pyramid level, index 0 being the base level.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LevelSpacings(Vec<Spacing>);

impl LevelSpacings {
    /// Expand a base spacing over a list of downsample factors.
    ///
    /// `LevelSpacings[i] == base.scaled(downsamples[i])`.
    pub fn from_base(base: Spacing, downsamples: &[f64]) -> Self {
        Self(downsamples.iter().map(|&d| base.scaled(d)).collect())
    }

    /// Spacing of a level, or `None` if out of range.
    pub fn get(&self, level: usize) -> Option<Spacing> {
        self.0.get(level).copied()
    }

    /// Spacing of level 0.
    pub fn base(&self) -> Option<Spacing> {
        self.0.first().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Spacing> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Spacing] {
        &self.0
    }
}

// =============================================================================
// Rules
// =============================================================================

/// One row of the spacing decision table.
///
/// `extract` runs only when every key in `required` is present; an `Err`
/// carries the human-readable rejection reason.
#[derive(Debug, Clone, Copy)]
pub struct MppRule {
    pub name: &'static str,
    pub required: &'static [&'static str],
    pub extract: fn(&SlideProperties) -> Result<Spacing, String>,
}

impl MppRule {
    fn applies_to(&self, properties: &SlideProperties) -> bool {
        self.required.iter().all(|key| properties.contains(key))
    }
}

/// Default rule table, highest priority first.
pub const DEFAULT_MPP_RULES: &[MppRule] = &[
    MppRule {
        name: "vendor-mpp",
        required: &[PROPERTY_MPP_X, PROPERTY_MPP_Y],
        extract: vendor_mpp,
    },
    MppRule {
        name: "tiff-resolution",
        required: &[
            PROPERTY_TIFF_RESOLUTION_UNIT,
            PROPERTY_TIFF_X_RESOLUTION,
            PROPERTY_TIFF_Y_RESOLUTION,
        ],
        extract: tiff_resolution,
    },
];

fn vendor_mpp(properties: &SlideProperties) -> Result<Spacing, String> {
    let mpp_x = positive_property(properties, PROPERTY_MPP_X)?;
    let mpp_y = positive_property(properties, PROPERTY_MPP_Y)?;
    Ok(Spacing::new(mpp_y, mpp_x))
}

fn tiff_resolution(properties: &SlideProperties) -> Result<Spacing, String> {
    let unit = properties
        .get(PROPERTY_TIFF_RESOLUTION_UNIT)
        .unwrap_or_default();
    let multiplier = unit_multiplier(unit)
        .ok_or_else(|| format!("{} (unknown resolution unit {:?})", MPP_UNAVAILABLE, unit))?;

    let x_resolution = positive_property(properties, PROPERTY_TIFF_X_RESOLUTION)?;
    let y_resolution = positive_property(properties, PROPERTY_TIFF_Y_RESOLUTION)?;

    Ok(Spacing::new(
        multiplier / y_resolution,
        multiplier / x_resolution,
    ))
}

/// Parse a property as a finite, strictly positive float.
fn positive_property(properties: &SlideProperties, key: &str) -> Result<f64, String> {
    let raw = properties.get(key).unwrap_or_default();
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(format!("{} ({} = {:?})", MPP_UNAVAILABLE, key, raw)),
    }
}

// =============================================================================
// SpacingResolver
// =============================================================================

/// Resolves base and per-level spacing from slide properties.
#[derive(Debug, Clone, Copy)]
pub struct SpacingResolver {
    rules: &'static [MppRule],
}

impl Default for SpacingResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SpacingResolver {
    /// Resolver using [`DEFAULT_MPP_RULES`].
    pub const fn new() -> Self {
        Self {
            rules: DEFAULT_MPP_RULES,
        }
    }

    /// Resolver using a custom rule table, highest priority first.
    pub const fn with_rules(rules: &'static [MppRule]) -> Self {
        Self { rules }
    }

    /// Resolve level 0 spacing.
    ///
    /// `identifier` names the slide in the error if spacing is unavailable.
    pub fn resolve(
        &self,
        identifier: &str,
        properties: &SlideProperties,
    ) -> Result<Spacing, SlideError> {
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.applies_to(properties))
            .ok_or_else(|| SlideError::unsupported(identifier, MPP_UNAVAILABLE))?;

        let spacing =
            (rule.extract)(properties).map_err(|reason| SlideError::unsupported(identifier, reason))?;

        debug!(
            slide = identifier,
            rule = rule.name,
            mpp_y = spacing.mpp_y,
            mpp_x = spacing.mpp_x,
            "resolved base spacing"
        );

        Ok(spacing)
    }

    /// Resolve the spacing of every level.
    pub fn resolve_levels(
        &self,
        identifier: &str,
        properties: &SlideProperties,
        downsamples: &[f64],
    ) -> Result<LevelSpacings, SlideError> {
        let base = self.resolve(identifier, properties)?;
        Ok(LevelSpacings::from_base(base, downsamples))
    }
}

// =============================================================================
// Tests
// =============================================================================
