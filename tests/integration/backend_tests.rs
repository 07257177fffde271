//! End-to-end tests of `SlideBackend` over synthetic slides.

use std::io::Write;

use slide_spacing::{
    open_slide, SlideBackend, SlideError, Spacing, ThumbnailSize, PROPERTY_OBJECTIVE_POWER,
};

use super::test_utils::*;

// =============================================================================
// Spacing
// =============================================================================

#[test]
fn test_svs_spacing_from_vendor_mpp() {
    let backend = SlideBackend::new(decoder_from(create_svs(), "synthetic.svs")).unwrap();

    assert_eq!(backend.level_count(), 2);
    assert_eq!(backend.base_spacing(), Some(Spacing::new(0.5, 0.5)));
    assert_eq!(
        backend.spacings().as_slice(),
        &[Spacing::new(0.5, 0.5), Spacing::new(1.0, 1.0)]
    );
}

#[test]
fn test_generic_tiff_centimeter_fallback() {
    let data = create_generic_tiff(ByteOrderType::LittleEndian, false, centimeter_40000());
    let backend = SlideBackend::new(decoder_from(data, "generic.tif")).unwrap();

    assert_eq!(backend.properties().get("tiff.ResolutionUnit"), Some("centimeter"));
    assert_eq!(backend.properties().get("tiff.XResolution"), Some("40000"));
    assert_eq!(backend.spacings().get(0), Some(Spacing::new(0.25, 0.25)));
    assert_eq!(backend.spacings().get(1), Some(Spacing::new(0.5, 0.5)));
}

#[test]
fn test_generic_tiff_anisotropic_resolution() {
    let resolution = Some((RESOLUTION_UNIT_CENTIMETER, (40_000, 1), (20_000, 1)));
    let data = create_generic_tiff(ByteOrderType::LittleEndian, false, resolution);
    let backend = SlideBackend::new(decoder_from(data, "aniso.tif")).unwrap();

    // (y, x) order
    assert_eq!(backend.spacings().get(0), Some(Spacing::new(0.5, 0.25)));
    assert_eq!(backend.spacings().get(1).map(Spacing::as_tuple), Some((1.0, 0.5)));
}

#[test]
fn test_factor_three_pyramid_keeps_every_level() {
    // Empty tiles: only the layout matters here
    let level0 = IfdBuilder::tiled(1536, 768, TILE, COMPRESSION_JPEG, 3, vec![Vec::new(); 18])
        .resolution(RESOLUTION_UNIT_CENTIMETER, (40_000, 1), (40_000, 1));
    let level1 = IfdBuilder::tiled(512, 256, TILE, COMPRESSION_JPEG, 3, vec![Vec::new(); 2]);
    let data = TiffBuilder::new().add_ifd(level0).add_ifd(level1).build();

    let backend = SlideBackend::new(decoder_from(data, "factor3.tif")).unwrap();
    assert_eq!(backend.level_downsamples(), &[1.0, 3.0]);
    assert_eq!(
        backend.spacings().as_slice(),
        &[Spacing::new(0.25, 0.25), Spacing::new(0.75, 0.75)]
    );
}

#[test]
fn test_fractional_resolution() {
    // 80000/2 px/cm = 0.25 um/px
    let resolution = Some((RESOLUTION_UNIT_CENTIMETER, (80_000, 2), (80_000, 2)));
    let data = create_generic_tiff(ByteOrderType::LittleEndian, false, resolution);
    let backend = SlideBackend::new(decoder_from(data, "fraction.tif")).unwrap();
    assert_eq!(backend.base_spacing(), Some(Spacing::new(0.25, 0.25)));
}

#[test]
fn test_inch_unit_is_unsupported() {
    let resolution = Some((RESOLUTION_UNIT_INCH, (100_000, 1), (100_000, 1)));
    let data = create_generic_tiff(ByteOrderType::LittleEndian, false, resolution);
    let err = SlideBackend::new(decoder_from(data, "inch.tif")).unwrap_err();

    match err {
        SlideError::UnsupportedSlide { identifier, reason } => {
            assert_eq!(identifier, "inch.tif");
            assert!(reason.contains("inch"), "reason: {reason}");
        }
        other => panic!("expected UnsupportedSlide, got {:?}", other),
    }
}

#[test]
fn test_missing_resolution_is_unsupported() {
    let data = create_generic_tiff(ByteOrderType::LittleEndian, false, None);
    let err = SlideBackend::new(decoder_from(data, "bare.tif")).unwrap_err();
    assert!(err.is_unsupported());
    assert!(matches!(err, SlideError::UnsupportedSlide { .. }));
}

#[test]
fn test_zero_resolution_is_unsupported() {
    let resolution = Some((RESOLUTION_UNIT_CENTIMETER, (0, 1), (40_000, 1)));
    let data = create_generic_tiff(ByteOrderType::LittleEndian, false, resolution);
    let err = SlideBackend::new(decoder_from(data, "zero.tif")).unwrap_err();
    assert!(matches!(err, SlideError::UnsupportedSlide { .. }));
}

// =============================================================================
// Metadata
// =============================================================================

#[test]
fn test_svs_metadata() {
    let backend = SlideBackend::new(decoder_from(create_svs(), "synthetic.svs")).unwrap();

    assert_eq!(backend.vendor().unwrap(), "aperio");
    assert_eq!(backend.magnification().unwrap(), 20);
    assert_eq!(backend.dimensions(), Some((1024, 512)));
    assert_eq!(backend.level_dimensions(1), Some((512, 256)));
    assert_eq!(backend.level_downsamples(), &[1.0, 2.0]);

    let properties = backend.properties();
    assert_eq!(properties.get("aperio.AppMag"), Some("20"));
    assert_eq!(properties.get("aperio.ScanScope ID"), Some("SS7000"));
    assert_eq!(properties.get("tiff.Software"), Some("synthetic scanner"));
    assert_eq!(properties.get("openslide.level-count"), Some("2"));
    assert!(properties
        .get("openslide.comment")
        .is_some_and(|c| c.starts_with("Aperio Image Library")));
    assert_eq!(properties.with_prefix("aperio.").count(), 5);
}

#[test]
fn test_generic_tiff_without_magnification() {
    let data = create_generic_tiff(ByteOrderType::LittleEndian, false, centimeter_40000());
    let backend = SlideBackend::new(decoder_from(data, "generic.tif")).unwrap();

    assert_eq!(backend.vendor().unwrap(), "generic-tiff");
    match backend.magnification() {
        Err(SlideError::MissingProperty { key }) => assert_eq!(key, PROPERTY_OBJECTIVE_POWER),
        other => panic!("expected MissingProperty, got {:?}", other),
    }
}

#[test]
fn test_summary_of_svs() {
    let backend = SlideBackend::new(decoder_from(create_svs(), "synthetic.svs")).unwrap();
    let summary = backend.summary(true);

    assert_eq!(summary.vendor.as_deref(), Some("aperio"));
    assert_eq!(summary.magnification, Some(20));
    assert_eq!(summary.levels.len(), 2);
    assert_eq!(summary.levels[1].downsample, 2.0);
    assert_eq!(summary.levels[1].spacing, Spacing::new(1.0, 1.0));

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["magnification"], 20);
    assert_eq!(json["properties"]["aperio.MPP"], "0.5");
}

// =============================================================================
// Thumbnails
// =============================================================================

#[test]
fn test_thumbnail_preserves_aspect_ratio() {
    let backend = SlideBackend::new(decoder_from(create_svs(), "synthetic.svs")).unwrap();

    let thumb = backend.thumbnail(200u32).unwrap();
    assert_eq!(thumb.dimensions(), (200, 100));

    let thumb = backend.thumbnail((100u32, 400u32)).unwrap();
    assert_eq!(thumb.dimensions(), (100, 50));

    let thumb = backend
        .thumbnail(ThumbnailSize::Bounds {
            width: 1000,
            height: 100,
        })
        .unwrap();
    assert_eq!(thumb.dimensions(), (200, 100));
}

#[test]
fn test_thumbnail_never_upscales() {
    let backend = SlideBackend::new(decoder_from(create_svs(), "synthetic.svs")).unwrap();
    let thumb = backend.thumbnail(4096u32).unwrap();
    assert_eq!(thumb.dimensions(), (1024, 512));
}

#[test]
fn test_thumbnail_uses_coarser_level() {
    let backend = SlideBackend::new(decoder_from(create_svs(), "synthetic.svs")).unwrap();

    // Level 1 is uniformly gray, level 0 is not
    let thumb = backend.thumbnail(256u32).unwrap();
    assert_eq!(thumb.dimensions(), (256, 128));
    assert_color_near(*thumb.get_pixel(10, 10), [90, 90, 90], 8);
    assert_color_near(*thumb.get_pixel(245, 118), [90, 90, 90], 8);

    // Full size comes from level 0
    let full = backend.thumbnail(1024u32).unwrap();
    assert_color_near(*full.get_pixel(10, 10), LEVEL0_COLORS[0], 8);
    assert_color_near(*full.get_pixel(1000, 500), LEVEL0_COLORS[7], 8);
}

#[test]
fn test_thumbnail_zero_bound_is_error() {
    let backend = SlideBackend::new(decoder_from(create_svs(), "synthetic.svs")).unwrap();
    assert!(matches!(
        backend.thumbnail((0u32, 100u32)),
        Err(SlideError::Decode(_))
    ));
}

#[test]
fn test_thumbnail_of_large_single_level_slide() {
    // 20000x16000 has more pixels than a single region read allows
    let (tiles_x, tiles_y) = (79, 63);
    let mut tiles = vec![Vec::new(); tiles_x * tiles_y];
    tiles[0] = solid_raw_rgb(TILE, [220, 20, 20]);
    tiles[30 * tiles_x + 40] = solid_raw_rgb(TILE, [20, 20, 220]);

    let level0 = IfdBuilder::tiled(20_000, 16_000, TILE, COMPRESSION_NONE, 3, tiles)
        .resolution(RESOLUTION_UNIT_CENTIMETER, (40_000, 1), (40_000, 1));
    let data = TiffBuilder::new().add_ifd(level0).build();
    let backend = SlideBackend::new(decoder_from(data, "huge.tif")).unwrap();
    assert_eq!(backend.level_count(), 1);

    let thumb = backend.thumbnail(200u32).unwrap();
    assert_eq!(thumb.dimensions(), (200, 160));

    // Tile (0, 0) lands on [0, 3) and tile (40, 30) on [102, 105) x [77, 79)
    assert_color_near(*thumb.get_pixel(1, 1), [220, 20, 20], 4);
    assert_color_near(*thumb.get_pixel(103, 78), [20, 20, 220], 4);
    assert_eq!(thumb.get_pixel(150, 120).0, [255, 255, 255]);
}

// =============================================================================
// Files
// =============================================================================

#[test]
fn test_open_slide_from_file() {
    let mut file = tempfile::Builder::new().suffix(".svs").tempfile().unwrap();
    file.write_all(&create_svs()).unwrap();
    file.flush().unwrap();

    let backend = open_slide(file.path()).unwrap();
    assert_eq!(backend.base_spacing(), Some(Spacing::new(0.5, 0.5)));
    assert_eq!(backend.magnification().unwrap(), 20);
    assert!(backend.identifier().ends_with(".svs"));
    assert_eq!(backend.thumbnail(128u32).unwrap().dimensions(), (128, 64));
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = open_slide(dir.path().join("missing.svs")).unwrap_err();
    assert!(matches!(err, SlideError::Decode(_)));
    assert!(!err.is_unsupported());
}

#[test]
fn test_open_non_tiff_file_is_unsupported() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"this is not a slide, just some text").unwrap();
    file.flush().unwrap();

    let err = open_slide(file.path()).unwrap_err();
    assert!(err.is_unsupported());
}
