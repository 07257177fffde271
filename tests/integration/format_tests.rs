//! Container-level tests: byte orders, BigTIFF, tile decoding and regions.

use slide_spacing::error::{DecodeError, TiffError};
use slide_spacing::io::MemoryRangeReader;
use slide_spacing::{SlideBackend, SlideDecoder, SlideFormat, Spacing, TiffSlideDecoder};

use super::test_utils::*;

// =============================================================================
// Containers
// =============================================================================

#[test]
fn test_detects_formats() {
    let svs = decoder_from(create_svs(), "a.svs");
    assert_eq!(svs.format(), SlideFormat::AperioSvs);
    assert_eq!(svs.pyramid().other_ifds.len(), 1);

    let data = create_generic_tiff(ByteOrderType::LittleEndian, false, centimeter_40000());
    let generic = decoder_from(data, "b.tif");
    assert_eq!(generic.format(), SlideFormat::GenericTiff);
    assert!(generic.pyramid().other_ifds.is_empty());
}

#[test]
fn test_byte_orders_agree() {
    let little = decoder_from(
        create_generic_tiff(ByteOrderType::LittleEndian, false, centimeter_40000()),
        "le.tif",
    );
    let big = decoder_from(
        create_generic_tiff(ByteOrderType::BigEndian, false, centimeter_40000()),
        "be.tif",
    );

    assert_eq!(little.properties(), big.properties());
    assert_eq!(little.level_downsamples(), big.level_downsamples());
    assert_eq!(little.tile_size(0), Some((TILE, TILE)));
    assert_eq!(big.tile_size(0), Some((TILE, TILE)));

    let tile = big.read_tile(0, 2, 0).unwrap();
    assert_color_near(*tile.get_pixel(128, 128), LEVEL0_COLORS[2], 8);
}

#[test]
fn test_bigtiff() {
    let data = create_generic_tiff(ByteOrderType::LittleEndian, true, centimeter_40000());
    let decoder = decoder_from(data, "big.tif");

    assert!(decoder.header().is_bigtiff);
    assert_eq!(decoder.level_count(), 2);
    assert_eq!(decoder.dimensions(), Some((1024, 512)));

    let tile = decoder.read_tile(0, 1, 1).unwrap();
    assert_color_near(*tile.get_pixel(0, 0), LEVEL0_COLORS[5], 8);

    let backend = SlideBackend::new(decoder).unwrap();
    assert_eq!(backend.base_spacing(), Some(Spacing::new(0.25, 0.25)));
}

#[test]
fn test_bigtiff_big_endian() {
    let data = create_generic_tiff(ByteOrderType::BigEndian, true, centimeter_40000());
    let backend = SlideBackend::new(decoder_from(data, "big-be.tif")).unwrap();
    assert_eq!(backend.spacings().len(), 2);
    assert_eq!(backend.thumbnail(64u32).unwrap().dimensions(), (64, 32));
}

#[test]
fn test_truncated_file() {
    let data = create_svs();
    let truncated = data[..data.len() / 2].to_vec();
    let result = TiffSlideDecoder::from_reader(MemoryRangeReader::new(truncated, "cut.svs"));
    assert!(result.is_err());
}

#[test]
fn test_strip_only_tiff() {
    let data = TiffBuilder::new()
        .add_ifd(
            IfdBuilder::new()
                .with(TAG_IMAGE_WIDTH, TagValue::Long(vec![2048]))
                .with(TAG_IMAGE_LENGTH, TagValue::Long(vec![2048]))
                .with(TAG_STRIP_OFFSETS, TagValue::Long(vec![8]))
                .with(TAG_STRIP_BYTE_COUNTS, TagValue::Long(vec![16])),
        )
        .build();

    let err = TiffSlideDecoder::from_reader(MemoryRangeReader::new(data, "strips.tif")).unwrap_err();
    assert!(matches!(err, DecodeError::Tiff(TiffError::StripOrganization)));
}

// =============================================================================
// Tiles
// =============================================================================

#[test]
fn test_svs_abbreviated_tiles() {
    let decoder = decoder_from(create_svs(), "a.svs");

    for (index, color) in LEVEL0_COLORS.iter().enumerate() {
        let (tx, ty) = (index as u32 % 4, index as u32 / 4);
        let tile = decoder.read_tile(0, tx, ty).unwrap();
        assert_eq!(tile.dimensions(), (TILE, TILE));
        assert_color_near(*tile.get_pixel(100, 100), *color, 8);
    }
}

#[test]
fn test_uncompressed_tiles() {
    let colors = [[10, 20, 30], [40, 50, 60], [70, 80, 90], [100, 110, 120]];
    let tiles = colors.iter().map(|c| solid_raw_rgb(TILE, *c)).collect();
    let level0 = IfdBuilder::tiled(1024, 256, TILE, COMPRESSION_NONE, 3, tiles)
        .resolution(RESOLUTION_UNIT_CENTIMETER, (20_000, 1), (20_000, 1));
    let data = TiffBuilder::new().add_ifd(level0).build();

    let decoder = decoder_from(data, "raw.tif");
    assert_eq!(decoder.read_tile(0, 3, 0).unwrap().get_pixel(5, 5).0, [100, 110, 120]);

    let backend = SlideBackend::new(decoder).unwrap();
    assert_eq!(backend.base_spacing(), Some(Spacing::new(0.5, 0.5)));
}

#[test]
fn test_undecodable_compression() {
    let tiles = (0..8).map(|_| vec![0u8; 64]).collect();
    let level0 = IfdBuilder::tiled(1024, 512, TILE, COMPRESSION_LZW, 3, tiles)
        .resolution(RESOLUTION_UNIT_CENTIMETER, (40_000, 1), (40_000, 1));
    let data = TiffBuilder::new().add_ifd(level0).build();

    // Metadata is still available; only pixel access fails
    let decoder = decoder_from(data, "lzw.tif");
    let err = decoder.read_tile(0, 0, 0).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::Tiff(TiffError::UnsupportedCompression(_))
    ));

    let backend = SlideBackend::new(decoder).unwrap();
    assert_eq!(backend.base_spacing(), Some(Spacing::new(0.25, 0.25)));
}

#[test]
fn test_empty_tile_is_background() {
    let tiles = vec![solid_raw_rgb(TILE, [0, 0, 0]), Vec::new()];
    let level0 = IfdBuilder::tiled(512, 256, TILE, COMPRESSION_NONE, 3, tiles);
    let data = TiffBuilder::new().add_ifd(level0).build();

    let decoder = decoder_from(data, "sparse.tif");
    assert_eq!(decoder.read_tile(0, 1, 0).unwrap().get_pixel(0, 0).0, [255, 255, 255]);
    assert_eq!(decoder.read_tile(0, 0, 0).unwrap().get_pixel(0, 0).0, [0, 0, 0]);
}

#[test]
fn test_tile_out_of_range() {
    let decoder = decoder_from(create_svs(), "a.svs");

    assert!(matches!(
        decoder.read_tile(0, 4, 0),
        Err(DecodeError::InvalidRequest { .. })
    ));
    assert!(matches!(
        decoder.read_tile(5, 0, 0),
        Err(DecodeError::LevelOutOfRange { level: 5, count: 2 })
    ));
}

// =============================================================================
// Regions
// =============================================================================

#[test]
fn test_region_across_tiles() {
    let decoder = decoder_from(create_svs(), "a.svs");
    let region = decoder.read_region(0, 200, 200, 112, 112).unwrap();

    assert_eq!(region.dimensions(), (112, 112));
    assert_color_near(*region.get_pixel(10, 10), LEVEL0_COLORS[0], 8);
    assert_color_near(*region.get_pixel(100, 10), LEVEL0_COLORS[1], 8);
    assert_color_near(*region.get_pixel(10, 100), LEVEL0_COLORS[4], 8);
    assert_color_near(*region.get_pixel(100, 100), LEVEL0_COLORS[5], 8);
}

#[test]
fn test_region_past_edge_is_background() {
    let decoder = decoder_from(create_svs(), "a.svs");

    let region = decoder.read_region(0, 1000, 500, 48, 24).unwrap();
    assert_color_near(*region.get_pixel(5, 5), LEVEL0_COLORS[7], 8);
    assert_eq!(region.get_pixel(40, 5).0, [255, 255, 255]);
    assert_eq!(region.get_pixel(5, 20).0, [255, 255, 255]);

    let outside = decoder.read_region(1, 4000, 4000, 16, 16).unwrap();
    assert!(outside.pixels().all(|p| p.0 == [255, 255, 255]));
}

#[test]
fn test_region_too_large() {
    let decoder = decoder_from(create_svs(), "a.svs");
    assert!(matches!(
        decoder.read_region(0, 0, 0, 1 << 15, 1 << 15),
        Err(DecodeError::InvalidRequest { .. })
    ));
}
