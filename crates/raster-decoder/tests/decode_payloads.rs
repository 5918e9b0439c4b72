//! End-to-end decoding of encoded payloads.

use chrono::{TimeZone, Utc};
use radar_common::{grids, AxisOrientation, BoundingBox, Georeference, GridMetadata, ProductKind};
use raster_decoder::{decode, Compression, RasterEncoding, SampleEncoding, Transport};
use test_utils::{
    assert_approx_eq, base64_encode, deflate, encode_f16_le, encode_u16_le, encode_u8, gzip, zlib,
    RadolanFrameBuilder,
};

fn point_cell_grid(width: usize, height: usize) -> GridMetadata {
    GridMetadata::new(
        width,
        height,
        Georeference::LinearBounds(BoundingBox::new(8.0, 50.0, 8.1, 50.1)),
    )
}

#[test]
fn test_gzip_u8_rain_rate() {
    let values = vec![0.0, 0.5, 1.0, 12.5];
    let payload = gzip(&encode_u8(&values, 0.1));
    let encoding = RasterEncoding::raw(SampleEncoding::u8(0.1), point_cell_grid(2, 2))
        .with_compression(Compression::Gzip);

    let tile = decode(&payload, &encoding, ProductKind::Analysis).unwrap();
    assert_eq!(tile.width(), 2);
    for (decoded, expected) in tile.values.iter().zip(values.iter()) {
        assert_approx_eq!(*decoded, *expected, 1e-5);
    }
}

#[test]
fn test_auto_detects_gzip() {
    let payload = gzip(&encode_u16_le(&[1.5, 3.0], 0.01));
    let encoding = RasterEncoding::raw(SampleEncoding::u16(0.01), point_cell_grid(2, 1))
        .with_compression(Compression::Auto);

    let tile = decode(&payload, &encoding, ProductKind::ForecastRate).unwrap();
    assert_approx_eq!(tile.values[0], 1.5, 1e-4);
    assert_approx_eq!(tile.values[1], 3.0, 1e-4);
}

#[test]
fn test_base64_deflate_half_float() {
    let values = vec![0.0, 0.25, 17.5, 42.0];
    let packed = base64_encode(&deflate(&encode_f16_le(&values)));
    let encoding = RasterEncoding::raw(SampleEncoding::f16(), point_cell_grid(4, 1))
        .with_transport(Transport::Base64)
        .with_compression(Compression::Deflate);

    let tile = decode(packed.as_bytes(), &encoding, ProductKind::ForecastReflectivity).unwrap();
    assert_eq!(tile.values, values);
    assert_eq!(tile.product, ProductKind::ForecastReflectivity);
}

#[test]
fn test_corrupt_gzip_is_decode_error() {
    let mut payload = gzip(&[1, 2, 3, 4]);
    let len = payload.len();
    payload.truncate(len / 2);
    let encoding = RasterEncoding::raw(SampleEncoding::u8(1.0), point_cell_grid(2, 2))
        .with_compression(Compression::Gzip);

    assert!(decode(&payload, &encoding, ProductKind::Analysis).is_err());
}

#[test]
fn test_radolan_forecast_frame() {
    let issued = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let frame = RadolanFrameBuilder::new("RV", issued)
        .dimensions(2, 3)
        .lead_minutes(60)
        .build(&[0.0, 0.1, 0.2, 1.0, 2.5, f32::NAN]);

    let encoding = RasterEncoding::radolan(grids::radolan_national());
    let tile = decode(&gzip(&frame), &encoding, ProductKind::ForecastRate).unwrap();

    // Dimensions come from the frame header, georeference from the preset
    assert_eq!(tile.height(), 2);
    assert_eq!(tile.width(), 3);
    match tile.metadata.georeference {
        Georeference::Planar(grid) => assert_eq!(grid.axis_orientation, AxisOrientation::SouthUp),
        other => panic!("unexpected georeference: {:?}", other),
    }
    assert_eq!(
        tile.valid_at,
        Some(Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap())
    );
    assert_approx_eq!(tile.values[4], 2.5, 1e-5);
    assert!(tile.values[5].is_nan());
}

#[test]
fn test_radolan_reflectivity_bytes_zlib() {
    let issued = Utc.with_ymd_and_hms(2024, 6, 1, 12, 5, 0).unwrap();
    let frame = RadolanFrameBuilder::new("RX", issued)
        .dimensions(1, 3)
        .build_bytes(&[10.0, f32::NAN, 40.0]);

    // Compression is sniffed from the zlib header
    let encoding = RasterEncoding::radolan(grids::radolan_national());
    let tile = decode(&zlib(&frame), &encoding, ProductKind::ForecastReflectivity).unwrap();

    assert_eq!(tile.width(), 3);
    assert_approx_eq!(tile.values[0], 10.0, 1e-5);
    assert!(tile.values[1].is_nan());
    assert_approx_eq!(tile.values[2], 40.0, 1e-5);
}

#[test]
fn test_encoding_from_yaml() {
    let yaml = r#"
transport: base64
compression: deflate
format:
  type: raw
  sample:
    type: f16
    byte_order: little
  grid:
    width: 1
    height: 1
    georeference:
      kind: linear_bounds
      min_x: 8.0
      min_y: 50.0
      max_x: 8.1
      max_y: 50.1
"#;
    let encoding: RasterEncoding = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(encoding.transport, Transport::Base64);
    assert_eq!(encoding.compression, Compression::Deflate);
}
