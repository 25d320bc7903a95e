use image::imageops::FilterType;
use image::{ImageOutputFormat, Rgb, Rgba, RgbaImage};
use mask_smoke_lib::{
    execute, BlendMode, MaskDescriptor, RasterEngine, TransformError, TransformRequest,
    DEFAULT_PIXEL_LIMIT,
};
use std::io::Cursor;

fn rounded_clear_request() -> TransformRequest {
    TransformRequest::builder()
        .resize(200, 200)
        .composite(MaskDescriptor::rounded_rect(200, 200, 50), BlendMode::Clear)
        .png()
        .build()
}

fn encoded_png(image: &RgbaImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut buffer, ImageOutputFormat::Png)
        .unwrap();
    buffer.into_inner()
}

#[test]
fn test_clear_blend_cuts_out_the_rounded_rect() {
    let output = RasterEngine::new().transform(&rounded_clear_request()).unwrap();

    let decoded = image::load_from_memory(&output.data).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (200, 200));

    // Corners lie outside the rounded rectangle, so they stay opaque.
    assert_eq!(*decoded.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    assert_eq!(*decoded.get_pixel(199, 199), Rgba([255, 255, 255, 255]));
    // Everything the mask covers is cleared.
    assert_eq!(decoded.get_pixel(100, 100)[3], 0);
    assert_eq!(decoded.get_pixel(20, 180)[3], 0);
}

#[test]
fn test_output_info_describes_png() {
    let output = RasterEngine::new().transform(&rounded_clear_request()).unwrap();

    assert_eq!(&output.data[..4], &[0x89, b'P', b'N', b'G']);
    assert_eq!(output.info.format, "png");
    assert_eq!(output.info.channels, 4);
    assert_eq!(output.info.size, output.data.len());
}

#[test]
fn test_jpeg_output_drops_alpha() {
    let request = TransformRequest::builder()
        .resize(64, 32)
        .composite(MaskDescriptor::rounded_rect(64, 32, 8), BlendMode::Over)
        .jpeg(85)
        .build();

    let output = RasterEngine::new().transform(&request).unwrap();

    assert_eq!(&output.data[..2], &[0xFF, 0xD8]);
    assert_eq!(output.info.channels, 3);
    let decoded = image::load_from_memory(&output.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 32));
}

#[test]
fn test_encoded_input_is_resized() {
    let source = RgbaImage::from_pixel(10, 10, Rgba([200, 10, 10, 255]));
    let request = TransformRequest::builder()
        .input(encoded_png(&source))
        .resize(40, 20)
        .png()
        .build();

    let output = RasterEngine::new()
        .with_filter(FilterType::Nearest)
        .transform(&request)
        .unwrap();
    let decoded = image::load_from_memory(&output.data).unwrap().to_rgba8();

    assert_eq!(decoded.dimensions(), (40, 20));
    assert_eq!(*decoded.get_pixel(20, 10), Rgba([200, 10, 10, 255]));
}

#[test]
fn test_malformed_mask_fails_at_execution() {
    let request = TransformRequest::builder()
        .resize(200, 200)
        .composite(MaskDescriptor::from_bytes("not svg at all"), BlendMode::Clear)
        .png()
        .build();

    let err = RasterEngine::new().transform(&request).unwrap_err();
    assert!(matches!(err, TransformError::MalformedMask(_)), "got {:?}", err);
}

#[test]
fn test_empty_mask_is_malformed() {
    let request = TransformRequest::builder()
        .resize(8, 8)
        .composite(MaskDescriptor::from_bytes(Vec::new()), BlendMode::Clear)
        .build();

    let err = RasterEngine::new().transform(&request).unwrap_err();
    assert!(matches!(err, TransformError::MalformedMask(_)));
}

#[test]
fn test_zero_dimensions_are_rejected() {
    let request = TransformRequest::builder().resize(0, 200).png().build();

    let err = RasterEngine::new().transform(&request).unwrap_err();
    assert!(matches!(err, TransformError::InvalidDimensions { width: 0, height: 200 }));
}

#[test]
fn test_oversized_canvas_is_rejected_before_allocating() {
    let request = TransformRequest::builder()
        .resize(200_000, 200_000)
        .composite(MaskDescriptor::rounded_rect(200_000, 200_000, 50), BlendMode::Clear)
        .png()
        .build();

    let err = RasterEngine::new().transform(&request).unwrap_err();
    match err {
        TransformError::PixelLimitExceeded { width, height, limit } => {
            assert_eq!((width, height), (200_000, 200_000));
            assert_eq!(limit, DEFAULT_PIXEL_LIMIT);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_pixel_limit_is_configurable() {
    let request = TransformRequest::builder().resize(20, 20).png().build();

    let err = RasterEngine::new()
        .with_pixel_limit(399)
        .transform(&request)
        .unwrap_err();
    assert!(matches!(err, TransformError::PixelLimitExceeded { limit: 399, .. }));

    let output = RasterEngine::new().with_pixel_limit(400).transform(&request).unwrap();
    assert_eq!((output.info.width, output.info.height), (20, 20));
}

#[test]
fn test_blank_canvas_uses_background() {
    let request = TransformRequest::builder().resize(4, 4).png().build();

    let output = RasterEngine::new()
        .with_background(Rgba([10, 20, 30, 255]))
        .transform(&request)
        .unwrap();
    let decoded = image::load_from_memory(&output.data).unwrap().to_rgba8();

    assert!(decoded.pixels().all(|p| *p == Rgba([10, 20, 30, 255])));
}

#[test]
fn test_jpeg_flattens_cleared_area_onto_matte() {
    let request = TransformRequest::builder()
        .resize(200, 200)
        .composite(MaskDescriptor::rounded_rect(200, 200, 50), BlendMode::Clear)
        .jpeg(95)
        .build();

    let output = RasterEngine::new()
        .with_matte(Rgb([0, 0, 0]))
        .transform(&request)
        .unwrap();
    let decoded = image::load_from_memory(&output.data).unwrap().to_rgb8();

    // Cleared interior shows the matte, untouched corners stay white
    assert!(decoded.get_pixel(100, 100).0.iter().all(|&c| c < 16));
    assert!(decoded.get_pixel(0, 0).0.iter().all(|&c| c > 239));
}

#[test]
fn test_missing_resize_is_unsupported() {
    let request = TransformRequest::builder().png().build();

    let err = RasterEngine::new().transform(&request).unwrap_err();
    assert!(matches!(err, TransformError::UnsupportedOperation(_)));
}

#[test]
fn test_undecodable_input_is_a_decode_error() {
    let request = TransformRequest::builder()
        .input(b"mock image data for testing purposes".to_vec())
        .resize(10, 10)
        .build();

    let err = RasterEngine::new().transform(&request).unwrap_err();
    assert!(matches!(err, TransformError::Decode(_)));
}

#[tokio::test]
async fn test_submit_resolves_through_the_blocking_pool() {
    let output = execute(&RasterEngine::new(), rounded_clear_request())
        .await
        .expect("engine should succeed");

    assert!(!output.data.is_empty());
    assert_eq!((output.info.width, output.info.height), (200, 200));
}

#[tokio::test]
async fn test_submit_reports_errors_through_the_completion() {
    let request = TransformRequest::builder().resize(0, 0).build();

    let result = execute(&RasterEngine::new(), request).await;
    assert!(matches!(result, Err(TransformError::InvalidDimensions { .. })));
}
