use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};
use resvg::{tiny_skia, usvg};
use serde::Serialize;
use std::io::Cursor;

use crate::blend::BlendMode;
use crate::completion::{CompletionSender, TransformResult};
use crate::error::TransformError;
use crate::mask::MaskDescriptor;
use crate::request::{InputSource, OutputFormat, TransformRequest};

/// Anything that can run a [`TransformRequest`] and report back exactly once.
///
/// Implementations take ownership of the completion sender and must resolve it
/// (or drop it, which the waiting side sees as `EngineDropped`).
pub trait ImageEngine: Send + Sync {
    fn submit(&self, request: TransformRequest, completion: CompletionSender);
}

/// Metadata describing an encoded result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputInfo {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub data: Vec<u8>,
    pub info: OutputInfo,
}

/// Largest canvas the engine will allocate, 16383 x 16383 pixels.
pub const DEFAULT_PIXEL_LIMIT: u64 = 0x3FFF * 0x3FFF;

/// Engine that decodes with `image`, rasterises masks with `resvg` and runs the
/// pipeline on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct RasterEngine {
    filter: FilterType,
    background: Rgba<u8>,
    matte: Rgb<u8>,
    pixel_limit: u64,
}

impl Default for RasterEngine {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
            background: Rgba([255, 255, 255, 255]),
            matte: Rgb([0, 0, 0]),
            pixel_limit: DEFAULT_PIXEL_LIMIT,
        }
    }
}

impl RasterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Colour of the canvas used when the request has no input image.
    pub fn with_background(mut self, background: Rgba<u8>) -> Self {
        self.background = background;
        self
    }

    /// Colour that transparent pixels are flattened onto for formats without alpha.
    pub fn with_matte(mut self, matte: Rgb<u8>) -> Self {
        self.matte = matte;
        self
    }

    pub fn with_pixel_limit(mut self, pixel_limit: u64) -> Self {
        self.pixel_limit = pixel_limit;
        self
    }

    /// Runs the whole pipeline synchronously on the calling thread.
    pub fn transform(&self, request: &TransformRequest) -> TransformResult {
        // Work out the output size before touching any pixels
        let (width, height) = request.resize().ok_or_else(|| {
            TransformError::UnsupportedOperation(
                "pipeline has no resize step, output size is unknown".to_string(),
            )
        })?;
        if width == 0 || height == 0 {
            return Err(TransformError::InvalidDimensions { width, height });
        }

        // Refuse sizes we could not allocate instead of aborting on OOM
        if u64::from(width) * u64::from(height) > self.pixel_limit {
            return Err(TransformError::PixelLimitExceeded {
                width,
                height,
                limit: self.pixel_limit,
            });
        }

        // Start from a blank canvas or the decoded input, at the target size
        let mut canvas = match request.input() {
            InputSource::Empty => RgbaImage::from_pixel(width, height, self.background),
            InputSource::Encoded(bytes) => {
                let decoded = image::load_from_memory(bytes)
                    .map_err(|e| TransformError::Decode(e.to_string()))?;
                imageops::resize(&decoded.to_rgba8(), width, height, self.filter)
            }
        };

        // Apply each composite step in order
        for (index, step) in request.composites().iter().enumerate() {
            let mask = rasterize_mask(&step.mask, width, height)?;
            composite(&mut canvas, &mask, step.blend);
            tracing::debug!(step = index, blend = %step.blend, "composited mask");
        }

        encode(canvas, request.format(), self.matte)
    }
}

impl ImageEngine for RasterEngine {
    fn submit(&self, request: TransformRequest, completion: CompletionSender) {
        // Pipeline work is CPU-bound, keep it off the async workers
        let engine = self.clone();
        let job = tokio::task::spawn_blocking(move || engine.transform(&request));

        tokio::spawn(async move {
            let result = match job.await {
                Ok(result) => result,
                Err(e) => Err(TransformError::Engine(format!("pipeline task failed: {}", e))),
            };
            completion.resolve(result);
        });
    }
}

/// Renders the mask SVG stretched over `width` x `height`, as straight RGBA.
fn rasterize_mask(
    mask: &MaskDescriptor,
    width: u32,
    height: u32,
) -> Result<RgbaImage, TransformError> {
    if mask.is_empty() {
        return Err(TransformError::MalformedMask("mask is empty".to_string()));
    }

    let tree = usvg::Tree::from_data(mask.as_bytes(), &usvg::Options::default())
        .map_err(|e| TransformError::MalformedMask(format!("failed to parse SVG: {}", e)))?;

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or(TransformError::InvalidDimensions { width, height })?;

    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    // tiny-skia stores premultiplied pixels
    let mut rendered = RgbaImage::new(width, height);
    for (dst, src) in rendered.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(rendered)
}

fn composite(canvas: &mut RgbaImage, mask: &RgbaImage, blend: BlendMode) {
    for (dst, src) in canvas.pixels_mut().zip(mask.pixels()) {
        *dst = blend.apply(*src, *dst);
    }
}

/// Composites every pixel over an opaque matte colour.
fn flatten(canvas: &RgbaImage, matte: Rgb<u8>) -> RgbImage {
    let mut flat = RgbImage::new(canvas.width(), canvas.height());
    for (dst, src) in flat.pixels_mut().zip(canvas.pixels()) {
        let alpha = src[3] as u32;
        for c in 0..3 {
            let mixed = src[c] as u32 * alpha + matte[c] as u32 * (255 - alpha);
            dst[c] = ((mixed + 127) / 255) as u8;
        }
    }
    flat
}

fn encode(canvas: RgbaImage, format: OutputFormat, matte: Rgb<u8>) -> TransformResult {
    let (width, height) = canvas.dimensions();
    let mut buffer = Cursor::new(Vec::new());

    let channels = match format {
        OutputFormat::Png => {
            DynamicImage::ImageRgba8(canvas)
                .write_to(&mut buffer, ImageOutputFormat::Png)
                .map_err(|e| TransformError::Encode(e.to_string()))?;
            4
        }
        OutputFormat::Jpeg { quality } => {
            // JPEG has no alpha channel, so cleared areas show the matte
            DynamicImage::ImageRgb8(flatten(&canvas, matte))
                .write_to(&mut buffer, ImageOutputFormat::Jpeg(quality.clamp(1, 100)))
                .map_err(|e| TransformError::Encode(e.to_string()))?;
            3
        }
    };

    let data = buffer.into_inner();
    Ok(TransformOutput {
        info: OutputInfo {
            format: format.name().to_string(),
            width,
            height,
            channels,
            size: data.len(),
        },
        data,
    })
}
