use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::blend::BlendMode;
use crate::error::TransformError;
use crate::mask::MaskDescriptor;

/// Where the pipeline's pixels come from before any step runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputSource {
    /// No input image; the engine starts from a blank canvas at the target size.
    #[default]
    Empty,
    /// An encoded raster image in any format the engine can decode.
    Encoded(Arc<[u8]>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg { quality: u8 },
}

impl OutputFormat {
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg { .. } => "jpeg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = TransformError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg { quality: 80 }),
            other => Err(TransformError::UnsupportedOperation(format!(
                "unknown output format '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeStep {
    pub mask: MaskDescriptor,
    pub blend: BlendMode,
}

/// A fully described image pipeline: input, resize, composites, encoding.
///
/// Built once through [`TransformRequestBuilder`] and never mutated afterwards.
/// Building never fails; engines report problems when they execute it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    input: InputSource,
    resize: Option<(u32, u32)>,
    composites: Vec<CompositeStep>,
    format: OutputFormat,
}

impl TransformRequest {
    pub fn builder() -> TransformRequestBuilder {
        TransformRequestBuilder::default()
    }

    pub fn input(&self) -> &InputSource {
        &self.input
    }

    pub fn resize(&self) -> Option<(u32, u32)> {
        self.resize
    }

    pub fn composites(&self) -> &[CompositeStep] {
        &self.composites
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

#[derive(Debug, Default)]
pub struct TransformRequestBuilder {
    input: InputSource,
    resize: Option<(u32, u32)>,
    composites: Vec<CompositeStep>,
    format: Option<OutputFormat>,
}

impl TransformRequestBuilder {
    pub fn input(mut self, encoded: impl Into<Vec<u8>>) -> Self {
        self.input = InputSource::Encoded(Arc::from(encoded.into().into_boxed_slice()));
        self
    }

    pub fn resize(mut self, width: u32, height: u32) -> Self {
        self.resize = Some((width, height));
        self
    }

    pub fn composite(mut self, mask: MaskDescriptor, blend: BlendMode) -> Self {
        self.composites.push(CompositeStep { mask, blend });
        self
    }

    pub fn png(self) -> Self {
        self.format(OutputFormat::Png)
    }

    pub fn jpeg(self, quality: u8) -> Self {
        self.format(OutputFormat::Jpeg { quality })
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn build(self) -> TransformRequest {
        TransformRequest {
            input: self.input,
            resize: self.resize,
            composites: self.composites,
            format: self.format.unwrap_or(OutputFormat::Png),
        }
    }
}
