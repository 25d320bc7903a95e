pub mod blend;
pub mod completion;
pub mod engine_lib;
pub mod error;
pub mod harness_lib;
pub mod mask;
pub mod request;

pub use blend::BlendMode;
pub use engine_lib::{ImageEngine, DEFAULT_PIXEL_LIMIT, OutputInfo, RasterEngine, TransformOutput};
pub use error::TransformError;
pub use harness_lib::{
    build_mask, build_request, execute, run_smoke, validate, Failure, FailureKind, Harness,
    HarnessState, Outcome,
};
pub use mask::MaskDescriptor;
pub use request::{InputSource, OutputFormat, TransformRequest};

// Trait to abstract the pipeline parameters the harness needs
pub trait SmokeConfig {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn corner_radius(&self) -> u32;
    fn blend(&self) -> BlendMode;
    fn format(&self) -> OutputFormat;
}

/// The stock smoke test: 200x200, corner radius 50, `clear` blend, PNG output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmokeDefaults;

impl SmokeConfig for SmokeDefaults {
    fn width(&self) -> u32 {
        200
    }

    fn height(&self) -> u32 {
        200
    }

    fn corner_radius(&self) -> u32 {
        50
    }

    fn blend(&self) -> BlendMode {
        BlendMode::Clear
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }
}
