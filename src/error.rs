use thiserror::Error;

/// Failures an image engine can report for a transform request.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("malformed mask: {0}")]
    MalformedMask(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("dimensions {width}x{height} exceed the limit of {limit} pixels")]
    PixelLimitExceeded { width: u32, height: u32, limit: u64 },

    #[error("engine panicked during submission: {0}")]
    SubmitPanicked(String),

    #[error("failed to decode input: {0}")]
    Decode(String),

    #[error("failed to encode output: {0}")]
    Encode(String),

    #[error("engine dropped the completion without resolving it")]
    EngineDropped,

    #[error("engine failure: {0}")]
    Engine(String),
}
