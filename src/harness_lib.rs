use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::completion::{self, TransformResult};
use crate::engine_lib::{ImageEngine, TransformOutput};
use crate::error::TransformError;
use crate::mask::MaskDescriptor;
use crate::request::TransformRequest;
use crate::SmokeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    Idle,
    Submitted,
    Succeeded,
    Failed,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The engine reported an error.
    Engine,
    /// The engine succeeded but the result did not validate.
    Assertion,
    /// Anything else: panics during submission, misuse of the harness, I/O after the run.
    Unexpected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Engine => "engine error",
            FailureKind::Assertion => "assertion failed",
            FailureKind::Unexpected => "unexpected failure",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Pass/fail verdict of one harness run.
#[derive(Debug)]
pub enum Outcome {
    Passed(TransformOutput),
    Failed(Failure),
}

impl Outcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Outcome::Failed(Failure {
            kind,
            message: message.into(),
        })
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed(_))
    }

    /// Process status for an external test runner: 0 on pass, 1 on any failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Passed(_) => 0,
            Outcome::Failed(_) => 1,
        }
    }

    pub fn diagnostic(&self) -> Option<String> {
        match self {
            Outcome::Passed(_) => None,
            Outcome::Failed(failure) => Some(failure.to_string()),
        }
    }
}

pub fn build_mask<C: SmokeConfig + ?Sized>(config: &C) -> MaskDescriptor {
    MaskDescriptor::rounded_rect(config.width(), config.height(), config.corner_radius())
}

pub fn build_request<C: SmokeConfig + ?Sized>(config: &C, mask: MaskDescriptor) -> TransformRequest {
    TransformRequest::builder()
        .resize(config.width(), config.height())
        .composite(mask, config.blend())
        .format(config.format())
        .build()
}

/// Submits the request once and waits for the engine's single completion.
///
/// A panic inside `submit` is caught and reported as `SubmitPanicked`.
pub async fn execute<E: ImageEngine + ?Sized>(engine: &E, request: TransformRequest) -> TransformResult {
    let (sender, completion) = completion::channel();

    // Hand the request over; the engine owns the sender from here on
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| engine.submit(request, sender))) {
        return Err(TransformError::SubmitPanicked(panic_message(&*payload)));
    }

    completion.await
}

pub fn validate(bytes: &[u8]) -> bool {
    !bytes.is_empty()
}

type Validator = Box<dyn Fn(&[u8]) -> bool + Send + Sync>;

/// Drives a single request through an engine and judges the result.
///
/// A harness submits at most one request over its lifetime; later calls to
/// [`Harness::run`] fail without reaching the engine.
pub struct Harness<E> {
    engine: E,
    state: HarnessState,
    validator: Validator,
}

impl<E: ImageEngine> Harness<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: HarnessState::Idle,
            validator: Box::new(validate),
        }
    }

    /// Replaces the result check. Mostly useful for observing whether validation ran.
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&[u8]) -> bool + Send + Sync + 'static,
    {
        self.validator = Box::new(validator);
        self
    }

    pub fn state(&self) -> HarnessState {
        self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub async fn run(&mut self, request: TransformRequest) -> Outcome {
        // One submission per harness
        if self.state != HarnessState::Idle {
            return Outcome::failed(
                FailureKind::Unexpected,
                format!("harness already submitted its request (state {:?})", self.state),
            );
        }

        self.state = HarnessState::Submitted;
        tracing::debug!(composites = request.composites().len(), "submitting transform request");

        // Wait for the engine's one and only answer
        let output = match execute(&self.engine, request).await {
            Ok(output) => output,
            Err(e @ TransformError::SubmitPanicked(_)) => {
                self.state = HarnessState::Failed;
                return Outcome::failed(FailureKind::Unexpected, e.to_string());
            }
            Err(e) => {
                self.state = HarnessState::Failed;
                return Outcome::failed(FailureKind::Engine, e.to_string());
            }
        };

        // Validation only ever runs on a successful completion
        tracing::debug!(bytes = output.data.len(), format = %output.info.format, "engine completed");
        if (self.validator)(&output.data) {
            self.state = HarnessState::Succeeded;
            Outcome::Passed(output)
        } else {
            self.state = HarnessState::Failed;
            Outcome::failed(
                FailureKind::Assertion,
                format!("expected a non-empty result, got {} bytes", output.data.len()),
            )
        }
    }

    pub fn terminate(&mut self) {
        self.state = HarnessState::Terminated;
    }
}

/// Runs the configured smoke test against `engine` and returns the verdict.
pub async fn run_smoke<E: ImageEngine, C: SmokeConfig + ?Sized>(engine: E, config: &C) -> Outcome {
    let mask = build_mask(config);
    let request = build_request(config, mask);

    let mut harness = Harness::new(engine);
    let outcome = harness.run(request).await;
    harness.terminate();
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
