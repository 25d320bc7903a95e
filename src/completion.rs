//! One-shot completion signal between an engine and whoever submitted work to it.
//!
//! `CompletionSender::resolve` consumes the sender, so an engine can report at
//! most one outcome per request. The receiving half is a future that yields that
//! outcome, or `TransformError::EngineDropped` if the sender went away unresolved.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::engine_lib::TransformOutput;
use crate::error::TransformError;

pub type TransformResult = Result<TransformOutput, TransformError>;

pub fn channel() -> (CompletionSender, Completion) {
    let (tx, rx) = oneshot::channel();
    (CompletionSender { tx }, Completion { rx })
}

#[derive(Debug)]
pub struct CompletionSender {
    tx: oneshot::Sender<TransformResult>,
}

impl CompletionSender {
    /// Delivers the outcome. A receiver that is no longer listening is not an
    /// error for the engine, so the result is simply discarded in that case.
    pub fn resolve(self, result: TransformResult) {
        if self.tx.send(result).is_err() {
            tracing::debug!("completion receiver dropped before the engine finished");
        }
    }

    pub fn succeed(self, output: TransformOutput) {
        self.resolve(Ok(output));
    }

    pub fn fail(self, error: TransformError) {
        self.resolve(Err(error));
    }
}

#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<TransformResult>,
}

impl Future for Completion {
    type Output = TransformResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TransformError::EngineDropped)))
    }
}
