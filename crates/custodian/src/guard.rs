//! Cancellation and timeout guard for store-backed stages.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{EngineError, Result};

/// Runs `work`, giving up if `cancel` fires or `timeout` elapses first.
///
/// Cancellation is checked before the work is polled, so an already
/// cancelled token never starts it.
pub(crate) async fn guarded<T, F>(
    cancel: &CancellationToken,
    stage: &'static str,
    timeout: Duration,
    work: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(EngineError::Cancelled),
        outcome = tokio::time::timeout(timeout, work) => match outcome {
            Ok(result) => result,
            Err(_elapsed) => Err(EngineError::TimedOut { stage, timeout }),
        },
    }
}
