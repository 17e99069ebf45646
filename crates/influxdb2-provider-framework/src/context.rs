//! Per-operation context: cancellation and deadline

use crate::error::{FrameworkError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Context handed to every operation.
///
/// Remote calls go through [`Context::run`], which abandons the call as soon
/// as the token is cancelled or the deadline passes.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drive `fut` to completion unless the context is cancelled or expires
    /// first. The future is dropped on interruption.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        if self.cancel.is_cancelled() {
            return Err(FrameworkError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(FrameworkError::DeadlineExceeded);
            }
        }

        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FrameworkError::Cancelled),
            _ = expiry => Err(FrameworkError::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}
