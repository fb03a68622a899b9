//! Caller-supplied cancellation and deadline context.
//!
//! Dropping a future already cancels it, but pacing and backoff waits must
//! report *why* they stopped. `CallContext` carries an optional deadline and
//! a cancellation signal, and every wait in the crate goes through it.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

use crate::connector::ConnectorError;

/// Deadline and cancellation for one public call.
#[derive(Debug, Clone)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancelled: Option<watch::Receiver<bool>>,
}

/// Cancels every [`CallContext`] derived from it.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}

impl CallContext {
    /// A context that never expires and cannot be cancelled.
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancelled: None,
        }
    }

    /// A context plus the handle that cancels it.
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                deadline: None,
                cancelled: Some(rx),
            },
            CancelHandle { tx },
        )
    }

    /// Derive a context that expires after `timeout`, keeping any earlier
    /// deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context that expires at `deadline`, keeping any earlier one.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        };
        Self {
            deadline: Some(deadline),
            cancelled: self.cancelled.clone(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail fast if the context is already done.
    pub fn check(&self) -> Result<(), ConnectorError> {
        if let Some(rx) = &self.cancelled {
            if *rx.borrow() {
                return Err(ConnectorError::Cancelled);
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(ConnectorError::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Sleep for `duration` unless the context ends first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), ConnectorError> {
        self.sleep_until(Instant::now() + duration).await
    }

    /// Sleep until `until` unless the context ends first.
    ///
    /// A wait that would outlive the deadline returns `DeadlineExceeded`
    /// as soon as the deadline passes rather than at `until`.
    pub async fn sleep_until(&self, until: Instant) -> Result<(), ConnectorError> {
        self.run(sleep_until(until)).await
    }

    /// Drive `fut` to completion unless the context ends first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ConnectorError>
    where
        F: Future,
    {
        self.check()?;

        let cancelled = async {
            match self.cancelled.clone() {
                Some(mut rx) => {
                    let closed = rx.wait_for(|c| *c).await.map(|_| ()).is_err();
                    // A dropped handle can never cancel.
                    if closed {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(ConnectorError::Cancelled),
            _ = expired => Err(ConnectorError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}
