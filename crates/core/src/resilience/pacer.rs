//! Per-connector request pacing.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::connector::ConnectorError;
use crate::context::CallContext;

/// "Earliest next request" watermark for one connector instance.
///
/// Every request reserves a slot at or after the watermark and waits for
/// it; completion and rate-limit penalties push the watermark forward.
/// Concurrent callers therefore serialize behind each other.
#[derive(Debug)]
pub struct Pacer {
    spacing: Duration,
    next_allowed: Mutex<Instant>,
}

impl Pacer {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            next_allowed: Mutex::new(Instant::now()),
        }
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Wait for this caller's slot.
    pub async fn acquire(&self, ctx: &CallContext) -> Result<(), ConnectorError> {
        ctx.check()?;

        let slot = {
            let mut next = self.next_allowed.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + self.spacing;
            slot
        };

        let now = Instant::now();
        if slot > now {
            debug!(wait_ms = (slot - now).as_millis() as u64, "Pacing request");
            ctx.sleep_until(slot).await?;
        }
        Ok(())
    }

    /// Record that a request finished; the next one waits a full spacing.
    pub async fn complete(&self) {
        self.push_forward(self.spacing).await;
    }

    /// Hold off all requests for at least `delay` from now.
    pub async fn penalize(&self, delay: Duration) {
        self.push_forward(delay).await;
    }

    pub async fn next_allowed(&self) -> Instant {
        *self.next_allowed.lock().await
    }

    async fn push_forward(&self, delay: Duration) {
        let mut next = self.next_allowed.lock().await;
        *next = (*next).max(Instant::now() + delay);
    }
}
