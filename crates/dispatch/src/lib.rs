//! Dispatch engine: fans one send-operation out across a recipient batch.
//!
//! Only entitlement denial and channel setup can abort the call, and only
//! before any recipient is attempted. Everything after the session opens
//! is per-recipient data inside the batch result — one recipient's
//! failure never touches its siblings, and every requested recipient gets
//! exactly one outcome.

use std::{sync::Arc, time::Duration};

use {
    chrono::Utc,
    futures::{StreamExt, stream},
    thiserror::Error,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use {
    megaphone_channels::{ChannelRegistry, ChannelSession},
    megaphone_common::{Account, BatchResult, DispatchRequest, RecipientOutcome},
    megaphone_entitlement::EntitlementError,
};

/// Detail recorded on recipients that were never attempted because the
/// caller cancelled the batch.
pub const CANCELLED_DETAIL: &str = "dispatch cancelled";

/// Detail recorded on recipients whose send exceeded the per-send timeout.
pub const TIMEOUT_DETAIL: &str = "send timed out";

/// Whole-batch failures. None of these produce a partial result: the
/// caller can always distinguish "the operation could not run" from
/// "the operation ran but some recipients failed".
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("access denied: {0}")]
    Denied(#[from] EntitlementError),
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
    #[error("channel session setup failed: {0}")]
    Setup(#[source] anyhow::Error),
}

/// Fan-out bounds for one engine instance.
#[derive(Debug, Clone, Copy)]
pub struct DispatchLimits {
    /// Peak concurrent sends per dispatch call. Channels that declare
    /// serialized sends are pinned to 1 regardless.
    pub concurrency: usize,
    /// Per-recipient send timeout. A timeout fails that recipient only.
    pub send_timeout: Duration,
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self {
            concurrency: 8,
            send_timeout: Duration::from_secs(30),
        }
    }
}

/// The access-gated multi-channel dispatch engine.
pub struct DispatchEngine {
    registry: ChannelRegistry,
    limits: DispatchLimits,
}

impl DispatchEngine {
    #[must_use]
    pub fn new(registry: ChannelRegistry, limits: DispatchLimits) -> Self {
        Self { registry, limits }
    }

    /// Execute `request` for `account`.
    ///
    /// Cancelling `cancel` stops launching new sends; recipients that
    /// were never attempted are still reported, marked failed with
    /// [`CANCELLED_DETAIL`], so the result stays complete.
    pub async fn dispatch(
        &self,
        account: &Account,
        request: &DispatchRequest,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, DispatchError> {
        // Fresh authorization on every call; trial expiry is time-dependent.
        megaphone_entitlement::authorize(account, Utc::now())?;

        let adapter = self
            .registry
            .get(&request.channel)
            .ok_or_else(|| DispatchError::UnknownChannel(request.channel.clone()))?;

        // One-time session setup, shared read-only by all recipient tasks.
        let session = adapter.open_session().await.map_err(DispatchError::Setup)?;

        // A session that cannot multiplex gets its sends serialized.
        let limit = if adapter.serial_sends() {
            1
        } else {
            self.limits.concurrency.max(1)
        };

        debug!(
            channel = %request.channel,
            recipients = request.recipients.len(),
            limit,
            "starting fan-out"
        );

        let outcomes: Vec<RecipientOutcome> = stream::iter(request.recipients.iter().cloned())
            .map(|recipient: String| {
                let session = Arc::clone(&session);
                async move {
                    self.attempt(session, &recipient, &request.message, cancel)
                        .await
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            account = %account.id,
            channel = %request.channel,
            total = outcomes.len(),
            failed,
            "dispatch complete"
        );

        Ok(BatchResult { outcomes })
    }

    /// Attempt one recipient. Always resolves to an outcome; per-recipient
    /// failures are terminal for this batch (no retries).
    async fn attempt(
        &self,
        session: Arc<dyn ChannelSession>,
        recipient: &str,
        message: &str,
        cancel: &CancellationToken,
    ) -> RecipientOutcome {
        if cancel.is_cancelled() {
            return RecipientOutcome::failed(recipient, CANCELLED_DETAIL);
        }
        match tokio::time::timeout(self.limits.send_timeout, session.send(recipient, message)).await
        {
            Ok(Ok(())) => RecipientOutcome::success(recipient),
            Ok(Err(e)) => {
                warn!(recipient, error = %e, "send failed");
                RecipientOutcome::failed(recipient, e.to_string())
            },
            Err(_) => {
                warn!(recipient, timeout_ms = self.limits.send_timeout.as_millis() as u64, "send timed out");
                RecipientOutcome::failed(recipient, TIMEOUT_DETAIL)
            },
        }
    }
}
