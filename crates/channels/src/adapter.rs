use std::sync::Arc;

use {anyhow::Result, async_trait::async_trait, thiserror::Error};

use megaphone_common::Contact;

/// Per-recipient send failure. Anything here is data inside a batch
/// result, never a whole-batch error.
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// The channel could not map the handle to one of its own users.
    #[error("recipient not found: {0}")]
    Resolution(String),
    /// The channel accepted the recipient but the send itself failed.
    #[error("send failed: {0}")]
    Send(String),
}

/// One outreach channel (e.g. "instagram", "gmail").
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Channel selector used in dispatch requests.
    fn id(&self) -> &str;

    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// True when the channel's session cannot issue concurrent requests,
    /// so sends within a batch must not overlap.
    fn serial_sends(&self) -> bool {
        false
    }

    /// One-time session setup, run once per dispatch call — never once
    /// per recipient. A failure here aborts the whole batch: no send
    /// could possibly succeed without it.
    async fn open_session(&self) -> Result<Arc<dyn ChannelSession>>;
}

/// An authenticated session scoped to a single dispatch call. Shared
/// read-only by all recipient tasks in that call and dropped when the
/// call ends.
#[async_trait]
pub trait ChannelSession: Send + Sync {
    /// Send one message to one recipient.
    async fn send(&self, recipient: &str, message: &str) -> Result<(), SendError>;

    /// Contact listing, for channels that expose a directory graph.
    fn directory(&self) -> Option<&dyn ContactDirectory> {
        None
    }
}

/// Directory listing capability (e.g. the followers of a handle).
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    async fn list_contacts(&self, target: &str) -> Result<Vec<Contact>>;
}
