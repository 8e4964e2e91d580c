//! Channel adapter system.
//!
//! Each outreach channel (Instagram DMs, Gmail, ...) implements the
//! [`ChannelAdapter`] trait: a one-time session setup per dispatch plus a
//! per-recipient send capability. The registry maps channel selectors to
//! adapters so the engine never branches on channel names.

pub mod adapter;
pub mod registry;

pub use {
    adapter::{ChannelAdapter, ChannelSession, ContactDirectory, SendError},
    registry::ChannelRegistry,
};
