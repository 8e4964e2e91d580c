//! Contact extraction: gate, fetch, dedupe, truncate.
//!
//! Pulls the contact directory of a target handle through a channel
//! adapter, collapses duplicates, and applies the trial result limit
//! when the entitlement gate asks for it. Deduplication itself never
//! truncates — the limit is an entitlement concern.

use std::collections::HashSet;

use {chrono::Utc, serde::Serialize, thiserror::Error, tracing::info};

use {
    megaphone_channels::ChannelAdapter,
    megaphone_common::{Account, Contact},
    megaphone_entitlement::EntitlementError,
};

/// Maximum contacts returned to trial accounts.
pub const TRIAL_CONTACT_LIMIT: usize = 1000;

/// Failures that abort an extraction call as a whole.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("access denied: {0}")]
    Denied(#[from] EntitlementError),
    #[error("channel does not expose a contact directory")]
    NoDirectory,
    #[error("channel session setup failed: {0}")]
    Setup(#[source] anyhow::Error),
    #[error("contact listing failed: {0}")]
    Fetch(#[source] anyhow::Error),
}

/// Result of one extraction call. `total` counts deduplicated contacts
/// before any truncation; `limited` mirrors the trial entitlement.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub contacts: Vec<Contact>,
    pub total: usize,
    pub limited: bool,
}

/// Collapse a contact list to the first occurrence of each handle.
///
/// Handles are compared exactly as received; two handles differing only
/// by case are distinct contacts. First-occurrence order is preserved.
#[must_use]
pub fn dedupe(contacts: Vec<Contact>) -> Vec<Contact> {
    let mut seen = HashSet::with_capacity(contacts.len());
    contacts
        .into_iter()
        .filter(|c| seen.insert(c.handle.clone()))
        .collect()
}

/// Extract the contact directory of `target` on behalf of `account`.
pub async fn extract(
    adapter: &dyn ChannelAdapter,
    account: &Account,
    target: &str,
) -> Result<Extraction, ExtractError> {
    // Fresh authorization on every call; trial expiry is time-dependent.
    let entitlement = megaphone_entitlement::authorize(account, Utc::now())?;

    let session = adapter.open_session().await.map_err(ExtractError::Setup)?;
    let directory = session.directory().ok_or(ExtractError::NoDirectory)?;

    let raw = directory
        .list_contacts(target)
        .await
        .map_err(ExtractError::Fetch)?;

    let mut contacts = dedupe(raw);
    let total = contacts.len();
    let limited = entitlement.truncate;
    if limited {
        contacts.truncate(TRIAL_CONTACT_LIMIT);
    }

    info!(
        account = %account.id,
        target,
        total,
        returned = contacts.len(),
        limited,
        "extraction complete"
    );

    Ok(Extraction {
        contacts,
        total,
        limited,
    })
}
