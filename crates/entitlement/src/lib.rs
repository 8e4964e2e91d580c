//! Entitlement gating for outreach operations.
//!
//! Trial accounts get a fixed window from `trial_start`; subscribed
//! accounts are always allowed regardless of trial fields. The check is
//! pure and must run fresh on every gated call — trial expiry is
//! time-dependent, so a cached decision would go stale.

use {
    chrono::{DateTime, Duration, Utc},
    thiserror::Error,
    tracing::debug,
};

use megaphone_common::{Account, Tier};

/// How long a trial account keeps access after `trial_start`.
pub const TRIAL_WINDOW_HOURS: i64 = 72;

/// Reasons an account is denied a gated operation. Unknown tiers and
/// malformed trial accounts fail closed, never open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntitlementError {
    #[error("trial expired")]
    TrialExpired,
    #[error("trial account has no trial start date")]
    MissingTrialStart,
    #[error("unrecognized entitlement tier")]
    UnknownTier,
}

/// A granted entitlement. `truncate` means result sets must be limited
/// by the caller (a trial concern, not a data-shape concern).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entitlement {
    pub truncate: bool,
}

/// Decide whether `account` may perform a gated operation at `now`.
pub fn authorize(account: &Account, now: DateTime<Utc>) -> Result<Entitlement, EntitlementError> {
    match account.tier {
        Tier::Subscribed => Ok(Entitlement { truncate: false }),
        Tier::Trial => {
            let start = account
                .trial_start
                .ok_or(EntitlementError::MissingTrialStart)?;
            if now > start + Duration::hours(TRIAL_WINDOW_HOURS) {
                debug!(account = %account.id, "trial window elapsed");
                return Err(EntitlementError::TrialExpired);
            }
            Ok(Entitlement { truncate: true })
        },
        Tier::Unknown => {
            debug!(account = %account.id, "unrecognized tier, failing closed");
            Err(EntitlementError::UnknownTier)
        },
    }
}
