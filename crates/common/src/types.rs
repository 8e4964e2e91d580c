use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

// ── Accounts ─────────────────────────────────────────────────────────────────

/// Entitlement tier controlling feature access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Trial,
    Subscribed,
    /// Any tier value we don't recognize. Gating fails closed on this.
    Unknown,
}

// Deserialized by hand so an unrecognized tier value becomes `Unknown`
// instead of a parse error — the gate then fails closed on it.
impl<'de> Deserialize<'de> for Tier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "trial" => Tier::Trial,
            "subscribed" => Tier::Subscribed,
            _ => Tier::Unknown,
        })
    }
}

/// A subscriber account as read from the account store.
///
/// The store is authoritative; the core never writes accounts. A `trial`
/// account always carries `trial_start`; a missing one is a data error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub tier: Tier,
    #[serde(default)]
    pub trial_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subscription_end: Option<DateTime<Utc>>,
}

// ── Contacts ─────────────────────────────────────────────────────────────────

/// One entry in an extracted contact list.
///
/// Identity is the handle exactly as the channel returned it — no
/// normalization, no case folding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Contact {
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            display_name: None,
            private: false,
            avatar_url: None,
        }
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────────────

/// A request to send one message to many recipients on one channel.
/// Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub channel: String,
    pub recipients: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Success,
    Failed,
}

/// Per-recipient result of a dispatch. `detail` is set iff the send failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientOutcome {
    pub recipient: String,
    pub status: SendStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RecipientOutcome {
    #[must_use]
    pub fn success(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            status: SendStatus::Success,
            detail: None,
        }
    }

    #[must_use]
    pub fn failed(recipient: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            status: SendStatus::Failed,
            detail: Some(detail.into()),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SendStatus::Success
    }
}

/// Aggregated outcomes of one dispatch call.
///
/// Invariant: every recipient in the request appears exactly once here,
/// regardless of individual failures. Order is unspecified.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    pub outcomes: Vec<RecipientOutcome>,
}

impl BatchResult {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Look up the outcome for one recipient.
    #[must_use]
    pub fn outcome_for(&self, recipient: &str) -> Option<&RecipientOutcome> {
        self.outcomes.iter().find(|o| o.recipient == recipient)
    }
}
