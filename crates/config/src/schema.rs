//! Config schema types (gateway, dispatch limits, channels, accounts).

use {secrecy::Secret, serde::Deserialize};

use megaphone_common::Account;

/// Root configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MegaphoneConfig {
    pub gateway: GatewayConfig,
    pub dispatch: DispatchConfig,
    pub channels: ChannelsConfig,
    /// Accounts seeded into the in-memory store. Deployments with a real
    /// account database leave this empty.
    pub accounts: Vec<Account>,
}

/// HTTP surface settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

/// Fan-out bounds applied to every dispatch call.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Peak concurrent sends per dispatch call.
    pub concurrency: usize,
    /// Per-recipient send timeout in seconds.
    pub send_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            send_timeout_secs: 30,
        }
    }
}

/// Channel credential sections. A missing section leaves that channel
/// unregistered.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub instagram: Option<InstagramConfig>,
    pub gmail: Option<GmailConfig>,
}

/// Credentials for the Instagram directory-message channel.
#[derive(Debug, Deserialize)]
pub struct InstagramConfig {
    pub username: String,
    pub password: Secret<String>,
    /// Override the API base URL (used in tests).
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Credentials for the Gmail channel. The refresh token is exchanged for
/// an access token once per dispatch.
#[derive(Debug, Deserialize)]
pub struct GmailConfig {
    /// Sender address.
    pub user: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub refresh_token: Secret<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub token_url: Option<String>,
}
