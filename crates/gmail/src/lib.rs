//! Email channel adapter over the Gmail REST API.
//!
//! Session setup exchanges the configured refresh token for a short-lived
//! access token, once per dispatch. Recipient identifiers are used
//! directly as destination addresses — no resolution step — and sends may
//! run concurrently.

use std::sync::Arc;

use {
    anyhow::{Context, Result, bail},
    async_trait::async_trait,
    base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD},
    reqwest::Client,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::{debug, info},
};

use megaphone_channels::{ChannelAdapter, ChannelSession, SendError};

/// Gmail REST API base URL.
const API_BASE: &str = "https://gmail.googleapis.com";

/// Google OAuth token endpoint.
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Subject line applied to every outreach mail.
const SUBJECT: &str = "Bulk Message";

/// Email channel backed by the Gmail API.
pub struct GmailAdapter {
    client: Client,
    user: String,
    client_id: String,
    client_secret: Secret<String>,
    refresh_token: Secret<String>,
    api_base: String,
    token_url: String,
}

impl GmailAdapter {
    #[must_use]
    pub fn new(
        user: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Secret<String>,
        refresh_token: Secret<String>,
    ) -> Self {
        Self::with_endpoints(
            user,
            client_id,
            client_secret,
            refresh_token,
            API_BASE,
            TOKEN_URL,
        )
    }

    /// Point the adapter at different endpoints (used in tests).
    #[must_use]
    pub fn with_endpoints(
        user: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Secret<String>,
        refresh_token: Secret<String>,
        api_base: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            user: user.into(),
            client_id: client_id.into(),
            client_secret,
            refresh_token,
            api_base: api_base.into(),
            token_url: token_url.into(),
        }
    }
}

impl std::fmt::Debug for GmailAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailAdapter")
            .field("user", &self.user)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl ChannelAdapter for GmailAdapter {
    fn id(&self) -> &str {
        "gmail"
    }

    fn name(&self) -> &str {
        "Gmail"
    }

    async fn open_session(&self) -> Result<Arc<dyn ChannelSession>> {
        let resp = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("refresh_token", self.refresh_token.expose_secret()),
            ])
            .send()
            .await
            .context("gmail token request failed")?;

        if !resp.status().is_success() {
            bail!("gmail token refresh rejected: {}", resp.status());
        }

        let token: TokenResponse = resp
            .json()
            .await
            .context("failed to parse gmail token response")?;

        info!(user = %self.user, "gmail session opened");
        Ok(Arc::new(GmailSession {
            client: self.client.clone(),
            api_base: self.api_base.clone(),
            from: self.user.clone(),
            access_token: token.access_token,
        }))
    }
}

/// A Gmail session holding a short-lived access token, valid for one
/// dispatch call.
struct GmailSession {
    client: Client,
    api_base: String,
    from: String,
    access_token: String,
}

impl GmailSession {
    /// Build the RFC 822 message the API expects in `raw`.
    fn build_mime(&self, to: &str, body: &str) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}",
            self.from, to, SUBJECT, body
        )
    }
}

#[async_trait]
impl ChannelSession for GmailSession {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), SendError> {
        let raw = URL_SAFE_NO_PAD.encode(self.build_mime(recipient, message));
        debug!(recipient, "sending mail");

        let resp = self
            .client
            .post(format!(
                "{}/gmail/v1/users/me/messages/send",
                self.api_base
            ))
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await
            .map_err(|e| SendError::Send(format!("mail send failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(SendError::Send(format!(
                "mail send rejected: {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

// ── API types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}
