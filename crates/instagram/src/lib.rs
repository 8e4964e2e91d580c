//! Directory-message channel adapter for Instagram's private API.
//!
//! The adapter logs in once per dispatch and hands out a session shared
//! read-only by the batch. The API rejects concurrent requests on one
//! session, so the adapter declares serialized sends. Recipient handles
//! are resolved to internal user ids before broadcasting; a failed
//! resolution fails that recipient only.

use std::sync::Arc;

use {
    anyhow::{Context, Result, bail},
    async_trait::async_trait,
    reqwest::{Client, StatusCode},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::{debug, info},
};

use {
    megaphone_channels::{ChannelAdapter, ChannelSession, ContactDirectory, SendError},
    megaphone_common::Contact,
};

/// Instagram private API base URL.
const API_BASE: &str = "https://i.instagram.com/api/v1";

/// Directory-message channel backed by Instagram DMs.
pub struct InstagramAdapter {
    client: Client,
    username: String,
    password: Secret<String>,
    base_url: String,
}

impl InstagramAdapter {
    #[must_use]
    pub fn new(username: impl Into<String>, password: Secret<String>) -> Self {
        Self::with_base_url(username, password, API_BASE)
    }

    /// Point the adapter at a different API base (used in tests).
    #[must_use]
    pub fn with_base_url(
        username: impl Into<String>,
        password: Secret<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            username: username.into(),
            password,
            base_url: base_url.into(),
        }
    }
}

impl std::fmt::Debug for InstagramAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstagramAdapter")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl ChannelAdapter for InstagramAdapter {
    fn id(&self) -> &str {
        "instagram"
    }

    fn name(&self) -> &str {
        "Instagram"
    }

    // One authenticated session cannot issue concurrent requests.
    fn serial_sends(&self) -> bool {
        true
    }

    async fn open_session(&self) -> Result<Arc<dyn ChannelSession>> {
        let resp = self
            .client
            .post(format!("{}/accounts/login/", self.base_url))
            .json(&serde_json::json!({
                "username": self.username,
                "password": self.password.expose_secret(),
            }))
            .send()
            .await
            .context("instagram login request failed")?;

        if !resp.status().is_success() {
            bail!("instagram login rejected: {}", resp.status());
        }

        let login: LoginResponse = resp
            .json()
            .await
            .context("failed to parse instagram login response")?;
        if login.status != "ok" {
            bail!("instagram login failed: {}", login.status);
        }
        let authorization = login
            .authorization
            .context("instagram login response missing authorization token")?;

        info!(user = %self.username, "instagram session opened");
        Ok(Arc::new(InstagramSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            authorization,
        }))
    }
}

/// An authenticated Instagram session, valid for one dispatch call.
struct InstagramSession {
    client: Client,
    base_url: String,
    authorization: String,
}

impl InstagramSession {
    /// Map a handle to the channel-internal user id.
    async fn resolve_user(&self, handle: &str) -> Result<u64, SendError> {
        let resp = self
            .client
            .get(format!("{}/users/{handle}/usernameinfo/", self.base_url))
            .header("authorization", &self.authorization)
            .send()
            .await
            .map_err(|e| SendError::Send(format!("user lookup failed: {e}")))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(SendError::Resolution(handle.to_string()));
        }
        if !resp.status().is_success() {
            return Err(SendError::Send(format!(
                "user lookup failed: {}",
                resp.status()
            )));
        }

        let info: UserInfoResponse = resp
            .json()
            .await
            .map_err(|e| SendError::Send(format!("bad user lookup response: {e}")))?;
        Ok(info.user.pk)
    }
}

#[async_trait]
impl ChannelSession for InstagramSession {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), SendError> {
        let pk = self.resolve_user(recipient).await?;
        debug!(recipient, pk, "broadcasting direct message");

        let resp = self
            .client
            .post(format!(
                "{}/direct_v2/threads/broadcast/text/",
                self.base_url
            ))
            .header("authorization", &self.authorization)
            .json(&serde_json::json!({
                "recipient_users": [[pk]],
                "text": message,
            }))
            .send()
            .await
            .map_err(|e| SendError::Send(format!("broadcast failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(SendError::Send(format!(
                "broadcast rejected: {}",
                resp.status()
            )));
        }
        Ok(())
    }

    fn directory(&self) -> Option<&dyn ContactDirectory> {
        Some(self)
    }
}

#[async_trait]
impl ContactDirectory for InstagramSession {
    /// List the followers of `target`, walking pagination to the end.
    async fn list_contacts(&self, target: &str) -> Result<Vec<Contact>> {
        let pk = self
            .resolve_user(target)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;

        let mut contacts = Vec::new();
        let mut max_id: Option<String> = None;

        loop {
            let mut req = self
                .client
                .get(format!("{}/friendships/{pk}/followers/", self.base_url))
                .header("authorization", &self.authorization);
            if let Some(ref id) = max_id {
                req = req.query(&[("max_id", id)]);
            }

            let resp = req.send().await.context("follower listing failed")?;
            if !resp.status().is_success() {
                bail!("follower listing rejected: {}", resp.status());
            }
            let page: FollowersResponse = resp
                .json()
                .await
                .context("failed to parse follower listing")?;

            contacts.extend(page.users.into_iter().map(|u| Contact {
                handle: u.username,
                display_name: u.full_name,
                private: u.is_private,
                avatar_url: u.profile_pic_url,
            }));

            match page.next_max_id {
                Some(id) => max_id = Some(id),
                None => break,
            }
        }

        debug!(target, count = contacts.len(), "follower listing complete");
        Ok(contacts)
    }
}

// ── API types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LoginResponse {
    status: String,
    #[serde(default)]
    authorization: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    user: ApiUser,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    pk: u64,
}

#[derive(Debug, Deserialize)]
struct FollowersResponse {
    #[serde(default)]
    users: Vec<FollowerUser>,
    #[serde(default)]
    next_max_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FollowerUser {
    username: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    is_private: bool,
    #[serde(default)]
    profile_pic_url: Option<String>,
}
