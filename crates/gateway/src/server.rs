use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Json, Response},
        routing::{get, post},
    },
    serde::Deserialize,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use {
    megaphone_channels::ChannelRegistry,
    megaphone_common::{Account, DispatchRequest, store::AccountStore},
    megaphone_directory::ExtractError,
    megaphone_dispatch::{DispatchEngine, DispatchError},
};

/// Header carrying the pre-validated caller identity, set by the
/// upstream auth layer.
pub const ACCOUNT_HEADER: &str = "x-account-id";

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<DispatchEngine>,
    pub registry: ChannelRegistry,
    pub accounts: Arc<dyn AccountStore>,
}

impl GatewayState {
    #[must_use]
    pub fn new(
        engine: Arc<DispatchEngine>,
        registry: ChannelRegistry,
        accounts: Arc<dyn AccountStore>,
    ) -> Self {
        Self {
            engine,
            registry,
            accounts,
        }
    }
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_app(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/extract", post(extract_handler))
        .route("/api/send", post(send_handler))
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start_gateway(bind: &str, port: u16, state: GatewayState) -> anyhow::Result<()> {
    let channels = state.registry.ids();
    let app = build_app(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, channels = ?channels, "megaphone gateway listening");

    axum::serve(listener, app).await?;
    Ok(())
}

// ── Request types ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ExtractRequest {
    /// Channel whose directory to read. Defaults to the directory-message
    /// channel.
    #[serde(default = "default_extract_channel")]
    channel: String,
    target: String,
}

fn default_extract_channel() -> String {
    "instagram".into()
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

/// Resolve the caller's account from the identity header. The auth layer
/// upstream has already validated the identity; an account we don't know
/// about still fails closed.
async fn load_account(state: &GatewayState, headers: &HeaderMap) -> Result<Account, Response> {
    let id = headers
        .get(ACCOUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| error_body(StatusCode::UNAUTHORIZED, "caller identity required"))?;

    match state.accounts.get_account(id).await {
        Ok(Some(account)) => Ok(account),
        Ok(None) => Err(error_body(StatusCode::FORBIDDEN, "unknown account")),
        Err(e) => {
            warn!(account = id, error = %e, "account lookup failed");
            Err(error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "account lookup failed",
            ))
        },
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "channels": state.registry.ids(),
    }))
}

async fn extract_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(req): Json<ExtractRequest>,
) -> Response {
    let account = match load_account(&state, &headers).await {
        Ok(account) => account,
        Err(resp) => return resp,
    };
    if req.target.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "target must not be empty");
    }
    let Some(adapter) = state.registry.get(&req.channel) else {
        return error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("unknown channel: {}", req.channel),
        );
    };

    match megaphone_directory::extract(adapter.as_ref(), &account, &req.target).await {
        Ok(extraction) => Json(extraction).into_response(),
        Err(ExtractError::Denied(e)) => error_body(StatusCode::FORBIDDEN, e.to_string()),
        Err(e) => {
            warn!(account = %account.id, error = %e, "extraction failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        },
    }
}

async fn send_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(req): Json<DispatchRequest>,
) -> Response {
    let account = match load_account(&state, &headers).await {
        Ok(account) => account,
        Err(resp) => return resp,
    };
    if req.recipients.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "recipients must not be empty");
    }

    let cancel = CancellationToken::new();
    match state.engine.dispatch(&account, &req, &cancel).await {
        Ok(batch) => Json(batch).into_response(),
        Err(DispatchError::Denied(e)) => error_body(StatusCode::FORBIDDEN, e.to_string()),
        Err(e) => {
            warn!(account = %account.id, channel = %req.channel, error = %e, "dispatch failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        },
    }
}

#[cfg(test)]
mod tests {
    use {
        async_trait::async_trait,
        chrono::{Duration, Utc},
        megaphone_channels::{ChannelAdapter, ChannelSession, ContactDirectory, SendError},
        megaphone_common::{Contact, Tier, store::MemoryAccountStore},
        megaphone_dispatch::DispatchLimits,
    };

    use super::*;

    struct StubSession {
        fail: Vec<String>,
        contacts: Vec<Contact>,
    }

    #[async_trait]
    impl ChannelSession for StubSession {
        async fn send(&self, recipient: &str, _message: &str) -> Result<(), SendError> {
            if self.fail.iter().any(|r| r == recipient) {
                return Err(SendError::Resolution(recipient.to_string()));
            }
            Ok(())
        }

        fn directory(&self) -> Option<&dyn ContactDirectory> {
            Some(self)
        }
    }

    #[async_trait]
    impl ContactDirectory for StubSession {
        async fn list_contacts(&self, _target: &str) -> anyhow::Result<Vec<Contact>> {
            Ok(self.contacts.clone())
        }
    }

    struct StubAdapter {
        id: &'static str,
        fail: Vec<String>,
        contacts: Vec<Contact>,
        fail_setup: bool,
    }

    #[async_trait]
    impl ChannelAdapter for StubAdapter {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            "Stub"
        }

        async fn open_session(&self) -> anyhow::Result<Arc<dyn ChannelSession>> {
            if self.fail_setup {
                anyhow::bail!("login rejected");
            }
            Ok(Arc::new(StubSession {
                fail: self.fail.clone(),
                contacts: self.contacts.clone(),
            }))
        }
    }

    fn accounts() -> MemoryAccountStore {
        MemoryAccountStore::new([
            Account {
                id: "sub".into(),
                tier: Tier::Subscribed,
                trial_start: None,
                subscription_end: None,
            },
            Account {
                id: "trial".into(),
                tier: Tier::Trial,
                trial_start: Some(Utc::now() - Duration::hours(1)),
                subscription_end: None,
            },
            Account {
                id: "expired".into(),
                tier: Tier::Trial,
                trial_start: Some(Utc::now() - Duration::hours(100)),
                subscription_end: None,
            },
        ])
    }

    async fn spawn_app(adapter: StubAdapter) -> String {
        let mut registry = ChannelRegistry::new();
        registry.register(Arc::new(adapter));
        let engine = Arc::new(DispatchEngine::new(
            registry.clone(),
            DispatchLimits::default(),
        ));
        let state = GatewayState::new(engine, registry, Arc::new(accounts()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, build_app(state)).await;
        });
        format!("http://{addr}")
    }

    fn plain_adapter() -> StubAdapter {
        StubAdapter {
            id: "instagram",
            fail: Vec::new(),
            contacts: Vec::new(),
            fail_setup: false,
        }
    }

    #[tokio::test]
    async fn send_reports_per_recipient_failures_with_200() {
        let base = spawn_app(StubAdapter {
            fail: vec!["r2".into()],
            ..plain_adapter()
        })
        .await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/api/send"))
            .header(ACCOUNT_HEADER, "sub")
            .json(&serde_json::json!({
                "channel": "instagram",
                "recipients": ["r1", "r2", "r3"],
                "message": "hello",
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        let outcomes = body["outcomes"].as_array().unwrap();
        assert_eq!(outcomes.len(), 3);
        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|o| o["status"] == "failed")
            .map(|o| o["recipient"].as_str().unwrap_or_default())
            .collect();
        assert_eq!(failed, vec!["r2"]);
    }

    #[tokio::test]
    async fn expired_trial_gets_403() {
        let base = spawn_app(plain_adapter()).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/api/send"))
            .header(ACCOUNT_HEADER, "expired")
            .json(&serde_json::json!({
                "channel": "instagram",
                "recipients": ["r1"],
                "message": "hello",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap_or_default().contains("trial"));
    }

    #[tokio::test]
    async fn unknown_channel_gets_500() {
        let base = spawn_app(plain_adapter()).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/api/send"))
            .header(ACCOUNT_HEADER, "sub")
            .json(&serde_json::json!({
                "channel": "sms",
                "recipients": ["r1"],
                "message": "hello",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn setup_failure_gets_500_without_outcomes() {
        let base = spawn_app(StubAdapter {
            fail_setup: true,
            ..plain_adapter()
        })
        .await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/api/send"))
            .header(ACCOUNT_HEADER, "sub")
            .json(&serde_json::json!({
                "channel": "instagram",
                "recipients": ["r1", "r2"],
                "message": "hello",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body.get("outcomes").is_none());
    }

    #[tokio::test]
    async fn missing_identity_gets_401() {
        let base = spawn_app(plain_adapter()).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/api/send"))
            .json(&serde_json::json!({
                "channel": "instagram",
                "recipients": ["r1"],
                "message": "hello",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_recipients_gets_400() {
        let base = spawn_app(plain_adapter()).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/api/send"))
            .header(ACCOUNT_HEADER, "sub")
            .json(&serde_json::json!({
                "channel": "instagram",
                "recipients": [],
                "message": "hello",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn trial_extraction_is_truncated() {
        let contacts: Vec<Contact> = (0..1500)
            .map(|i| Contact::new(format!("user{i}")))
            .collect();
        let base = spawn_app(StubAdapter {
            contacts,
            ..plain_adapter()
        })
        .await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/api/extract"))
            .header(ACCOUNT_HEADER, "trial")
            .json(&serde_json::json!({ "target": "someone" }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["contacts"].as_array().unwrap().len(), 1000);
        assert_eq!(body["total"], 1500);
        assert_eq!(body["limited"], true);
    }

    #[tokio::test]
    async fn health_lists_channels() {
        let base = spawn_app(plain_adapter()).await;
        let resp = reqwest::Client::new()
            .get(format!("{base}/health"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["channels"], serde_json::json!(["instagram"]));
    }
}
