//! Axum gateway receiving Slack Events API callbacks.
//!
//! - Request body size limit (64KB) and request timeout (30s)
//! - `X-Slack-Signature` verification with a 300s replay window
//! - Events are acknowledged immediately; commands run in the background

use crate::channels::{SlackEnvelope, SlackEvent, SlackMessenger};
use crate::commands::{all_commands, CommandExecutor, CommandRegistry};
use crate::config::{build_http_client, Config};
use crate::images::ThreadRandom;
use crate::util::truncate_with_ellipsis;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Requests signed longer ago than this are rejected as replays.
pub const SIGNATURE_MAX_AGE_SECS: u64 = 300;

const SIGNATURE_HEADER: &str = "X-Slack-Signature";
const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";
const RETRY_HEADER: &str = "X-Slack-Retry-Num";
const RETRY_REASON_HEADER: &str = "X-Slack-Retry-Reason";

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub executor: CommandExecutor,
    /// Slack signing secret for `X-Slack-Signature` verification
    pub signing_secret: Arc<str>,
}

/// Routes served by the gateway, with body limit and timeout applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_slack_events))
        .route("/slack/events", post(handle_slack_events))
        .route("/health", get(handle_health))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Wire the bot from config and serve until Ctrl+C.
pub async fn run_gateway(host: &str, port: u16, config: Config) -> Result<()> {
    config.validate()?;
    config.validate_slack()?;

    let client = build_http_client(&config.http);
    let slack = Arc::new(SlackMessenger::new(
        config.slack.bot_token.clone(),
        config.slack.api_url.clone(),
        client.clone(),
    ));
    let identity = slack
        .auth_test()
        .await
        .context("Slack rejected the bot token")?;
    tracing::info!(
        user_id = %identity.user_id,
        team = %identity.team,
        "Slack bot authenticated"
    );

    let registry = Arc::new(CommandRegistry::new(all_commands(
        &config,
        client,
        Arc::new(ThreadRandom),
    )));
    let state = AppState {
        executor: CommandExecutor::new(registry, slack),
        signing_secret: Arc::from(config.slack.signing_secret.as_str()),
    };

    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind gateway to {host}:{port}"))?;
    let actual_port = listener.local_addr()?.port();

    println!("🐱 iyashi-bot gateway listening on http://{host}:{actual_port}");
    println!("  POST /slack/events - Slack Events API (also POST /)");
    println!("  GET  /health       - health check");
    println!("  Press Ctrl+C to stop.\n");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// AXUM HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

/// GET /health
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// POST /slack/events - signed Events API callback
async fn handle_slack_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let (Some(timestamp), Some(signature)) =
        (header_value(TIMESTAMP_HEADER), header_value(SIGNATURE_HEADER))
    else {
        tracing::warn!("Slack event missing signature headers");
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Missing signature headers"})),
        )
            .into_response();
    };

    if !verify_slack_signature(&state.signing_secret, timestamp, &body, signature) {
        tracing::warn!("Slack event signature verification failed");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "Invalid signature"})),
        )
            .into_response();
    }

    // Slack redelivers when the first ack was slow; that delivery is already being handled.
    if let Some(retry) = header_value(RETRY_HEADER) {
        let reason = header_value(RETRY_REASON_HEADER).unwrap_or("unknown");
        tracing::warn!(retry, reason, "Ignoring Slack retry delivery");
        return StatusCode::OK.into_response();
    }

    let envelope = match serde_json::from_slice::<SlackEnvelope>(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(
                "Invalid Slack event payload: {e} ({})",
                truncate_with_ellipsis(&String::from_utf8_lossy(&body), 120)
            );
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Invalid JSON payload"})),
            )
                .into_response();
        }
    };

    match envelope {
        SlackEnvelope::UrlVerification { challenge } => {
            ([(header::CONTENT_TYPE, "text/plain")], challenge).into_response()
        }
        SlackEnvelope::EventCallback {
            event: SlackEvent::AppMention(mention),
        } => {
            if mention.is_edited() {
                tracing::debug!(channel = %mention.channel, "Ignoring edited mention");
                return StatusCode::OK.into_response();
            }
            tracing::info!(
                channel = %mention.channel,
                user = %mention.user,
                "Mention received: {}",
                truncate_with_ellipsis(&mention.text, 80)
            );
            let executor = state.executor.clone();
            tokio::spawn(async move {
                executor
                    .execute_text(&mention.channel, &mention.user, &mention.text)
                    .await;
            });
            StatusCode::OK.into_response()
        }
        SlackEnvelope::EventCallback { .. } | SlackEnvelope::Other => {
            StatusCode::OK.into_response()
        }
    }
}

/// Verify a Slack request signature.
///
/// Slack signs `v0:{timestamp}:{body}` with HMAC-SHA256 and sends
/// `v0=<hex>` in `X-Slack-Signature`. Timestamps more than
/// [`SIGNATURE_MAX_AGE_SECS`] away from now are rejected.
pub fn verify_slack_signature(secret: &str, timestamp: &str, body: &[u8], signature: &str) -> bool {
    verify_slack_signature_at(
        secret,
        timestamp,
        body,
        signature,
        chrono::Utc::now().timestamp(),
    )
}

fn verify_slack_signature_at(
    secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now: i64,
) -> bool {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let Ok(ts) = timestamp.trim().parse::<i64>() else {
        tracing::warn!("Slack: invalid request timestamp: {timestamp}");
        return false;
    };
    if now.abs_diff(ts) > SIGNATURE_MAX_AGE_SECS {
        tracing::warn!("Slack: rejecting stale request timestamp ({ts}, now={now})");
        return false;
    }

    let Some(signature_hex) = signature.trim().strip_prefix("v0=") else {
        return false;
    };
    let Ok(provided) = hex::decode(signature_hex) else {
        tracing::warn!("Slack: invalid signature format");
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);

    mac.verify_slice(&provided).is_ok()
}
