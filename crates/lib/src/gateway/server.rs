//! Gateway HTTP server (single port).

use crate::channels::{
    parse_webhook, ChannelHandle, InboundEvent, LineChannel, ReplyMessage, WebhookError,
    SIGNATURE_HEADER,
};
use crate::config::{self, Config, Credentials};
use crate::reply;
use crate::search::{format_coordinate, HotpepperClient};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;

const HEALTH_BODY: &str = "Hello World";

/// Shared, read-only state for request handlers. Built once at startup.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    /// Channel secret for X-Line-Signature verification.
    channel_secret: Arc<str>,
    /// Reply side of the channel (LINE in production).
    pub channel: Arc<dyn ChannelHandle>,
    pub search: HotpepperClient,
    /// Deadline for one webhook batch.
    request_timeout: Duration,
}

impl GatewayState {
    /// Build clients from config and resolved credentials. Both clients share the upstream timeout.
    pub fn new(config: Config, credentials: Credentials) -> Self {
        let timeout = config.gateway.upstream_timeout();
        let request_timeout = config.gateway.request_timeout();
        let channel = LineChannel::new(
            config.channels.line.api_base.clone(),
            credentials.channel_access_token,
            timeout,
        );
        let search = HotpepperClient::new(
            config.search.base_url.clone(),
            credentials.search_api_key,
            timeout,
        );
        Self {
            config: Arc::new(config),
            channel_secret: Arc::from(credentials.channel_secret),
            channel: Arc::new(channel),
            search,
            request_timeout,
        }
    }

    /// Replace the reply channel (e.g. with an in-memory recorder).
    pub fn with_channel(mut self, channel: Arc<dyn ChannelHandle>) -> Self {
        self.channel = channel;
        self
    }
}

/// Routes: `GET /` health, `POST /callback` webhook.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/callback", post(line_callback))
        .with_state(state)
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Credentials must resolve (env or config) or startup fails; nothing after startup exits the process.
/// Blocks until shutdown (SIGINT or SIGTERM).
pub async fn run_gateway(config: Config) -> Result<()> {
    let credentials = config::resolve_credentials(&config)?;
    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let state = GatewayState::new(config, credentials);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a constant body for liveness checks.
async fn health_http() -> &'static str {
    HEALTH_BODY
}

/// POST /callback verifies X-Line-Signature, then replies to each event in order.
/// 400 on a missing or bad signature, 500 on any other parse failure, 200 otherwise
/// (including when individual replies or searches fail).
async fn line_callback(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> StatusCode {
    let request_id = uuid::Uuid::new_v4().to_string();
    log::info!("[{}] webhook request received", request_id);
    let body = match body {
        Ok(b) => b,
        Err(e) => {
            log::warn!("[{}] reading webhook body failed: {}", request_id, e);
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let events = match parse_webhook(&state.channel_secret, signature, &body) {
        Ok(events) => events,
        Err(WebhookError::InvalidSignature) => {
            log::warn!("[{}] rejected webhook: invalid signature", request_id);
            return StatusCode::BAD_REQUEST;
        }
        Err(e) => {
            log::warn!("[{}] rejected webhook: {}", request_id, e);
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };
    dispatch_within_deadline(&state, &request_id, events).await;
    StatusCode::OK
}

/// Run the batch under the request deadline. Returns false when the deadline cut it short.
async fn dispatch_within_deadline(
    state: &GatewayState,
    request_id: &str,
    events: Vec<InboundEvent>,
) -> bool {
    let deadline = state.request_timeout;
    match tokio::time::timeout(deadline, dispatch_events(state, request_id, events)).await {
        Ok(()) => true,
        Err(_) => {
            log::warn!(
                "[{}] batch not finished within {:?}; remaining events dropped",
                request_id,
                deadline
            );
            false
        }
    }
}

/// Handle a batch sequentially. A failed reply never stops the rest of the batch.
async fn dispatch_events(state: &GatewayState, request_id: &str, events: Vec<InboundEvent>) {
    for event in events {
        match event {
            InboundEvent::Text { reply_token, text } => {
                log::debug!("[{}] text message ({} chars)", request_id, text.chars().count());
                send_reply(state, request_id, &reply_token, reply::echo_reply(&text)).await;
            }
            InboundEvent::Location {
                reply_token,
                latitude,
                longitude,
            } => {
                let message = location_reply(state, request_id, latitude, longitude).await;
                send_reply(state, request_id, &reply_token, message).await;
            }
            InboundEvent::Other => {
                log::debug!("[{}] ignoring unhandled event", request_id);
            }
        }
    }
}

/// Search around the coordinates; any upstream failure degrades to a text reply.
async fn location_reply(
    state: &GatewayState,
    request_id: &str,
    latitude: f64,
    longitude: f64,
) -> ReplyMessage {
    let lat = format_coordinate(latitude);
    let lng = format_coordinate(longitude);
    log::debug!("[{}] location message at {},{}", request_id, lat, lng);
    match state.search.search(&lat, &lng).await {
        Ok(shops) => {
            log::debug!("[{}] search returned {} shop(s)", request_id, shops.len());
            reply::shops_reply(&shops, state.config.search.column_limit())
        }
        Err(e) => {
            log::warn!("[{}] restaurant search failed: {}", request_id, e);
            reply::search_unavailable_reply()
        }
    }
}

async fn send_reply(state: &GatewayState, request_id: &str, reply_token: &str, message: ReplyMessage) {
    if let Err(e) = state.channel.reply(reply_token, vec![message]).await {
        log::warn!(
            "[{}] {} reply failed (not retried): {}",
            request_id,
            state.channel.id(),
            e
        );
    }
}
