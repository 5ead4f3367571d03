//! Inbound events: a verified webhook body reduced to what the bot dispatches on.

use crate::channels::line::{WebhookEvent, WebhookMessage, WebhookPayload};
use crate::channels::signature::verify_signature;

/// One event from a webhook batch, in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Text {
        reply_token: String,
        text: String,
    },
    Location {
        reply_token: String,
        latitude: f64,
        longitude: f64,
    },
    /// Non-message events, unsupported message kinds, or events without a reply token.
    Other,
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("malformed webhook body: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<WebhookEvent> for InboundEvent {
    fn from(event: WebhookEvent) -> Self {
        if event.typ != "message" {
            return InboundEvent::Other;
        }
        let Some(reply_token) = event.reply_token.filter(|t| !t.is_empty()) else {
            return InboundEvent::Other;
        };
        match event.message {
            Some(WebhookMessage::Text { text, .. }) => InboundEvent::Text { reply_token, text },
            Some(WebhookMessage::Location {
                latitude,
                longitude,
                ..
            }) => InboundEvent::Location {
                reply_token,
                latitude,
                longitude,
            },
            Some(WebhookMessage::Unsupported) | None => InboundEvent::Other,
        }
    }
}

/// Verify the signature header against the raw body, then parse the events in order.
/// A missing header is treated as an invalid signature.
pub fn parse_webhook(
    channel_secret: &str,
    signature: Option<&str>,
    body: &[u8],
) -> Result<Vec<InboundEvent>, WebhookError> {
    let signature = signature.unwrap_or("");
    if !verify_signature(channel_secret, body, signature) {
        return Err(WebhookError::InvalidSignature);
    }
    let payload: WebhookPayload = serde_json::from_slice(body)?;
    if let Some(ref dest) = payload.destination {
        log::debug!("webhook for destination {} with {} event(s)", dest, payload.events.len());
    }
    Ok(payload.events.into_iter().map(InboundEvent::from).collect())
}
