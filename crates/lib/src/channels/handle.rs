//! Outbound side of a channel: reply to an inbound event.

use crate::channels::line::{LineError, ReplyMessage};
use async_trait::async_trait;

/// Handle to a messaging channel that can answer inbound events.
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel id (e.g. "line").
    fn id(&self) -> &str;

    /// Send `messages` as the reply correlated with `reply_token`. Tokens are single-use; a
    /// second reply with the same token fails on the platform side and is not retried.
    async fn reply(&self, reply_token: &str, messages: Vec<ReplyMessage>) -> Result<(), LineError>;
}
