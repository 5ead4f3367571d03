//! Communication channels (LINE).
//!
//! Webhook verification and parsing turn a raw callback into [`InboundEvent`]s; replies go
//! back out through a [`ChannelHandle`] keyed by the event's reply token.

mod handle;
mod inbound;
mod line;
mod signature;

pub use handle::ChannelHandle;
pub use inbound::{parse_webhook, InboundEvent, WebhookError};
pub use line::{
    CarouselColumn, CarouselTemplate, LineChannel, LineError, ReplyMessage, Template,
    TemplateAction,
};
pub use signature::{sign_body, verify_signature, SIGNATURE_HEADER};
