//! Gourmet bot core library: configuration, LINE channel, restaurant search, reply
//! construction, and the webhook gateway used by the CLI.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod reply;
pub mod search;
