//! Restaurant search (Hot Pepper Gourmet).

mod hotpepper;

pub use hotpepper::{format_coordinate, HotpepperClient, SearchError, Shop};
