//! Reply construction: echo text, restaurant carousel, and the degraded fallbacks.

use crate::channels::{CarouselColumn, CarouselTemplate, ReplyMessage, Template, TemplateAction};
use crate::search::Shop;

/// LINE shows at most 60 characters of column text when an image or title is present.
pub const ADDRESS_MAX_CHARS: usize = 60;
pub const TITLE_MAX_CHARS: usize = 40;

pub const CAROUSEL_ALT_TEXT: &str = "Restaurant list";
pub const OPEN_PAGE_LABEL: &str = "Open in Hot Pepper";
pub const IMAGE_BACKGROUND_COLOR: &str = "#FFFFFF";

pub const NO_RESULTS_TEXT: &str = "No restaurants found nearby.";
pub const SEARCH_UNAVAILABLE_TEXT: &str =
    "Restaurant search is temporarily unavailable. Please try again later.";

/// First `max` Unicode code points of `s` (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub fn echo_reply(text: &str) -> ReplyMessage {
    ReplyMessage::text(text)
}

/// Columns of one carousel must agree on whether a thumbnail and a title are set.
struct ColumnShape {
    thumbnail: bool,
    title: bool,
}

fn shop_column(shop: &Shop, shape: &ColumnShape) -> CarouselColumn {
    let address = truncate_chars(&shop.address, ADDRESS_MAX_CHARS);
    CarouselColumn {
        thumbnail_image_url: shape.thumbnail.then(|| shop.photo_url.clone()),
        image_background_color: IMAGE_BACKGROUND_COLOR.to_string(),
        title: shape
            .title
            .then(|| truncate_chars(shop.name.trim(), TITLE_MAX_CHARS).to_string()),
        text: if address.trim().is_empty() {
            "-".to_string()
        } else {
            address.to_string()
        },
        actions: vec![TemplateAction::Uri {
            label: OPEN_PAGE_LABEL.to_string(),
            uri: shop.page_url.clone(),
        }],
    }
}

/// Carousel of up to `max_columns` shops, or the no-results text when none are usable.
/// Shops without a page URL are skipped. A thumbnail (title) is set on every column only
/// when every shown shop has a photo (name).
pub fn shops_reply(shops: &[Shop], max_columns: usize) -> ReplyMessage {
    let usable: Vec<&Shop> = shops
        .iter()
        .filter(|s| !s.page_url.trim().is_empty())
        .take(max_columns)
        .collect();
    if usable.is_empty() {
        return ReplyMessage::text(NO_RESULTS_TEXT);
    }
    let shape = ColumnShape {
        thumbnail: usable.iter().all(|s| !s.photo_url.trim().is_empty()),
        title: usable.iter().all(|s| !s.name.trim().is_empty()),
    };
    let columns = usable.iter().map(|s| shop_column(s, &shape)).collect();
    ReplyMessage::Template {
        alt_text: CAROUSEL_ALT_TEXT.to_string(),
        template: Template::Carousel(CarouselTemplate {
            columns,
            image_aspect_ratio: "rectangle".to_string(),
            image_size: "cover".to_string(),
        }),
    }
}

pub fn search_unavailable_reply() -> ReplyMessage {
    ReplyMessage::text(SEARCH_UNAVAILABLE_TEXT)
}
